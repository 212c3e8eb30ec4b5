//! 查询侧数据传输对象
//!
//! 对外序列化统一 camelCase，与运营侧前端约定一致。

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{EventStatus, RewardEvent, RewardType};
use crate::repository::DailyStatRow;

/// 分页事件列表
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub items: Vec<RewardEvent>,
    /// 满足条件的事件总数（非本页条数）
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl EventPage {
    /// 总页数（向上取整）
    pub fn total_pages(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            (self.total + self.page_size - 1) / self.page_size
        }
    }
}

/// 全局统计摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_events: i64,
    pub by_status: Vec<StatusCount>,
    pub by_type: Vec<TypeCount>,
    /// 已处理事件的积分总和
    pub processed_points: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: EventStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    pub reward_type: RewardType,
    pub count: i64,
}

/// 按日统计
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub day: NaiveDate,
    pub created_count: i64,
    pub processed_count: i64,
    pub processed_points: i64,
}

impl From<DailyStatRow> for DailyStat {
    fn from(row: DailyStatRow) -> Self {
        Self {
            day: row.day,
            created_count: row.created_count,
            processed_count: row.processed_count,
            processed_points: row.processed_points,
        }
    }
}
