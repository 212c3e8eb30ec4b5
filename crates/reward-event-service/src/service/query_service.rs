//! 事件查询服务
//!
//! 只读侧：分页列表、单条查询、运营统计。不触碰状态机。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use super::dto::{DailyStat, EventPage, StatsSummary, StatusCount, TypeCount};
use crate::error::{Result, RewardError};
use crate::models::RewardEvent;
use crate::repository::EventFilter;
use crate::repository::traits::RewardEventRepositoryTrait;

/// 单页条数上限
pub const MAX_PAGE_SIZE: i64 = 200;

/// 事件查询服务
pub struct EventQueryService<E>
where
    E: RewardEventRepositoryTrait,
{
    event_repo: Arc<E>,
}

impl<E> EventQueryService<E>
where
    E: RewardEventRepositoryTrait,
{
    pub fn new(event_repo: Arc<E>) -> Self {
        Self { event_repo }
    }

    /// 按 ID 查询事件
    #[instrument(skip(self))]
    pub async fn get_event(&self, event_id: i64) -> Result<RewardEvent> {
        self.event_repo
            .find_by_id(event_id)
            .await?
            .ok_or(RewardError::EventNotFound(event_id))
    }

    /// 分页查询事件列表，page 从 0 起
    #[instrument(skip(self))]
    pub async fn list_events(
        &self,
        filter: &EventFilter,
        page: i64,
        page_size: i64,
    ) -> Result<EventPage> {
        if page < 0 {
            return Err(RewardError::Validation(format!("页码不能为负: {page}")));
        }
        if page_size <= 0 || page_size > MAX_PAGE_SIZE {
            return Err(RewardError::Validation(format!(
                "每页条数必须在 1..={MAX_PAGE_SIZE} 范围内: {page_size}"
            )));
        }

        let offset = page.checked_mul(page_size).ok_or_else(|| {
            RewardError::Validation(format!("页码超出可分页范围: {page}"))
        })?;

        let total = self.event_repo.count_events(filter).await?;
        let items = self
            .event_repo
            .list_events(filter, offset, page_size)
            .await?;

        Ok(EventPage {
            items,
            total,
            page,
            page_size,
        })
    }

    /// 全局统计摘要
    #[instrument(skip(self))]
    pub async fn stats_summary(&self) -> Result<StatsSummary> {
        let by_status: Vec<StatusCount> = self
            .event_repo
            .count_by_status()
            .await?
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect();
        let by_type: Vec<TypeCount> = self
            .event_repo
            .count_by_type()
            .await?
            .into_iter()
            .map(|(reward_type, count)| TypeCount { reward_type, count })
            .collect();
        let total_events = by_status.iter().map(|c| c.count).sum();
        let processed_points = self.event_repo.sum_processed_points().await?;

        Ok(StatsSummary {
            total_events,
            by_status,
            by_type,
            processed_points,
        })
    }

    /// 按日统计 [start, end) 窗口内的创建/处理数量和已处理积分
    #[instrument(skip(self))]
    pub async fn daily_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyStat>> {
        if start >= end {
            return Err(RewardError::Validation(format!(
                "统计窗口起点必须早于终点: {start} >= {end}"
            )));
        }

        let rows = self.event_repo.daily_stats(start, end).await?;
        Ok(rows.into_iter().map(DailyStat::from).collect())
    }
}
