//! 奖励事件与奖励策略实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{EventStatus, RewardType};

/// 奖励策略（运营配置，本服务只读）
///
/// 同一奖励类型最多存在一条生效策略，由存储层的部分唯一索引保证。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RewardPolicy {
    pub reward_type: RewardType,
    /// 本次奖励发放的积分
    pub points: i32,
    /// 附加徽章积分，可为 0
    pub badge_points: i32,
    /// 每用户每自然日可创建的事件数上限
    pub daily_limit: i32,
    pub active: bool,
}

/// 奖励事件
///
/// 核心实体。points / badge_points 是创建时刻策略的快照，
/// 创建后不再变更，即使策略随后被调整或处理发生重试。
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RewardEvent {
    pub id: i64,
    /// 获得奖励的用户
    pub user_id: String,
    /// 触发奖励的动态，非动态类奖励为空
    pub feed_id: Option<i64>,
    pub reward_type: RewardType,
    pub points: i32,
    pub badge_points: i32,
    /// 人类可读描述，用于运营侧展示
    pub description: String,
    /// 触发上下文快照（如 {"milestone": 100}）
    pub related_data: serde_json::Value,
    pub status: EventStatus,
    /// 处理失败次数，每次失败递增
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 待持久化的新事件
///
/// 状态固定为 PENDING、retry_count 固定为 0，由仓储层在插入时填充。
#[derive(Debug, Clone)]
pub struct NewRewardEvent {
    pub user_id: String,
    pub feed_id: Option<i64>,
    pub reward_type: RewardType,
    pub points: i32,
    pub badge_points: i32,
    pub description: String,
    pub related_data: serde_json::Value,
}

impl NewRewardEvent {
    /// 从策略快照构造新事件
    pub fn from_policy(
        user_id: impl Into<String>,
        feed_id: Option<i64>,
        policy: &RewardPolicy,
        description: impl Into<String>,
        related_data: serde_json::Value,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            feed_id,
            reward_type: policy.reward_type,
            points: policy.points,
            badge_points: policy.badge_points,
            description: description.into(),
            related_data,
        }
    }
}
