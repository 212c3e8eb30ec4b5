//! 数据访问层

pub mod event_repo;
pub mod policy_repo;
pub mod traits;

pub use event_repo::RewardEventRepository;
pub use policy_repo::RewardPolicyRepository;
pub use traits::{RewardEventRepositoryTrait, RewardPolicyRepositoryTrait};

use chrono::NaiveDate;

use crate::models::{EventStatus, RewardType};

/// 事件列表查询条件
///
/// 各字段均为可选，None 表示不限定。
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub user_id: Option<String>,
    pub feed_id: Option<i64>,
    pub reward_type: Option<RewardType>,
    pub status: Option<EventStatus>,
}

/// 按日聚合统计行
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DailyStatRow {
    pub day: NaiveDate,
    /// 当日创建的事件数
    pub created_count: i64,
    /// 当日创建且当前已处理完成的事件数
    pub processed_count: i64,
    /// 上述已处理事件的积分总和
    pub processed_points: i64,
}
