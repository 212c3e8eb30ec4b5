//! 仓储接口定义
//!
//! 服务层通过 trait 依赖仓储，便于在单元测试中以内存实现替换 Postgres。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{EventStatus, NewRewardEvent, RewardEvent, RewardPolicy, RewardType};

use super::{DailyStatRow, EventFilter};

/// 奖励策略仓储接口（只读）
#[async_trait]
pub trait RewardPolicyRepositoryTrait: Send + Sync {
    /// 查询某奖励类型的生效策略，未配置或已停用返回 None
    async fn find_active_policy(&self, reward_type: RewardType) -> Result<Option<RewardPolicy>>;
}

/// 奖励事件仓储接口
///
/// 事件表是追加型审计流水：只插入、只按状态机转移，从不删除。
#[async_trait]
pub trait RewardEventRepositoryTrait: Send + Sync {
    /// 插入新事件（状态 PENDING、retry_count 0）
    ///
    /// 依赖 (user_id, reward_type, feed_id) 唯一约束，
    /// 冲突时不插入并返回 None——并发重复创建的兜底。
    async fn insert_if_absent(&self, event: &NewRewardEvent) -> Result<Option<i64>>;

    /// 去重预检：是否已存在同 (user, feed, type) 的事件
    async fn exists_for_feed(
        &self,
        user_id: &str,
        feed_id: i64,
        reward_type: RewardType,
    ) -> Result<bool>;

    /// 统计用户某类型自 since 起创建的事件数（每日配额用）
    async fn count_created_since(
        &self,
        user_id: &str,
        reward_type: RewardType,
        since: DateTime<Utc>,
    ) -> Result<i64>;

    /// 按 ID 查询事件
    async fn find_by_id(&self, event_id: i64) -> Result<Option<RewardEvent>>;

    /// 认领事件：PENDING|FAILED -> PROCESSING 的原子条件更新
    ///
    /// 返回 false 表示事件已被其他处理器认领或已处理，调用方必须跳过，
    /// 不得继续执行积分入账。
    async fn claim_for_processing(&self, event_id: i64) -> Result<bool>;

    /// PROCESSING -> PROCESSED
    async fn mark_processed(&self, event_id: i64) -> Result<bool>;

    /// PROCESSING -> FAILED，同时 retry_count + 1
    async fn mark_failed(&self, event_id: i64) -> Result<bool>;

    /// 列出可认领的事件（按创建时间升序）
    ///
    /// status 限定 PENDING 或 FAILED；max_retry_count 过滤掉重试耗尽的事件。
    async fn list_claimable(
        &self,
        status: EventStatus,
        max_retry_count: i32,
        limit: i64,
    ) -> Result<Vec<RewardEvent>>;

    /// 僵死回收：updated_at 早于 stale_before 的 PROCESSING 事件
    /// 批量回退为 FAILED（retry_count + 1），返回回退条数
    async fn requeue_stale_processing(&self, stale_before: DateTime<Utc>) -> Result<u64>;

    /// 按条件分页查询事件（按创建时间倒序）
    async fn list_events(
        &self,
        filter: &EventFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RewardEvent>>;

    /// 按条件统计事件总数
    async fn count_events(&self, filter: &EventFilter) -> Result<i64>;

    /// 按状态分组统计
    async fn count_by_status(&self) -> Result<Vec<(EventStatus, i64)>>;

    /// 按奖励类型分组统计
    async fn count_by_type(&self) -> Result<Vec<(RewardType, i64)>>;

    /// 已处理事件的积分总和
    async fn sum_processed_points(&self) -> Result<i64>;

    /// 按日聚合 [start, end) 窗口内的创建/处理数量和已处理积分
    async fn daily_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyStatRow>>;
}
