//! 奖励事件枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 奖励类型
///
/// 标识触发奖励的用户行为，每种类型对应一条可运营配置的奖励策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardType {
    /// 发布动态 - 创建一条动态即可触发
    FeedCreation,
    /// 活动动态参与 - 在运营活动下发布动态
    EventFeedParticipation,
    /// 每日评论成就 - 当日评论数达标
    CommentDailyAchievement,
    /// 点赞里程碑 - 动态点赞数到达固定里程碑
    FeedLikesMilestone,
    /// 多商品动态 - 单条动态挂载多个不同商品
    DiverseProductFeed,
}

impl RewardType {
    /// 该奖励类型是否以动态为去重主体
    ///
    /// 以动态为主体的类型通过 (user_id, feed_id, reward_type) 唯一约束去重；
    /// 无动态主体的类型（如每日评论成就）仅受每日配额约束。
    pub fn is_feed_scoped(&self) -> bool {
        !matches!(self, Self::CommentDailyAchievement)
    }
}

/// 事件处理状态
///
/// 生命周期：PENDING -> PROCESSING -> PROCESSED（终态）或 FAILED（可重试）。
/// FAILED -> PROCESSING 为重试路径。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// 待处理 - 事件已创建，等待扫描
    #[default]
    Pending,
    /// 处理中 - 已被某个处理器认领，充当处理期间的互斥标记
    Processing,
    /// 已处理 - 积分入账成功，终态
    Processed,
    /// 失败 - 积分入账失败，等待重试
    Failed,
}

impl EventStatus {
    /// 状态转移表
    ///
    /// 所有状态变更必须通过仓储层的条件更新执行，
    /// 本方法仅用于文档化合法转移和测试校验。
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Failed, Self::Processing)
                | (Self::Processing, Self::Processed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// 是否为可认领状态（等待处理或等待重试）
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed)
    }
}
