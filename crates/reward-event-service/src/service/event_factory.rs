//! 奖励事件工厂
//!
//! 每种奖励类型一个公开创建方法，全部遵循同一套创建协议：
//!
//! 1. 解析生效策略，未配置即静默跳过（策略可被运营随时下线）
//! 2. 去重预检（仅动态主体类奖励）
//! 3. 类型特定阈值检查（里程碑/多商品）
//! 4. 每日配额检查（自然日，服务器本地时区）
//! 5. 上下文序列化，失败记日志并跳过，绝不落半条记录
//! 6. 以策略快照落库，状态 PENDING
//!
//! 任何检查不通过都是预期中的高频静默跳过，不是错误；存储故障也只记
//! 警告日志——奖励记账是尽力而为的旁路，绝不能阻断触发它的主业务动作
//! （发动态、评论等）。真正的去重裁决在存储层唯一约束上，步骤 2 的
//! 预检只是省一次无谓的插入。

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::models::{NewRewardEvent, RewardType};
use crate::repository::traits::{RewardEventRepositoryTrait, RewardPolicyRepositoryTrait};

/// 点赞里程碑集合，点赞数恰好到达其中之一才触发奖励
pub const LIKE_MILESTONES: [i64; 4] = [50, 100, 500, 1000];

/// 多商品动态奖励要求的最少不同商品数
pub const DIVERSE_PRODUCT_MIN_COUNT: i64 = 3;

/// 创建结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// 事件已创建
    Created(i64),
    /// 静默跳过
    Skipped(SkipReason),
}

impl CreateOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 该类型无生效策略
    NoActivePolicy,
    /// 同 (user, feed, type) 已存在事件
    Duplicate,
    /// 里程碑/商品数阈值未达标
    ThresholdNotMet,
    /// 已达当日配额
    DailyQuotaReached,
    /// 上下文序列化失败
    ContextSerialization,
    /// 存储故障，已记日志
    Storage,
}

/// 当日零点（服务器本地时区），转为 UTC 供 created_at 比较
///
/// 夏令时切换导致本地零点不存在的极端情形退回 UTC 零点。
pub fn local_day_start() -> DateTime<Utc> {
    let midnight = Local::now().date_naive().and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc(),
    }
}

/// 奖励事件工厂
pub struct EventFactory<P, E>
where
    P: RewardPolicyRepositoryTrait,
    E: RewardEventRepositoryTrait,
{
    policy_repo: Arc<P>,
    event_repo: Arc<E>,
}

// ---- 各奖励类型的上下文快照，序列化进 related_data ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedCreationContext {
    feed_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventParticipationContext {
    feed_id: i64,
    event_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentAchievementContext {
    comment_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LikesMilestoneContext {
    feed_id: i64,
    milestone: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiverseProductContext {
    feed_id: i64,
    distinct_product_count: i64,
}

impl<P, E> EventFactory<P, E>
where
    P: RewardPolicyRepositoryTrait,
    E: RewardEventRepositoryTrait,
{
    pub fn new(policy_repo: Arc<P>, event_repo: Arc<E>) -> Self {
        Self {
            policy_repo,
            event_repo,
        }
    }

    /// 发布动态奖励
    #[instrument(skip(self))]
    pub async fn create_feed_creation_event(&self, user_id: &str, feed_id: i64) -> CreateOutcome {
        self.swallow(
            RewardType::FeedCreation,
            user_id,
            self.try_create(
                user_id,
                Some(feed_id),
                RewardType::FeedCreation,
                "发布动态奖励",
                &FeedCreationContext { feed_id },
                true,
            )
            .await,
        )
    }

    /// 活动动态参与奖励
    #[instrument(skip(self))]
    pub async fn create_event_feed_participation_event(
        &self,
        user_id: &str,
        feed_id: i64,
        event_id: i64,
    ) -> CreateOutcome {
        self.swallow(
            RewardType::EventFeedParticipation,
            user_id,
            self.try_create(
                user_id,
                Some(feed_id),
                RewardType::EventFeedParticipation,
                "活动动态参与奖励",
                &EventParticipationContext { feed_id, event_id },
                true,
            )
            .await,
        )
    }

    /// 每日评论成就奖励
    ///
    /// 不绑定具体动态，去重仅依靠每日配额（通常配置为 1）。
    #[instrument(skip(self))]
    pub async fn create_comment_daily_achievement_event(
        &self,
        user_id: &str,
        comment_count: i64,
    ) -> CreateOutcome {
        self.swallow(
            RewardType::CommentDailyAchievement,
            user_id,
            self.try_create(
                user_id,
                None,
                RewardType::CommentDailyAchievement,
                "每日评论成就奖励",
                &CommentAchievementContext { comment_count },
                true,
            )
            .await,
        )
    }

    /// 点赞里程碑奖励
    ///
    /// 点赞数必须恰好落在里程碑集合上；同一动态至多奖励一次
    /// （首个到达的里程碑），由去重约束保证。
    #[instrument(skip(self))]
    pub async fn create_feed_likes_milestone_event(
        &self,
        user_id: &str,
        feed_id: i64,
        like_count: i64,
    ) -> CreateOutcome {
        self.swallow(
            RewardType::FeedLikesMilestone,
            user_id,
            self.try_create(
                user_id,
                Some(feed_id),
                RewardType::FeedLikesMilestone,
                "点赞里程碑奖励",
                &LikesMilestoneContext {
                    feed_id,
                    milestone: like_count,
                },
                LIKE_MILESTONES.contains(&like_count),
            )
            .await,
        )
    }

    /// 多商品动态奖励
    #[instrument(skip(self))]
    pub async fn create_diverse_product_feed_event(
        &self,
        user_id: &str,
        feed_id: i64,
        distinct_product_count: i64,
    ) -> CreateOutcome {
        self.swallow(
            RewardType::DiverseProductFeed,
            user_id,
            self.try_create(
                user_id,
                Some(feed_id),
                RewardType::DiverseProductFeed,
                "多商品动态奖励",
                &DiverseProductContext {
                    feed_id,
                    distinct_product_count,
                },
                distinct_product_count >= DIVERSE_PRODUCT_MIN_COUNT,
            )
            .await,
        )
    }

    // ==================== 私有方法 ====================

    /// 统一创建协议
    ///
    /// 到落库为止没有任何副作用：所有检查通过之前不存在半成品记录。
    async fn try_create<C: Serialize>(
        &self,
        user_id: &str,
        feed_id: Option<i64>,
        reward_type: RewardType,
        description: &str,
        context: &C,
        threshold_met: bool,
    ) -> Result<CreateOutcome> {
        // 1. 策略解析：未配置即静默跳过
        let Some(policy) = self.policy_repo.find_active_policy(reward_type).await? else {
            debug!(?reward_type, "无生效策略，跳过奖励事件创建");
            return Ok(CreateOutcome::Skipped(SkipReason::NoActivePolicy));
        };

        // 2. 去重预检（仅动态主体类奖励参与三元组去重）
        if let Some(feed_id) = feed_id
            && reward_type.is_feed_scoped()
            && self
                .event_repo
                .exists_for_feed(user_id, feed_id, reward_type)
                .await?
        {
            debug!(user_id, feed_id, ?reward_type, "奖励事件已存在，跳过");
            return Ok(CreateOutcome::Skipped(SkipReason::Duplicate));
        }

        // 3. 类型特定阈值检查
        if !threshold_met {
            debug!(user_id, ?reward_type, "阈值未达标，跳过");
            return Ok(CreateOutcome::Skipped(SkipReason::ThresholdNotMet));
        }

        // 4. 每日配额检查（软限制：并发竞争下允许超出 1 条）
        let created_today = self
            .event_repo
            .count_created_since(user_id, reward_type, local_day_start())
            .await?;
        if created_today >= policy.daily_limit as i64 {
            debug!(
                user_id,
                ?reward_type,
                created_today,
                daily_limit = policy.daily_limit,
                "已达当日配额，跳过"
            );
            return Ok(CreateOutcome::Skipped(SkipReason::DailyQuotaReached));
        }

        // 5. 上下文序列化：失败绝不落半条记录
        let related_data = match serde_json::to_value(context) {
            Ok(value) => value,
            Err(e) => {
                warn!(user_id, ?reward_type, error = %e, "奖励上下文序列化失败，跳过创建");
                return Ok(CreateOutcome::Skipped(SkipReason::ContextSerialization));
            }
        };

        // 6. 以策略快照落库；唯一约束冲突表示并发重复创建
        let new_event =
            NewRewardEvent::from_policy(user_id, feed_id, &policy, description, related_data);
        match self.event_repo.insert_if_absent(&new_event).await? {
            Some(event_id) => {
                debug!(
                    user_id,
                    ?reward_type,
                    event_id,
                    points = policy.points,
                    "奖励事件已创建"
                );
                Ok(CreateOutcome::Created(event_id))
            }
            None => {
                debug!(user_id, ?reward_type, "并发重复创建被唯一约束拦截");
                Ok(CreateOutcome::Skipped(SkipReason::Duplicate))
            }
        }
    }

    /// 吞掉存储/序列化故障
    ///
    /// 创建路径上的异常只记警告日志，向调用方表现为跳过。
    fn swallow(
        &self,
        reward_type: RewardType,
        user_id: &str,
        result: Result<CreateOutcome>,
    ) -> CreateOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    user_id,
                    ?reward_type,
                    error = %e,
                    "奖励事件创建失败，不影响主业务流程"
                );
                CreateOutcome::Skipped(SkipReason::Storage)
            }
        }
    }
}
