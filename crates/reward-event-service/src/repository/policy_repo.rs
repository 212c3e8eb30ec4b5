//! 奖励策略仓储
//!
//! 策略由运营侧配置，本服务只读。同一类型最多一条生效策略
//! 由 reward_policies 上的部分唯一索引保证。

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::RewardPolicyRepositoryTrait;
use crate::error::Result;
use crate::models::{RewardPolicy, RewardType};

/// 奖励策略仓储（Postgres 实现）
pub struct RewardPolicyRepository {
    pool: PgPool,
}

impl RewardPolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RewardPolicyRepositoryTrait for RewardPolicyRepository {
    async fn find_active_policy(&self, reward_type: RewardType) -> Result<Option<RewardPolicy>> {
        let policy = sqlx::query_as::<_, RewardPolicy>(
            r#"
            SELECT reward_type, points, badge_points, daily_limit, active
            FROM reward_policies
            WHERE reward_type = $1 AND active = true
            "#,
        )
        .bind(reward_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(policy)
    }
}
