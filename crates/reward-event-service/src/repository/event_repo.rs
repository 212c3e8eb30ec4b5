//! 奖励事件仓储
//!
//! 事件表是追加型审计流水，所有状态变更都通过条件更新执行：
//! - 插入依赖 (user_id, reward_type, feed_id) 唯一索引，冲突即视为重复创建
//! - 认领使用 `WHERE status IN ('PENDING','FAILED')` 的原子更新，
//!   rows_affected = 0 表示事件已被其他处理器持有，调用方跳过
//!
//! 多实例部署下的正确性完全由这两条存储层约束保证，不依赖进程内锁。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::traits::RewardEventRepositoryTrait;
use super::{DailyStatRow, EventFilter};
use crate::error::Result;
use crate::models::{EventStatus, NewRewardEvent, RewardEvent, RewardType};

const EVENT_COLUMNS: &str = "id, user_id, feed_id, reward_type, points, badge_points, \
     description, related_data, status, retry_count, created_at, updated_at";

/// 奖励事件仓储（Postgres 实现）
pub struct RewardEventRepository {
    pool: PgPool,
}

impl RewardEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RewardEventRepositoryTrait for RewardEventRepository {
    /// 插入新事件，唯一索引冲突时返回 None
    ///
    /// 唯一索引建立在 (user_id, reward_type, feed_id) 上。Postgres 对
    /// NULL 采用 distinct 语义，因此无动态主体的事件（feed_id 为空）
    /// 不参与该去重，只受每日配额约束。
    async fn insert_if_absent(&self, event: &NewRewardEvent) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO reward_events
                (user_id, feed_id, reward_type, points, badge_points,
                 description, related_data, status, retry_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'PENDING', 0, NOW(), NOW())
            ON CONFLICT (user_id, reward_type, feed_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&event.user_id)
        .bind(event.feed_id)
        .bind(event.reward_type)
        .bind(event.points)
        .bind(event.badge_points)
        .bind(&event.description)
        .bind(&event.related_data)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    async fn exists_for_feed(
        &self,
        user_id: &str,
        feed_id: i64,
        reward_type: RewardType,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reward_events
                WHERE user_id = $1 AND feed_id = $2 AND reward_type = $3
            )
            "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(reward_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn count_created_since(
        &self,
        user_id: &str,
        reward_type: RewardType,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reward_events
            WHERE user_id = $1 AND reward_type = $2 AND created_at >= $3
            "#,
        )
        .bind(user_id)
        .bind(reward_type)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_by_id(&self, event_id: i64) -> Result<Option<RewardEvent>> {
        let event = sqlx::query_as::<_, RewardEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM reward_events WHERE id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// PENDING|FAILED -> PROCESSING
    ///
    /// rows_affected 就是认领裁决：0 表示事件已被其他处理器认领、
    /// 已处理完成或不存在，调用方不得继续执行入账。
    async fn claim_for_processing(&self, event_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reward_events
            SET status = 'PROCESSING', updated_at = NOW()
            WHERE id = $1 AND status IN ('PENDING', 'FAILED')
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_processed(&self, event_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reward_events
            SET status = 'PROCESSED', updated_at = NOW()
            WHERE id = $1 AND status = 'PROCESSING'
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, event_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reward_events
            SET status = 'FAILED', retry_count = retry_count + 1, updated_at = NOW()
            WHERE id = $1 AND status = 'PROCESSING'
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_claimable(
        &self,
        status: EventStatus,
        max_retry_count: i32,
        limit: i64,
    ) -> Result<Vec<RewardEvent>> {
        let events = sqlx::query_as::<_, RewardEvent>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM reward_events
            WHERE status = $1 AND retry_count < $2
            ORDER BY created_at ASC
            LIMIT $3
            "#
        ))
        .bind(status)
        .bind(max_retry_count)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// 僵死 PROCESSING 回收
    ///
    /// 处理器在入账和落账之间崩溃会把事件留在 PROCESSING。
    /// 回退为 FAILED 并计一次重试，让事件重新进入正常重试路径。
    async fn requeue_stale_processing(&self, stale_before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reward_events
            SET status = 'FAILED', retry_count = retry_count + 1, updated_at = NOW()
            WHERE status = 'PROCESSING' AND updated_at < $1
            "#,
        )
        .bind(stale_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_events(
        &self,
        filter: &EventFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RewardEvent>> {
        let events = sqlx::query_as::<_, RewardEvent>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM reward_events
            WHERE ($1::varchar IS NULL OR user_id = $1)
              AND ($2::bigint IS NULL OR feed_id = $2)
              AND ($3::varchar IS NULL OR reward_type = $3)
              AND ($4::varchar IS NULL OR status = $4)
            ORDER BY created_at DESC, id DESC
            OFFSET $5 LIMIT $6
            "#
        ))
        .bind(&filter.user_id)
        .bind(filter.feed_id)
        .bind(filter.reward_type)
        .bind(filter.status)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn count_events(&self, filter: &EventFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reward_events
            WHERE ($1::varchar IS NULL OR user_id = $1)
              AND ($2::bigint IS NULL OR feed_id = $2)
              AND ($3::varchar IS NULL OR reward_type = $3)
              AND ($4::varchar IS NULL OR status = $4)
            "#,
        )
        .bind(&filter.user_id)
        .bind(filter.feed_id)
        .bind(filter.reward_type)
        .bind(filter.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_by_status(&self) -> Result<Vec<(EventStatus, i64)>> {
        let rows = sqlx::query_as::<_, (EventStatus, i64)>(
            r#"
            SELECT status, COUNT(*) FROM reward_events GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count_by_type(&self) -> Result<Vec<(RewardType, i64)>> {
        let rows = sqlx::query_as::<_, (RewardType, i64)>(
            r#"
            SELECT reward_type, COUNT(*) FROM reward_events GROUP BY reward_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn sum_processed_points(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(points), 0)::bigint
            FROM reward_events
            WHERE status = 'PROCESSED'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn daily_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyStatRow>> {
        let rows = sqlx::query_as::<_, DailyStatRow>(
            r#"
            SELECT
                created_at::date AS day,
                COUNT(*) AS created_count,
                COUNT(*) FILTER (WHERE status = 'PROCESSED') AS processed_count,
                COALESCE(SUM(points) FILTER (WHERE status = 'PROCESSED'), 0)::bigint
                    AS processed_points
            FROM reward_events
            WHERE created_at >= $1 AND created_at < $2
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
