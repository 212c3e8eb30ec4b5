//! 奖励事件处理器
//!
//! 驱动 PENDING|FAILED -> PROCESSING -> PROCESSED|FAILED 状态机。
//! 单个事件的处理流程：
//!
//! 1. 原子认领（条件更新，零行受影响即放弃，保证同一事件至多一个
//!    处理器持有）
//! 2. 调用外部积分服务入账，带超时上限
//! 3. 入账成功落 PROCESSED；失败或超时落 FAILED 并累计重试次数
//!
//! 入账失败属于预期内的可重试故障，吞掉并交给重试扫描；唯一向调用方
//! 暴露的业务错误是按 ID 处理时的事件不存在。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reward_shared::config::ProcessingConfig;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, RewardError};
use crate::ledger::Ledger;
use crate::models::{EventStatus, RewardEvent};
use crate::repository::traits::RewardEventRepositoryTrait;

/// 单个事件的处理结局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// 入账成功，事件已落 PROCESSED
    Processed,
    /// 认领失败：事件已被其他处理器持有或已处理完成
    Skipped,
    /// 入账失败或超时，事件已落 FAILED 待重试
    Failed,
}

/// 一轮批量扫描的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 本轮扫描到的事件数
    pub picked: usize,
    /// 处理成功数
    pub processed: usize,
    /// 处理失败数（含存储故障）
    pub failed: usize,
    /// 认领失败跳过数
    pub skipped: usize,
}

/// 奖励事件处理器
pub struct EventProcessor<E, L>
where
    E: RewardEventRepositoryTrait,
    L: Ledger,
{
    event_repo: Arc<E>,
    ledger: Arc<L>,
    config: ProcessingConfig,
}

impl<E, L> EventProcessor<E, L>
where
    E: RewardEventRepositoryTrait,
    L: Ledger,
{
    pub fn new(event_repo: Arc<E>, ledger: Arc<L>, config: ProcessingConfig) -> Self {
        Self {
            event_repo,
            ledger,
            config,
        }
    }

    /// 按 ID 处理单个事件
    ///
    /// 事件不存在返回 [`RewardError::EventNotFound`]，这是处理路径上
    /// 唯一向调用方暴露的业务错误。
    #[instrument(skip(self))]
    pub async fn process_specific_event(&self, event_id: i64) -> Result<ProcessOutcome> {
        let event = self
            .event_repo
            .find_by_id(event_id)
            .await?
            .ok_or(RewardError::EventNotFound(event_id))?;

        self.process_event(&event).await
    }

    /// 扫描并处理一批 PENDING 事件
    #[instrument(skip(self))]
    pub async fn process_pending_reward_events(&self) -> Result<SweepReport> {
        let events = self
            .event_repo
            .list_claimable(
                EventStatus::Pending,
                self.config.max_retry_count,
                self.config.batch_size,
            )
            .await?;

        Ok(self.process_batch(events).await)
    }

    /// 扫描并重试一批 FAILED 事件
    ///
    /// 重试次数达到上限的事件不再进入扫描，留在 FAILED 终态等待人工介入。
    #[instrument(skip(self))]
    pub async fn retry_failed_reward_events(&self) -> Result<SweepReport> {
        let events = self
            .event_repo
            .list_claimable(
                EventStatus::Failed,
                self.config.max_retry_count,
                self.config.batch_size,
            )
            .await?;

        Ok(self.process_batch(events).await)
    }

    /// 回收僵死的 PROCESSING 事件
    ///
    /// 处理器崩溃会把事件永久留在 PROCESSING。超过 stale_after 未更新的
    /// 一律回退为 FAILED 并计一次重试，重新进入重试路径。
    #[instrument(skip(self))]
    pub async fn reconcile_stale_processing(&self, stale_after: Duration) -> Result<u64> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(stale_after)
                .map_err(|e| RewardError::Internal(format!("非法的僵死判定时长: {e}")))?;

        let requeued = self.event_repo.requeue_stale_processing(cutoff).await?;
        if requeued > 0 {
            warn!(requeued, "回收僵死 PROCESSING 事件，已回退为 FAILED");
        }

        Ok(requeued)
    }

    // ==================== 私有方法 ====================

    /// 逐个处理，单个事件的失败不中断整批
    async fn process_batch(&self, events: Vec<RewardEvent>) -> SweepReport {
        let mut report = SweepReport {
            picked: events.len(),
            ..SweepReport::default()
        };

        for event in &events {
            match self.process_event(event).await {
                Ok(ProcessOutcome::Processed) => report.processed += 1,
                Ok(ProcessOutcome::Skipped) => report.skipped += 1,
                Ok(ProcessOutcome::Failed) => report.failed += 1,
                Err(e) => {
                    warn!(event_id = event.id, error = %e, "事件处理异常，继续处理下一条");
                    report.failed += 1;
                }
            }
        }

        if report.picked > 0 {
            info!(
                picked = report.picked,
                processed = report.processed,
                failed = report.failed,
                skipped = report.skipped,
                "批量扫描完成"
            );
        }

        report
    }

    /// 认领 -> 入账 -> 落账
    ///
    /// 入账发生在认领成功之后，条件更新保证并发处理器中只有一个能走到
    /// 入账这一步。
    async fn process_event(&self, event: &RewardEvent) -> Result<ProcessOutcome> {
        if !self.event_repo.claim_for_processing(event.id).await? {
            debug!(event_id = event.id, "事件已被其他处理器持有或已处理，跳过");
            return Ok(ProcessOutcome::Skipped);
        }

        let credit_result = tokio::time::timeout(
            Duration::from_millis(self.config.ledger_timeout_ms),
            self.ledger
                .credit(&event.user_id, event.points, event.badge_points),
        )
        .await;

        match credit_result {
            Ok(Ok(())) => {
                self.event_repo.mark_processed(event.id).await?;
                info!(
                    event_id = event.id,
                    user_id = %event.user_id,
                    reward_type = ?event.reward_type,
                    points = event.points,
                    badge_points = event.badge_points,
                    "积分入账成功"
                );
                Ok(ProcessOutcome::Processed)
            }
            Ok(Err(e)) => {
                warn!(
                    event_id = event.id,
                    user_id = %event.user_id,
                    retry_count = event.retry_count,
                    error = %e,
                    "积分入账失败，事件转入 FAILED 等待重试"
                );
                self.event_repo.mark_failed(event.id).await?;
                Ok(ProcessOutcome::Failed)
            }
            Err(_) => {
                warn!(
                    event_id = event.id,
                    user_id = %event.user_id,
                    timeout_ms = self.config.ledger_timeout_ms,
                    "积分入账超时，事件转入 FAILED 等待重试"
                );
                self.event_repo.mark_failed(event.id).await?;
                Ok(ProcessOutcome::Failed)
            }
        }
    }
}
