//! 奖励事件扫描 Worker
//!
//! 固定间隔轮询数据库，每轮依次执行三个阶段：
//!
//! 1. 处理新创建的 PENDING 事件
//! 2. 重试 FAILED 事件（重试上限内）
//! 3. 回收僵死的 PROCESSING 事件
//!
//! 正确性完全由存储层的条件更新保证，Worker 可在多实例环境中安全
//! 并行运行；任一阶段出错只记日志，循环永不退出。

use std::sync::Arc;
use std::time::Duration;

use reward_shared::config::SweepConfig;
use tracing::{error, info};

use crate::ledger::Ledger;
use crate::repository::traits::RewardEventRepositoryTrait;
use crate::service::EventProcessor;

/// 奖励事件扫描 Worker
pub struct RewardSweepWorker<E, L>
where
    E: RewardEventRepositoryTrait,
    L: Ledger,
{
    processor: Arc<EventProcessor<E, L>>,
    poll_interval: Duration,
    stale_processing_after: Duration,
}

impl<E, L> RewardSweepWorker<E, L>
where
    E: RewardEventRepositoryTrait,
    L: Ledger,
{
    pub fn new(processor: Arc<EventProcessor<E, L>>, config: &SweepConfig) -> Self {
        Self {
            processor,
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            stale_processing_after: Duration::from_secs(config.stale_processing_seconds),
        }
    }

    /// 主循环：持续轮询直到进程退出
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            stale_processing_after = ?self.stale_processing_after,
            "RewardSweepWorker 已启动"
        );
        loop {
            self.run_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// 执行一轮三阶段扫描
    ///
    /// 拆出来便于测试和手工触发。
    pub async fn run_once(&self) {
        if let Err(e) = self.processor.process_pending_reward_events().await {
            error!(error = %e, "PENDING 事件扫描出错");
        }

        if let Err(e) = self.processor.retry_failed_reward_events().await {
            error!(error = %e, "FAILED 事件重试扫描出错");
        }

        if let Err(e) = self
            .processor
            .reconcile_stale_processing(self.stale_processing_after)
            .await
        {
            error!(error = %e, "僵死 PROCESSING 回收出错");
        }
    }
}
