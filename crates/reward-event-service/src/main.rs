//! 奖励事件服务入口
//!
//! 加载配置、初始化日志与数据库，启动后台扫描 Worker 驱动
//! 奖励事件的异步处理。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reward_event_service::repository::RewardEventRepository;
use reward_event_service::{EventProcessor, HttpLedgerClient, RewardSweepWorker};
use reward_shared::{config::AppConfig, database::Database, observability};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("reward-event-service").context("配置加载失败")?;

    observability::init(&config.observability).context("日志初始化失败")?;

    info!(
        service = %config.service_name,
        environment = %config.environment,
        "Starting reward-event-service"
    );

    let db = Database::connect(&config.database)
        .await
        .context("数据库连接失败")?;

    sqlx::migrate!("./migrations")
        .run(db.pool())
        .await
        .context("数据库迁移失败")?;

    let event_repo = Arc::new(RewardEventRepository::new(db.pool().clone()));
    let ledger = Arc::new(
        HttpLedgerClient::new(
            &config.ledger.base_url,
            Duration::from_millis(config.ledger.connect_timeout_ms),
        )
        .context("积分服务客户端初始化失败")?,
    );

    let processor = Arc::new(EventProcessor::new(
        event_repo,
        ledger,
        config.processing.clone(),
    ));
    let worker = RewardSweepWorker::new(processor, &config.sweep);

    tokio::select! {
        _ = worker.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("收到退出信号，停止扫描");
        }
    }

    db.close().await;

    Ok(())
}
