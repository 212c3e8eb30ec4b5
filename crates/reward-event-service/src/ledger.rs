//! 积分账本客户端
//!
//! 积分/徽章账本是外部协作方，本服务只依赖一个 credit 入账操作。
//! 入账在账本侧不保证幂等，处理器必须通过 PROCESSING 状态保证
//! 同一事件至多触发一次 credit 调用。

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// 积分服务调用错误
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// 网络/服务不可用等瞬时故障
    #[error("积分服务不可用: {0}")]
    Unavailable(String),
    /// 账本侧明确拒绝入账（如用户被冻结）
    #[error("积分入账被拒绝: {0}")]
    Rejected(String),
}

/// 积分账本接口
///
/// 使用 trait object 注入处理器，测试中以可编程 mock 替代真实 HTTP 调用。
#[async_trait]
pub trait Ledger: Send + Sync {
    /// 为用户入账积分与徽章积分
    async fn credit(
        &self,
        user_id: &str,
        points: i32,
        badge_points: i32,
    ) -> std::result::Result<(), LedgerError>;
}

/// 入账请求体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreditRequest<'a> {
    user_id: &'a str,
    points: i32,
    badge_points: i32,
}

/// 基于 HTTP 的积分服务客户端
pub struct HttpLedgerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLedgerClient {
    /// 创建客户端
    ///
    /// connect_timeout 仅限制建连阶段；整体调用超时由处理器统一施加。
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Ledger for HttpLedgerClient {
    #[instrument(skip(self))]
    async fn credit(
        &self,
        user_id: &str,
        points: i32,
        badge_points: i32,
    ) -> std::result::Result<(), LedgerError> {
        let url = format!("{}/internal/points/credit", self.base_url);
        let body = CreditRequest {
            user_id,
            points,
            badge_points,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            debug!(user_id, points, badge_points, "积分入账成功");
            return Ok(());
        }

        let status = response.status();
        let message = response.text().await.unwrap_or_default();

        // 4xx 表示账本侧明确拒绝，重试无意义；5xx 视为瞬时故障
        if status.is_client_error() {
            Err(LedgerError::Rejected(format!("{status}: {message}")))
        } else {
            Err(LedgerError::Unavailable(format!("{status}: {message}")))
        }
    }
}
