//! 奖励事件服务错误类型
//!
//! 区分两类错误：
//! - 业务查询错误（事件不存在、参数无效），直接反馈给管理侧调用方
//! - 系统错误（数据库、内部异常），在创建路径被吞掉并记日志，在查询路径上抛
//!
//! 积分服务的调用失败不进入本枚举：处理器在状态机内消化
//! （事件转 FAILED 并累计重试），见 [`crate::ledger::LedgerError`]。

use thiserror::Error;

/// 奖励事件服务错误类型
#[derive(Debug, Error)]
pub enum RewardError {
    #[error("奖励事件不存在: {0}")]
    EventNotFound(i64),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 奖励事件服务 Result 类型别名
pub type Result<T> = std::result::Result<T, RewardError>;

impl RewardError {
    /// 检查是否为可重试的错误（瞬时故障）
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        matches!(self, Self::EventNotFound(_) | Self::Validation(_))
    }
}
