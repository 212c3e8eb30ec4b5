//! 奖励事件服务
//!
//! 社区电商的积分奖励流水线：业务动作（发动态、评论、点赞里程碑等）
//! 触发奖励事件的幂等创建，后台扫描异步驱动状态机完成积分入账。
//!
//! ## 核心功能
//!
//! - **事件创建**：策略驱动、去重幂等、每日配额限制
//! - **事件处理**：PENDING|FAILED -> PROCESSING -> PROCESSED|FAILED
//!   状态机，外部积分服务入账，失败重试有上限
//! - **僵死回收**：崩溃遗留的 PROCESSING 事件定期回退重试
//! - **查询统计**：分页列表、状态/类型分布、按日聚合
//!
//! ## 模块结构
//!
//! - `models`: 实体与枚举
//! - `repository`: 仓储接口与 Postgres 实现
//! - `service`: 工厂、处理器、查询服务
//! - `worker`: 后台扫描循环
//! - `ledger`: 外部积分服务客户端
//! - `error`: 错误类型定义

pub mod error;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod service;
pub mod worker;

#[cfg(test)]
pub mod test_support;

pub use error::{Result, RewardError};
pub use ledger::{HttpLedgerClient, Ledger, LedgerError};
pub use models::{EventStatus, NewRewardEvent, RewardEvent, RewardPolicy, RewardType};
pub use service::{
    CreateOutcome, EventFactory, EventProcessor, EventQueryService, ProcessOutcome, SkipReason,
    SweepReport,
};
pub use worker::RewardSweepWorker;
