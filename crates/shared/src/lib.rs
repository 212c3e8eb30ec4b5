//! 共享库
//!
//! 包含奖励事件服务共用的配置、数据库连接和日志初始化等基础设施代码。

pub mod config;
pub mod database;
pub mod observability;
