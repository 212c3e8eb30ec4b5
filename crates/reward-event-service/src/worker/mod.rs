//! 后台任务

pub mod sweep_worker;

pub use sweep_worker::RewardSweepWorker;
