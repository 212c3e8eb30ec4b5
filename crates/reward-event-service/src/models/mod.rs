//! 数据模型

pub mod enums;
pub mod event;

pub use enums::{EventStatus, RewardType};
pub use event::{NewRewardEvent, RewardEvent, RewardPolicy};
