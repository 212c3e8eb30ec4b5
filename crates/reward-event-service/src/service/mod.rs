//! 业务服务层

pub mod dto;
pub mod event_factory;
pub mod event_processor;
pub mod query_service;

pub use event_factory::{CreateOutcome, EventFactory, SkipReason};
pub use event_processor::{EventProcessor, ProcessOutcome, SweepReport};
pub use query_service::EventQueryService;
