//! Health collectors for service and role health checks.
//!
//! - [`HealthCollector`]: Service/role health summaries and checks as ordinal gauges

mod collector;

pub use collector::HealthCollector;
pub(crate) use collector::METRIC_NAMES as HEALTH_METRIC_NAMES;
