//! Schema-driven timeseries collectors.
//!
//! - [`TimeseriesCollector`]: Current values of every schema metric for services and roles

mod collector;

pub use collector::TimeseriesCollector;
