//! Upstream Layer
//!
//! Everything that talks to, or describes, the Cloudera Manager REST API:
//!
//! - [`Transport`] / [`HttpTransport`]: authenticated request execution
//! - [`Endpoints`]: URL assembly for the service, role and timeseries resources
//! - [`model`]: wire records and their validated domain counterparts

mod endpoints;
pub mod model;
#[cfg(test)]
pub(crate) mod testing;
mod transport;

pub use endpoints::{Endpoints, TimeseriesQuery};
pub use model::{DecodeError, TimeseriesCategory};
pub use transport::{HttpMethod, HttpTransport, Transport, TransportError, UpstreamRequest};
