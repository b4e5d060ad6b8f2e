//! HTTP API and consumer worker binaries for the coupon issuance service.

pub mod http;
pub mod telemetry;
