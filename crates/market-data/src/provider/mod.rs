//! Upstream provider implementations.
//!
//! Only Alpha Vantage is supported. The HTTP layer sits behind
//! [`UpstreamTransport`](alpha_vantage::UpstreamTransport) so the client can
//! be driven by a scripted transport in tests.

pub mod alpha_vantage;
