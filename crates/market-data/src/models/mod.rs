//! Request and response types for the upstream provider.

mod endpoint;
mod params;
mod upstream;

pub use endpoint::Endpoint;
pub use params::{ListingState, NewsQuery, RequestParams};
pub use upstream::{ListingRow, Rejection, RejectionKind, Upstream, UpstreamPayload};
