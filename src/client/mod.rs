//! Client side of the site API: route resolution, request sequencing, resilient parsing.

pub mod fetch;
pub mod parse;
pub mod routes;

pub use fetch::{ApiClient, ApiRequest, HttpTransport, Transport};
pub use parse::{parse_response, Envelope, RawResponse};
pub use routes::{Environment, Navigator, ResolverConfig, RouteResolver};
