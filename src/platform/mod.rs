//! Platform adapters
//!
//! A fixed set of adapters, one per [`PlatformFamily`](crate::types::PlatformFamily),
//! each driving that family's login, token exchange and authenticated reads
//! over HTTPS.

pub mod adapter;
pub mod bearer_token;
pub mod factory;
pub mod http;
pub mod session_cookie;

pub use adapter::{PlatformAdapter, PlatformResult};
pub use bearer_token::BearerTokenAdapter;
pub use factory::{AdapterRegistry, build_http_client, create_adapter};
pub use http::{HttpReply, HttpUtils};
pub use session_cookie::SessionCookieAdapter;
