//! Sample YouTube Data API v3 client: installed-app OAuth plus a few
//! list/search requests, returning raw JSON.

pub mod client;
pub mod error;
pub mod oauth;
pub mod request;
pub mod secrets;
