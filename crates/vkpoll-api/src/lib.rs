//! VK API client.
//!
//! - [`ApiClient`]: invokes API methods over HTTP and unwraps the response envelope
//! - [`Chain`]: packs several calls into one `execute` request and fans the
//!   results back out to each caller
//! - [`ApiError`]: transport failures and domain errors reported by the API
//! - [`HttpSender`]: raw GET requests returning the response body
//!
//! # Example
//!
//! ```ignore
//! use vkpoll_api::{ApiClient, ApiConfig, Params};
//!
//! let client = ApiClient::new(ApiConfig::default().with_token("secret"))?;
//! let users = client.call("users.get", Params::new().with("user_ids", 1)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod chain;
mod client;
mod config;
mod error;
mod http;
mod params;

pub use chain::{Chain, ChainedCall};
pub use client::ApiClient;
pub use config::{ApiConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT_MS, DEFAULT_VERSION};
pub use error::{ApiError, ApiResult, TransportError, error_code};
pub use http::HttpSender;
pub use params::Params;
