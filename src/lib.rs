//! # BoardGameGeek XML API Client
//!
//! A rate-limited, async Rust client for the BoardGameGeek XML API2.
//!
//! The crate owns the request pipeline shared by every BGG endpoint: request
//! pacing, authentication headers, polling of queued (202) responses, repair of
//! malformed XML and decoding into caller-supplied serde types.
//!
//! ## Features
//!
//! - **Rate Limiting**: two requests per second per client, no bursts
//! - **Authentication**: anonymous, bearer API key, or a raw session cookie
//! - **Queued Requests**: 202 responses are retried until BGG has the data ready
//! - **XML Repair**: bare ampersands, HTML entities and control characters are fixed
//!   before decoding, and structurally irregular documents get a second chance
//!   through a normalizing tree round trip
//! - **Cancellation**: long polls can be aborted with a [`CancellationToken`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgg_xml::{BggClient, Endpoint, Query, MAX_THING_IDS};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Items {
//!     #[serde(rename = "item", default)]
//!     items: Vec<Item>,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct Item {
//!     #[serde(rename = "@id")]
//!     id: u64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BggClient::new()?.with_api_key("your_api_key");
//!
//!     let query = Query::new(Endpoint::Thing)
//!         .ids("id", &[174430, 167791], MAX_THING_IDS)?
//!         .flag("stats", true);
//!     let things: Items = client.query(&query).await?;
//!     println!("Fetched {} items", things.items.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod normalize;
pub mod rate_limit;
pub mod sanitize;
pub mod types;

pub use client::{decode_xml, BggClient, ClientConfig};
pub use error::{BggError, Result};
pub use rate_limit::RateLimiter;
pub use sanitize::sanitize_xml;
pub use types::{AuthMode, Endpoint, Query, MAX_THING_IDS};

/// Re-exported so callers can cancel in-flight requests
pub use tokio_util::sync::CancellationToken;

use std::time::Duration;

/// The default base URL for BGG's XML API2
pub const DEFAULT_BASE_URL: &str = "https://boardgamegeek.com/xmlapi2";

/// Default user agent string for requests
pub const DEFAULT_USER_AGENT: &str = concat!("bgg-xml-rs/", env!("CARGO_PKG_VERSION"));

/// Default number of retries while BGG answers 202
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default pause between 202 retries
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Default request rate per client
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 2;
