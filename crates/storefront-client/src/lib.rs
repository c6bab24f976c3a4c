#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Storefront Client Library
//!
//! HTTP plumbing, typed backend APIs, the shopping session and admin
//! operations.

pub mod admin;
pub mod api;
pub mod checkout;
pub mod client;
pub mod clock;
pub mod debounce;
pub mod envelope;
pub mod error;
pub mod routing;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use admin::{AdminPanel, ImageUpload, MenuForm};
pub use api::{GeoPlace, MenuRecord, ShipApi, StoreApi};
pub use checkout::CustomerDetails;
pub use client::BackendClient;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use routing::{OsrmRouteProvider, RouteProvider};
pub use session::{CheckoutOutcome, MenuSource, ShopState, Storefront, StorefrontBuilder};
pub use transport::{HttpResponse, ReqwestTransport, Transport};
