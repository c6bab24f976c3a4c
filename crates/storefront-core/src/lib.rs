#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Storefront Core Library
//!
//! Data model and bookkeeping for the storefront client.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod coupon;
pub mod error;
pub mod fields;
pub mod ids;
pub mod images;
pub mod money;
pub mod notice;
pub mod product;
pub mod push;
pub mod shipping;
pub mod store;
pub mod totals;
pub mod traits;

// Re-exports for convenience
pub use cart::{AddOutcome, Addon, Cart, CartLine, LineOption, LineTotals};
pub use catalog::{Catalog, Category, CategoryIndex, MenuItem, SpecialCategories};
pub use config::StorefrontConfig;
pub use coupon::{Coupon, CouponKind, PromoRecord};
pub use error::{Error, Result};
pub use ids::ItemId;
pub use money::{Amount, format_rupiah};
pub use notice::{Notice, NoticeLevel, Notifier};
pub use shipping::{GateBlock, LatLng, Quote, Route, ShippingMode, ShippingState};
pub use store::LocalStore;
pub use totals::{CartSummary, Totals};
pub use traits::ConfigManager;
