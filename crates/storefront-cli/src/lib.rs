//! # storefront-cli
//!
//! Command-line storefront for a food-ordering shop.
//!
//! This crate provides:
//! - Menu browsing and product pricing
//! - Cart, promo code and shipping commands
//! - Checkout with a payment link
//! - Admin menu, category, stock and promo management
//! - Config file management and push previews

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config_handlers;
pub mod error;
pub mod output;

pub use error::{Error, Result};
