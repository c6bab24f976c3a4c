//! Integration test suite for the storefront client.
//!
//! Drives the session and admin panel end to end against scripted
//! transports, and the reqwest transport against local mock servers.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
mod integration;
