//! Integration tests.

mod admin_flow;
mod checkout_flow;
mod reqwest_transport;
