//! HTTP utilities shared by the provider adapters.

pub mod client;

pub use client::create_client_with_timeouts;
