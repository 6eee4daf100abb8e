//! Client-side connection helpers, layered on top of [`crate::Connection`].
mod client;

pub use client::Client;
