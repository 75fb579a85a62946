//! Retry executor for fallible single-result and streaming operations.
//!
//! The engine lives in [`retry`]; [`config`] and [`logging`] carry the
//! on-disk settings and log setup shared by the `ferry` CLI.

pub mod config;
pub mod logging;
pub mod retry;
