//! Service-specific client implementations
//!
//! This module contains the HTTP client for the insights (request log) API.

pub mod insights;
mod common;

pub use common::UserAgent;
