//! Unit tests for the Insights SDK
//!
//! This module contains tests for various components of the SDK.

pub mod support;
pub mod assembler_tests;
pub mod report_tests;
