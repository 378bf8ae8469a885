//! Common test utilities for API integration tests
//!
//! This module provides shared test infrastructure: a mock Spotify server
//! wired into a fully assembled application.

#![allow(unused_imports)]

pub mod helpers;

pub use helpers::*;
