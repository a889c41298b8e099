//! Shared utilities for feature modules
//!
//! - **auth**: the acting-user extractor
//! - **access**: scoping reads to the acting user

pub mod access;
pub mod auth;
