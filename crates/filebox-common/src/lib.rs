//! # filebox-common
//!
//! Shared configuration, error handling, models, and upload validation used
//! across all Filebox crates. No I/O lives here apart from reading config.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;
