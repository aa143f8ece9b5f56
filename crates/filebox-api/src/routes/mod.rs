//! API route modules.

pub mod files;
pub mod health;
