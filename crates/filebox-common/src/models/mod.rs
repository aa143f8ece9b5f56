//! Domain models shared between the API and the storage gateways.

pub mod file;

pub use file::*;
