//! Core business logic for rhythme.

pub mod services;

pub use services::*;
