//! # attache-core
//!
//! Core types and traits shared across the attache workspace:
//! - `Id` primary-key alias
//! - `Identifiable` / `Timestamped` entity traits
//! - `ValidationErrors` collection for field-level validation failures

pub mod error;
pub mod traits;

pub use error::*;
pub use traits::*;
