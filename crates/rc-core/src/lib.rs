//! replay-catalog/crates/rc-core/src/lib.rs
//!
//! The catalog data model, stream selection policy and port definitions for
//! the replay catalog.

pub mod error;
pub mod fetch;
pub mod models;
pub mod selection;
pub mod services;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use fetch::*;
pub use models::*;
pub use selection::*;
pub use services::*;
pub use traits::*;
