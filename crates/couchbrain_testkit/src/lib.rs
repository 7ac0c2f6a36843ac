//! # couchbrain Testkit
//!
//! Test utilities for couchbrain.
//!
//! This crate provides:
//! - Seeded reference stores and brain fixtures
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use couchbrain_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     let store = seeded_store(250);
//!     assert_eq!(store.live_count(), 250);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
