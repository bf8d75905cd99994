//! # Relay Testing Utils
//!
//! Shared testing utilities for the queue relay workspace.
//! This crate provides mock implementations and test data builders
//! that can be used across all other crates in the workspace.
//!
//! ## Usage
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! relay-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! Then use the mocks in your tests:
//!
//! ```rust
//! use relay_testing_utils::mocks::*;
//! use relay_testing_utils::builders::QueueMessageBuilder;
//! ```

pub mod builders;
pub mod mocks;

// Re-export commonly used items
pub use builders::*;
pub use mocks::*;
