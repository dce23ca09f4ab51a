//! Shared test utilities for cardex integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a `CardService` over in-memory or on-disk backends
//! - Fault-injecting wrappers around the backends
//! - Builders for images and extraction results

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use fakes::*;
pub use harness::TestHarness;
