//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;
pub mod helpers;

#[allow(unused_imports)]
pub use fixtures::TestEnvironment;
#[allow(unused_imports)]
pub use helpers::FakeResolver;
