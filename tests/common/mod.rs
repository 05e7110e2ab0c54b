//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.

mod fixtures;
mod server;

#[allow(unused_imports)]
pub use fixtures::{create_test_catalog_db, FixtureTrack, FIXTURE_TRACKS};
pub use server::TestServer;
