//! Cadence end-to-end test support
//!
//! - [`harness`]: isolated databases and wired-up services
//! - [`mocks`]: deterministic card and scenario factories


pub use harness::TestDatabaseManager;
pub use mocks::{BatchConfig, TestDataFactory, TestScenario};
