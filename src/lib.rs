//! Maintenance tooling for dual-controller storage arrays.
//!
//! The crate wraps the array management REST API behind the [`ArrayApi`]
//! trait and builds three maintenance policies on top of it: host listing
//! with connection data, safe volume teardown, and a host redundancy health
//! report.

pub mod array;
pub mod config;
pub mod health;
pub mod hosts;
pub mod logging;
pub mod test_support;
pub mod volumes;

pub use array::{ArrayApi, ArrayError, Credentials, RestArray};
pub use config::{ArrayConfig, ConfigError};
pub use health::{HealthReport, HostClassification, Redundancy};
pub use hosts::HostRecord;
pub use volumes::{SizeParseError, TeardownSummary};
