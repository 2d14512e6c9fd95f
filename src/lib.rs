//! Library crate for hostscan-rs exposing the scan engine and its collaborators.
pub mod config;
pub mod diff;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pool;
pub mod runner;
pub mod scan;
pub mod sink;
pub mod targets;
pub mod types;
