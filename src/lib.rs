//! hoopsim-e2e: E2E validation of a browser-hosted basketball simulation.
//!
//! Drives the application in a headless browser, runs its validation entry
//! point, and checks every team statistic against fixed target ranges.

pub mod bridge;
pub mod config;
pub mod environment;
pub mod normalize;
pub mod pipeline;
pub mod ranges;
pub mod report;
pub mod types;
