//! Project Tracker Library
//!
//! This module exports the core components for testing and integration.

pub mod auth;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod tracker;
pub mod types;
