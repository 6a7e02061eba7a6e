//! Infrastructure layer modules
//!
//! This module contains shared infrastructure components:
//! - `backoff`: Jittered exponential backoff
//! - `config`: Application configuration and settings
//! - `error`: HTTP-facing error type
//! - `metrics`: Prometheus metrics helpers

pub mod backoff;
pub mod config;
pub mod error;
pub mod metrics;
