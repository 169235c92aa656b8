//! Core library for the homologation workflow service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
