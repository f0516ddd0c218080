//! Library exports for snaptron, shared between the binary and tests.

pub mod collector;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod startup;
pub mod state;
pub mod transports;
pub mod utils;
