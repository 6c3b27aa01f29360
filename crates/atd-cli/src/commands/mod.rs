//! Command handlers extracted from `main.rs`.

pub mod engine;
pub mod session;
