//! File boundary: profile and monitor CSV input, dataset artifact output.

pub mod export;
pub mod monitor;
pub mod profiles;
