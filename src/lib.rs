//! Synthetic loadshape generation and measurement dataset assembly for
//! distribution-circuit simulations.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod io;
pub mod labels;
pub mod loadshape;
pub mod monitor;
pub mod observability;
pub mod pipeline;
pub mod profiles;
pub mod seeds;
pub mod selector;

pub use error::{Result, SynthError};
