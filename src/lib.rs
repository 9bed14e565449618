pub mod aggregate;
pub mod calendar;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod liveness;
pub mod models;
pub mod refresh;
pub mod source;

pub use error::{AppError, Result};
