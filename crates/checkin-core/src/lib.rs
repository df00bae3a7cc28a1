#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Domain model and pure logic for the weekly check-in service.

pub mod error;
pub mod form;
pub mod model;
pub mod password;
pub mod stats;
pub mod week;

mod time;

pub use error::CoreError;
pub use time::{now_ms, today, EpochMs};
