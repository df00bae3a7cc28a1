#![forbid(unsafe_code)]

//! HTTP service for weekly check-ins: SQLite storage, cookie sessions and
//! server-rendered pages.

pub mod config;
pub mod db;
pub mod gc;
pub mod http;
pub mod seed;
pub mod session;
pub mod views;

pub use http::{router, AppError, AppState};
