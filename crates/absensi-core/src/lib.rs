//! absensi core: school attendance and roster management.
//!
//! The services (`roster`, `attendance`, `users`, `profile`) are written
//! against the `store::DocumentStore` seam and read through the local
//! `cache`. Every mutating operation is checked against the capability table
//! in `access` before anything is sent to the store.

pub mod access;
pub mod app;
pub mod attendance;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod profile;
pub mod report;
pub mod roster;
pub mod store;
pub mod users;
pub mod utils;

pub use app::App;
pub use error::{Error, PolicyError, ReportError, Result};
