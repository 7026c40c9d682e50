//! DDAS Server Library
//!
//! Duplicate download detection: clients report files they are about to
//! download or have downloaded, and the server decides whether an equivalent
//! file is already known before registering it.
//!
//! # Modules
//!
//! - `dedup`: Duplicate resolution, fingerprinting, quota and registration
//! - `db`: SQLite record store
//! - `routes`: HTTP surface
//! - `cleanup`: Retention sweep

pub mod cleanup;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod routes;
pub mod state;
