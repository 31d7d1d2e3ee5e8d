//! PDF Splitter Library
//!
//! Accepts a PDF upload, extracts a contiguous page range into a new PDF and
//! serves it back through a short-lived download link.
//!
//! # Modules
//!
//! - `split`: Page range resolution and extraction via lopdf
//! - `artifacts`: Registry, expiry rules and background sweeper for derived files
//! - `rate_limit`: Per-client submission throttling
//! - `storage`: Scratch directories and file naming
//! - `routes`: HTTP endpoints

pub mod artifacts;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod split;
pub mod state;
pub mod storage;
