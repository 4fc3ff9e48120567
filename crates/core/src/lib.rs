//! Dealbird Core - Shared types library.
//!
//! This crate provides common types used across all Dealbird components:
//! - `digest` - Storage backends, ingestion, digest composition and delivery
//! - `cli` - Command-line entry points for the weekly batch run
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no SMTP.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, the validated email address, raw input records,
//!   storage entities, digest views, and run-report tallies

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
