//! Core types for Dealbird.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod digest;
pub mod email;
pub mod entities;
pub mod id;
pub mod records;
pub mod report;

pub use digest::{EmailData, EnrichedDeal, RetailerDeals};
pub use email::{Email, EmailParseError};
pub use entities::{Deal, Product, Retailer, User};
pub use id::*;
pub use records::{RawDeal, RawUser};
pub use report::{DealTally, IngestReport, SeedReport, SendOutcome, UpsertTally};
