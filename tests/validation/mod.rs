//! Validation tests module.
//!
//! Behaviour every resource kind shares: structural parsing, key
//! normalization, cross-field rule reporting and numeric boundaries.

pub mod boundaries;
pub mod cross_field;
pub mod normalization;
pub mod structural;
