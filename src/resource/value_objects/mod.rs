//! Value objects shared by several resource kinds.
//!
//! Each value object parses an already structurally valid string (or map)
//! into a richer form and enforces rules a regex cannot express: time
//! window arithmetic, ARN anatomy, CIDR host bits, tag key restrictions and
//! JSON documents passed as strings.
//! Failures are reported as [`ValidationError`](crate::error::ValidationError)s
//! naming the attribute the value came from.

mod arn;
mod cidr;
mod document;
pub mod rules;
mod tags;
mod time_window;

pub use arn::Arn;
pub use cidr::Ipv4Cidr;
pub use document::JsonDocument;
pub use tags::{MAX_KEY_LENGTH, MAX_TAGS, MAX_VALUE_LENGTH, Tags, check_tags};
pub use time_window::{TimeWindow, WeeklyTimeWindow};
