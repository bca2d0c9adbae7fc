//! End-to-end scenarios through the public API.

pub mod clock;
pub mod properties;
pub mod registry;
