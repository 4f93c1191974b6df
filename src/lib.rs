//! Travelogue site library.
//!
//! Turns legacy blog post HTML into ordered content blocks and builds a
//! cross-post gallery index over every post's media.

pub mod config;
pub mod data;
pub mod error;
pub mod media;
pub mod renderer;
pub mod segment;
pub mod tables;
pub mod types;
