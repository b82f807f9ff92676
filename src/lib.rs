//! # storefs
//!
//! A union filesystem over an ordered list of store directories.
//!
//! Clients see one flat namespace. Each name is served from the first store
//! that holds it, new files always land in the first store, and listings
//! concatenate every store in order.

pub mod config;
pub mod fs;
pub use fs::*;

