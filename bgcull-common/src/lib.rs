//! # bgcull Common Library
//!
//! Shared code for the bgcull services:
//! - Collection data model (items, expansion links, box dimensions)
//! - Configuration loading and root folder resolution
//! - Atomic file writes for durable documents
//! - Common error type

pub mod collection;
pub mod config;
pub mod error;
pub mod fs;

pub use collection::{BoxDimensions, ExpansionLink, Item, ItemId, NamedItem};
pub use error::{Error, Result};
