//! Collection data model
//!
//! Items are supplied by the collection import and never mutated here. The two
//! derived value shapes (`ExpansionLink`, `BoxDimensions`) are what the catalog
//! sync caches per item.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Catalog identifier of a collection item
pub type ItemId = u64;

/// A single collection entry being evaluated for removal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Date the item entered the collection
    #[serde(default)]
    pub acquired_on: Option<NaiveDate>,
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub last_played: Option<NaiveDate>,
    /// User rating (1-10 on the catalog scale), if rated
    #[serde(default)]
    pub rating: Option<f64>,
    /// Declared complexity weight
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub min_players: Option<u32>,
    #[serde(default)]
    pub max_players: Option<u32>,
}

impl Item {
    /// Minimal item with only identity set; every other field takes its neutral default
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            acquired_on: None,
            play_count: 0,
            last_played: None,
            rating: None,
            weight: None,
            min_players: None,
            max_players: None,
        }
    }
}

/// Identifier + name pair, the minimum the name-based matcher needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedItem {
    pub id: ItemId,
    pub name: String,
}

impl NamedItem {
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// Asserts the owning item is an expansion of `base_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionLink {
    pub base_id: ItemId,
    pub base_name: String,
}

impl ExpansionLink {
    pub fn new(base_id: ItemId, base_name: impl Into<String>) -> Self {
        Self {
            base_id,
            base_name: base_name.into(),
        }
    }
}

/// Physical box size in inches; volume in cubic inches
///
/// Volume is stored, not derived on read: it is computed once when the
/// dimensions are parsed and kept alongside them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxDimensions {
    pub width: f64,
    pub length: f64,
    pub depth: f64,
    pub volume: f64,
}

impl BoxDimensions {
    /// Build from raw measurements, rounding all values to 2 decimals
    ///
    /// Returns `None` unless all three measurements are finite and positive.
    pub fn from_measurements(width: f64, length: f64, depth: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(width) && valid(length) && valid(depth)) {
            return None;
        }

        Some(Self {
            width: round2(width),
            length: round2(length),
            depth: round2(depth),
            volume: round2(width * length * depth),
        })
    }
}

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
