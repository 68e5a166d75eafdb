//! Purchased components quoted alongside laser-cut parts.

use serde::{Deserialize, Serialize};

/// A purchased item (hardware, fasteners, bought-out assemblies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
    pub part_name: String,
    pub part_number: String,
    pub quantity: f64,
    /// Unit price in dollars.
    pub price: f64,
    pub shelf_number: String,
    pub notes: String,
    pub image_path: String,
}

impl Default for Component {
    fn default() -> Self {
        Self {
            part_name: String::new(),
            part_number: String::new(),
            quantity: 1.0,
            price: 0.0,
            shelf_number: String::new(),
            notes: String::new(),
            image_path: String::new(),
        }
    }
}

impl Component {
    pub fn new(part_name: impl Into<String>, part_number: impl Into<String>, quantity: f64, price: f64) -> Self {
        Self {
            part_name: part_name.into(),
            part_number: part_number.into(),
            quantity,
            price,
            ..Self::default()
        }
    }
}
