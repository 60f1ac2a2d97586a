use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `inventory` collection. The photo column is called `image`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub unit: String,
    pub organization_id: String,
    pub created_by: String,
    #[serde(default, rename = "image")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// insert body for `inventory`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewInventoryItem {
    pub name: String,
    pub quantity: i64,
    pub unit: String,
    pub organization_id: String,
    pub created_by: String,
    #[serde(rename = "image")]
    pub image_url: Option<String>,
}

impl NewInventoryItem {
    pub fn into_item(self, id: String, created_at: DateTime<Utc>) -> InventoryItem {
        InventoryItem {
            id,
            name: self.name,
            quantity: self.quantity,
            unit: self.unit,
            organization_id: self.organization_id,
            created_by: self.created_by,
            image_url: self.image_url,
            created_at,
        }
    }
}

/// Units offered by the add-item form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "kg")]
    Kilograms,
    #[serde(rename = "g")]
    Grams,
    #[serde(rename = "L")]
    Liters,
    #[serde(rename = "mL")]
    Milliliters,
    #[serde(rename = "pcs")]
    Pieces,
    #[serde(rename = "bags")]
    Bags,
    #[serde(rename = "bottles")]
    Bottles,
    #[serde(rename = "trays")]
    Trays,
    #[serde(rename = "boxes")]
    Boxes,
    #[serde(rename = "vials")]
    Vials,
}

impl Unit {
    pub const ALL: [Unit; 10] = [
        Unit::Kilograms,
        Unit::Grams,
        Unit::Liters,
        Unit::Milliliters,
        Unit::Pieces,
        Unit::Bags,
        Unit::Bottles,
        Unit::Trays,
        Unit::Boxes,
        Unit::Vials,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Kilograms => "kg",
            Unit::Grams => "g",
            Unit::Liters => "L",
            Unit::Milliliters => "mL",
            Unit::Pieces => "pcs",
            Unit::Bags => "bags",
            Unit::Bottles => "bottles",
            Unit::Trays => "trays",
            Unit::Boxes => "boxes",
            Unit::Vials => "vials",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Unit::Kilograms => "Kilograms (kg)",
            Unit::Grams => "Grams (g)",
            Unit::Liters => "Liters (L)",
            Unit::Milliliters => "Milliliters (mL)",
            Unit::Pieces => "Pieces (pcs)",
            Unit::Bags => "Bags",
            Unit::Bottles => "Bottles",
            Unit::Trays => "Trays",
            Unit::Boxes => "Boxes",
            Unit::Vials => "Vials",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Unit::ALL
            .iter()
            .copied()
            .find(|u| u.symbol().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let symbols: Vec<&str> = Unit::ALL.iter().map(|u| u.symbol()).collect();
                format!("Invalid unit: {}. Choose from {}", s, symbols.join(", "))
            })
    }
}
