//! The model bundle: the unit exchanged wholesale with the backend.
//!
//! Field names on the wire follow the backend's JSON shape exactly
//! (`ModelMetaData`, `ProductsForModelItem`, ...), so every field carries an
//! explicit serde rename.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forecast_core::ModelId;

use crate::tables::{Formulation, ProductDateTable, ScheduleTable, UnitYield};

/// Epoch timestamp in milliseconds, as stored by the backend.
pub type TimestampMillis = i64;

/// Scalar attributes of a forecast model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "createdDate")]
    pub created_date: TimestampMillis,
    #[serde(rename = "lastUpdated")]
    pub last_updated: TimestampMillis,
    #[serde(rename = "startDate")]
    pub start_date: TimestampMillis,
    #[serde(rename = "runDays")]
    pub run_days: u32,
    /// Empty until the backend assigns an identifier on first save.
    #[serde(default)]
    pub uid: String,
    #[serde(rename = "modelName")]
    pub model_name: String,
    #[serde(rename = "id_description", default)]
    pub id_description: String,
}

impl Metadata {
    /// Identifier this model is saved under, if one has been assigned.
    pub fn model_id(&self) -> Option<ModelId> {
        ModelId::from_uid(&self.uid)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_date)
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_updated)
    }

    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_date)
    }

    /// Shallow merge: every field set in `patch` replaces the current value.
    pub fn merged(&self, patch: &MetadataPatch) -> Metadata {
        Metadata {
            created_date: patch.created_date.unwrap_or(self.created_date),
            last_updated: patch.last_updated.unwrap_or(self.last_updated),
            start_date: patch.start_date.unwrap_or(self.start_date),
            run_days: patch.run_days.unwrap_or(self.run_days),
            uid: patch.uid.clone().unwrap_or_else(|| self.uid.clone()),
            model_name: patch
                .model_name
                .clone()
                .unwrap_or_else(|| self.model_name.clone()),
            id_description: patch
                .id_description
                .clone()
                .unwrap_or_else(|| self.id_description.clone()),
        }
    }
}

/// Partial metadata update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(rename = "createdDate", default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<TimestampMillis>,
    #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<TimestampMillis>,
    #[serde(rename = "startDate", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<TimestampMillis>,
    #[serde(rename = "runDays", default, skip_serializing_if = "Option::is_none")]
    pub run_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(rename = "modelName", default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(rename = "id_description", default, skip_serializing_if = "Option::is_none")]
    pub id_description: Option<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn model_name(name: impl Into<String>) -> Self {
        Self {
            model_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Self::default()
        }
    }
}

/// One product of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "ProductCode")]
    pub product_code: String,
    #[serde(rename = "ProductDescription", default)]
    pub product_description: String,
    #[serde(rename = "TankCapacityGals", default)]
    pub tank_capacity_gals: f64,
    #[serde(rename = "CurrentInventoryGals", default)]
    pub current_inventory_gals: f64,
}

impl ProductRecord {
    pub fn new(product_code: impl Into<String>) -> Self {
        Self {
            product_code: product_code.into(),
            product_description: String::new(),
            tank_capacity_gals: 0.0,
            current_inventory_gals: 0.0,
        }
    }
}

/// Products in display order. Position is the edit address; duplicate codes
/// are tolerated.
pub type ProductList = Vec<ProductRecord>;

/// Complete representation of one forecast model.
///
/// Tables missing from a backend response load as empty tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    #[serde(rename = "ModelMetaData")]
    pub metadata: Metadata,
    #[serde(rename = "ProductsForModelItem", default)]
    pub products: ProductList,
    #[serde(rename = "Receipts", default)]
    pub receipts: ProductDateTable,
    #[serde(rename = "DailyOpenOrders", default)]
    pub daily_open_orders: ProductDateTable,
    #[serde(rename = "DailyDemandForecast", default)]
    pub daily_demand_forecast: ProductDateTable,
    #[serde(rename = "ProductFormulation", default)]
    pub product_formulation: Formulation,
    #[serde(rename = "ScheduleItem", default)]
    pub schedule: ScheduleTable,
    #[serde(rename = "UnitYieldItem", default)]
    pub unit_yield: UnitYield,
}

impl ModelBundle {
    /// A bundle with the given metadata and every table empty.
    pub fn empty(metadata: Metadata) -> Self {
        Self {
            metadata,
            products: Vec::new(),
            receipts: ProductDateTable::default(),
            daily_open_orders: ProductDateTable::default(),
            daily_demand_forecast: ProductDateTable::default(),
            product_formulation: Formulation::default(),
            schedule: ScheduleTable::default(),
            unit_yield: UnitYield::default(),
        }
    }

    pub fn model_id(&self) -> Option<ModelId> {
        self.metadata.model_id()
    }
}
