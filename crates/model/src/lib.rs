//! Forecast model data layer.
//!
//! This crate holds the in-memory representation of one forecast model
//! (metadata, product list and the nested planning tables), the store that
//! applies cell-level edits to it, and the conversions between nested tables
//! and flat grid rows. It performs no IO.

pub mod bundle;
pub mod grid;
pub mod store;
pub mod tables;

pub use bundle::{Metadata, MetadataPatch, ModelBundle, ProductList, ProductRecord};
pub use grid::{
    CellEdit, FormulationRow, MetadataField, MetadataRow, MetadataValue, ProductDateRow,
    ProductRow, ScheduleRow, ToRows, UnitYieldRow,
};
pub use store::ModelStore;
pub use tables::{
    DateTableKind, Formulation, FormulationComponent, ProductDateTable, ScheduleTable, UnitYield,
    YieldOutput,
};
