//! Keyed grid conversion.
//!
//! Nested tables flatten into one row per leaf value, carrying every key on the
//! path plus the value. Row ids start at 1 and follow the table's insertion
//! order; they are display identifiers only and are reassigned on every
//! traversal.
//!
//! Going back is defined per cell: an edited row yields a [`CellEdit`] naming
//! exactly one store mutation. Rows are a view, not a serialization format.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bundle::{Metadata, MetadataPatch, ProductRecord};
use crate::tables::{
    DateTableKind, Formulation, FormulationComponent, ProductDateTable, ScheduleTable, UnitYield,
    YieldOutput,
};

/// A single-cell mutation extracted from an edited row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellEdit {
    Metadata(MetadataPatch),
    Product {
        index: usize,
        record: ProductRecord,
    },
    ProductDate {
        table: DateTableKind,
        product_code: String,
        date: String,
        value: f64,
    },
    Formulation {
        product_code: String,
        component_code: String,
        formula_percent: f64,
    },
    Schedule {
        unit: String,
        product_code: String,
        date: String,
        value: f64,
    },
    UnitYield {
        unit: String,
        charge_product_code: String,
        output_product_code: String,
        output_percent: f64,
    },
}

/// Flatten a nested table into grid rows.
pub trait ToRows {
    type Row;

    fn to_rows(&self) -> Vec<Self::Row>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductDateRow {
    #[serde(rename = "id")]
    pub id: usize,
    pub product_code: String,
    pub date: String,
    pub value: f64,
}

impl ProductDateRow {
    /// The row does not know which of the three date tables it came from.
    pub fn edit(&self, table: DateTableKind) -> CellEdit {
        CellEdit::ProductDate {
            table,
            product_code: self.product_code.clone(),
            date: self.date.clone(),
            value: self.value,
        }
    }
}

impl ToRows for ProductDateTable {
    type Row = ProductDateRow;

    fn to_rows(&self) -> Vec<ProductDateRow> {
        let mut rows = Vec::with_capacity(self.len());
        for (product_code, dates) in self.iter() {
            for (date, value) in dates {
                rows.push(ProductDateRow {
                    id: rows.len() + 1,
                    product_code: product_code.clone(),
                    date: date.clone(),
                    value: *value,
                });
            }
        }
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleRow {
    #[serde(rename = "id")]
    pub id: usize,
    pub unit: String,
    pub product_code: String,
    pub date: String,
    pub value: f64,
}

impl ScheduleRow {
    pub fn edit(&self) -> CellEdit {
        CellEdit::Schedule {
            unit: self.unit.clone(),
            product_code: self.product_code.clone(),
            date: self.date.clone(),
            value: self.value,
        }
    }
}

impl ToRows for ScheduleTable {
    type Row = ScheduleRow;

    fn to_rows(&self) -> Vec<ScheduleRow> {
        let mut rows = Vec::with_capacity(self.len());
        for (unit, products) in self.iter() {
            for (product_code, dates) in products {
                for (date, value) in dates {
                    rows.push(ScheduleRow {
                        id: rows.len() + 1,
                        unit: unit.clone(),
                        product_code: product_code.clone(),
                        date: date.clone(),
                        value: *value,
                    });
                }
            }
        }
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FormulationRow {
    #[serde(rename = "id")]
    pub id: usize,
    pub product_code: String,
    pub component_code: String,
    pub formula_percent: f64,
}

impl FormulationRow {
    /// Note the edit matches by component code, so it reaches every line of
    /// the recipe sharing this row's code.
    pub fn edit(&self) -> CellEdit {
        CellEdit::Formulation {
            product_code: self.product_code.clone(),
            component_code: self.component_code.clone(),
            formula_percent: self.formula_percent,
        }
    }
}

impl ToRows for Formulation {
    type Row = FormulationRow;

    fn to_rows(&self) -> Vec<FormulationRow> {
        let mut rows = Vec::with_capacity(self.len());
        for (product_code, components) in self.iter() {
            for component in components {
                rows.push(FormulationRow {
                    id: rows.len() + 1,
                    product_code: product_code.clone(),
                    component_code: component.component_code.clone(),
                    formula_percent: component.formula_percent,
                });
            }
        }
        rows
    }
}

impl Formulation {
    /// Rebuild a table by appending every row's line in order.
    ///
    /// Products whose list was empty have no rows and therefore do not
    /// reappear.
    pub fn from_rows(rows: &[FormulationRow]) -> Self {
        let mut table = Formulation::new();
        for row in rows {
            table.push(
                &row.product_code,
                FormulationComponent::new(row.component_code.clone(), row.formula_percent),
            );
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnitYieldRow {
    #[serde(rename = "id")]
    pub id: usize,
    pub unit: String,
    pub charge_product_code: String,
    pub output_product_code: String,
    pub output_percent: f64,
}

impl UnitYieldRow {
    pub fn edit(&self) -> CellEdit {
        CellEdit::UnitYield {
            unit: self.unit.clone(),
            charge_product_code: self.charge_product_code.clone(),
            output_product_code: self.output_product_code.clone(),
            output_percent: self.output_percent,
        }
    }
}

impl ToRows for UnitYield {
    type Row = UnitYieldRow;

    fn to_rows(&self) -> Vec<UnitYieldRow> {
        let mut rows = Vec::with_capacity(self.len());
        for (unit, charges) in self.iter() {
            for (charge_product_code, outputs) in charges {
                for output in outputs {
                    rows.push(UnitYieldRow {
                        id: rows.len() + 1,
                        unit: unit.clone(),
                        charge_product_code: charge_product_code.clone(),
                        output_product_code: output.output_product_code.clone(),
                        output_percent: output.output_percent,
                    });
                }
            }
        }
        rows
    }
}

impl UnitYield {
    /// Rebuild a table by appending every row's output in order.
    pub fn from_rows(rows: &[UnitYieldRow]) -> Self {
        let mut table = UnitYield::new();
        for row in rows {
            table.push(
                &row.unit,
                &row.charge_product_code,
                YieldOutput::new(row.output_product_code.clone(), row.output_percent),
            );
        }
        table
    }
}

/// Product rows: `id` is the 1-based position in the product list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: usize,
    #[serde(flatten)]
    pub product: ProductRecord,
}

impl ProductRow {
    /// `None` for id 0, which addresses no position.
    pub fn edit(&self) -> Option<CellEdit> {
        let index = self.id.checked_sub(1)?;
        Some(CellEdit::Product {
            index,
            record: self.product.clone(),
        })
    }
}

impl ToRows for [ProductRecord] {
    type Row = ProductRow;

    fn to_rows(&self) -> Vec<ProductRow> {
        self.iter()
            .enumerate()
            .map(|(index, product)| ProductRow {
                id: index + 1,
                product: product.clone(),
            })
            .collect()
    }
}

/// Editable metadata fields, in grid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    ModelName,
    IdDescription,
    CreatedDate,
    LastUpdated,
    StartDate,
    RunDays,
    Uid,
}

impl MetadataField {
    pub const ALL: [MetadataField; 7] = [
        MetadataField::ModelName,
        MetadataField::IdDescription,
        MetadataField::CreatedDate,
        MetadataField::LastUpdated,
        MetadataField::StartDate,
        MetadataField::RunDays,
        MetadataField::Uid,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetadataField::ModelName => "Model Name",
            MetadataField::IdDescription => "ID Description",
            MetadataField::CreatedDate => "Created Date",
            MetadataField::LastUpdated => "Last Updated",
            MetadataField::StartDate => "Start Date",
            MetadataField::RunDays => "Run Days",
            MetadataField::Uid => "UID",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }

    /// Metadata rows are numbered in `ALL` order starting at 1.
    pub fn from_row_id(id: usize) -> Option<Self> {
        Self::ALL.get(id.checked_sub(1)?).copied()
    }

    fn read(&self, meta: &Metadata) -> MetadataValue {
        match self {
            MetadataField::ModelName => MetadataValue::Text(meta.model_name.clone()),
            MetadataField::IdDescription => MetadataValue::Text(meta.id_description.clone()),
            MetadataField::CreatedDate => MetadataValue::Number(meta.created_date as f64),
            MetadataField::LastUpdated => MetadataValue::Number(meta.last_updated as f64),
            MetadataField::StartDate => MetadataValue::Number(meta.start_date as f64),
            MetadataField::RunDays => MetadataValue::Number(f64::from(meta.run_days)),
            MetadataField::Uid => MetadataValue::Text(meta.uid.clone()),
        }
    }

    /// `None` when the value does not fit the field.
    fn patch(&self, value: &MetadataValue) -> Option<MetadataPatch> {
        let mut patch = MetadataPatch::default();
        match self {
            MetadataField::ModelName => patch.model_name = Some(value.as_text()),
            MetadataField::IdDescription => patch.id_description = Some(value.as_text()),
            MetadataField::Uid => patch.uid = Some(value.as_text()),
            MetadataField::CreatedDate => patch.created_date = Some(value.as_integer()?),
            MetadataField::LastUpdated => patch.last_updated = Some(value.as_integer()?),
            MetadataField::StartDate => patch.start_date = Some(value.as_integer()?),
            MetadataField::RunDays => {
                patch.run_days = Some(u32::try_from(value.as_integer()?).ok()?)
            }
        }
        Some(patch)
    }
}

impl core::fmt::Display for MetadataField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Cell value of a metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

impl MetadataValue {
    fn as_text(&self) -> String {
        match self {
            MetadataValue::Text(s) => s.clone(),
            MetadataValue::Number(n) => n.to_string(),
        }
    }

    fn as_integer(&self) -> Option<i64> {
        let n = match self {
            MetadataValue::Number(n) => *n,
            MetadataValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        if n.is_finite() && n.fract() == 0.0 && n.abs() <= i64::MAX as f64 {
            Some(n as i64)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub id: usize,
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "Value")]
    pub value: MetadataValue,
}

impl MetadataRow {
    /// Rows for every editable field; empty when no metadata is loaded.
    pub fn rows(meta: Option<&Metadata>) -> Vec<MetadataRow> {
        let Some(meta) = meta else {
            return Vec::new();
        };
        MetadataField::ALL
            .iter()
            .enumerate()
            .map(|(index, field)| MetadataRow {
                id: index + 1,
                field: field.label().to_string(),
                value: field.read(meta),
            })
            .collect()
    }

    /// The field is resolved from the row id, the way the grid addresses
    /// rows; the displayed label is ignored.
    ///
    /// Unknown ids and values that do not fit the field yield `None`.
    pub fn edit(&self) -> Option<CellEdit> {
        let Some(field) = MetadataField::from_row_id(self.id) else {
            debug!(row_id = self.id, label = %self.field, "metadata edit: unknown row, ignored");
            return None;
        };
        match field.patch(&self.value) {
            Some(patch) => Some(CellEdit::Metadata(patch)),
            None => {
                debug!(%field, value = ?self.value, "metadata edit: value does not fit field, ignored");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_metadata() -> Metadata {
        Metadata {
            created_date: 1_000,
            last_updated: 2_000,
            start_date: 3_000,
            run_days: 7,
            uid: "m-1".to_string(),
            model_name: "Plan".to_string(),
            id_description: "desc".to_string(),
        }
    }

    #[test]
    fn product_date_rows_follow_insertion_order() {
        let table = ProductDateTable::new()
            .with_value("P2", "2024-01-02", 2.0)
            .with_value("P1", "2024-01-01", 1.0)
            .with_value("P2", "2024-01-01", 3.0);

        let rows = table.to_rows();
        let keys: Vec<(usize, &str, &str)> = rows
            .iter()
            .map(|r| (r.id, r.product_code.as_str(), r.date.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1, "P2", "2024-01-02"),
                (2, "P2", "2024-01-01"),
                (3, "P1", "2024-01-01"),
            ]
        );
    }

    #[test]
    fn product_date_row_edit_targets_given_table() {
        let row = ProductDateRow {
            id: 4,
            product_code: "P1".to_string(),
            date: "2024-01-02".to_string(),
            value: 20.0,
        };
        assert_eq!(
            row.edit(DateTableKind::DailyOpenOrders),
            CellEdit::ProductDate {
                table: DateTableKind::DailyOpenOrders,
                product_code: "P1".to_string(),
                date: "2024-01-02".to_string(),
                value: 20.0,
            }
        );
    }

    #[test]
    fn rows_serialize_with_grid_column_names() {
        let row = UnitYieldRow {
            id: 1,
            unit: "U1".to_string(),
            charge_product_code: "P1".to_string(),
            output_product_code: "O1".to_string(),
            output_percent: 30.0,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["ChargeProductCode"], "P1");
        assert_eq!(value["OutputProductCode"], "O1");
        assert_eq!(value["OutputPercent"], 30.0);

        let product = ProductRow {
            id: 2,
            product: ProductRecord::new("P7"),
        };
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["id"], 2);
        assert_eq!(value["ProductCode"], "P7");
    }

    #[test]
    fn empty_list_under_key_produces_no_rows() {
        let table = Formulation::new().with_percent("F1", "C1", 10.0);
        assert!(table.to_rows().is_empty());
    }

    #[test]
    fn product_rows_are_one_based_positions() {
        let products = vec![ProductRecord::new("A"), ProductRecord::new("B")];
        let rows = products.to_rows();
        assert_eq!(rows[1].id, 2);
        match rows[1].edit() {
            Some(CellEdit::Product { index, record }) => {
                assert_eq!(index, 1);
                assert_eq!(record.product_code, "B");
            }
            other => panic!("expected product edit, got {other:?}"),
        }

        let stray = ProductRow {
            id: 0,
            product: ProductRecord::new("X"),
        };
        assert_eq!(stray.edit(), None);
    }

    #[test]
    fn metadata_rows_cover_every_field_in_order() {
        let meta = sample_metadata();
        let rows = MetadataRow::rows(Some(&meta));
        let labels: Vec<&str> = rows.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Model Name",
                "ID Description",
                "Created Date",
                "Last Updated",
                "Start Date",
                "Run Days",
                "UID"
            ]
        );
        assert_eq!(rows[5].value, MetadataValue::Number(7.0));
        assert!(MetadataRow::rows(None).is_empty());
    }

    #[test]
    fn metadata_row_edit_resolves_field_by_id() {
        let row = MetadataRow {
            id: 6,
            field: "whatever the grid echoed".to_string(),
            value: MetadataValue::Text("45".to_string()),
        };
        let Some(CellEdit::Metadata(patch)) = row.edit() else {
            panic!("expected metadata edit");
        };
        assert_eq!(patch.run_days, Some(45));
        assert_eq!(patch.model_name, None);
    }

    #[test]
    fn metadata_row_shape_mismatch_is_ignored() {
        let unknown = MetadataRow {
            id: 42,
            field: "Color".to_string(),
            value: MetadataValue::Text("blue".to_string()),
        };
        assert_eq!(unknown.edit(), None);

        let not_a_number = MetadataRow {
            id: 6,
            field: "Run Days".to_string(),
            value: MetadataValue::Text("soon".to_string()),
        };
        assert_eq!(not_a_number.edit(), None);

        let negative = MetadataRow {
            id: 6,
            field: "Run Days".to_string(),
            value: MetadataValue::Number(-3.0),
        };
        assert_eq!(negative.edit(), None);
    }

    #[test]
    fn metadata_labels_round_trip() {
        for field in MetadataField::ALL {
            assert_eq!(MetadataField::from_label(field.label()), Some(field));
        }
        assert_eq!(MetadataField::from_label("Colour"), None);
        assert_eq!(MetadataField::from_row_id(0), None);
        assert_eq!(MetadataField::from_row_id(7), Some(MetadataField::Uid));
    }

    fn code() -> impl Strategy<Value = String> {
        "[A-Z][A-Z0-9]{0,3}"
    }

    fn date() -> impl Strategy<Value = String> {
        (1u32..=12, 1u32..=28).prop_map(|(m, d)| format!("2024-{m:02}-{d:02}"))
    }

    fn value() -> impl Strategy<Value = f64> {
        -1.0e6f64..1.0e6f64
    }

    fn product_date_table() -> impl Strategy<Value = ProductDateTable> {
        prop::collection::vec((code(), date(), value()), 0..40).prop_map(|leaves| {
            leaves
                .into_iter()
                .fold(ProductDateTable::new(), |t, (p, d, v)| t.with_value(&p, &d, v))
        })
    }

    fn schedule_table() -> impl Strategy<Value = ScheduleTable> {
        prop::collection::vec((code(), code(), date(), value()), 0..40).prop_map(|leaves| {
            leaves
                .into_iter()
                .fold(ScheduleTable::new(), |t, (u, p, d, v)| t.with_value(&u, &p, &d, v))
        })
    }

    fn formulation() -> impl Strategy<Value = Formulation> {
        prop::collection::vec((code(), code(), 0.0f64..100.0), 0..40).prop_map(|lines| {
            let mut table = Formulation::new();
            for (product, component, percent) in lines {
                table.push(&product, FormulationComponent::new(component, percent));
            }
            table
        })
    }

    fn unit_yield() -> impl Strategy<Value = UnitYield> {
        prop::collection::vec((code(), code(), code(), 0.0f64..100.0), 0..40).prop_map(|lines| {
            let mut table = UnitYield::new();
            for (unit, charge, output, percent) in lines {
                table.push(&unit, &charge, YieldOutput::new(output, percent));
            }
            table
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: replaying every row's edit on an empty table rebuilds it.
        #[test]
        fn product_date_rows_round_trip(table in product_date_table()) {
            let rows = table.to_rows();
            prop_assert_eq!(rows.len(), table.len());

            let rebuilt = rows.iter().fold(ProductDateTable::new(), |t, row| {
                match row.edit(DateTableKind::Receipts) {
                    CellEdit::ProductDate { product_code, date, value, .. } => {
                        t.with_value(&product_code, &date, value)
                    }
                    _ => t,
                }
            });
            prop_assert_eq!(rebuilt, table);
        }

        #[test]
        fn schedule_rows_round_trip(table in schedule_table()) {
            let rows = table.to_rows();
            prop_assert_eq!(rows.len(), table.len());

            let rebuilt = rows.iter().fold(ScheduleTable::new(), |t, row| match row.edit() {
                CellEdit::Schedule { unit, product_code, date, value } => {
                    t.with_value(&unit, &product_code, &date, value)
                }
                _ => t,
            });
            prop_assert_eq!(rebuilt, table);
        }

        #[test]
        fn formulation_rows_round_trip(table in formulation()) {
            let rows = table.to_rows();
            prop_assert_eq!(rows.len(), table.len());
            prop_assert_eq!(Formulation::from_rows(&rows), table);
        }

        #[test]
        fn unit_yield_rows_round_trip(table in unit_yield()) {
            let rows = table.to_rows();
            prop_assert_eq!(rows.len(), table.len());
            prop_assert_eq!(UnitYield::from_rows(&rows), table);
        }

        /// Property: ids are 1..=n in row order, one row per leaf.
        #[test]
        fn row_ids_are_sequential(table in schedule_table()) {
            let ids: Vec<usize> = table.to_rows().iter().map(|r| r.id).collect();
            let expected: Vec<usize> = (1..=table.len()).collect();
            prop_assert_eq!(ids, expected);
        }

        /// Property: re-applying a formulation row's own edit is a no-op when
        /// its component code is unique within the recipe.
        #[test]
        fn formulation_row_edit_reapplies_cleanly(table in formulation()) {
            for row in table.to_rows() {
                let unique = table
                    .components(&row.product_code)
                    .iter()
                    .filter(|c| c.component_code == row.component_code)
                    .count() == 1;
                if !unique {
                    continue;
                }
                if let CellEdit::Formulation { product_code, component_code, formula_percent } = row.edit() {
                    prop_assert_eq!(
                        table.with_percent(&product_code, &component_code, formula_percent),
                        table.clone()
                    );
                }
            }
        }
    }
}
