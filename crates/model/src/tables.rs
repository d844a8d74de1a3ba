//! Nested planning tables.
//!
//! Every table is keyed by plain strings (product codes, unit names, calendar
//! date strings) with no referential checks between tables. Maps keep the
//! insertion order of the backend JSON so grid rows come out in that order.
//!
//! Updates are immutable: `with_*` methods return a new table and leave `self`
//! untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Date string → value.
pub type DateValues = IndexMap<String, f64>;

/// The three product→date tables of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateTableKind {
    Receipts,
    DailyOpenOrders,
    DailyDemandForecast,
}

impl DateTableKind {
    pub const ALL: [DateTableKind; 3] = [
        DateTableKind::Receipts,
        DateTableKind::DailyOpenOrders,
        DateTableKind::DailyDemandForecast,
    ];

    /// Bundle field name of the table.
    pub fn as_str(&self) -> &'static str {
        match self {
            DateTableKind::Receipts => "Receipts",
            DateTableKind::DailyOpenOrders => "DailyOpenOrders",
            DateTableKind::DailyDemandForecast => "DailyDemandForecast",
        }
    }
}

impl core::fmt::Display for DateTableKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product code → date → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductDateTable(IndexMap<String, DateValues>);

impl ProductDateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of leaf values.
    pub fn len(&self) -> usize {
        self.0.values().map(IndexMap::len).sum()
    }

    pub fn get(&self, product_code: &str, date: &str) -> Option<f64> {
        self.0.get(product_code)?.get(date).copied()
    }

    pub fn dates(&self, product_code: &str) -> Option<&DateValues> {
        self.0.get(product_code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DateValues)> {
        self.0.iter()
    }

    /// Returns a copy with `[product_code][date] = value`, creating the inner
    /// mapping if the product is new.
    pub fn with_value(&self, product_code: &str, date: &str, value: f64) -> Self {
        let mut next = self.clone();
        next.0
            .entry(product_code.to_string())
            .or_default()
            .insert(date.to_string(), value);
        next
    }
}

impl FromIterator<(String, DateValues)> for ProductDateTable {
    fn from_iter<I: IntoIterator<Item = (String, DateValues)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Unit → product code → date → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleTable(IndexMap<String, IndexMap<String, DateValues>>);

impl ScheduleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(IndexMap::values)
            .map(IndexMap::len)
            .sum()
    }

    pub fn get(&self, unit: &str, product_code: &str, date: &str) -> Option<f64> {
        self.0.get(unit)?.get(product_code)?.get(date).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexMap<String, DateValues>)> {
        self.0.iter()
    }

    /// Returns a copy with the three-level path set, creating intermediate
    /// mappings as needed.
    pub fn with_value(&self, unit: &str, product_code: &str, date: &str, value: f64) -> Self {
        let mut next = self.clone();
        next.0
            .entry(unit.to_string())
            .or_default()
            .entry(product_code.to_string())
            .or_default()
            .insert(date.to_string(), value);
        next
    }
}

/// One component line of a product recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulationComponent {
    #[serde(rename = "ComponentCode")]
    pub component_code: String,
    #[serde(rename = "FormulaPercent")]
    pub formula_percent: f64,
}

impl FormulationComponent {
    pub fn new(component_code: impl Into<String>, formula_percent: f64) -> Self {
        Self {
            component_code: component_code.into(),
            formula_percent,
        }
    }
}

/// Finished product code → ordered component list.
///
/// Component codes may repeat within one list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Formulation(IndexMap<String, Vec<FormulationComponent>>);

impl Formulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn components(&self, product_code: &str) -> &[FormulationComponent] {
        self.0.get(product_code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_product(&self, product_code: &str) -> bool {
        self.0.contains_key(product_code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<FormulationComponent>)> {
        self.0.iter()
    }

    /// Returns a copy where **every** component of `product_code` whose code
    /// equals `component_code` carries `formula_percent`.
    ///
    /// No component is created: an unknown product ends up with an empty list
    /// under its key, and an unknown component leaves the list as it was.
    pub fn with_percent(&self, product_code: &str, component_code: &str, formula_percent: f64) -> Self {
        let updated = self
            .0
            .get(product_code)
            .map(|components| {
                components
                    .iter()
                    .map(|c| {
                        if c.component_code == component_code {
                            FormulationComponent {
                                formula_percent,
                                ..c.clone()
                            }
                        } else {
                            c.clone()
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut next = self.clone();
        next.0.insert(product_code.to_string(), updated);
        next
    }

    /// Append a component line (used when building a table, not by edits).
    pub fn push(&mut self, product_code: &str, component: FormulationComponent) {
        self.0
            .entry(product_code.to_string())
            .or_default()
            .push(component);
    }
}

/// One output line of a unit's yield for a charge product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldOutput {
    #[serde(rename = "Output_ProductCode")]
    pub output_product_code: String,
    #[serde(rename = "OutputPercent")]
    pub output_percent: f64,
}

impl YieldOutput {
    pub fn new(output_product_code: impl Into<String>, output_percent: f64) -> Self {
        Self {
            output_product_code: output_product_code.into(),
            output_percent,
        }
    }
}

/// Unit → charge product code → ordered output list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitYield(IndexMap<String, IndexMap<String, Vec<YieldOutput>>>);

impl UnitYield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(IndexMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn outputs(&self, unit: &str, charge_product_code: &str) -> &[YieldOutput] {
        self.0
            .get(unit)
            .and_then(|charges| charges.get(charge_product_code))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexMap<String, Vec<YieldOutput>>)> {
        self.0.iter()
    }

    /// Returns a copy where every output of `unit → charge_product_code` whose
    /// code equals `output_product_code` carries `output_percent`.
    ///
    /// An absent path yields an empty list under it; nothing is created.
    pub fn with_percent(
        &self,
        unit: &str,
        charge_product_code: &str,
        output_product_code: &str,
        output_percent: f64,
    ) -> Self {
        let updated = self
            .0
            .get(unit)
            .and_then(|charges| charges.get(charge_product_code))
            .map(|outputs| {
                outputs
                    .iter()
                    .map(|o| {
                        if o.output_product_code == output_product_code {
                            YieldOutput {
                                output_percent,
                                ..o.clone()
                            }
                        } else {
                            o.clone()
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut next = self.clone();
        next.0
            .entry(unit.to_string())
            .or_default()
            .insert(charge_product_code.to_string(), updated);
        next
    }

    /// Append an output line (used when building a table, not by edits).
    pub fn push(&mut self, unit: &str, charge_product_code: &str, output: YieldOutput) {
        self.0
            .entry(unit.to_string())
            .or_default()
            .entry(charge_product_code.to_string())
            .or_default()
            .push(output);
    }
}
