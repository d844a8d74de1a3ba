//! Model store: the loaded model held as independent slices.
//!
//! Each slice sits behind its own `Arc`. A mutation builds a new container for
//! the one slice it touches and swaps it in; every other slice keeps pointing
//! at the same allocation, and clones of the store taken earlier keep seeing
//! the old values.
//!
//! Metadata doubles as the readiness sentinel: until a bundle is loaded the
//! store is "not ready" and every mutation is refused without touching state.

use std::sync::Arc;

use tracing::{debug, warn};

use forecast_core::{ModelError, ModelId, ModelResult};

use crate::bundle::{Metadata, MetadataPatch, ModelBundle, ProductList, ProductRecord};
use crate::grid::CellEdit;
use crate::tables::{DateTableKind, Formulation, ProductDateTable, ScheduleTable, UnitYield};

#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    metadata: Option<Arc<Metadata>>,
    products: Arc<ProductList>,
    receipts: Arc<ProductDateTable>,
    daily_open_orders: Arc<ProductDateTable>,
    daily_demand_forecast: Arc<ProductDateTable>,
    product_formulation: Arc<Formulation>,
    schedule: Arc<ScheduleTable>,
    unit_yield: Arc<UnitYield>,
    /// Bumped by every `load` and `reset`.
    generation: u64,
}

impl ModelStore {
    /// An empty, not-ready store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store populated from `bundle`.
    pub fn from_bundle(bundle: ModelBundle) -> Self {
        let mut store = Self::new();
        store.load(bundle);
        store
    }

    /// Replace every slice with the corresponding part of `bundle`.
    pub fn load(&mut self, bundle: ModelBundle) {
        debug!(
            model_id = bundle.metadata.uid.as_str(),
            products = bundle.products.len(),
            "store: loading bundle"
        );
        self.generation += 1;
        self.metadata = Some(Arc::new(bundle.metadata));
        self.products = Arc::new(bundle.products);
        self.receipts = Arc::new(bundle.receipts);
        self.daily_open_orders = Arc::new(bundle.daily_open_orders);
        self.daily_demand_forecast = Arc::new(bundle.daily_demand_forecast);
        self.product_formulation = Arc::new(bundle.product_formulation);
        self.schedule = Arc::new(bundle.schedule);
        self.unit_yield = Arc::new(bundle.unit_yield);
    }

    /// Drop the loaded model and return to the constructed state.
    pub fn reset(&mut self) {
        debug!("store: reset");
        *self = Self {
            generation: self.generation + 1,
            ..Self::default()
        };
    }

    pub fn is_ready(&self) -> bool {
        self.metadata.is_some()
    }

    /// Rebuild the full bundle from the current slices.
    pub fn compose(&self) -> ModelResult<ModelBundle> {
        let metadata = self.metadata.as_deref().ok_or(ModelError::NotReady)?;
        Ok(ModelBundle {
            metadata: metadata.clone(),
            products: self.products.as_ref().clone(),
            receipts: self.receipts.as_ref().clone(),
            daily_open_orders: self.daily_open_orders.as_ref().clone(),
            daily_demand_forecast: self.daily_demand_forecast.as_ref().clone(),
            product_formulation: self.product_formulation.as_ref().clone(),
            schedule: self.schedule.as_ref().clone(),
            unit_yield: self.unit_yield.as_ref().clone(),
        })
    }

    /// Identifies which load the current contents came from. Edits keep it;
    /// `load` and `reset` change it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Identifier of the loaded model, if the backend assigned one.
    pub fn model_id(&self) -> Option<ModelId> {
        self.metadata.as_deref().and_then(Metadata::model_id)
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_deref()
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    pub fn receipts(&self) -> &ProductDateTable {
        &self.receipts
    }

    pub fn daily_open_orders(&self) -> &ProductDateTable {
        &self.daily_open_orders
    }

    pub fn daily_demand_forecast(&self) -> &ProductDateTable {
        &self.daily_demand_forecast
    }

    pub fn product_date_table(&self, kind: DateTableKind) -> &ProductDateTable {
        match kind {
            DateTableKind::Receipts => &self.receipts,
            DateTableKind::DailyOpenOrders => &self.daily_open_orders,
            DateTableKind::DailyDemandForecast => &self.daily_demand_forecast,
        }
    }

    pub fn product_formulation(&self) -> &Formulation {
        &self.product_formulation
    }

    pub fn schedule(&self) -> &ScheduleTable {
        &self.schedule
    }

    pub fn unit_yield(&self) -> &UnitYield {
        &self.unit_yield
    }

    fn ensure_ready(&self, op: &'static str) -> ModelResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            warn!(op, "no model loaded, update skipped");
            Err(ModelError::NotReady)
        }
    }

    /// Shallow-merge `patch` into metadata.
    pub fn update_metadata(&mut self, patch: MetadataPatch) -> ModelResult<()> {
        self.ensure_ready("update_metadata")?;
        debug!(?patch, "update_metadata");
        let next = match self.metadata.as_deref() {
            Some(current) => current.merged(&patch),
            None => return Err(ModelError::NotReady),
        };
        self.metadata = Some(Arc::new(next));
        Ok(())
    }

    /// Record the identifier the backend assigned on a create-save.
    ///
    /// Only fills an empty `uid`; returns whether metadata changed.
    pub fn assign_id(&mut self, id: &ModelId) -> bool {
        let next = match self.metadata.as_deref() {
            Some(current) if current.uid.is_empty() => current.merged(&MetadataPatch::uid(id.as_str())),
            _ => return false,
        };
        debug!(model_id = %id, "assign_id");
        self.metadata = Some(Arc::new(next));
        true
    }

    /// [`assign_id`](Self::assign_id), but only while the store still holds
    /// the model of `generation`.
    pub fn assign_id_for(&mut self, generation: u64, id: &ModelId) -> bool {
        if self.generation != generation {
            debug!(
                model_id = %id,
                generation,
                current = self.generation,
                "assign_id: model replaced, skipped"
            );
            return false;
        }
        self.assign_id(id)
    }

    /// Replace the product at `index` wholesale.
    ///
    /// Writing at or past the end of the list is rejected; use
    /// [`push_product`](Self::push_product) to append.
    pub fn update_product(&mut self, index: usize, record: ProductRecord) -> ModelResult<()> {
        self.ensure_ready("update_product")?;
        let len = self.products.len();
        if index >= len {
            return Err(ModelError::out_of_range(index, len));
        }
        debug!(index, product_code = record.product_code.as_str(), "update_product");
        let mut next = self.products.as_ref().clone();
        next[index] = record;
        self.products = Arc::new(next);
        Ok(())
    }

    /// Append a product and return its index.
    pub fn push_product(&mut self, record: ProductRecord) -> ModelResult<usize> {
        self.ensure_ready("push_product")?;
        debug!(product_code = record.product_code.as_str(), "push_product");
        let mut next = self.products.as_ref().clone();
        next.push(record);
        let index = next.len() - 1;
        self.products = Arc::new(next);
        Ok(index)
    }

    /// Replace the first product whose code is `product_code`.
    ///
    /// Returns the index that was replaced, or `None` when no product has the
    /// code (nothing changes).
    pub fn update_product_by_code(
        &mut self,
        product_code: &str,
        record: ProductRecord,
    ) -> ModelResult<Option<usize>> {
        self.ensure_ready("update_product_by_code")?;
        match self
            .products
            .iter()
            .position(|p| p.product_code == product_code)
        {
            Some(index) => self.update_product(index, record).map(|()| Some(index)),
            None => {
                debug!(product_code, "update_product_by_code: unknown code, ignored");
                Ok(None)
            }
        }
    }

    /// Set `table[product_code][date] = value`.
    pub fn update_product_date_table(
        &mut self,
        kind: DateTableKind,
        product_code: &str,
        date: &str,
        value: f64,
    ) -> ModelResult<()> {
        self.ensure_ready("update_product_date_table")?;
        debug!(table = %kind, product_code, date, value, "update_product_date_table");
        let slot = match kind {
            DateTableKind::Receipts => &mut self.receipts,
            DateTableKind::DailyOpenOrders => &mut self.daily_open_orders,
            DateTableKind::DailyDemandForecast => &mut self.daily_demand_forecast,
        };
        *slot = Arc::new(slot.with_value(product_code, date, value));
        Ok(())
    }

    pub fn update_receipts(&mut self, product_code: &str, date: &str, value: f64) -> ModelResult<()> {
        self.update_product_date_table(DateTableKind::Receipts, product_code, date, value)
    }

    pub fn update_daily_open_orders(
        &mut self,
        product_code: &str,
        date: &str,
        value: f64,
    ) -> ModelResult<()> {
        self.update_product_date_table(DateTableKind::DailyOpenOrders, product_code, date, value)
    }

    pub fn update_daily_demand_forecast(
        &mut self,
        product_code: &str,
        date: &str,
        value: f64,
    ) -> ModelResult<()> {
        self.update_product_date_table(DateTableKind::DailyDemandForecast, product_code, date, value)
    }

    /// Set the percent of every component matching `component_code`.
    ///
    /// See [`Formulation::with_percent`] for the matching rules.
    pub fn update_formulation(
        &mut self,
        product_code: &str,
        component_code: &str,
        formula_percent: f64,
    ) -> ModelResult<()> {
        self.ensure_ready("update_formulation")?;
        debug!(product_code, component_code, formula_percent, "update_formulation");
        self.product_formulation = Arc::new(self.product_formulation.with_percent(
            product_code,
            component_code,
            formula_percent,
        ));
        Ok(())
    }

    pub fn update_schedule(
        &mut self,
        unit: &str,
        product_code: &str,
        date: &str,
        value: f64,
    ) -> ModelResult<()> {
        self.ensure_ready("update_schedule")?;
        debug!(unit, product_code, date, value, "update_schedule");
        self.schedule = Arc::new(self.schedule.with_value(unit, product_code, date, value));
        Ok(())
    }

    /// Set the percent of every output matching `output_product_code`.
    pub fn update_unit_yield(
        &mut self,
        unit: &str,
        charge_product_code: &str,
        output_product_code: &str,
        output_percent: f64,
    ) -> ModelResult<()> {
        self.ensure_ready("update_unit_yield")?;
        debug!(
            unit,
            charge_product_code, output_product_code, output_percent, "update_unit_yield"
        );
        self.unit_yield = Arc::new(self.unit_yield.with_percent(
            unit,
            charge_product_code,
            output_product_code,
            output_percent,
        ));
        Ok(())
    }

    /// Apply one edit extracted from a grid row.
    pub fn apply(&mut self, edit: CellEdit) -> ModelResult<()> {
        match edit {
            CellEdit::Metadata(patch) => self.update_metadata(patch),
            CellEdit::Product { index, record } => self.update_product(index, record),
            CellEdit::ProductDate {
                table,
                product_code,
                date,
                value,
            } => self.update_product_date_table(table, &product_code, &date, value),
            CellEdit::Formulation {
                product_code,
                component_code,
                formula_percent,
            } => self.update_formulation(&product_code, &component_code, formula_percent),
            CellEdit::Schedule {
                unit,
                product_code,
                date,
                value,
            } => self.update_schedule(&unit, &product_code, &date, value),
            CellEdit::UnitYield {
                unit,
                charge_product_code,
                output_product_code,
                output_percent,
            } => self.update_unit_yield(
                &unit,
                &charge_product_code,
                &output_product_code,
                output_percent,
            ),
        }
    }
}
