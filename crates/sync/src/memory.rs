//! In-memory gateway for tests and local development.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use forecast_core::ModelId;
use forecast_model::{MetadataPatch, ModelBundle};

use crate::gateway::{GatewayError, ModelGateway, SaveReceipt, SaveTarget};

/// In-memory model backend.
///
/// Intended for tests/dev. Behaves like the HTTP backend: a create-save mints
/// a fresh identifier and stores the bundle with that `uid` filled in.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    models: RwLock<BTreeMap<ModelId, ModelBundle>>,
    offline: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored model. A bundle without `uid` gets a minted one.
    pub fn with_model(mut self, bundle: ModelBundle) -> Self {
        let id = bundle.model_id().unwrap_or_else(ModelId::generate);
        let bundle = stamped(&id, bundle);
        // Exclusive access; poisoning is irrelevant.
        self.models
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, bundle);
        self
    }

    /// While offline every call fails with [`GatewayError::Network`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Stored copy of a model, bypassing the async interface.
    pub fn stored(&self, id: &ModelId) -> Option<ModelBundle> {
        self.models.read().ok()?.get(id).cloned()
    }

    fn ensure_online(&self) -> Result<(), GatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(GatewayError::Network("gateway offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn put(&self, id: ModelId, bundle: ModelBundle) -> Result<(), GatewayError> {
        let bundle = stamped(&id, bundle);
        let mut models = self.models.write().map_err(|_| poisoned())?;
        models.insert(id, bundle);
        Ok(())
    }
}

fn stamped(id: &ModelId, bundle: ModelBundle) -> ModelBundle {
    let metadata = bundle.metadata.merged(&MetadataPatch::uid(id.as_str()));
    ModelBundle { metadata, ..bundle }
}

fn poisoned() -> GatewayError {
    GatewayError::Api(500, "lock poisoned".to_string())
}

#[async_trait]
impl ModelGateway for InMemoryGateway {
    async fn list_ids(&self) -> Result<Vec<ModelId>, GatewayError> {
        self.ensure_online()?;
        let models = self
            .models
            .read()
            .map_err(|_| poisoned())?;
        Ok(models.keys().cloned().collect())
    }

    async fn load(&self, id: &ModelId) -> Result<ModelBundle, GatewayError> {
        self.ensure_online()?;
        let models = self
            .models
            .read()
            .map_err(|_| poisoned())?;
        models
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.clone()))
    }

    async fn save(
        &self,
        target: &SaveTarget,
        bundle: &ModelBundle,
    ) -> Result<SaveReceipt, GatewayError> {
        self.ensure_online()?;
        let id = match target {
            SaveTarget::Create => ModelId::generate(),
            SaveTarget::Update(id) => id.clone(),
        };
        self.put(id.clone(), bundle.clone())?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(SaveReceipt { id })
    }
}
