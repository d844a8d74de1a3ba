//! Model session: one store, one gateway, sequenced load/save.
//!
//! Load and save requests queue FIFO on a single async lock, so a second load
//! issued while one is pending waits for it instead of racing it. The store
//! sits behind its own lock that is only held for synchronous reads and edits,
//! never across a gateway call; edits made while a save is in flight are
//! accepted and go out with the next save.

use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use forecast_core::{ModelError, ModelId, ModelResult};
use forecast_model::{CellEdit, ModelBundle, ModelStore};

use crate::gateway::{GatewayError, ModelGateway, SaveTarget};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl SessionError {
    /// No model is loaded yet.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, SessionError::Model(ModelError::NotReady))
    }

    /// The backend could not be reached or refused the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, SessionError::Gateway(_))
    }
}

pub struct ModelSession<G> {
    gateway: G,
    store: RwLock<ModelStore>,
    io: Mutex<()>,
}

impl<G> core::fmt::Debug for ModelSession<G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelSession")
            .field("model_id", &self.read(ModelStore::model_id))
            .finish_non_exhaustive()
    }
}

impl<G> ModelSession<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            store: RwLock::new(ModelStore::new()),
            io: Mutex::new(()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The full bundle as it would be saved now.
    pub fn compose(&self) -> ModelResult<ModelBundle> {
        self.read(ModelStore::compose)
    }

    pub fn is_ready(&self) -> bool {
        self.read(ModelStore::is_ready)
    }

    /// Cheap copy of the store; later edits do not show through.
    pub fn snapshot(&self) -> ModelStore {
        self.read(ModelStore::clone)
    }

    pub fn read<R>(&self, f: impl FnOnce(&ModelStore) -> R) -> R {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        f(&*store)
    }

    /// Run a mutation against the store.
    pub fn edit<R>(&self, f: impl FnOnce(&mut ModelStore) -> ModelResult<R>) -> ModelResult<R> {
        self.write(f)
    }

    /// Apply one edit extracted from a grid row.
    pub fn apply(&self, edit: CellEdit) -> ModelResult<()> {
        self.write(|store| store.apply(edit))
    }

    /// Start editing a bundle that did not come from the backend, such as a
    /// new draft. It is created on the next save if it carries no `uid`.
    pub fn open(&self, bundle: ModelBundle) {
        self.write(|store| store.load(bundle));
    }

    /// Drop the loaded model.
    pub fn reset(&self) {
        self.write(ModelStore::reset);
    }

    fn write<R>(&self, f: impl FnOnce(&mut ModelStore) -> R) -> R {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *store)
    }
}

impl<G: ModelGateway> ModelSession<G> {
    /// Identifiers available for loading.
    pub async fn list_ids(&self) -> Result<Vec<ModelId>, SessionError> {
        self.gateway.list_ids().await.map_err(|e| {
            error!(error = %e, "failed to list models");
            e.into()
        })
    }

    /// Fetch `id` and replace the loaded model with it.
    ///
    /// On failure the store is left exactly as it was.
    pub async fn load(&self, id: &ModelId) -> Result<(), SessionError> {
        let _io = self.io.lock().await;
        debug!(model_id = %id, "loading model");

        let bundle = self.gateway.load(id).await.map_err(|e| {
            error!(model_id = %id, error = %e, "failed to load model");
            SessionError::from(e)
        })?;

        let products = bundle.products.len();
        self.write(|store| store.load(bundle));
        info!(model_id = %id, products, "model loaded");
        Ok(())
    }

    /// Send the current bundle to the backend and return the identifier it is
    /// stored under.
    ///
    /// A model without identifier is created and the assigned identifier is
    /// written back into metadata, so the next save updates it. If the model
    /// was replaced by `open`, `load` or `reset` while the request was out, the
    /// identifier stays with the saved model and the new one is left alone.
    pub async fn save(&self) -> Result<ModelId, SessionError> {
        let _io = self.io.lock().await;

        let (generation, bundle) = self
            .read(|store| store.compose().map(|bundle| (store.generation(), bundle)))
            .inspect_err(|_| {
                error!("cannot save, no model loaded");
            })?;
        let target = SaveTarget::for_bundle(&bundle);
        debug!(?target, "saving model");

        let receipt = self.gateway.save(&target, &bundle).await.map_err(|e| {
            error!(?target, error = %e, "failed to save model");
            SessionError::from(e)
        })?;

        if target == SaveTarget::Create
            && !self.write(|store| store.assign_id_for(generation, &receipt.id))
        {
            warn!(model_id = %receipt.id, "assigned id not recorded, store changed during save");
        }
        info!(model_id = %receipt.id, "model saved");
        Ok(receipt.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGateway;
    use forecast_model::Metadata;

    fn bundle(uid: &str) -> ModelBundle {
        ModelBundle::empty(Metadata {
            created_date: 0,
            last_updated: 0,
            start_date: 0,
            run_days: 7,
            uid: uid.to_string(),
            model_name: "plan".to_string(),
            id_description: String::new(),
        })
    }

    #[tokio::test]
    async fn save_before_load_is_not_ready_and_sends_nothing() {
        let session = ModelSession::new(InMemoryGateway::new());
        let err = session.save().await.unwrap_err();
        assert!(err.is_not_ready());
        assert!(!err.is_transport());
        assert_eq!(session.gateway().save_count(), 0);
    }

    #[tokio::test]
    async fn failed_load_leaves_store_untouched() {
        let gateway = InMemoryGateway::new().with_model(bundle("m-1"));
        let session = ModelSession::new(gateway);
        let id = ModelId::parse("m-1").unwrap();
        session.load(&id).await.unwrap();
        session.edit(|s| s.update_receipts("P1", "2024-01-01", 3.0)).unwrap();
        let before = session.compose().unwrap();

        let err = session
            .load(&ModelId::parse("missing").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(session.compose().unwrap(), before);
    }

    #[tokio::test]
    async fn reset_drops_loaded_model() {
        let session = ModelSession::new(InMemoryGateway::new().with_model(bundle("m-1")));
        session.load(&ModelId::parse("m-1").unwrap()).await.unwrap();
        assert!(session.is_ready());

        session.reset();
        assert!(!session.is_ready());
        assert_eq!(session.compose(), Err(ModelError::NotReady));
    }
}
