//! Gateway contract between the model store and the forecast-model backend.

use std::sync::Arc;

use async_trait::async_trait;

use forecast_core::ModelId;
use forecast_model::ModelBundle;

/// Where a save goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    /// The bundle has no identifier yet; the backend assigns one.
    Create,
    /// Overwrite the model stored under this identifier.
    Update(ModelId),
}

impl SaveTarget {
    /// Update when the bundle's metadata carries an identifier, create otherwise.
    pub fn for_bundle(bundle: &ModelBundle) -> Self {
        match bundle.model_id() {
            Some(id) => SaveTarget::Update(id),
            None => SaveTarget::Create,
        }
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Identifier the bundle is now stored under.
    pub id: ModelId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("model not found: {0}")]
    NotFound(ModelId),
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid gateway URL: {0}")]
    InvalidUrl(String),
}

/// Backend operations on whole model bundles.
///
/// Implementations never touch the store; callers decide what to do with the
/// result, so a failed call leaves local state exactly as it was.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Identifiers of every stored model, for selection before loading.
    async fn list_ids(&self) -> Result<Vec<ModelId>, GatewayError>;

    async fn load(&self, id: &ModelId) -> Result<ModelBundle, GatewayError>;

    async fn save(&self, target: &SaveTarget, bundle: &ModelBundle)
        -> Result<SaveReceipt, GatewayError>;
}

#[async_trait]
impl<G> ModelGateway for Arc<G>
where
    G: ModelGateway + ?Sized,
{
    async fn list_ids(&self) -> Result<Vec<ModelId>, GatewayError> {
        (**self).list_ids().await
    }

    async fn load(&self, id: &ModelId) -> Result<ModelBundle, GatewayError> {
        (**self).load(id).await
    }

    async fn save(
        &self,
        target: &SaveTarget,
        bundle: &ModelBundle,
    ) -> Result<SaveReceipt, GatewayError> {
        (**self).save(target, bundle).await
    }
}
