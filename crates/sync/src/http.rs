//! HTTP gateway to the forecast-model backend.
//!
//! | operation | request |
//! |---|---|
//! | list  | `GET  /forecast-model` |
//! | load  | `POST /forecast-model/load/{id}` |
//! | save  | `POST /forecast-model/save/{id}` (update) or `POST /forecast-model/save` (create) |

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use forecast_core::ModelId;
use forecast_model::ModelBundle;

use crate::config::GatewayConfig;
use crate::gateway::{GatewayError, ModelGateway, SaveReceipt, SaveTarget};

const RESOURCE: &str = "forecast-model";

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(config.base_url.clone()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn with_token(config: &GatewayConfig, token: String) -> Result<Self, GatewayError> {
        let mut gateway = Self::new(config)?;
        gateway.token = Some(token);
        Ok(gateway)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn save_endpoint(&self, target: &SaveTarget) -> Result<Url, GatewayError> {
        match target {
            SaveTarget::Create => self.endpoint(&[RESOURCE, "save"]),
            SaveTarget::Update(id) => self.endpoint(&[RESOURCE, "save", id.as_str()]),
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        id: Option<&ModelId>,
    ) -> Result<reqwest::Response, GatewayError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
            return Err(GatewayError::NotFound(id.clone()));
        }
        Err(GatewayError::Api(
            status.as_u16(),
            resp.text().await.unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl ModelGateway for HttpGateway {
    async fn list_ids(&self) -> Result<Vec<ModelId>, GatewayError> {
        let url = self.endpoint(&[RESOURCE])?;
        let resp = self.send(self.client.get(url), None).await?;
        let raw: Vec<String> = resp
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        Ok(raw.into_iter().filter_map(|s| ModelId::parse(s).ok()).collect())
    }

    async fn load(&self, id: &ModelId) -> Result<ModelBundle, GatewayError> {
        let url = self.endpoint(&[RESOURCE, "load", id.as_str()])?;
        debug!(%url, "loading model");
        let resp = self.send(self.client.post(url), Some(id)).await?;
        resp.json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }

    async fn save(
        &self,
        target: &SaveTarget,
        bundle: &ModelBundle,
    ) -> Result<SaveReceipt, GatewayError> {
        let url = self.save_endpoint(target)?;
        debug!(%url, "saving model");
        let id = match target {
            SaveTarget::Update(id) => Some(id),
            SaveTarget::Create => None,
        };
        let resp = self.send(self.client.post(url).json(bundle), id).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        match (target, assigned_id(&body)) {
            (_, Some(assigned)) => Ok(SaveReceipt { id: assigned }),
            (SaveTarget::Update(id), None) => Ok(SaveReceipt { id: id.clone() }),
            (SaveTarget::Create, None) => Err(GatewayError::Parse(format!(
                "create response carried no model id: {body:?}"
            ))),
        }
    }
}

#[derive(Deserialize)]
struct UidOnly {
    uid: String,
}

/// Shapes the backend uses to report the identifier of a saved model.
#[derive(Deserialize)]
#[serde(untagged)]
enum SaveResponse {
    Id(String),
    Uid {
        #[serde(alias = "id")]
        uid: String,
    },
    Bundle {
        #[serde(rename = "ModelMetaData")]
        metadata: UidOnly,
    },
}

fn assigned_id(body: &str) -> Option<ModelId> {
    let raw = match serde_json::from_str::<SaveResponse>(body).ok()? {
        SaveResponse::Id(uid) | SaveResponse::Uid { uid } => uid,
        SaveResponse::Bundle { metadata } => metadata.uid,
    };
    ModelId::parse(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(&GatewayConfig::new(base)).unwrap()
    }

    #[test]
    fn endpoints_join_onto_base_path() {
        let gw = gateway("http://localhost:8001");
        assert_eq!(
            gw.endpoint(&[RESOURCE]).unwrap().as_str(),
            "http://localhost:8001/forecast-model"
        );

        let gw = gateway("http://planner/api/");
        let id = ModelId::parse("m 1/x").unwrap();
        assert_eq!(
            gw.save_endpoint(&SaveTarget::Update(id)).unwrap().as_str(),
            "http://planner/api/forecast-model/save/m%201%2Fx"
        );
        assert_eq!(
            gw.save_endpoint(&SaveTarget::Create).unwrap().as_str(),
            "http://planner/api/forecast-model/save"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            HttpGateway::new(&GatewayConfig::new("not a url")),
            Err(GatewayError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpGateway::new(&GatewayConfig::new("mailto:ops@example.com")),
            Err(GatewayError::InvalidUrl(_))
        ));
    }

    #[test]
    fn assigned_id_accepts_backend_response_shapes() {
        let id = |s: &str| assigned_id(s).map(ModelId::into_string);

        assert_eq!(id(r#""m-1""#), Some("m-1".to_string()));
        assert_eq!(id(r#"{"uid": "m-2"}"#), Some("m-2".to_string()));
        assert_eq!(id(r#"{"id": "m-3"}"#), Some("m-3".to_string()));
        assert_eq!(
            id(r#"{"ModelMetaData": {"uid": "m-4", "modelName": "x"}}"#),
            Some("m-4".to_string())
        );
        assert_eq!(id(r#"{"status": "ok"}"#), None);
        assert_eq!(id(r#""""#), None);
        assert_eq!(id(""), None);
    }
}
