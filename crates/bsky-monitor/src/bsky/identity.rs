//! DID → PDS endpoint resolution.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use crate::error::{MonitorError, Result};

/// Service id of the personal data server entry in a DID document.
const PDS_SERVICE_ID: &str = "#atproto_pds";

/// Locates the PDS hosting an account's blobs.
#[async_trait]
pub trait PdsResolver: Send + Sync {
    async fn pds_endpoint(&self, did: &str) -> Result<Url>;
}

/// Resolver that always answers with one endpoint.
#[derive(Debug, Clone)]
pub struct FixedPds {
    endpoint: Url,
}

impl FixedPds {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| MonitorError::Config(format!("invalid PDS endpoint {endpoint}: {e}")))?;
        Ok(Self { endpoint })
    }
}

#[async_trait]
impl PdsResolver for FixedPds {
    async fn pds_endpoint(&self, _did: &str) -> Result<Url> {
        Ok(self.endpoint.clone())
    }
}

#[derive(Debug, Deserialize)]
struct DidDocument {
    #[serde(default)]
    service: Vec<DidService>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidService {
    id: String,
    service_endpoint: String,
}

/// Resolves `did:plc` via the PLC directory and `did:web` via `.well-known`.
///
/// Endpoints are cached for the lifetime of the resolver.
pub struct DidDocumentResolver {
    plc_directory: Url,
    http: Client,
    cache: RwLock<HashMap<String, Url>>,
}

impl DidDocumentResolver {
    pub fn new(plc_directory: &str) -> Result<Self> {
        let plc_directory = super::client::base_url(plc_directory)?;
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            plc_directory,
            http,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn document_url(&self, did: &str) -> Result<Url> {
        let invalid = |reason: String| MonitorError::Identity {
            did: did.to_string(),
            reason,
        };

        if did.starts_with("did:plc:") {
            // "./" keeps the DID from being parsed as an absolute `did:` URL
            self.plc_directory
                .join(&format!("./{did}"))
                .map_err(|e| invalid(e.to_string()))
        } else if let Some(host) = did.strip_prefix("did:web:") {
            Url::parse(&format!("https://{host}/.well-known/did.json"))
                .map_err(|e| invalid(e.to_string()))
        } else {
            Err(invalid("unsupported DID method".to_string()))
        }
    }

    async fn fetch(&self, did: &str) -> Result<Url> {
        let url = self.document_url(did)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Identity {
                did: did.to_string(),
                reason: format!("DID document lookup returned {status}"),
            });
        }

        let document: DidDocument = response.json().await?;
        let endpoint = document
            .service
            .iter()
            .find(|service| service.id.ends_with(PDS_SERVICE_ID))
            .ok_or_else(|| MonitorError::Identity {
                did: did.to_string(),
                reason: "no PDS endpoint for identity".to_string(),
            })?;

        Url::parse(&endpoint.service_endpoint).map_err(|e| MonitorError::Identity {
            did: did.to_string(),
            reason: format!("invalid PDS endpoint: {e}"),
        })
    }
}

#[async_trait]
impl PdsResolver for DidDocumentResolver {
    async fn pds_endpoint(&self, did: &str) -> Result<Url> {
        if let Some(url) = self.cache.read().await.get(did) {
            return Ok(url.clone());
        }

        let url = self.fetch(did).await?;
        tracing::debug!(did, pds = %url, "Resolved PDS endpoint");
        self.cache
            .write()
            .await
            .insert(did.to_string(), url.clone());
        Ok(url)
    }
}
