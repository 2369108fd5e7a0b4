//! Eclair backend implementation
//!
//! Eclair's API takes form-encoded bodies and HTTP basic auth with an empty
//! user name.

use crate::backend::{endpoint, send, DescriptionCommitment, InvoiceBackend, NodeType};
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Eclair backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EclairConfig {
    /// API URL, e.g. `http://127.0.0.1:8080`
    pub host: String,
    /// `eclair.api.password`
    pub password: String,
}

pub struct EclairBackend {
    config: EclairConfig,
    http_client: Client,
}

impl EclairBackend {
    pub fn new(config: EclairConfig, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl InvoiceBackend for EclairBackend {
    async fn make_invoice(
        &self,
        amount_msat: u64,
        description: &DescriptionCommitment,
    ) -> Result<String, BackendError> {
        debug!(
            "Creating invoice via Eclair: amount={} msats, description_hash={}",
            amount_msat,
            description.hash_hex()
        );

        #[derive(Deserialize)]
        struct InvoiceResponse {
            serialized: String,
        }

        let amount = amount_msat.to_string();
        let description_hash = description.hash_hex();
        let request = self
            .http_client
            .post(endpoint(&self.config.host, "/createinvoice"))
            .basic_auth("", Some(&self.config.password))
            .form(&[
                ("amountMsat", amount.as_str()),
                ("descriptionHash", description_hash.as_str()),
            ]);

        let response: InvoiceResponse = send(NodeType::Eclair, request).await?;
        Ok(response.serialized)
    }

    fn node_type(&self) -> NodeType {
        NodeType::Eclair
    }
}
