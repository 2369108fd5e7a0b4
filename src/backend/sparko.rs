//! Sparko backend implementation

use crate::backend::{endpoint, invoice_label, send, DescriptionCommitment, InvoiceBackend, NodeType};
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Sparko backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SparkoConfig {
    /// Sparko plugin URL
    pub host: String,
    /// Access key with permission for `invoicewithdescriptionhash`
    pub key: String,
}

pub struct SparkoBackend {
    config: SparkoConfig,
    http_client: Client,
}

impl SparkoBackend {
    pub fn new(config: SparkoConfig, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl InvoiceBackend for SparkoBackend {
    async fn make_invoice(
        &self,
        amount_msat: u64,
        description: &DescriptionCommitment,
    ) -> Result<String, BackendError> {
        debug!("Creating invoice via Sparko: amount={} msats", amount_msat);

        #[derive(Deserialize)]
        struct InvoiceResponse {
            bolt11: String,
        }

        let request = self
            .http_client
            .post(endpoint(&self.config.host, "/rpc"))
            .header("X-Access", &self.config.key)
            .json(&serde_json::json!({
                "method": "invoicewithdescriptionhash",
                "params": [amount_msat, invoice_label(), description.hash_hex()],
            }));

        let response: InvoiceResponse = send(NodeType::Sparko, request).await?;
        Ok(response.bolt11)
    }

    fn node_type(&self) -> NodeType {
        NodeType::Sparko
    }
}
