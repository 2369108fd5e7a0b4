//! LNBits backend implementation
//!
//! Creates invoices through the LNBits REST API.

use crate::backend::{endpoint, send, DescriptionCommitment, InvoiceBackend, NodeType};
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// LNBits backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LnBitsConfig {
    /// LNBits instance URL (e.g., "https://lnbits.example.com")
    pub host: String,
    /// Wallet invoice key
    pub key: String,
}

/// LNBits backend implementation
pub struct LnBitsBackend {
    config: LnBitsConfig,
    http_client: Client,
}

impl LnBitsBackend {
    pub fn new(config: LnBitsConfig, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl InvoiceBackend for LnBitsBackend {
    async fn make_invoice(
        &self,
        amount_msat: u64,
        description: &DescriptionCommitment,
    ) -> Result<String, BackendError> {
        // LNBits invoices whole satoshis only.
        if amount_msat % 1000 != 0 {
            return Err(BackendError::UpstreamFailure(format!(
                "LNBits cannot invoice {} msats: not a whole number of sats",
                amount_msat
            )));
        }
        let amount_sat = amount_msat / 1000;
        debug!(
            "Creating invoice via LNBits: amount={} msats ({} sats), description_hash={}",
            amount_msat,
            amount_sat,
            description.hash_hex()
        );

        #[derive(Serialize)]
        struct InvoiceRequest {
            out: bool,
            amount: u64,
            memo: &'static str,
            description_hash: String,
            unhashed_description: String,
        }

        #[derive(Deserialize)]
        struct InvoiceResponse {
            #[serde(alias = "bolt11")]
            payment_request: String,
        }

        let request = self
            .http_client
            .post(endpoint(&self.config.host, "/api/v1/payments"))
            .header("X-Api-Key", &self.config.key)
            .json(&InvoiceRequest {
                out: false,
                amount: amount_sat,
                memo: "",
                description_hash: description.hash_hex(),
                unhashed_description: hex::encode(description.description()),
            });

        let response: InvoiceResponse = send(NodeType::LnBits, request).await?;
        debug!("LNBits invoice created: {}", response.payment_request);
        Ok(response.payment_request)
    }

    fn node_type(&self) -> NodeType {
        NodeType::LnBits
    }
}
