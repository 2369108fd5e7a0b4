//! Commando backend implementation
//!
//! Core Lightning authorised by a rune, reached through its REST interface
//! (`POST /v1/invoice`). CLN cannot take a bare description hash, so the full
//! metadata is sent with `deschashonly` and the node hashes it itself.

use crate::backend::{endpoint, invoice_label, send, DescriptionCommitment, InvoiceBackend, NodeType};
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Commando backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandoConfig {
    /// clnrest URL, e.g. `https://cln.example.com:3010`
    pub host: String,
    /// Rune restricted to `method=invoice`
    pub rune: String,
}

pub struct CommandoBackend {
    config: CommandoConfig,
    http_client: Client,
}

impl CommandoBackend {
    pub fn new(config: CommandoConfig, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl InvoiceBackend for CommandoBackend {
    async fn make_invoice(
        &self,
        amount_msat: u64,
        description: &DescriptionCommitment,
    ) -> Result<String, BackendError> {
        let label = invoice_label();
        debug!(
            "Creating invoice via Commando: amount={} msats, label={}",
            amount_msat, label
        );

        #[derive(Serialize)]
        struct InvoiceRequest<'a> {
            amount_msat: u64,
            label: String,
            description: &'a str,
            deschashonly: bool,
        }

        #[derive(Deserialize)]
        struct InvoiceResponse {
            bolt11: String,
        }

        let request = self
            .http_client
            .post(endpoint(&self.config.host, "/v1/invoice"))
            .header("Rune", &self.config.rune)
            .json(&InvoiceRequest {
                amount_msat,
                label,
                description: description.description(),
                deschashonly: true,
            });

        let response: InvoiceResponse = send(NodeType::Commando, request).await?;
        Ok(response.bolt11)
    }

    fn node_type(&self) -> NodeType {
        NodeType::Commando
    }
}
