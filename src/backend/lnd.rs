//! LND backend implementation
//!
//! Uses LND's REST gateway (`POST /v1/invoices`) with an invoice macaroon.

use crate::backend::{endpoint, send, DescriptionCommitment, InvoiceBackend, NodeType};
use crate::error::{BackendError, ConfigError};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Certificate, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// LND backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LndConfig {
    /// REST endpoint, e.g. `https://127.0.0.1:8080`
    pub host: String,
    /// Hex-encoded macaroon allowed to call `AddInvoice`
    pub macaroon: String,
    /// Node TLS certificate, PEM text or hex-encoded PEM (self-signed setups)
    #[serde(default)]
    pub cert: Option<String>,
}

/// LND backend implementation
pub struct LndBackend {
    config: LndConfig,
    http_client: Client,
}

impl LndBackend {
    /// Create a new LND backend
    ///
    /// Without a certificate the shared client is reused; with one, a client
    /// trusting that certificate is built once here.
    pub fn new(config: LndConfig, shared: &Client, timeout: Duration) -> Result<Self, ConfigError> {
        let http_client = match config.cert.as_deref().map(str::trim) {
            None | Some("") => shared.clone(),
            Some(cert) => {
                let pem = if cert.starts_with("-----BEGIN") {
                    cert.as_bytes().to_vec()
                } else {
                    hex::decode(cert).map_err(|e| {
                        ConfigError::CorruptedConfig(format!("LND cert is neither PEM nor hex: {}", e))
                    })?
                };
                let certificate = Certificate::from_pem(&pem)
                    .map_err(|e| ConfigError::CorruptedConfig(format!("Invalid LND cert: {}", e)))?;
                Client::builder()
                    .timeout(timeout)
                    .add_root_certificate(certificate)
                    .build()
                    .map_err(|e| {
                        ConfigError::CorruptedConfig(format!("Failed to create LND HTTP client: {}", e))
                    })?
            }
        };

        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl InvoiceBackend for LndBackend {
    async fn make_invoice(
        &self,
        amount_msat: u64,
        description: &DescriptionCommitment,
    ) -> Result<String, BackendError> {
        debug!(
            "Creating invoice via LND: amount={} msats, description_hash={}",
            amount_msat,
            description.hash_hex()
        );

        // int64 and bytes fields travel as decimal strings and base64 on the REST gateway.
        #[derive(Serialize)]
        struct AddInvoiceRequest {
            value_msat: String,
            description_hash: String,
        }

        #[derive(Deserialize)]
        struct AddInvoiceResponse {
            payment_request: String,
        }

        let request = self
            .http_client
            .post(endpoint(&self.config.host, "/v1/invoices"))
            .header("Grpc-Metadata-macaroon", &self.config.macaroon)
            .json(&AddInvoiceRequest {
                value_msat: amount_msat.to_string(),
                description_hash: base64::engine::general_purpose::STANDARD.encode(description.hash()),
            });

        let response: AddInvoiceResponse = send(NodeType::Lnd, request).await?;
        debug!("LND invoice created: {}", response.payment_request);
        Ok(response.payment_request)
    }

    fn node_type(&self) -> NodeType {
        NodeType::Lnd
    }
}
