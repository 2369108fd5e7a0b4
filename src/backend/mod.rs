//! Invoice backend implementations
//!
//! Supports the node kinds an address can be registered with:
//! - Commando (Core Lightning REST, rune auth)
//! - Sparko (Core Lightning spark plugin)
//! - LND (REST API, macaroon auth)
//! - LNBits (REST API)
//! - Eclair (REST API)
//!
//! The set is closed. A new node kind is a new [`NodeBackendConfig`] variant.

use crate::error::{BackendError, ConfigError};
use async_trait::async_trait;
use bitcoin_hashes::{sha256, Hash};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub mod commando;
pub mod eclair;
pub mod lnbits;
pub mod lnd;
pub mod sparko;

/// Node backend type, as stored in a user's registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Commando,
    Sparko,
    Lnd,
    LnBits,
    Eclair,
}

impl FromStr for NodeType {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "commando" => Ok(NodeType::Commando),
            "sparko" => Ok(NodeType::Sparko),
            "lnd" => Ok(NodeType::Lnd),
            "lnbits" => Ok(NodeType::LnBits),
            "eclair" => Ok(NodeType::Eclair),
            _ => Err(BackendError::UnknownNodeType(s.to_string())),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeType::Commando => "Commando",
            NodeType::Sparko => "Sparko",
            NodeType::Lnd => "LND",
            NodeType::LnBits => "LNBits",
            NodeType::Eclair => "Eclair",
        })
    }
}

/// Connection parameters for exactly one node backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBackendConfig {
    Commando(commando::CommandoConfig),
    Sparko(sparko::SparkoConfig),
    Lnd(lnd::LndConfig),
    LnBits(lnbits::LnBitsConfig),
    Eclair(eclair::EclairConfig),
}

impl NodeBackendConfig {
    /// Parse a stored node payload as the variant named by `node_type`.
    ///
    /// The payload is only ever read as the tagged variant, so tag and
    /// payload cannot disagree silently: a mismatch fails to parse.
    pub fn parse(node_type: NodeType, payload: &[u8]) -> Result<Self, ConfigError> {
        fn read<T: DeserializeOwned>(node_type: NodeType, payload: &[u8]) -> Result<T, ConfigError> {
            serde_json::from_slice(payload).map_err(|e| {
                ConfigError::CorruptedConfig(format!("{} node parameters: {}", node_type, e))
            })
        }

        Ok(match node_type {
            NodeType::Commando => NodeBackendConfig::Commando(read(node_type, payload)?),
            NodeType::Sparko => NodeBackendConfig::Sparko(read(node_type, payload)?),
            NodeType::Lnd => NodeBackendConfig::Lnd(read(node_type, payload)?),
            NodeType::LnBits => NodeBackendConfig::LnBits(read(node_type, payload)?),
            NodeType::Eclair => NodeBackendConfig::Eclair(read(node_type, payload)?),
        })
    }

    /// Resolve the tag first, then the payload.
    pub fn from_tagged(tag: &str, payload: &[u8]) -> Result<Self, crate::error::LnurlError> {
        let node_type = NodeType::from_str(tag)?;
        Ok(Self::parse(node_type, payload)?)
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeBackendConfig::Commando(_) => NodeType::Commando,
            NodeBackendConfig::Sparko(_) => NodeType::Sparko,
            NodeBackendConfig::Lnd(_) => NodeType::Lnd,
            NodeBackendConfig::LnBits(_) => NodeType::LnBits,
            NodeBackendConfig::Eclair(_) => NodeType::Eclair,
        }
    }
}

/// LNURL metadata together with the SHA-256 bound into the invoice.
///
/// Both halves come from one string, so the metadata served to the wallet and
/// the preimage of the invoice's description hash are the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionCommitment {
    description: String,
    hash: [u8; 32],
}

impl DescriptionCommitment {
    pub fn new(description: impl Into<String>) -> Self {
        let description = description.into();
        let hash = sha256::Hash::hash(description.as_bytes()).to_byte_array();
        Self { description, hash }
    }

    /// The committed-to text (the LNURL metadata string).
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Invoice backend trait - implemented by every node kind
#[async_trait]
pub trait InvoiceBackend: Send + Sync {
    /// Create an invoice for `amount_msat` whose description hash is the
    /// commitment's hash.
    ///
    /// Transport and RPC failures surface as [`BackendError::UpstreamFailure`];
    /// this layer never retries.
    async fn make_invoice(
        &self,
        amount_msat: u64,
        description: &DescriptionCommitment,
    ) -> Result<String, BackendError>;

    /// Get the node type
    fn node_type(&self) -> NodeType;
}

/// Create an invoice backend from its stored configuration.
///
/// `client` is the process-wide backend client. LND with a pinned certificate
/// gets its own client built with the same `timeout`.
pub fn create_backend(
    config: NodeBackendConfig,
    client: &Client,
    timeout: Duration,
) -> Result<Arc<dyn InvoiceBackend>, ConfigError> {
    let backend: Arc<dyn InvoiceBackend> = match config {
        NodeBackendConfig::Commando(config) => {
            Arc::new(commando::CommandoBackend::new(config, client.clone()))
        }
        NodeBackendConfig::Sparko(config) => {
            Arc::new(sparko::SparkoBackend::new(config, client.clone()))
        }
        NodeBackendConfig::Lnd(config) => Arc::new(lnd::LndBackend::new(config, client, timeout)?),
        NodeBackendConfig::LnBits(config) => {
            Arc::new(lnbits::LnBitsBackend::new(config, client.clone()))
        }
        NodeBackendConfig::Eclair(config) => {
            Arc::new(eclair::EclairBackend::new(config, client.clone()))
        }
    };
    Ok(backend)
}

/// Build the shared HTTP client used by all node backends.
pub fn http_client(timeout: Duration) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::HttpClient(format!("Failed to create HTTP client: {}", e)))
}

/// Random label for backends that require one per invoice.
pub(crate) fn invoice_label() -> String {
    format!("lnaddress/{}", hex::encode(rand::random::<[u8; 8]>()))
}

pub(crate) fn endpoint(host: &str, path: &str) -> String {
    format!("{}{}", host.trim_end_matches('/'), path)
}

/// Send a backend request and decode its JSON reply.
pub(crate) async fn send<T: DeserializeOwned>(
    node_type: NodeType,
    request: RequestBuilder,
) -> Result<T, BackendError> {
    let response = request
        .send()
        .await
        .map_err(|e| BackendError::UpstreamFailure(format!("{} request failed: {}", node_type, e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(BackendError::UpstreamFailure(format!(
            "{} API error: {} - {}",
            node_type, status, error_text
        )));
    }

    debug!("{} replied with status {}", node_type, status);
    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::UpstreamFailure(format!("Failed to parse {} response: {}", node_type, e)))
}
