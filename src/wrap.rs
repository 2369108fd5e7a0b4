//! Invoice wrapping through an lnproxy relay
//!
//! The relay returns a new invoice that routes to the same payment secret.
//! Nothing it returns is trusted. The wrapped invoice must commit to the
//! payment hash of the plain invoice, and it must charge exactly the plain
//! amount plus the routing budget.

use crate::error::{ConfigError, WrapError};
use crate::invoice::{decode, DecodedInvoice};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Routing budget granted to the relay on top of the backend invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingFees {
    pub base_msat: u64,
    /// Proportional part in parts per million of the payer's amount
    pub ppm: u64,
}

impl RoutingFees {
    /// `base + ppm * amount / 1_000_000`, saturating at `u64::MAX`.
    pub fn budget_for(&self, amount_msat: u64) -> u64 {
        let proportional = u128::from(self.ppm) * u128::from(amount_msat) / 1_000_000;
        let budget = u128::from(self.base_msat) + proportional;
        u64::try_from(budget).unwrap_or(u64::MAX)
    }
}

/// A service that wraps an invoice for a given routing budget.
#[async_trait]
pub trait WrappingProxy: Send + Sync {
    /// Return the relay's wrapped invoice text, unverified.
    async fn request_wrap(&self, invoice: &str, routing_msat: u64) -> Result<String, WrapError>;
}

/// Client for an lnproxy relay's JSON API.
pub struct LnproxyClient {
    url: String,
    http_client: Client,
}

impl LnproxyClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(format!("Failed to create proxy HTTP client: {}", e)))?;
        Ok(Self::with_client(url, http_client))
    }

    pub fn with_client(url: impl Into<String>, http_client: Client) -> Self {
        Self {
            url: url.into(),
            http_client,
        }
    }
}

#[async_trait]
impl WrappingProxy for LnproxyClient {
    async fn request_wrap(&self, invoice: &str, routing_msat: u64) -> Result<String, WrapError> {
        #[derive(Serialize)]
        struct ProxyRequest<'a> {
            invoice: &'a str,
            routing_msat: String,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ProxyReply {
            Wrapped { proxy_invoice: String },
            Rejected { reason: String },
        }

        debug!("Requesting wrap from {}: routing_msat={}", self.url, routing_msat);

        let response = self
            .http_client
            .post(&self.url)
            .json(&ProxyRequest {
                invoice,
                routing_msat: routing_msat.to_string(),
            })
            .send()
            .await
            .map_err(|e| WrapError::ProxyUnreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WrapError::ProxyUnreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(WrapError::ProxyRejected(format!("{} - {}", status, body.trim())));
        }

        match serde_json::from_str::<ProxyReply>(&body) {
            Ok(ProxyReply::Wrapped { proxy_invoice }) => Ok(proxy_invoice),
            Ok(ProxyReply::Rejected { reason }) => Err(WrapError::ProxyRejected(reason)),
            Err(_) => Err(WrapError::ProxyRejected(body.trim().to_string())),
        }
    }
}

/// Check a relay's wrapped invoice against the plain invoice it was given.
///
/// Returns the decoded wrapped invoice when both invariants hold.
pub fn verify_wrapped(
    plain: &str,
    wrapped: &str,
    routing_msat: u64,
) -> Result<DecodedInvoice, WrapError> {
    let plain = decode(plain).map_err(|source| WrapError::UndecodableInvoice {
        which: "plain",
        source,
    })?;
    let wrapped = decode(wrapped).map_err(|source| WrapError::UndecodableInvoice {
        which: "wrapped",
        source,
    })?;

    if wrapped.payment_hash != plain.payment_hash {
        return Err(WrapError::HashMismatch);
    }

    if plain.is_amountless() {
        return Err(WrapError::AmountlessInvoice);
    }

    // Strict equality: an undercharge drops budget the payer already agreed to.
    let budget_mismatch = WrapError::BudgetMismatch {
        plain_msat: plain.amount_msat,
        routing_msat,
        wrapped_msat: wrapped.amount_msat,
    };
    match plain.amount_msat.checked_add(routing_msat) {
        Some(expected) if expected == wrapped.amount_msat => Ok(wrapped),
        _ => Err(budget_mismatch),
    }
}

/// Wraps invoices through a relay and accepts only verified results.
#[derive(Clone)]
pub struct WrapVerifier {
    proxy: Arc<dyn WrappingProxy>,
    fees: RoutingFees,
}

impl WrapVerifier {
    pub fn new(proxy: Arc<dyn WrappingProxy>, fees: RoutingFees) -> Self {
        Self { proxy, fees }
    }

    pub fn fees(&self) -> RoutingFees {
        self.fees
    }

    /// Routing budget reserved out of a payer amount.
    pub fn routing_budget(&self, amount_msat: u64) -> u64 {
        self.fees.budget_for(amount_msat)
    }

    /// Wrap `plain` with `routing_msat` of budget and verify the result.
    pub async fn wrap(&self, plain: &str, routing_msat: u64) -> Result<String, WrapError> {
        let wrapped = self.proxy.request_wrap(plain, routing_msat).await?;
        let wrapped = wrapped.trim();

        match verify_wrapped(plain, wrapped, routing_msat) {
            Ok(decoded) => {
                debug!(
                    "Wrapped invoice verified: payment_hash={}, amount={} msats",
                    decoded.payment_hash.payment_hash_hex(),
                    decoded.amount_msat
                );
                Ok(wrapped.to_string())
            }
            Err(e @ (WrapError::HashMismatch | WrapError::BudgetMismatch { .. })) => {
                error!("Relay returned a tampered invoice: {}", e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
