//! LNURL-pay (LUD6) request processing
//!
//! Two phases per address, with nothing kept between requests:
//! - without `amount`, answer with the pay request metadata
//! - with `amount`, reserve the routing budget, get an invoice from the
//!   user's backend and, when a relay is configured, wrap and verify it

use crate::backend::DescriptionCommitment;
use crate::error::{BackendError, ConfigError, LnurlError, ValidationError};
use crate::invoice::decode;
use crate::registry::{Registration, Registry};
use crate::wrap::WrapVerifier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const PAY_REQUEST_TAG: &str = "payRequest";

/// Usernames are restricted to `[a-z0-9-_.]+`.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_' | b'.'))
}

/// A payable `user@domain` address and the amounts it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAddress {
    username: String,
    domain: String,
    min_amount_msat: u64,
    max_amount_msat: u64,
}

impl PaymentAddress {
    pub fn new(
        username: impl Into<String>,
        domain: impl Into<String>,
        min_amount_msat: u64,
        max_amount_msat: u64,
    ) -> Result<Self, ConfigError> {
        let username = username.into();
        let domain = domain.into();
        if !is_valid_username(&username) {
            return Err(ConfigError::CorruptedConfig(format!(
                "Invalid username {:?}",
                username
            )));
        }
        if domain.is_empty() || domain.contains(['/', '"', '@', '\\']) {
            return Err(ConfigError::CorruptedConfig(format!("Invalid domain {:?}", domain)));
        }
        if min_amount_msat > max_amount_msat {
            return Err(ConfigError::CorruptedConfig(format!(
                "{}: min {} msat above max {} msat",
                username, min_amount_msat, max_amount_msat
            )));
        }
        Ok(Self {
            username,
            domain,
            min_amount_msat,
            max_amount_msat,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn min_amount_msat(&self) -> u64 {
        self.min_amount_msat
    }

    pub fn max_amount_msat(&self) -> u64 {
        self.max_amount_msat
    }

    /// `user@domain`
    pub fn identifier(&self) -> String {
        format!("{}@{}", self.username, self.domain)
    }

    /// Canonical LUD6 metadata. Served verbatim and hashed into invoices.
    pub fn metadata(&self) -> String {
        let identifier = self.identifier();
        serde_json::json!([
            ["text/plain", format!("pay {}", identifier)],
            ["text/identifier", identifier],
        ])
        .to_string()
    }

    pub fn description_commitment(&self) -> DescriptionCommitment {
        DescriptionCommitment::new(self.metadata())
    }

    pub fn callback(&self) -> String {
        format!("https://{}/.well-known/lnurlp/{}", self.domain, self.username)
    }

    pub fn pay_request(&self) -> PayRequest {
        PayRequest {
            callback: self.callback(),
            max_sendable: self.max_amount_msat,
            min_sendable: self.min_amount_msat,
            metadata: self.metadata(),
            tag: PAY_REQUEST_TAG.to_string(),
        }
    }

    /// Parse a millisatoshi `amount` parameter and check it against the bounds.
    ///
    /// Only plain decimal digits are accepted; `u64::from_str` alone would
    /// also take a leading `+`.
    pub fn parse_amount(&self, raw: &str) -> Result<u64, ValidationError> {
        let unparsable = || ValidationError::AmountUnparsable(raw.to_string());
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unparsable());
        }
        let amount_msat: u64 = raw.parse().map_err(|_| unparsable())?;
        if amount_msat < self.min_amount_msat || amount_msat > self.max_amount_msat {
            return Err(self.out_of_range(amount_msat));
        }
        Ok(amount_msat)
    }

    fn out_of_range(&self, amount_msat: u64) -> ValidationError {
        ValidationError::AmountOutOfRange {
            amount_msat,
            min_msat: self.min_amount_msat,
            max_msat: self.max_amount_msat,
        }
    }
}

/// Phase 1 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub callback: String,
    pub max_sendable: u64,
    pub min_sendable: u64,
    pub metadata: String,
    pub tag: String,
}

/// Phase 2 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub pr: String,
    pub routes: Vec<serde_json::Value>,
}

/// LUD6 error envelope, always sent with HTTP 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LnurlResponse {
    PayRequest(PayRequest),
    Invoice(InvoiceResponse),
    Error(ErrorResponse),
}

impl LnurlResponse {
    pub fn invoice(pr: String) -> Self {
        LnurlResponse::Invoice(InvoiceResponse {
            pr,
            routes: Vec::new(),
        })
    }

    pub fn error(err: &LnurlError) -> Self {
        LnurlResponse::Error(ErrorResponse {
            status: "ERROR".to_string(),
            reason: err.reason().to_string(),
        })
    }
}

/// Resolves LNURL-pay requests against an immutable registry.
#[derive(Clone)]
pub struct LnurlPayService {
    registry: Arc<Registry>,
    wrapper: Option<WrapVerifier>,
}

impl LnurlPayService {
    /// `wrapper` is `None` when invoices are returned unwrapped.
    pub fn new(registry: Arc<Registry>, wrapper: Option<WrapVerifier>) -> Self {
        Self { registry, wrapper }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handle one request, mapping any failure to the error envelope.
    pub async fn handle(&self, username: &str, amount: Option<&str>) -> LnurlResponse {
        match self.resolve(username, amount).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_tampering() {
                    error!("Refusing wrapped invoice for {}: {}", username, e);
                } else {
                    warn!("LNURL-pay request for {:?} failed: {}", username, e);
                }
                LnurlResponse::error(&e)
            }
        }
    }

    /// Handle one request. An empty `amount` counts as absent.
    pub async fn resolve(
        &self,
        username: &str,
        amount: Option<&str>,
    ) -> Result<LnurlResponse, LnurlError> {
        if !is_valid_username(username) {
            return Err(ValidationError::InvalidUsername(username.to_string()).into());
        }
        let registration = self.registry.lookup(username)?;

        let Some(raw_amount) = amount.filter(|a| !a.is_empty()) else {
            debug!("Serving pay request metadata for {}", username);
            return Ok(LnurlResponse::PayRequest(registration.address().pay_request()));
        };

        let amount_msat = registration.address().parse_amount(raw_amount)?;
        let invoice = self.request_invoice(registration, amount_msat).await?;
        info!(
            "Issued invoice for {}: amount={} msats, wrapped={}",
            registration.address().identifier(),
            amount_msat,
            self.wrapper.is_some()
        );
        Ok(LnurlResponse::invoice(invoice))
    }

    /// Get an invoice charging the payer exactly `amount_msat`.
    ///
    /// With a relay, the backend invoices `amount_msat - budget` and the relay
    /// adds the budget back on top.
    pub async fn request_invoice(
        &self,
        registration: &Registration,
        amount_msat: u64,
    ) -> Result<String, LnurlError> {
        let address = registration.address();
        let backend = registration.backend()?;

        let routing_msat = self
            .wrapper
            .as_ref()
            .map_or(0, |wrapper| wrapper.routing_budget(amount_msat));
        let invoice_msat = amount_msat
            .checked_sub(routing_msat)
            .filter(|&msat| msat > 0)
            .ok_or_else(|| address.out_of_range(amount_msat))?;

        let description = address.description_commitment();
        debug!(
            "Requesting invoice from {} backend: amount={} msats, routing={} msats, description_hash={}",
            backend.node_type(),
            invoice_msat,
            routing_msat,
            description.hash_hex()
        );
        let invoice = backend.make_invoice(invoice_msat, &description).await?;
        check_invoice_amount(&invoice, invoice_msat)?;

        match &self.wrapper {
            Some(wrapper) => Ok(wrapper.wrap(&invoice, routing_msat).await?),
            None => Ok(invoice),
        }
    }
}

/// The backend invoice must charge exactly `expected_msat`.
fn check_invoice_amount(invoice: &str, expected_msat: u64) -> Result<(), BackendError> {
    let decoded = decode(invoice).map_err(|e| {
        BackendError::UpstreamFailure(format!("Backend returned an undecodable invoice: {}", e))
    })?;
    if decoded.amount_msat != expected_msat {
        return Err(BackendError::UpstreamFailure(format!(
            "Backend invoice is for {} msat, requested {} msat",
            decoded.amount_msat, expected_msat
        )));
    }
    Ok(())
}
