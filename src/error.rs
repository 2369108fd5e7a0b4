//! Error types for the Lightning Address server
//!
//! Every failure is terminal for the request that hit it. The caller only
//! ever sees [`LnurlError::reason`]; the `Display` text carries the internal
//! cause and is meant for operator logs.

use thiserror::Error;

/// Failures of the invoice text codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed invoice")]
    Malformed,

    #[error("Invoice truncated: a declared field runs past the end of input")]
    Truncated,

    #[error("Invoice carries no payment hash field")]
    MissingHashCommitment,
}

/// Failures raised while asking a node backend for an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Upstream node failure: {0}")]
    UpstreamFailure(String),
}

/// Failures of the wrap-and-verify exchange with the wrapping proxy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapError {
    #[error("Proxy rejected invoice: {0}")]
    ProxyRejected(String),

    #[error("Proxy unreachable: {0}")]
    ProxyUnreachable(String),

    #[error("Cannot decode {which} invoice: {source}")]
    UndecodableInvoice {
        which: &'static str,
        #[source]
        source: DecodeError,
    },

    #[error("Wrapped payment hash does not match")]
    HashMismatch,

    #[error("Wrapped amount {wrapped_msat} msat != {plain_msat} + {routing_msat} msat")]
    BudgetMismatch {
        plain_msat: u64,
        routing_msat: u64,
        wrapped_msat: u64,
    },

    #[error("Plain invoice encodes no amount")]
    AmountlessInvoice,
}

/// Caller input rejected before any upstream call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount is not a millisatoshi integer: {0:?}")]
    AmountUnparsable(String),

    #[error("Amount {amount_msat} msat outside [{min_msat}, {max_msat}]")]
    AmountOutOfRange {
        amount_msat: u64,
        min_msat: u64,
        max_msat: u64,
    },

    #[error("Invalid username: {0:?}")]
    InvalidUsername(String),
}

/// Registry and configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Username is not registered: {0}")]
    UnregisteredUser(String),

    #[error("Corrupted configuration: {0}")]
    CorruptedConfig(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Any failure of an LNURL-pay request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LnurlError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Wrap(#[from] WrapError),
}

impl LnurlError {
    /// Fixed, non-leaking message placed in the JSON error envelope.
    pub fn reason(&self) -> &'static str {
        match self {
            LnurlError::Validation(ValidationError::InvalidUsername(_)) => "invalid username",
            LnurlError::Validation(_) => "invalid amount",
            LnurlError::Config(ConfigError::UnregisteredUser(_)) => "username is not registered",
            LnurlError::Config(_) => "user details corrupted",
            LnurlError::Backend(BackendError::UnknownNodeType(_)) => "user details corrupted",
            LnurlError::Backend(BackendError::UpstreamFailure(_)) => "error while requesting invoice",
            LnurlError::Wrap(_) => "error while wrapping invoice",
        }
    }

    /// Whether the failure indicates a tampering proxy rather than a plain outage.
    pub fn is_tampering(&self) -> bool {
        matches!(
            self,
            LnurlError::Wrap(WrapError::HashMismatch) | LnurlError::Wrap(WrapError::BudgetMismatch { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_do_not_leak_causes() {
        let err = LnurlError::from(BackendError::UpstreamFailure(
            "LND API error: 401 - macaroon 0201abcd invalid".to_string(),
        ));
        assert_eq!(err.reason(), "error while requesting invoice");
        assert!(err.to_string().contains("macaroon"));

        let err = LnurlError::from(WrapError::ProxyRejected("relay out of liquidity".to_string()));
        assert_eq!(err.reason(), "error while wrapping invoice");
    }

    #[test]
    fn unknown_node_type_reads_as_corrupted_user() {
        let err = LnurlError::from(BackendError::UnknownNodeType("cashu".to_string()));
        assert_eq!(err.reason(), "user details corrupted");
    }

    #[test]
    fn http_client_failure_is_not_a_registry_error() {
        let err = ConfigError::HttpClient("no TLS backend".to_string());
        assert_eq!(err.to_string(), "HTTP client error: no TLS backend");
        assert_ne!(err, ConfigError::Registry("no TLS backend".to_string()));
        assert_eq!(LnurlError::from(err).reason(), "user details corrupted");
    }

    #[test]
    fn tampering_classification() {
        assert!(LnurlError::from(WrapError::HashMismatch).is_tampering());
        assert!(LnurlError::from(WrapError::BudgetMismatch {
            plain_msat: 1,
            routing_msat: 1,
            wrapped_msat: 3,
        })
        .is_tampering());
        assert!(!LnurlError::from(WrapError::ProxyRejected(String::new())).is_tampering());
    }
}
