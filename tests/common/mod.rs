//! Helpers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use lightning_invoice::{Currency, InvoiceBuilder, PaymentSecret};
use lnaddress_proxy::backend::{DescriptionCommitment, InvoiceBackend, NodeType};
use lnaddress_proxy::error::{BackendError, WrapError};
use lnaddress_proxy::wrap::WrappingProxy;
use std::sync::Mutex;

/// Sign a real mainnet BOLT11 invoice.
pub fn bolt11(amount_msat: Option<u64>, payment_hash: [u8; 32], description_hash: [u8; 32]) -> String {
    let private_key = SecretKey::from_slice(&[0x42; 32]).unwrap();

    let builder = InvoiceBuilder::new(Currency::Bitcoin)
        .description_hash(sha256::Hash::from_byte_array(description_hash))
        .payment_hash(sha256::Hash::from_byte_array(payment_hash))
        .payment_secret(PaymentSecret([7u8; 32]))
        .current_timestamp()
        .min_final_cltv_expiry_delta(144);
    let builder = match amount_msat {
        Some(amount_msat) => builder.amount_milli_satoshis(amount_msat),
        None => builder,
    };

    builder
        .build_signed(|hash| Secp256k1::new().sign_ecdsa_recoverable(hash, &private_key))
        .unwrap()
        .to_string()
}

/// Backend that signs invoices for a fixed payment hash and records requests.
pub struct RecordingBackend {
    pub payment_hash: [u8; 32],
    pub fail: bool,
    /// Subtracted from the amount actually invoiced.
    pub shortfall_msat: u64,
    pub requests: Mutex<Vec<(u64, [u8; 32])>>,
}

impl RecordingBackend {
    pub fn new(payment_hash: [u8; 32]) -> Self {
        Self {
            payment_hash,
            fail: false,
            shortfall_msat: 0,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new([0; 32])
        }
    }

    pub fn requests(&self) -> Vec<(u64, [u8; 32])> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoiceBackend for RecordingBackend {
    async fn make_invoice(
        &self,
        amount_msat: u64,
        description: &DescriptionCommitment,
    ) -> Result<String, BackendError> {
        self.requests
            .lock()
            .unwrap()
            .push((amount_msat, *description.hash()));
        if self.fail {
            return Err(BackendError::UpstreamFailure("connection refused".to_string()));
        }
        Ok(bolt11(
            Some(amount_msat - self.shortfall_msat),
            self.payment_hash,
            *description.hash(),
        ))
    }

    fn node_type(&self) -> NodeType {
        NodeType::Lnd
    }
}

/// Relay that wraps honestly unless told to tamper.
pub struct StubRelay {
    /// Payment hash the relay commits to; `None` keeps the original.
    pub substitute_hash: Option<[u8; 32]>,
    /// Added to the honest wrapped amount.
    pub amount_skew_msat: i64,
    pub original_hash: [u8; 32],
    pub requests: Mutex<Vec<(String, u64)>>,
}

impl StubRelay {
    pub fn honest(original_hash: [u8; 32]) -> Self {
        Self {
            substitute_hash: None,
            amount_skew_msat: 0,
            original_hash,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, u64)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WrappingProxy for StubRelay {
    async fn request_wrap(&self, invoice: &str, routing_msat: u64) -> Result<String, WrapError> {
        self.requests
            .lock()
            .unwrap()
            .push((invoice.to_string(), routing_msat));

        let plain = lnaddress_proxy::decode(invoice).map_err(|e| WrapError::ProxyRejected(e.to_string()))?;
        let amount = (plain.amount_msat + routing_msat) as i64 + self.amount_skew_msat;
        let hash = self.substitute_hash.unwrap_or(self.original_hash);
        Ok(bolt11(Some(amount as u64), hash, [0xee; 32]))
    }
}
