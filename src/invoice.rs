//! Lightning invoice handling (BOLT11)
//!
//! This is not a full BOLT11 parser. It reads only the two things the
//! wrap check needs, the amount and the payment-hash field. It does not touch
//! the signature or checksum. Every offset derived from a length header is
//! checked against the remaining input before it is used.

use crate::error::DecodeError;
use std::fmt;
use std::str::FromStr;

/// Human-readable prefix of a mainnet invoice.
const PREFIX: &[u8] = b"lnbc";
const SEPARATOR: u8 = b'1';
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Symbols occupied by the timestamp at the start of the data part.
const TIMESTAMP_LEN: usize = 7;
/// Type symbol (1) plus big-endian base-32 length (2).
const FIELD_HEADER_LEN: usize = 3;
const PAYMENT_HASH_TAG: u8 = 1;

/// Symbols in the data span of a payment-hash field (256 bits, padded).
pub const PAYMENT_HASH_LEN: usize = 52;

fn symbol_value(symbol: u8) -> Option<u8> {
    CHARSET.iter().position(|&c| c == symbol).map(|v| v as u8)
}

/// The 52-symbol payment-hash field exactly as it is embedded in an invoice.
///
/// Two invoices commit to the same payment hash iff their commitments are
/// equal symbol-for-symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaymentHashCommitment([u8; PAYMENT_HASH_LEN]);

impl PaymentHashCommitment {
    /// Build the commitment a BOLT11 encoder would embed for `hash`.
    pub fn from_payment_hash(hash: &[u8; 32]) -> Self {
        let mut symbols = [CHARSET[0]; PAYMENT_HASH_LEN];
        let mut acc: u32 = 0;
        let mut bits = 0u32;
        let mut idx = 0;
        for &byte in hash {
            acc = (acc << 8) | u32::from(byte);
            bits += 8;
            while bits >= 5 {
                bits -= 5;
                symbols[idx] = CHARSET[((acc >> bits) & 0x1f) as usize];
                idx += 1;
            }
            acc &= (1 << bits) - 1;
        }
        if bits > 0 {
            symbols[idx] = CHARSET[((acc << (5 - bits)) & 0x1f) as usize];
        }
        Self(symbols)
    }

    /// Raw 32-byte payment hash behind the commitment. Only used for logs.
    pub fn payment_hash(&self) -> [u8; 32] {
        let mut hash = [0u8; 32];
        let mut acc: u32 = 0;
        let mut bits = 0u32;
        let mut idx = 0;
        for &symbol in &self.0 {
            // Every stored symbol came through `symbol_value` already.
            acc = (acc << 5) | u32::from(symbol_value(symbol).unwrap_or(0));
            bits += 5;
            if bits >= 8 {
                bits -= 8;
                if idx < hash.len() {
                    hash[idx] = (acc >> bits) as u8;
                    idx += 1;
                }
            }
            acc &= (1 << bits) - 1;
        }
        hash
    }

    /// Payment hash as hex string
    pub fn payment_hash_hex(&self) -> String {
        hex::encode(self.payment_hash())
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for PaymentHashCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for PaymentHashCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentHashCommitment({})", self.as_str())
    }
}

/// Amount and payment-hash commitment extracted from an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInvoice {
    /// Millisatoshis, or 0 when the invoice does not encode an amount.
    pub amount_msat: u64,
    pub payment_hash: PaymentHashCommitment,
}

impl DecodedInvoice {
    /// Whether the invoice left the amount to the payer.
    pub fn is_amountless(&self) -> bool {
        self.amount_msat == 0
    }
}

impl FromStr for DecodedInvoice {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

/// Decode the amount and payment-hash commitment of a mainnet invoice.
///
/// The input is case-normalised first. The separator is the last `1`, which
/// cannot occur in the data part.
pub fn decode(invoice: &str) -> Result<DecodedInvoice, DecodeError> {
    let text = invoice.to_ascii_lowercase();
    let bytes = text.as_bytes();

    let sep = bytes
        .iter()
        .rposition(|&b| b == SEPARATOR)
        .ok_or(DecodeError::Malformed)?;
    let (hrp, data) = (&bytes[..sep], &bytes[sep + 1..]);

    let amount_msat = parse_amount(hrp)?;

    if data.is_empty() || !data.iter().all(|&b| symbol_value(b).is_some()) {
        return Err(DecodeError::Malformed);
    }

    let payment_hash = find_payment_hash(data)?;

    Ok(DecodedInvoice {
        amount_msat,
        payment_hash,
    })
}

/// Millisatoshis encoded in the human-readable part, 0 when absent.
fn parse_amount(hrp: &[u8]) -> Result<u64, DecodeError> {
    let rest = hrp.strip_prefix(PREFIX).ok_or(DecodeError::Malformed)?;
    let Some((&unit, digits)) = rest.split_last() else {
        return Ok(0);
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(DecodeError::Malformed);
    }
    let value: u64 = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(DecodeError::Malformed)?;

    let msat = match unit {
        b'p' => Some(value / 10),
        b'n' => value.checked_mul(100),
        b'u' => value.checked_mul(100_000),
        b'm' => value.checked_mul(100_000_000),
        _ => None,
    };
    msat.ok_or(DecodeError::Malformed)
}

fn find_payment_hash(data: &[u8]) -> Result<PaymentHashCommitment, DecodeError> {
    if data.len() < TIMESTAMP_LEN {
        return Err(DecodeError::Truncated);
    }

    let value = |b: u8| symbol_value(b).ok_or(DecodeError::Malformed);

    let mut pos = TIMESTAMP_LEN;
    while pos < data.len() {
        let header = data
            .get(pos..pos + FIELD_HEADER_LEN)
            .ok_or(DecodeError::Truncated)?;
        let tag = value(header[0])?;
        let len = usize::from(value(header[1])?) * 32 + usize::from(value(header[2])?);

        let start = pos + FIELD_HEADER_LEN;
        let field = data.get(start..start + len).ok_or(DecodeError::Truncated)?;

        // A `p` field of the wrong length is skipped, as BOLT11 readers must.
        if tag == PAYMENT_HASH_TAG && len == PAYMENT_HASH_LEN {
            let mut symbols = [0u8; PAYMENT_HASH_LEN];
            symbols.copy_from_slice(field);
            return Ok(PaymentHashCommitment(symbols));
        }
        pos = start + len;
    }

    Err(DecodeError::MissingHashCommitment)
}
