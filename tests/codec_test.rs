//! Decoding real signed invoices

mod common;

use common::bolt11;
use lnaddress_proxy::error::DecodeError;
use lnaddress_proxy::invoice::{decode, PaymentHashCommitment};

#[test]
fn test_decodes_signed_invoices() {
    let amounts = [1, 10, 999, 1_000, 97_000, 100_000, 12_345_678, 250_000_000, 10_000_000_000];

    for (i, amount_msat) in amounts.into_iter().enumerate() {
        let payment_hash = [i as u8 + 1; 32];
        let invoice = bolt11(Some(amount_msat), payment_hash, [0xab; 32]);

        let decoded = decode(&invoice).unwrap();
        assert_eq!(decoded.amount_msat, amount_msat, "{}", invoice);
        assert_eq!(decoded.payment_hash.payment_hash(), payment_hash);
        assert_eq!(
            decoded.payment_hash,
            PaymentHashCommitment::from_payment_hash(&payment_hash)
        );
    }
}

#[test]
fn test_amountless_signed_invoice() {
    let invoice = bolt11(None, [0x42; 32], [0xab; 32]);
    let decoded = decode(&invoice).unwrap();
    assert!(decoded.is_amountless());
    assert_eq!(decoded.payment_hash.payment_hash(), [0x42; 32]);
}

#[test]
fn test_description_hash_is_not_mistaken_for_payment_hash() {
    let invoice = bolt11(Some(97_000), [0x01; 32], [0x02; 32]);
    let decoded = decode(&invoice).unwrap();
    assert_eq!(decoded.payment_hash.payment_hash(), [0x01; 32]);
}

#[test]
fn test_uppercase_invoice() {
    let invoice = bolt11(Some(97_000), [0x07; 32], [0xab; 32]);
    assert_eq!(
        decode(&invoice.to_uppercase()).unwrap(),
        decode(&invoice).unwrap()
    );
}

#[test]
fn test_wrapped_invoice_keeps_commitment() {
    // Same payment hash, different node and amount: commitments compare equal.
    let plain = decode(&bolt11(Some(97_000), [0x5a; 32], [0x01; 32])).unwrap();
    let wrapped = decode(&bolt11(Some(100_000), [0x5a; 32], [0x02; 32])).unwrap();
    assert_eq!(plain.payment_hash, wrapped.payment_hash);
    assert_ne!(plain.amount_msat, wrapped.amount_msat);
}

#[test]
fn test_truncated_signed_invoice() {
    let invoice = bolt11(Some(97_000), [0x07; 32], [0xab; 32]);
    // Skip the separator and the 7-symbol timestamp before looking for the field.
    let fields = invoice.rfind('1').unwrap() + 8;
    let start = fields + invoice[fields..].find("pp5").unwrap();
    // Cut inside the payment hash field.
    assert_eq!(decode(&invoice[..start + 20]), Err(DecodeError::Truncated));
}
