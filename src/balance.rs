// Balance Reconstruction
//
// The contract stores three encodings of a user's balance: the homomorphic
// EGCT running total, the rolling balance PCT rewritten on every outgoing
// operation, and the append-only queue of incoming amount PCTs. The
// plaintext balance is the balance PCT plus the queue; the EGCT is the
// commitment the circuits actually constrain. Reconstruction folds the
// readable parts and refuses to answer when they disagree with the
// commitment, so a desynchronized ledger surfaces as an error instead of a
// wrong number.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::curve::{elgamal_decryption, mul_with_scalar, ElGamalCiphertext};
use crate::error::{EercError, EercResult};
use crate::field::Fr;
use crate::pct::{pct_decrypt, PoseidonCiphertext};

/// One entry of the incoming-credit queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountPct {
    /// 7-field wire form of the credit's PCT.
    pub pct: [Fr; 7],
    /// Transaction index assigned by the contract when the credit landed.
    pub index: u64,
}

/// The contract's balance record for a (user, token) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEncoding {
    pub egct: ElGamalCiphertext,
    pub nonce: u64,
    pub amount_pcts: Vec<AmountPct>,
    pub balance_pct: [Fr; 7],
}

/// Decrypt a single amount from a PCT in wire form.
pub fn decrypt_pct_amount(fields: &[Fr; 7], sk: &Fr) -> EercResult<Fr> {
    let ct = PoseidonCiphertext::from_fields(fields)?;
    Ok(pct_decrypt(&ct, sk, 1)?[0])
}

/// Reconstruct the plaintext total from a balance record.
///
/// total = decrypt(balancePCT) + sum(decrypt(amountPCTs[i])), then verified
/// against the EGCT: total * Base8 must equal the ElGamal decryption. A
/// mismatch returns `InconsistentBalance`.
pub fn calculate_total_balance(encoding: &BalanceEncoding, sk: &Fr) -> EercResult<Fr> {
    let mut total = Fr::ZERO;

    if !PoseidonCiphertext::is_zero_fields(&encoding.balance_pct) {
        total = total.add_mod(&decrypt_pct_amount(&encoding.balance_pct, sk)?);
    }

    for entry in &encoding.amount_pcts {
        total = total.add_mod(&decrypt_pct_amount(&entry.pct, sk)?);
    }

    if !total.is_zero() {
        let expected = mul_with_scalar(&total)?;
        let got = elgamal_decryption(sk, &encoding.egct)?;
        if got != expected {
            warn!("balance reconstruction mismatch against EGCT commitment");
            return Err(EercError::InconsistentBalance);
        }
    }

    debug!(
        credits = encoding.amount_pcts.len(),
        "reconstructed balance from contract record"
    );
    Ok(total)
}

// =============================================================================
// Tests
// =============================================================================
