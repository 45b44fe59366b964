// Transfer witness assembly.
//
// A transfer spends from the sender's homomorphic balance and credits the
// receiver. The sender proves knowledge of their key and of a plaintext
// balance covering the amount; the receiver gets a fresh EGCT plus amount
// PCT; the auditor gets its PCT; and the sender's rolling balance PCT is
// rewritten to the post-transfer balance and submitted beside the proof.

use rand::{CryptoRng, RngCore};
use serde::Serialize;
use tracing::info;

use super::{cipher_input, fr_input, point_input, OperationEngine, SenderBalance};
use crate::curve::{encrypt_message, AffinePoint, ElGamalCiphertext};
use crate::error::EercResult;
use crate::field::Fr;
use crate::keys::SessionKey;
use crate::pct::pct_encrypt;

/// Private inputs of the transfer circuit; names fixed by the circuit.
#[derive(Debug, Clone, Serialize)]
pub struct TransferWitness {
    #[serde(rename = "ValueToTransfer")]
    pub value_to_transfer: String,
    #[serde(rename = "SenderPrivateKey")]
    pub sender_private_key: String,
    #[serde(rename = "SenderPublicKey")]
    pub sender_public_key: [String; 2],
    #[serde(rename = "SenderBalance")]
    pub sender_balance: String,
    #[serde(rename = "SenderBalanceC1")]
    pub sender_balance_c1: [String; 2],
    #[serde(rename = "SenderBalanceC2")]
    pub sender_balance_c2: [String; 2],
    #[serde(rename = "SenderVTTC1")]
    pub sender_vtt_c1: [String; 2],
    #[serde(rename = "SenderVTTC2")]
    pub sender_vtt_c2: [String; 2],
    #[serde(rename = "ReceiverPublicKey")]
    pub receiver_public_key: [String; 2],
    #[serde(rename = "ReceiverVTTC1")]
    pub receiver_vtt_c1: [String; 2],
    #[serde(rename = "ReceiverVTTC2")]
    pub receiver_vtt_c2: [String; 2],
    #[serde(rename = "ReceiverVTTRandom")]
    pub receiver_vtt_random: String,
    #[serde(rename = "ReceiverPCT")]
    pub receiver_pct: [String; 4],
    #[serde(rename = "ReceiverPCTAuthKey")]
    pub receiver_pct_auth_key: [String; 2],
    #[serde(rename = "ReceiverPCTNonce")]
    pub receiver_pct_nonce: String,
    #[serde(rename = "ReceiverPCTRandom")]
    pub receiver_pct_random: String,
    #[serde(rename = "AuditorPublicKey")]
    pub auditor_public_key: [String; 2],
    #[serde(rename = "AuditorPCT")]
    pub auditor_pct: [String; 4],
    #[serde(rename = "AuditorPCTAuthKey")]
    pub auditor_pct_auth_key: [String; 2],
    #[serde(rename = "AuditorPCTNonce")]
    pub auditor_pct_nonce: String,
    #[serde(rename = "AuditorPCTRandom")]
    pub auditor_pct_random: String,
}

/// Transfer payloads. `sender_balance_pct` is the rewritten rolling PCT
/// the contract call takes beside the proof; the receiver artifacts are
/// what the contract appends on the other side.
#[derive(Debug)]
pub struct TransferOutput {
    pub witness: TransferWitness,
    pub new_balance: u64,
    pub sender_balance_pct: [Fr; 7],
    pub sender_egct: ElGamalCiphertext,
    pub receiver_egct: ElGamalCiphertext,
    pub receiver_amount_pct: [Fr; 7],
    pub auditor_pct: [Fr; 7],
}

impl<R: RngCore + CryptoRng> OperationEngine<R> {
    /// Assemble a transfer of `amount` to `receiver_pk`. Valid in both
    /// deployment modes.
    pub fn transfer(
        &mut self,
        key: &SessionKey,
        receiver_pk: &AffinePoint,
        amount: u64,
        balance: &SenderBalance,
        auditor_pk: &AffinePoint,
    ) -> EercResult<TransferOutput> {
        Self::require_registered(receiver_pk)?;
        Self::require_auditor(auditor_pk)?;
        let new_balance = Self::check_spend(amount, balance)?;

        let amount_field = Fr::from_u64(amount);

        // The sender-side EGCT of the amount; its randomness is not a
        // witness input (the circuit checks it with the sender's key).
        let (sender_egct, _) = encrypt_message(key.public(), amount, self.rng())?;
        let (receiver_egct, receiver_vtt_random) =
            encrypt_message(receiver_pk, amount, self.rng())?;

        let (receiver_pct, receiver_random) =
            pct_encrypt(&[amount_field], receiver_pk, self.rng())?;
        let (auditor_pct, auditor_random) = pct_encrypt(&[amount_field], auditor_pk, self.rng())?;

        // Rewritten rolling balance PCT: the sender's own view of the
        // post-transfer balance.
        let (balance_pct, _) =
            pct_encrypt(&[Fr::from_u64(new_balance)], key.public(), self.rng())?;

        let witness = TransferWitness {
            value_to_transfer: fr_input(&amount_field),
            sender_private_key: fr_input(key.secret()),
            sender_public_key: point_input(key.public()),
            sender_balance: fr_input(&Fr::from_u64(balance.plaintext)),
            sender_balance_c1: point_input(&balance.egct.c1),
            sender_balance_c2: point_input(&balance.egct.c2),
            sender_vtt_c1: point_input(&sender_egct.c1),
            sender_vtt_c2: point_input(&sender_egct.c2),
            receiver_public_key: point_input(receiver_pk),
            receiver_vtt_c1: point_input(&receiver_egct.c1),
            receiver_vtt_c2: point_input(&receiver_egct.c2),
            receiver_vtt_random: fr_input(&receiver_vtt_random),
            receiver_pct: cipher_input(&receiver_pct.cipher),
            receiver_pct_auth_key: point_input(&receiver_pct.auth_key),
            receiver_pct_nonce: fr_input(&receiver_pct.nonce),
            receiver_pct_random: fr_input(&receiver_random),
            auditor_public_key: point_input(auditor_pk),
            auditor_pct: cipher_input(&auditor_pct.cipher),
            auditor_pct_auth_key: point_input(&auditor_pct.auth_key),
            auditor_pct_nonce: fr_input(&auditor_pct.nonce),
            auditor_pct_random: fr_input(&auditor_random),
        };

        info!(amount, new_balance, "assembled transfer witness");

        Ok(TransferOutput {
            witness,
            new_balance,
            sender_balance_pct: balance_pct.to_fields()?,
            sender_egct,
            receiver_egct,
            receiver_amount_pct: receiver_pct.to_fields()?,
            auditor_pct: auditor_pct.to_fields()?,
        })
    }
}
