// Private mint witness assembly (standalone deployments).
//
// A mint credits the recipient with a fresh EGCT and amount PCT, gives the
// auditor its own PCT of the amount, and derives the replay nullifier from
// the auditor ciphertext: Poseidon5(chainId, aCipher[0..4]). The contract
// records the nullifier, so an identical witness cannot be minted twice.

use rand::{CryptoRng, RngCore};
use serde::Serialize;
use tracing::info;

use super::{cipher_input, fr_input, point_input, DeploymentMode, OperationEngine};
use crate::curve::{encrypt_message, AffinePoint, ElGamalCiphertext};
use crate::error::{EercError, EercResult};
use crate::field::Fr;
use crate::pct::pct_encrypt;
use crate::poseidon::poseidon5;

/// Private inputs of the mint circuit; names fixed by the circuit.
#[derive(Debug, Clone, Serialize)]
pub struct MintWitness {
    #[serde(rename = "ValueToMint")]
    pub value_to_mint: String,
    #[serde(rename = "ChainID")]
    pub chain_id: String,
    #[serde(rename = "NullifierHash")]
    pub nullifier_hash: String,
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

/// Mint payloads: the witness plus the wire forms the contract stores.
#[derive(Debug)]
pub struct MintOutput {
    pub witness: MintWitness,
    pub nullifier: Fr,
    pub receiver_egct: ElGamalCiphertext,
    pub receiver_amount_pct: [Fr; 7],
    pub auditor_pct: [Fr; 7],
}

impl<R: RngCore + CryptoRng> OperationEngine<R> {
    /// Assemble a mint of `amount` to `receiver_pk`. Rejected in converter
    /// mode, where supply only enters through deposits.
    pub fn private_mint(
        &mut self,
        receiver_pk: &AffinePoint,
        amount: u64,
        auditor_pk: &AffinePoint,
    ) -> EercResult<MintOutput> {
        self.require_mode(DeploymentMode::Standalone)?;
        if amount == 0 {
            return Err(EercError::InvalidAmount("amount must be positive".into()));
        }
        Self::require_registered(receiver_pk)?;
        Self::require_auditor(auditor_pk)?;

        let amount_field = Fr::from_u64(amount);
        let chain_id = self.chain_id_field();

        let (receiver_egct, vtt_random) = encrypt_message(receiver_pk, amount, self.rng())?;
        let (receiver_pct, receiver_random) =
            pct_encrypt(&[amount_field], receiver_pk, self.rng())?;
        let (auditor_pct, auditor_random) = pct_encrypt(&[amount_field], auditor_pk, self.rng())?;

        let nullifier = poseidon5(
            &chain_id,
            &auditor_pct.cipher[0],
            &auditor_pct.cipher[1],
            &auditor_pct.cipher[2],
            &auditor_pct.cipher[3],
        );

        let witness = MintWitness {
            value_to_mint: fr_input(&amount_field),
            chain_id: fr_input(&chain_id),
            nullifier_hash: fr_input(&nullifier),
            receiver_public_key: point_input(receiver_pk),
            receiver_vtt_c1: point_input(&receiver_egct.c1),
            receiver_vtt_c2: point_input(&receiver_egct.c2),
            receiver_vtt_random: fr_input(&vtt_random),
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

        info!(amount, nullifier = %nullifier.to_hex(), "assembled mint witness");

        Ok(MintOutput {
            witness,
            nullifier,
            receiver_egct,
            receiver_amount_pct: receiver_pct.to_fields()?,
            auditor_pct: auditor_pct.to_fields()?,
        })
    }
}
