// Withdraw witness assembly (converter deployments).
//
// A withdrawal destroys encrypted supply and releases the underlying
// ERC-20: no receiver EGCT exists. The sender proves the spend against
// their balance, the auditor gets a PCT of the amount, and the rolling
// balance PCT is rewritten to the remainder.

use rand::{CryptoRng, RngCore};
use serde::Serialize;
use tracing::info;

use super::{cipher_input, fr_input, point_input, DeploymentMode, OperationEngine, SenderBalance};
use crate::curve::AffinePoint;
use crate::error::EercResult;
use crate::field::Fr;
use crate::keys::SessionKey;
use crate::pct::pct_encrypt;

/// Private inputs of the withdraw circuit; names fixed by the circuit.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawWitness {
    #[serde(rename = "ValueToWithdraw")]
    pub value_to_withdraw: String,
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

#[derive(Debug)]
pub struct WithdrawOutput {
    pub witness: WithdrawWitness,
    pub new_balance: u64,
    pub sender_balance_pct: [Fr; 7],
    pub auditor_pct: [Fr; 7],
}

impl<R: RngCore + CryptoRng> OperationEngine<R> {
    /// Assemble a withdrawal of `amount`. Only valid in converter mode.
    pub fn withdraw(
        &mut self,
        key: &SessionKey,
        amount: u64,
        balance: &SenderBalance,
        auditor_pk: &AffinePoint,
    ) -> EercResult<WithdrawOutput> {
        self.require_mode(DeploymentMode::Converter)?;
        Self::require_auditor(auditor_pk)?;
        let new_balance = Self::check_spend(amount, balance)?;

        let amount_field = Fr::from_u64(amount);
        let (auditor_pct, auditor_random) = pct_encrypt(&[amount_field], auditor_pk, self.rng())?;
        let (balance_pct, _) =
            pct_encrypt(&[Fr::from_u64(new_balance)], key.public(), self.rng())?;

        let witness = WithdrawWitness {
            value_to_withdraw: fr_input(&amount_field),
            sender_private_key: fr_input(key.secret()),
            sender_public_key: point_input(key.public()),
            sender_balance: fr_input(&Fr::from_u64(balance.plaintext)),
            sender_balance_c1: point_input(&balance.egct.c1),
            sender_balance_c2: point_input(&balance.egct.c2),
            auditor_public_key: point_input(auditor_pk),
            auditor_pct: cipher_input(&auditor_pct.cipher),
            auditor_pct_auth_key: point_input(&auditor_pct.auth_key),
            auditor_pct_nonce: fr_input(&auditor_pct.nonce),
            auditor_pct_random: fr_input(&auditor_random),
        };

        info!(amount, new_balance, "assembled withdraw witness");

        Ok(WithdrawOutput {
            witness,
            new_balance,
            sender_balance_pct: balance_pct.to_fields()?,
            auditor_pct: auditor_pct.to_fields()?,
        })
    }
}
