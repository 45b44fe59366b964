// Operation Engine
//
// Builds the encrypted payloads and prover witnesses for the protocol's
// five proof-backed operations plus the proof-less converter deposit. One
// submodule per operation, mirroring the contract's entry points:
//
// - register:  bind a derived key to an address under the current chain
// - mint:      credit a recipient (standalone deployments only)
// - transfer:  move value between registered users
// - withdraw:  unwrap back to the underlying ERC-20 (converter only)
// - burn:      destroy value (standalone only)
// - deposit:   wrap ERC-20 value into the protocol (converter only)
//
// Witness field names are fixed by the circuits and serialized verbatim;
// renaming any of them breaks proving. Every operation draws fresh
// randomness from the engine's rng and mutates no engine state, so a failed
// build can simply be retried.

mod burn;
mod deposit;
mod mint;
mod register;
mod transfer;
mod withdraw;

pub use burn::{BurnOutput, BurnWitness};
pub use deposit::{convert_token_decimals, DepositOutput, PROTOCOL_DECIMALS};
pub use mint::{MintOutput, MintWitness};
pub use register::{RegisterOutput, RegisterWitness};
pub use transfer::{TransferOutput, TransferWitness};
pub use withdraw::{WithdrawOutput, WithdrawWitness};

use rand::{CryptoRng, RngCore};
use serde::Serialize;

use crate::curve::{AffinePoint, ElGamalCiphertext};
use crate::error::{EercError, EercResult};
use crate::field::Fr;

/// Deployment flavor. Standalone deployments mint and burn supply
/// directly; converter deployments wrap an existing ERC-20 through
/// deposit and withdraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Standalone,
    Converter,
}

impl DeploymentMode {
    fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Standalone => "standalone",
            DeploymentMode::Converter => "converter",
        }
    }
}

/// The sender's view of their current balance: the on-chain EGCT plus the
/// plaintext total reconstructed from it (see `balance`).
#[derive(Debug, Clone)]
pub struct SenderBalance {
    pub egct: ElGamalCiphertext,
    pub plaintext: u64,
}

/// Witness and payload builder for one deployment. Holds no secret state;
/// keys are passed per call and randomness comes from the injected rng.
pub struct OperationEngine<R: RngCore + CryptoRng> {
    mode: DeploymentMode,
    chain_id: u64,
    rng: R,
}

impl<R: RngCore + CryptoRng> OperationEngine<R> {
    pub fn new(mode: DeploymentMode, chain_id: u64, rng: R) -> Self {
        OperationEngine { mode, chain_id, rng }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub(crate) fn chain_id_field(&self) -> Fr {
        Fr::from_u64(self.chain_id)
    }

    pub(crate) fn rng(&mut self) -> &mut R {
        &mut self.rng
    }

    pub(crate) fn require_mode(&self, required: DeploymentMode) -> EercResult<()> {
        if self.mode == required {
            Ok(())
        } else {
            Err(EercError::NotPermittedInMode(self.mode.as_str()))
        }
    }

    /// A counterparty key must be a registered, valid subgroup point.
    pub(crate) fn require_registered(pk: &AffinePoint) -> EercResult<()> {
        if pk.is_identity() {
            return Err(EercError::UnregisteredParty);
        }
        if !pk.in_prime_subgroup() {
            return Err(EercError::InvalidPoint("counterparty key outside subgroup"));
        }
        Ok(())
    }

    /// The auditor must be configured before any audited operation.
    pub(crate) fn require_auditor(pk: &AffinePoint) -> EercResult<()> {
        if pk.is_identity() {
            return Err(EercError::AuditorNotSet);
        }
        if !pk.in_prime_subgroup() {
            return Err(EercError::InvalidPoint("auditor key outside subgroup"));
        }
        Ok(())
    }

    /// Amounts must be positive and, for spending operations, covered by
    /// the sender's plaintext balance.
    pub(crate) fn check_spend(amount: u64, balance: &SenderBalance) -> EercResult<u64> {
        if amount == 0 {
            return Err(EercError::InvalidAmount("amount must be positive".into()));
        }
        if amount > balance.plaintext {
            return Err(EercError::InvalidAmount(format!(
                "amount {} exceeds balance {}",
                amount, balance.plaintext
            )));
        }
        Ok(balance.plaintext - amount)
    }
}

/// Serialize a witness struct into the prover's JSON input map.
pub fn witness_inputs<W: Serialize>(witness: &W) -> EercResult<serde_json::Value> {
    serde_json::to_value(witness)
        .map_err(|e| EercError::ProverError(format!("witness serialization failed: {e}")))
}

// Formatting helpers shared by the witness builders. The prover consumes
// decimal strings.

pub(crate) fn fr_input(value: &Fr) -> String {
    value.to_decimal()
}

pub(crate) fn point_input(point: &AffinePoint) -> [String; 2] {
    [point.x.to_decimal(), point.y.to_decimal()]
}

pub(crate) fn cipher_input(cipher: &[Fr]) -> [String; 4] {
    debug_assert_eq!(cipher.len(), 4);
    [
        cipher[0].to_decimal(),
        cipher[1].to_decimal(),
        cipher[2].to_decimal(),
        cipher[3].to_decimal(),
    ]
}
