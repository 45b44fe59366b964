// External Prover Seam
//
// Proof generation itself is outside the core: the SDK assembles a witness
// map, hands it to a Groth16 prover over BN254 together with the circuit's
// asset pair, and gets back proof points plus public signals. This module
// carries the types on that seam and the ABI-fixed shape checks the
// contract enforces.

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{EercError, EercResult};

/// The five proof-backed operations, one circuit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Circuit {
    Register,
    Mint,
    Transfer,
    Withdraw,
    Burn,
}

impl Circuit {
    pub fn name(&self) -> &'static str {
        match self {
            Circuit::Register => "register",
            Circuit::Mint => "mint",
            Circuit::Transfer => "transfer",
            Circuit::Withdraw => "withdraw",
            Circuit::Burn => "burn",
        }
    }

    /// Public-signal count fixed by the contract ABI; a proof with any
    /// other shape is unsubmittable.
    pub fn public_signal_count(&self) -> usize {
        match self {
            Circuit::Register => 5,
            Circuit::Mint => 24,
            Circuit::Transfer => 32,
            Circuit::Withdraw => 16,
            Circuit::Burn => 19,
        }
    }
}

/// Prover artifact pair for one circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitAssets {
    pub wasm_url: String,
    pub zkey_url: String,
}

/// Asset locations for every circuit of a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitRegistry {
    pub register: CircuitAssets,
    pub mint: CircuitAssets,
    pub transfer: CircuitAssets,
    pub withdraw: CircuitAssets,
    pub burn: CircuitAssets,
}

impl CircuitRegistry {
    pub fn assets(&self, circuit: Circuit) -> &CircuitAssets {
        match circuit {
            Circuit::Register => &self.register,
            Circuit::Mint => &self.mint,
            Circuit::Transfer => &self.transfer,
            Circuit::Withdraw => &self.withdraw,
            Circuit::Burn => &self.burn,
        }
    }
}

/// Groth16 proof points over BN254, decimal-string encoded the way the
/// prover emits them. Coordinates live in the base field, not the scalar
/// field, so they stay strings here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPoints {
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
}

impl ProofPoints {
    /// Flatten to the verifier's calldata word order: a, then b with each
    /// inner pair swapped (the pairing check consumes G2 coordinates in
    /// reversed limb order), then c.
    pub fn to_calldata_words(&self) -> EercResult<Vec<[u8; 32]>> {
        let ordered: [&str; 8] = [
            &self.a[0],
            &self.a[1],
            &self.b[0][1],
            &self.b[0][0],
            &self.b[1][1],
            &self.b[1][0],
            &self.c[0],
            &self.c[1],
        ];
        ordered.iter().map(|s| decimal_to_word(s)).collect()
    }
}

/// Prover result: proof points plus the circuit's public signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOutput {
    pub points: ProofPoints,
    pub public_signals: Vec<String>,
}

/// Reject proofs whose public-signal count does not match the ABI.
pub fn validate_proof_shape(circuit: Circuit, output: &ProofOutput) -> EercResult<()> {
    let expected = circuit.public_signal_count();
    if output.public_signals.len() != expected {
        return Err(EercError::ProverError(format!(
            "{} proof has {} public signals, contract expects {}",
            circuit.name(),
            output.public_signals.len(),
            expected
        )));
    }
    Ok(())
}

/// The external SNARK prover. `prove` is the only mandatory suspension
/// point; `prefetch` lets hosts warm the artifact cache ahead of time.
#[async_trait]
pub trait ProverOracle: Send + Sync {
    async fn prove(
        &self,
        assets: &CircuitAssets,
        witness: &serde_json::Value,
    ) -> EercResult<ProofOutput>;

    async fn prefetch(&self, _assets: &CircuitAssets) -> EercResult<()> {
        Ok(())
    }
}

fn decimal_to_word(s: &str) -> EercResult<[u8; 32]> {
    let value = BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or_else(|| EercError::ProverError(format!("non-decimal proof coordinate: {s}")))?;
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(EercError::ProverError(
            "proof coordinate exceeds 256 bits".to_string(),
        ));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

// =============================================================================
// Tests
// =============================================================================
