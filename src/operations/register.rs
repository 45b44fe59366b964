// Registration witness assembly.
//
// Binds the signature-derived key to an address and chain:
// registrationHash = Poseidon3(chainId, sk, address). The contract stores
// the hash and the public key; the proof shows the three are consistent.

use rand::{CryptoRng, RngCore};
use serde::Serialize;
use tracing::info;

use super::{fr_input, point_input, OperationEngine};
use crate::curve::AffinePoint;
use crate::error::EercResult;
use crate::field::Fr;
use crate::keys::{address_to_field, SessionKey};
use crate::poseidon::poseidon3;

/// Private inputs of the registration circuit. Field names are fixed by
/// the circuit; this struct exists only to feed the prover.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterWitness {
    #[serde(rename = "SenderPrivateKey")]
    pub sender_private_key: String,
    #[serde(rename = "SenderPublicKey")]
    pub sender_public_key: [String; 2],
    #[serde(rename = "SenderAddress")]
    pub sender_address: String,
    #[serde(rename = "ChainID")]
    pub chain_id: String,
    #[serde(rename = "RegistrationHash")]
    pub registration_hash: String,
}

/// Everything the registration call needs besides the proof itself.
#[derive(Debug)]
pub struct RegisterOutput {
    pub witness: RegisterWitness,
    pub public_key: AffinePoint,
    pub registration_hash: Fr,
}

impl<R: RngCore + CryptoRng> OperationEngine<R> {
    /// Assemble the registration witness for `address`. Valid in both
    /// deployment modes.
    pub fn register(&self, key: &SessionKey, address: &str) -> EercResult<RegisterOutput> {
        let address_field = address_to_field(address)?;
        let chain_id = self.chain_id_field();
        let registration_hash = poseidon3(&chain_id, key.secret(), &address_field);

        let witness = RegisterWitness {
            sender_private_key: fr_input(key.secret()),
            sender_public_key: point_input(key.public()),
            sender_address: fr_input(&address_field),
            chain_id: fr_input(&chain_id),
            registration_hash: fr_input(&registration_hash),
        };

        info!(
            address,
            hash = %registration_hash.to_hex(),
            "assembled registration witness"
        );

        Ok(RegisterOutput {
            witness,
            public_key: *key.public(),
            registration_hash,
        })
    }
}
