//! # eERC SDK
//!
//! Client-side cryptographic engine for the eERC encrypted token protocol.
//! Balances and amounts live on the contract only as ciphertexts; this
//! crate produces every encrypted payload and prover witness a wallet
//! needs to drive the five proof-backed operations, and reconstructs
//! plaintext balances on the read path.
//!
//! The proving system itself, transaction submission and the RPC surface
//! are deliberately outside: the SDK hands a witness map to an external
//! Groth16 prover (`prover::ProverOracle`) and composes call arguments the
//! host submits (`contract`).

pub mod balance;
pub mod contract;
pub mod curve;
pub mod error;
pub mod field;
pub mod keys;
pub mod message;
pub mod operations;
pub mod pct;
pub mod poseidon;
pub mod prover;

// Re-export the primitives
pub use curve::{
    elgamal_decryption, encrypt_message, generate_keypair, generate_public_key,
    generate_randomness, mul_with_scalar, AffinePoint, ElGamalCiphertext, KeyPair, BASE8,
};
pub use error::{EercError, EercResult};
pub use field::Fr;
pub use pct::{pct_decrypt, pct_encrypt, PoseidonCiphertext};
pub use poseidon::{poseidon2, poseidon3, poseidon5, PoseidonSponge};

// Re-export the session and operation surface
pub use balance::{calculate_total_balance, AmountPct, BalanceEncoding};
pub use keys::{
    derive_key_from_signature, derive_session_key, registration_message, Session, SessionKey,
    SignatureOracle,
};
pub use message::{decrypt_metadata, encrypt_metadata, EncryptedMessage};
pub use operations::{
    DeploymentMode, DepositOutput, MintOutput, OperationEngine, RegisterOutput, SenderBalance,
    TransferOutput, WithdrawOutput,
};
pub use prover::{Circuit, CircuitAssets, CircuitRegistry, ProofOutput, ProofPoints, ProverOracle};
