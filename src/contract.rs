// Contract Surface
//
// The SDK never talks RPC itself. This module mirrors the contract's read
// surface as an async trait the host implements, composes the write-call
// argument tuples in the ABI's order, and types the event payloads the
// auditor path consumes. Tuple layouts are load-bearing: the contract
// decodes them positionally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::balance::{decrypt_pct_amount, BalanceEncoding};
use crate::curve::AffinePoint;
use crate::error::EercResult;
use crate::field::Fr;
use crate::message::{decrypt_metadata, EncryptedMessage};
use crate::prover::ProofOutput;

// =============================================================================
// Read Surface
// =============================================================================

/// Read-only contract state the core consumes. Implemented by the host
/// against its RPC stack of choice.
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Registered Baby Jubjub public key for an address; identity when the
    /// address has not registered.
    async fn get_user_public_key(&self, address: &str) -> EercResult<AffinePoint>;

    /// Balance record for the deployment's own token.
    async fn balance_of(&self, address: &str) -> EercResult<BalanceEncoding>;

    /// Balance record for a wrapped ERC-20 (converter mode).
    async fn get_balance_from_token_address(
        &self,
        address: &str,
        token_address: &str,
    ) -> EercResult<BalanceEncoding>;

    async fn auditor_public_key(&self) -> EercResult<AffinePoint>;
    async fn auditor(&self) -> EercResult<String>;
    async fn token_ids(&self, token_address: &str) -> EercResult<u64>;
    async fn decimals(&self) -> EercResult<u8>;
    async fn name(&self) -> EercResult<String>;
    async fn symbol(&self) -> EercResult<String>;
    async fn owner(&self) -> EercResult<String>;
    async fn is_converter(&self) -> EercResult<bool>;
    async fn registrar(&self) -> EercResult<String>;

    /// Spending allowance granted to the protocol contract on the
    /// underlying ERC-20 (converter deposits).
    async fn allowance(&self, owner: &str, token_address: &str) -> EercResult<u128>;
}

// =============================================================================
// Write Surface
// =============================================================================

/// `register(proof)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCall {
    pub proof: ProofOutput,
}

/// `privateMint(recipient, proof[, message])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintCall {
    pub recipient: String,
    pub proof: ProofOutput,
    pub message: Option<EncryptedMessage>,
}

/// `transfer(to, tokenId, proof, balancePCT[, message])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCall {
    pub to: String,
    pub token_id: u64,
    pub proof: ProofOutput,
    pub balance_pct: [Fr; 7],
    pub message: Option<EncryptedMessage>,
}

/// `withdraw(tokenId, proof, balancePCT[, message])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCall {
    pub token_id: u64,
    pub proof: ProofOutput,
    pub balance_pct: [Fr; 7],
    pub message: Option<EncryptedMessage>,
}

/// `privateBurn(proof, balancePCT[, message])`. There is no variant
/// without `balancePCT`; call sites that omit it are malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnCall {
    pub proof: ProofOutput,
    pub balance_pct: [Fr; 7],
    pub message: Option<EncryptedMessage>,
}

/// `deposit(amount, tokenAddress, amountPCT[, message])`. Proof-less;
/// converter mode only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCall {
    pub amount: u128,
    pub token_address: String,
    pub amount_pct: [Fr; 7],
    pub message: Option<EncryptedMessage>,
}

/// `setAuditorPublicKey(address)`: points the contract at the registered
/// key of the new auditor. Owner-only on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAuditorCall {
    pub address: String,
}

/// Serialize a 7-field PCT to ABI words (32-byte big-endian each).
pub fn pct_to_words(fields: &[Fr; 7]) -> [[u8; 32]; 7] {
    let mut words = [[0u8; 32]; 7];
    for (word, field) in words.iter_mut().zip(fields.iter()) {
        *word = field.to_be_bytes();
    }
    words
}

// =============================================================================
// Events
// =============================================================================

/// `PrivateMint(minter, auditorPCT)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMintEvent {
    pub minter: String,
    pub auditor_pct: [Fr; 7],
}

/// `PrivateTransfer(from, to, auditorPCT)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateTransferEvent {
    pub from: String,
    pub to: String,
    pub auditor_pct: [Fr; 7],
}

/// `PrivateBurn(burner, auditorPCT)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateBurnEvent {
    pub burner: String,
    pub auditor_pct: [Fr; 7],
}

/// Metadata payload of a `PrivateMessage` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub message_from: String,
    pub message_to: String,
    pub message_type: String,
    pub encrypted_msg: Vec<u8>,
}

/// `PrivateMessage(metadata)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessageEvent {
    pub metadata: MessageMetadata,
}

/// Auditor-side decryption of an event's `auditorPCT`: the transaction
/// amount under the auditor's viewing key.
pub fn decrypt_auditor_amount(auditor_pct: &[Fr; 7], auditor_sk: &Fr) -> EercResult<Fr> {
    let amount = decrypt_pct_amount(auditor_pct, auditor_sk)?;
    debug!("decrypted auditor amount from event");
    Ok(amount)
}

/// Decode the encrypted message carried by a `PrivateMessage` event.
pub fn decode_private_message(metadata: &MessageMetadata, sk: &Fr) -> EercResult<String> {
    let envelope = EncryptedMessage::from_bytes(&metadata.encrypted_msg)?;
    decrypt_metadata(&envelope, sk)
}

// =============================================================================
// Tests
// =============================================================================
