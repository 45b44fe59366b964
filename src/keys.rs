// Key Derivation for the eERC Protocol
//
// The protocol has no key files: a user's Baby Jubjub secret is derived
// deterministically from an ECDSA signature over a fixed registration
// message, lives only in process memory for the session, and is zeroized on
// drop. Any client that reproduces the message byte-for-byte derives the
// same key, which is what makes registration portable across wallets.

use async_trait::async_trait;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve::{generate_public_key, AffinePoint};
use crate::error::{EercError, EercResult};
use crate::field::Fr;

/// Prefix of the registration message. The full message is this literal
/// followed by the lowercased 0x address, with no separator.
pub const REGISTRATION_MESSAGE_PREFIX: &str = "eERC\nRegistering user with\n Address:";

// =============================================================================
// Addresses
// =============================================================================

/// Parse a 0x-prefixed 20-byte address. Rejects malformed input and the
/// zero address.
pub fn parse_address(address: &str) -> EercResult<[u8; 20]> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EercError::InvalidAddress(address.to_string()))?;
    if hex_part.len() != 40 {
        return Err(EercError::InvalidAddress(address.to_string()));
    }
    let bytes = hex::decode(hex_part).map_err(|_| EercError::InvalidAddress(address.to_string()))?;
    let array: [u8; 20] = bytes.try_into().expect("length checked above");
    if array.iter().all(|&b| b == 0) {
        return Err(EercError::InvalidAddress(address.to_string()));
    }
    Ok(array)
}

/// Address as a field element, the form the registration circuit takes.
pub fn address_to_field(address: &str) -> EercResult<Fr> {
    let bytes = parse_address(address)?;
    Ok(Fr::from_be_bytes_reduced(&bytes))
}

/// The exact message the wallet signs at registration. Bit-exact across
/// clients: prefix literal plus the lowercased 0x address.
pub fn registration_message(address: &str) -> EercResult<String> {
    parse_address(address)?;
    Ok(format!(
        "{}{}",
        REGISTRATION_MESSAGE_PREFIX,
        address.to_lowercase()
    ))
}

// =============================================================================
// Signature-Derived Keys
// =============================================================================

/// Derive the Baby Jubjub secret from a 65-byte ECDSA signature: interpret
/// r || s (the first 64 bytes) as a big-endian integer and reduce mod the
/// subgroup order. A zero result fails with `WeakKey`.
pub fn derive_key_from_signature(signature: &[u8; 65]) -> EercResult<Fr> {
    let secret = Fr::reduce_bytes_mod_order(&signature[0..64]);
    if secret.is_zero() {
        return Err(EercError::WeakKey);
    }
    Ok(secret)
}

/// A session's decryption key. The secret is reduced mod l at construction
/// and wiped when the session ends; it is never serialized.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    secret: Fr,
    #[zeroize(skip)]
    public: AffinePoint,
}

impl SessionKey {
    pub fn from_secret(secret: Fr) -> EercResult<Self> {
        let secret = secret.reduce_mod_order();
        if secret.is_zero() {
            return Err(EercError::WeakKey);
        }
        let public = generate_public_key(&secret)?;
        Ok(SessionKey { secret, public })
    }

    pub fn from_signature(signature: &[u8; 65]) -> EercResult<Self> {
        Self::from_secret(derive_key_from_signature(signature)?)
    }

    pub fn public(&self) -> &AffinePoint {
        &self.public
    }

    pub fn secret(&self) -> &Fr {
        &self.secret
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the secret, even in debug output.
        f.debug_struct("SessionKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// A wallet session. Read paths (balance reconstruction, message and
/// auditor decryption) need the decryption key; before derivation has run
/// the session is locked and those paths fail with `MissingKey` instead of
/// guessing. Ending the session drops the key, which zeroizes it.
#[derive(Debug, Default)]
pub struct Session {
    key: Option<SessionKey>,
}

impl Session {
    /// A session with no key yet.
    pub fn locked() -> Self {
        Session { key: None }
    }

    pub fn with_key(key: SessionKey) -> Self {
        Session { key: Some(key) }
    }

    pub fn set_key(&mut self, key: SessionKey) {
        self.key = Some(key);
    }

    pub fn is_key_set(&self) -> bool {
        self.key.is_some()
    }

    /// The session key, or `MissingKey` when derivation has not run.
    pub fn key(&self) -> EercResult<&SessionKey> {
        self.key.as_ref().ok_or(EercError::MissingKey)
    }

    /// End the session; the secret is zeroized on drop.
    pub fn end(&mut self) {
        self.key = None;
    }
}

// =============================================================================
// Wallet Seam
// =============================================================================

/// The wallet's signing capability. Key derivation suspends on this oracle;
/// everything after the signature arrives is synchronous.
#[async_trait]
pub trait SignatureOracle: Send + Sync {
    /// Sign a UTF-8 message, returning the 65-byte r || s || v signature.
    async fn sign_message(&self, message: &str) -> EercResult<[u8; 65]>;
}

/// Derive the session key for `address` by signing the registration
/// message. Deterministic: re-running against the same wallet yields the
/// same key.
pub async fn derive_session_key<O: SignatureOracle + ?Sized>(
    oracle: &O,
    address: &str,
) -> EercResult<SessionKey> {
    let message = registration_message(address)?;
    debug!(address, "requesting registration signature");
    let signature = oracle.sign_message(&message).await?;
    let key = SessionKey::from_signature(&signature)?;
    info!(
        address,
        public_key_x = %key.public().x.to_hex(),
        "derived session key"
    );
    Ok(key)
}

// =============================================================================
// Tests
// =============================================================================
