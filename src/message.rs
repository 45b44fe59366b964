// Encrypted Message Metadata Codec
//
// Transactions may carry a UTF-8 message readable only by its addressee
// (and the auditor, who gets a separate PCT). The codec packs the string
// into 250-bit field-element chunks, encrypts the chunk vector as a PCT,
// and lays the result out as 32-byte big-endian words:
//
//   length(32) || nonce(32) || auth_key.x(32) || auth_key.y(32) || cipher_0(32) ...
//
// where `length` is the chunk count before padding. Round-trip identity
// holds for UTF-8 strings; leading NUL bytes are absorbed by the integer
// encoding and trailing NULs are stripped on decode, which the protocol
// accepts (callers do not rely on NUL padding).

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::curve::AffinePoint;
use crate::error::{EercError, EercResult};
use crate::field::Fr;
use crate::pct::{pct_decrypt, pct_encrypt, PoseidonCiphertext};
use rand::{CryptoRng, RngCore};

/// Bits carried per chunk. 250 < 254 keeps every chunk a canonical field
/// element with headroom.
const CHUNK_BITS: usize = 250;

/// Split a UTF-8 string into 250-bit chunks, least-significant chunk
/// first. The empty string encodes as a single zero chunk.
pub fn str_to_chunks(message: &str) -> Vec<Fr> {
    let mut n = BigUint::from_bytes_be(message.as_bytes());
    let mask = (BigUint::from(1u32) << CHUNK_BITS) - 1u32;
    let zero = BigUint::from(0u32);

    let mut chunks = Vec::new();
    while n > zero {
        chunks.push(Fr::from_biguint(&(&n & &mask)));
        n >>= CHUNK_BITS;
    }
    if chunks.is_empty() {
        chunks.push(Fr::ZERO);
    }
    chunks
}

/// Recombine chunks (least-significant first) into the original string.
pub fn chunks_to_str(chunks: &[Fr]) -> EercResult<String> {
    let mut n = BigUint::from(0u32);
    for chunk in chunks.iter().rev() {
        n = (n << CHUNK_BITS) | chunk.to_biguint();
    }
    let bytes = n.to_bytes_be();
    if bytes == [0] {
        return Ok(String::new());
    }
    let text = String::from_utf8(bytes)
        .map_err(|_| EercError::ArithmeticError("decrypted message is not valid utf-8"))?;
    Ok(text.trim_end_matches('\u{0000}').to_string())
}

// =============================================================================
// Encrypted Envelope
// =============================================================================

/// A message encrypted to a recipient public key. `length` is the chunk
/// count before padding; the ciphertext itself is padded to whole blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    pub length: usize,
    pub ct: PoseidonCiphertext,
}

impl EncryptedMessage {
    /// On-wire byte layout: every word 32 bytes, big-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 * (4 + self.ct.cipher.len()));
        let mut length_word = [0u8; 32];
        length_word[24..32].copy_from_slice(&(self.length as u64).to_be_bytes());
        out.extend_from_slice(&length_word);
        out.extend_from_slice(&self.ct.nonce.to_be_bytes());
        out.extend_from_slice(&self.ct.auth_key.x.to_be_bytes());
        out.extend_from_slice(&self.ct.auth_key.y.to_be_bytes());
        for element in &self.ct.cipher {
            out.extend_from_slice(&element.to_be_bytes());
        }
        out
    }

    /// Parse the wire layout back. Validates word alignment, the chunk
    /// count against the ciphertext size, and the auth key.
    pub fn from_bytes(bytes: &[u8]) -> EercResult<Self> {
        if bytes.len() % 32 != 0 || bytes.len() < 32 * 5 {
            return Err(EercError::ArithmeticError("malformed message envelope"));
        }
        let words: Vec<[u8; 32]> = bytes
            .chunks(32)
            .map(|w| w.try_into().expect("32-byte chunks"))
            .collect();

        let length_big = BigUint::from_bytes_be(&words[0]);
        let length = u64::try_from(&length_big)
            .map_err(|_| EercError::ArithmeticError("message length overflow"))?
            as usize;

        let nonce = Fr::from_be_bytes(&words[1])
            .ok_or(EercError::ArithmeticError("nonce not a field element"))?;
        let x = Fr::from_be_bytes(&words[2])
            .ok_or(EercError::InvalidPoint("auth key x not a field element"))?;
        let y = Fr::from_be_bytes(&words[3])
            .ok_or(EercError::InvalidPoint("auth key y not a field element"))?;
        let auth_key = AffinePoint::new(x, y);
        if !auth_key.is_on_curve() {
            return Err(EercError::InvalidPoint("auth key is not on the curve"));
        }

        let cipher: Vec<Fr> = words[4..]
            .iter()
            .map(|w| {
                Fr::from_be_bytes(w)
                    .ok_or(EercError::ArithmeticError("cipher word not a field element"))
            })
            .collect::<EercResult<_>>()?;

        if cipher.len() % 4 != 0 || length == 0 || length > cipher.len() {
            return Err(EercError::ArithmeticError("malformed message envelope"));
        }

        Ok(EncryptedMessage {
            length,
            ct: PoseidonCiphertext {
                cipher,
                auth_key,
                nonce,
            },
        })
    }
}

/// Encrypt a UTF-8 message to `pk`.
pub fn encrypt_metadata<R: RngCore + CryptoRng>(
    message: &str,
    pk: &AffinePoint,
    rng: &mut R,
) -> EercResult<EncryptedMessage> {
    let chunks = str_to_chunks(message);
    let (ct, _) = pct_encrypt(&chunks, pk, rng)?;
    Ok(EncryptedMessage {
        length: chunks.len(),
        ct,
    })
}

/// Decrypt a message envelope with the session secret.
pub fn decrypt_metadata(envelope: &EncryptedMessage, sk: &Fr) -> EercResult<String> {
    let chunks = pct_decrypt(&envelope.ct, sk, envelope.length)?;
    chunks_to_str(&chunks)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::KeyPair;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(5150)
    }

    #[test]
    fn test_chunking_roundtrip() {
        for s in [
            "a",
            "hello world",
            "hello, auditor 🙂",
            "exactly thirty-one bytes here..",
            "a considerably longer message that needs more than a single 250-bit chunk to encode",
        ] {
            let chunks = str_to_chunks(s);
            assert_eq!(chunks_to_str(&chunks).unwrap(), s);
        }
    }

    #[test]
    fn test_empty_string_encodes_as_single_zero_chunk() {
        let chunks = str_to_chunks("");
        assert_eq!(chunks, vec![Fr::ZERO]);
        assert_eq!(chunks_to_str(&chunks).unwrap(), "");
    }

    #[test]
    fn test_short_string_is_one_chunk() {
        // 31 bytes = 248 bits, inside one chunk.
        let chunks = str_to_chunks("hello, auditor 🙂");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_trailing_nul_is_stripped() {
        let chunks = str_to_chunks("abc\u{0000}");
        assert_eq!(chunks_to_str(&chunks).unwrap(), "abc");
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();

        let message = "hello, auditor 🙂";
        let envelope = encrypt_metadata(message, &keypair.public, &mut rng).unwrap();
        assert_eq!(decrypt_metadata(&envelope, &keypair.secret).unwrap(), message);
    }

    #[test]
    fn test_metadata_roundtrip_empty() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();

        let envelope = encrypt_metadata("", &keypair.public, &mut rng).unwrap();
        assert_eq!(decrypt_metadata(&envelope, &keypair.secret).unwrap(), "");
    }

    #[test]
    fn test_metadata_roundtrip_multi_chunk() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();

        let message = "a considerably longer message that spans multiple 250-bit \
                       chunks and therefore more than one sponge block 🙂🙂🙂";
        let envelope = encrypt_metadata(message, &keypair.public, &mut rng).unwrap();
        assert!(envelope.length > 1);
        assert_eq!(decrypt_metadata(&envelope, &keypair.secret).unwrap(), message);
    }

    #[test]
    fn test_wire_layout_roundtrip() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();

        let envelope = encrypt_metadata("wire me", &keypair.public, &mut rng).unwrap();
        let bytes = envelope.to_bytes();

        // length + nonce + auth key (2 words) + one padded cipher block.
        assert_eq!(bytes.len(), 32 * (4 + 4));

        let restored = EncryptedMessage::from_bytes(&bytes).unwrap();
        assert_eq!(envelope, restored);
        assert_eq!(decrypt_metadata(&restored, &keypair.secret).unwrap(), "wire me");
    }

    #[test]
    fn test_malformed_envelopes_rejected() {
        assert!(EncryptedMessage::from_bytes(&[0u8; 31]).is_err());
        assert!(EncryptedMessage::from_bytes(&[0u8; 64]).is_err());
        // Aligned but zero length word with zero cipher: auth key (0,0) is
        // off-curve.
        assert!(EncryptedMessage::from_bytes(&[0u8; 32 * 8]).is_err());
    }
}
