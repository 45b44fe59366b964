// PCT - Poseidon Ciphertext
//
// Authenticated ECDH encryption of field-element vectors under a recipient
// public key. Every operation attaches PCTs beside its homomorphic EGCTs:
// the EGCT commits to an amount as a curve point, the PCT carries the
// plaintext field elements the holder (or the auditor) can actually read.
//
// Scheme: sample s in [1, l), derive the shared point K = s*pk and the
// transmitted auth key s*Base8, seed the rate-2 Poseidon sponge with
// [K.x, K.y, nonce] and add the squeezed keystream to the message. The
// sponge schedule must match the circuit's Poseidon gadget bit-for-bit.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::curve::{mul_with_scalar, AffinePoint};
use crate::error::{EercError, EercResult};
use crate::field::Fr;
use crate::poseidon::PoseidonSponge;

/// Ciphertext block size; messages are zero-padded up to a multiple of it.
pub const PCT_BLOCK: usize = 4;

/// A Poseidon ciphertext. `cipher` always holds a multiple of four
/// elements; amount PCTs use exactly one block and travel on-wire in the
/// 7-field form `cipher[0..4] || auth_key.x || auth_key.y || nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseidonCiphertext {
    pub cipher: Vec<Fr>,
    pub auth_key: AffinePoint,
    pub nonce: Fr,
}

impl PoseidonCiphertext {
    /// The 7-field wire form used by the contract for amount PCTs.
    pub fn to_fields(&self) -> EercResult<[Fr; 7]> {
        if self.cipher.len() != PCT_BLOCK {
            return Err(EercError::ArithmeticError(
                "wire form is defined for single-block ciphertexts",
            ));
        }
        Ok([
            self.cipher[0],
            self.cipher[1],
            self.cipher[2],
            self.cipher[3],
            self.auth_key.x,
            self.auth_key.y,
            self.nonce,
        ])
    }

    /// Rebuild from the 7-field wire form. The auth key must be on-curve.
    pub fn from_fields(fields: &[Fr; 7]) -> EercResult<Self> {
        let auth_key = AffinePoint::new(fields[4], fields[5]);
        if !auth_key.is_on_curve() {
            return Err(EercError::InvalidPoint("auth key is not on the curve"));
        }
        Ok(PoseidonCiphertext {
            cipher: fields[0..4].to_vec(),
            auth_key,
            nonce: fields[6],
        })
    }

    /// All-zero test: the contract stores zeroed PCT slots before first use.
    pub fn is_zero_fields(fields: &[Fr; 7]) -> bool {
        fields.iter().all(|f| f.is_zero())
    }
}

/// Encrypt a field-element vector under `pk`. Returns the ciphertext and
/// the encryption randomness `s`, which the circuits consume as a private
/// witness input.
pub fn pct_encrypt<R: RngCore + CryptoRng>(
    message: &[Fr],
    pk: &AffinePoint,
    rng: &mut R,
) -> EercResult<(PoseidonCiphertext, Fr)> {
    if message.is_empty() {
        return Err(EercError::ArithmeticError("empty plaintext vector"));
    }
    if !pk.is_on_curve() {
        return Err(EercError::InvalidPoint("public key is not on the curve"));
    }

    let s = Fr::random_scalar(rng);
    let shared = pk.mul_scalar(&s)?;
    let auth_key = mul_with_scalar(&s)?;
    let nonce = Fr::random(rng);

    let padded_len = message.len().div_ceil(PCT_BLOCK) * PCT_BLOCK;
    let keystream = derive_keystream(&shared, &nonce, padded_len);

    let mut cipher = Vec::with_capacity(padded_len);
    for i in 0..padded_len {
        let m = if i < message.len() { message[i] } else { Fr::ZERO };
        cipher.push(m.add_mod(&keystream[i]));
    }

    Ok((
        PoseidonCiphertext {
            cipher,
            auth_key,
            nonce,
        },
        s,
    ))
}

/// Decrypt the first `len` elements of a ciphertext under `sk`. The length
/// travels out-of-band (amount PCTs are always length 1; message metadata
/// carries an explicit length word).
pub fn pct_decrypt(ct: &PoseidonCiphertext, sk: &Fr, len: usize) -> EercResult<Vec<Fr>> {
    if len == 0 || len > ct.cipher.len() {
        return Err(EercError::ArithmeticError(
            "plaintext length outside ciphertext bounds",
        ));
    }
    if !ct.auth_key.is_on_curve() {
        return Err(EercError::InvalidPoint("auth key is not on the curve"));
    }

    let shared = ct.auth_key.mul_scalar(sk)?;
    let keystream = derive_keystream(&shared, &ct.nonce, ct.cipher.len());

    Ok((0..len)
        .map(|i| ct.cipher[i].sub_mod(&keystream[i]))
        .collect())
}

fn derive_keystream(shared: &AffinePoint, nonce: &Fr, n: usize) -> Vec<Fr> {
    let mut sponge = PoseidonSponge::new();
    sponge.absorb(&[shared.x, shared.y, *nonce]);
    sponge.squeeze_many(n)
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
        StdRng::seed_from_u64(1234)
    }

    #[test]
    fn test_roundtrip_all_lengths() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();

        for len in 1..=4 {
            let message: Vec<Fr> = (0..len).map(|_| Fr::random(&mut rng)).collect();
            let (ct, s) = pct_encrypt(&message, &keypair.public, &mut rng).unwrap();

            assert_eq!(ct.cipher.len(), PCT_BLOCK);
            assert!(!s.is_zero());

            let decrypted = pct_decrypt(&ct, &keypair.secret, len).unwrap();
            assert_eq!(decrypted, message);
        }
    }

    #[test]
    fn test_roundtrip_multi_block() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();

        let message: Vec<Fr> = (0..7).map(|_| Fr::random(&mut rng)).collect();
        let (ct, _) = pct_encrypt(&message, &keypair.public, &mut rng).unwrap();
        assert_eq!(ct.cipher.len(), 8);

        let decrypted = pct_decrypt(&ct, &keypair.secret, 7).unwrap();
        assert_eq!(decrypted, message);
    }

    #[test]
    fn test_padding_is_zero() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();

        let message = vec![Fr::from_u64(42)];
        let (ct, _) = pct_encrypt(&message, &keypair.public, &mut rng).unwrap();

        let full = pct_decrypt(&ct, &keypair.secret, PCT_BLOCK).unwrap();
        assert_eq!(full[0], Fr::from_u64(42));
        assert_eq!(&full[1..], &[Fr::ZERO; 3]);
    }

    #[test]
    fn test_wrong_key_garbles() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();
        let other = KeyPair::random(&mut rng).unwrap();

        let message = vec![Fr::from_u64(100)];
        let (ct, _) = pct_encrypt(&message, &keypair.public, &mut rng).unwrap();

        let decrypted = pct_decrypt(&ct, &other.secret, 1).unwrap();
        assert_ne!(decrypted, message);
    }

    #[test]
    fn test_fresh_randomness_per_encryption() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();
        let message = vec![Fr::from_u64(5)];

        let (ct1, s1) = pct_encrypt(&message, &keypair.public, &mut rng).unwrap();
        let (ct2, s2) = pct_encrypt(&message, &keypair.public, &mut rng).unwrap();

        assert_ne!(s1, s2);
        assert_ne!(ct1.nonce, ct2.nonce);
        assert_ne!(ct1.cipher, ct2.cipher);
    }

    #[test]
    fn test_wire_form_roundtrip() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();

        let (ct, _) = pct_encrypt(&[Fr::from_u64(9)], &keypair.public, &mut rng).unwrap();
        let fields = ct.to_fields().unwrap();
        let restored = PoseidonCiphertext::from_fields(&fields).unwrap();
        assert_eq!(ct, restored);
    }

    #[test]
    fn test_wire_form_rejects_multi_block() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();
        let message: Vec<Fr> = (0..5).map(Fr::from_u64).collect();
        let (ct, _) = pct_encrypt(&message, &keypair.public, &mut rng).unwrap();
        assert!(ct.to_fields().is_err());
    }

    #[test]
    fn test_invalid_length_rejected() {
        let mut rng = rng();
        let keypair = KeyPair::random(&mut rng).unwrap();
        let (ct, _) = pct_encrypt(&[Fr::ONE], &keypair.public, &mut rng).unwrap();

        assert!(pct_decrypt(&ct, &keypair.secret, 0).is_err());
        assert!(pct_decrypt(&ct, &keypair.secret, 5).is_err());
    }
}
