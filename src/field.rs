// Scalar Field Arithmetic for the eERC Protocol
//
// Implements the BN254 scalar field F_p used by every other component:
// Baby Jubjub coordinates, Poseidon state, ciphertext elements and witness
// values are all elements of this field. The representation is kept
// compatible with the on-chain circuits: 4 x 64-bit little-endian limbs,
// canonical (fully reduced) at rest.
//
// # Architecture
//
// - Addition/subtraction/negation: limb arithmetic with carry/borrow.
// - Multiplication, exponentiation, inversion, square roots: routed through
//   num-bigint with cached moduli. Products of two 254-bit values need a
//   512-bit intermediate and a generic reduction; BigUint gives both without
//   a hand-written Montgomery ladder.
// - Secret scalars additionally use the Baby Jubjub prime-subgroup order l;
//   the same helpers take that modulus explicitly.

use lazy_static::lazy_static;
use num_bigint::BigUint;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::{Add, Mul, Neg, Sub};
use zeroize::Zeroize;

use crate::error::{EercError, EercResult};

// =============================================================================
// Field Constants
// =============================================================================

/// BN254 scalar field modulus p, little-endian limbs.
/// p = 21888242871839275222246405745257275088548364400416034343698204186575808495617
pub const FR_MODULUS: [u64; 4] = [
    0x43e1f593f0000001,
    0x2833e84879b97091,
    0xb85045b68181585d,
    0x30644e72e131a029,
];

/// Order l of the Baby Jubjub prime subgroup, little-endian limbs.
/// l = 2736030358979909402780800718157159386076813972158567259200215660948447373041
///
/// Every secret scalar is reduced mod l before scalar multiplication.
pub const SUBGROUP_ORDER: [u64; 4] = [
    0x677297dc392126f1,
    0xab3eedb83920ee0a,
    0x370a08b6d0302b0b,
    0x060c89ce5c263405,
];

lazy_static! {
    /// Cached BigUint form of p (avoids reparsing on every multiplication).
    static ref P_BIGUINT: BigUint = limbs_to_biguint(&FR_MODULUS);

    /// Cached BigUint form of l.
    static ref L_BIGUINT: BigUint = limbs_to_biguint(&SUBGROUP_ORDER);

    /// (p - 1) / 2^28, the odd part of p - 1 (Tonelli-Shanks).
    static ref TS_ODD: BigUint = (&*P_BIGUINT - 1u32) >> 28;

    /// 5^((p-1)/2^28) mod p: a generator of the 2-Sylow subgroup.
    /// 5 is a multiplicative generator of F_p*, hence a non-residue.
    static ref TS_Z: BigUint = BigUint::from(5u32).modpow(&TS_ODD, &P_BIGUINT);
}

/// 2-adicity of p - 1.
const TS_TWO_ADICITY: u32 = 28;

fn limbs_to_biguint(limbs: &[u64; 4]) -> BigUint {
    let mut bytes = [0u8; 32];
    for i in 0..4 {
        bytes[i * 8..(i + 1) * 8].copy_from_slice(&limbs[i].to_le_bytes());
    }
    BigUint::from_bytes_le(&bytes)
}

// =============================================================================
// Fr - BN254 Scalar Field Element
// =============================================================================

/// An element of the BN254 scalar field, always fully reduced.
/// Limbs are little-endian (limbs[0] is least significant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Zeroize)]
pub struct Fr {
    pub limbs: [u64; 4],
}

impl Fr {
    /// Zero element.
    pub const ZERO: Self = Fr { limbs: [0, 0, 0, 0] };

    /// One element.
    pub const ONE: Self = Fr { limbs: [1, 0, 0, 0] };

    /// Create from raw limbs (little-endian). The value must already be
    /// reduced; used for compile-time constants.
    pub const fn from_raw(limbs: [u64; 4]) -> Self {
        Fr { limbs }
    }

    /// Create from a u64 value.
    pub fn from_u64(val: u64) -> Self {
        Fr { limbs: [val, 0, 0, 0] }
    }

    /// Create from a u128 value.
    pub fn from_u128(val: u128) -> Self {
        Fr {
            limbs: [val as u64, (val >> 64) as u64, 0, 0],
        }
    }

    /// Create from canonical big-endian bytes. Fails if the value is not
    /// below p.
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Option<Self> {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let offset = (3 - i) * 8;
            limbs[i] = u64::from_be_bytes(bytes[offset..offset + 8].try_into().ok()?);
        }
        let fe = Fr { limbs };
        if fe.gte(&Fr { limbs: FR_MODULUS }) {
            None
        } else {
            Some(fe)
        }
    }

    /// Create from arbitrary-length big-endian bytes, reduced mod p.
    pub fn from_be_bytes_reduced(bytes: &[u8]) -> Self {
        let big = BigUint::from_bytes_be(bytes) % &*P_BIGUINT;
        Self::from_biguint(&big)
    }

    /// Convert to canonical big-endian bytes (32 bytes).
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for i in 0..4 {
            let offset = (3 - i) * 8;
            bytes[offset..offset + 8].copy_from_slice(&self.limbs[i].to_be_bytes());
        }
        bytes
    }

    pub(crate) fn to_biguint(&self) -> BigUint {
        limbs_to_biguint(&self.limbs)
    }

    pub(crate) fn from_biguint(big: &BigUint) -> Self {
        let bytes = big.to_bytes_le();
        let mut limbs = [0u64; 4];
        let mut buf = [0u8; 32];
        buf[..bytes.len()].copy_from_slice(&bytes);
        for i in 0..4 {
            limbs[i] = u64::from_le_bytes(buf[i * 8..(i + 1) * 8].try_into().expect("fixed slice"));
        }
        Fr { limbs }
    }

    /// Check if zero.
    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&x| x == 0)
    }

    /// Check if self >= other as integers.
    pub fn gte(&self, other: &Self) -> bool {
        !matches!(cmp_limbs(&self.limbs, &other.limbs), Ordering::Less)
    }

    /// Modular addition: (self + other) mod p.
    pub fn add_mod(&self, other: &Self) -> Self {
        let (sum, carry) = add_with_carry(&self.limbs, &other.limbs);
        if carry || cmp_limbs(&sum, &FR_MODULUS) != Ordering::Less {
            let (reduced, _) = sub_with_borrow(&sum, &FR_MODULUS);
            Fr { limbs: reduced }
        } else {
            Fr { limbs: sum }
        }
    }

    /// Modular subtraction: (self - other) mod p.
    pub fn sub_mod(&self, other: &Self) -> Self {
        let (diff, borrow) = sub_with_borrow(&self.limbs, &other.limbs);
        if borrow {
            let (wrapped, _) = add_with_carry(&diff, &FR_MODULUS);
            Fr { limbs: wrapped }
        } else {
            Fr { limbs: diff }
        }
    }

    /// Modular negation: -self mod p.
    pub fn neg_mod(&self) -> Self {
        if self.is_zero() {
            *self
        } else {
            Fr { limbs: FR_MODULUS }.sub_mod(self)
        }
    }

    /// Modular multiplication: (self * other) mod p.
    pub fn mul_mod(&self, other: &Self) -> Self {
        let product = self.to_biguint() * other.to_biguint() % &*P_BIGUINT;
        Self::from_biguint(&product)
    }

    /// Modular exponentiation: self^exp mod p.
    pub fn pow_mod(&self, exp: &Self) -> Self {
        let result = self.to_biguint().modpow(&exp.to_biguint(), &P_BIGUINT);
        Self::from_biguint(&result)
    }

    /// Modular inverse via Fermat: self^(p-2) mod p.
    /// Fails with `ArithmeticError` on zero.
    pub fn inv_mod(&self) -> EercResult<Self> {
        if self.is_zero() {
            return Err(EercError::ArithmeticError("inverse of zero"));
        }
        let exp = &*P_BIGUINT - 2u32;
        Ok(Self::from_biguint(&self.to_biguint().modpow(&exp, &P_BIGUINT)))
    }

    /// Square root via Tonelli-Shanks. Fails with `ArithmeticError` when
    /// self is a non-residue. Used on point decompression only.
    pub fn sqrt_mod(&self) -> EercResult<Self> {
        if self.is_zero() {
            return Ok(Self::ZERO);
        }
        let p = &*P_BIGUINT;
        let a = self.to_biguint();

        // Euler criterion first so non-residues fail cleanly.
        let half = (p - 1u32) >> 1;
        if a.modpow(&half, p) != BigUint::from(1u32) {
            return Err(EercError::ArithmeticError("sqrt of non-residue"));
        }

        let mut m = TS_TWO_ADICITY;
        let mut c = TS_Z.clone();
        let mut t = a.modpow(&TS_ODD, p);
        let exp = (&*TS_ODD + 1u32) >> 1;
        let mut r = a.modpow(&exp, p);
        let one = BigUint::from(1u32);

        while t != one {
            // Find least i with t^(2^i) = 1.
            let mut i = 0u32;
            let mut probe = t.clone();
            while probe != one {
                probe = &probe * &probe % p;
                i += 1;
            }
            let b = c.modpow(&(one.clone() << (m - i - 1)), p);
            m = i;
            c = &b * &b % p;
            t = t * &c % p;
            r = r * &b % p;
        }
        Ok(Self::from_biguint(&r))
    }

    /// Sample a uniform field element from the given rng by rejection.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            // p is 254 bits; clearing the top two bits makes most draws land.
            bytes[0] &= 0x3f;
            if let Some(fe) = Fr::from_be_bytes(&bytes) {
                return fe;
            }
        }
    }

    /// Sample a uniform non-zero scalar in [1, l) for use as encryption
    /// randomness or an ephemeral key.
    pub fn random_scalar<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            // l is 251 bits.
            bytes[0] &= 0x07;
            let candidate = BigUint::from_bytes_be(&bytes);
            if candidate != BigUint::from(0u32) && candidate < *L_BIGUINT {
                return Self::from_biguint(&candidate);
            }
        }
    }

    /// Reduce arbitrary-length big-endian bytes mod the subgroup order l.
    pub fn reduce_bytes_mod_order(bytes: &[u8]) -> Self {
        let reduced = BigUint::from_bytes_be(bytes) % &*L_BIGUINT;
        Self::from_biguint(&reduced)
    }

    /// Reduce a field element mod the subgroup order l.
    pub fn reduce_mod_order(&self) -> Self {
        let reduced = self.to_biguint() % &*L_BIGUINT;
        Self::from_biguint(&reduced)
    }

    /// Narrow to u64 when the value fits (protocol amounts always do).
    pub fn as_u64(&self) -> Option<u64> {
        if self.limbs[1] == 0 && self.limbs[2] == 0 && self.limbs[3] == 0 {
            Some(self.limbs[0])
        } else {
            None
        }
    }

    /// Convert to hex string (0x-prefixed, 32 bytes).
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    /// Parse from a 0x-prefixed or bare hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).ok()?;
        if bytes.len() > 32 {
            return None;
        }
        let mut padded = [0u8; 32];
        padded[32 - bytes.len()..].copy_from_slice(&bytes);
        Fr::from_be_bytes(&padded)
    }

    /// Decimal string form, the representation the prover's witness map and
    /// the contract tooling expect.
    pub fn to_decimal(&self) -> String {
        self.to_biguint().to_str_radix(10)
    }

    /// Parse from a decimal string, reduced mod p.
    pub fn from_decimal(s: &str) -> Option<Self> {
        let big = BigUint::parse_bytes(s.as_bytes(), 10)?;
        Some(Self::from_biguint(&(big % &*P_BIGUINT)))
    }
}

impl Default for Fr {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Ord for Fr {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_limbs(&self.limbs, &other.limbs)
    }
}

impl PartialOrd for Fr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Fr {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        self.add_mod(&other)
    }
}

impl Sub for Fr {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        self.sub_mod(&other)
    }
}

impl Mul for Fr {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        self.mul_mod(&other)
    }
}

impl Neg for Fr {
    type Output = Self;
    fn neg(self) -> Self {
        self.neg_mod()
    }
}

impl std::fmt::Display for Fr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

// =============================================================================
// Limb Helpers
// =============================================================================

fn cmp_limbs(a: &[u64; 4], b: &[u64; 4]) -> Ordering {
    for i in (0..4).rev() {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    Ordering::Equal
}

fn add_with_carry(a: &[u64; 4], b: &[u64; 4]) -> ([u64; 4], bool) {
    let mut result = [0u64; 4];
    let mut carry = 0u128;
    for i in 0..4 {
        let sum = a[i] as u128 + b[i] as u128 + carry;
        result[i] = sum as u64;
        carry = sum >> 64;
    }
    (result, carry != 0)
}

fn sub_with_borrow(a: &[u64; 4], b: &[u64; 4]) -> ([u64; 4], bool) {
    let mut result = [0u64; 4];
    let mut borrow = 0i128;
    for i in 0..4 {
        let diff = a[i] as i128 - b[i] as i128 - borrow;
        if diff < 0 {
            result[i] = (diff + (1i128 << 64)) as u64;
            borrow = 1;
        } else {
            result[i] = diff as u64;
            borrow = 0;
        }
    }
    (result, borrow != 0)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_basic_arithmetic() {
        let a = Fr::from_u64(100);
        let b = Fr::from_u64(200);

        assert_eq!(a.add_mod(&b), Fr::from_u64(300));
        assert_eq!(b.sub_mod(&a), Fr::from_u64(100));
        assert_eq!(a.mul_mod(&b), Fr::from_u64(20000));
    }

    #[test]
    fn test_modulus_wraps_to_zero() {
        let p = Fr { limbs: FR_MODULUS };
        let p_minus_one = p.sub_mod(&Fr::ONE);
        assert_eq!(p_minus_one.add_mod(&Fr::ONE), Fr::ZERO);
    }

    #[test]
    fn test_sub_underflow() {
        let a = Fr::from_u64(5);
        let b = Fr::from_u64(7);
        let diff = a.sub_mod(&b);
        assert_eq!(diff.add_mod(&b), a);
    }

    #[test]
    fn test_negation() {
        let a = Fr::from_u64(12345);
        assert_eq!(a.add_mod(&a.neg_mod()), Fr::ZERO);
        assert_eq!(Fr::ZERO.neg_mod(), Fr::ZERO);
    }

    #[test]
    fn test_inverse() {
        let a = Fr::from_u64(7);
        let a_inv = a.inv_mod().unwrap();
        assert_eq!(a.mul_mod(&a_inv), Fr::ONE);

        assert!(Fr::ZERO.inv_mod().is_err());
    }

    #[test]
    fn test_pow() {
        let a = Fr::from_u64(3);
        assert_eq!(a.pow_mod(&Fr::from_u64(4)), Fr::from_u64(81));
        assert_eq!(a.pow_mod(&Fr::ZERO), Fr::ONE);
    }

    #[test]
    fn test_sqrt_roundtrip() {
        let a = Fr::from_u64(123456789);
        let square = a.mul_mod(&a);
        let root = square.sqrt_mod().unwrap();
        // Either root or its negation.
        assert!(root == a || root == a.neg_mod());
    }

    #[test]
    fn test_sqrt_non_residue_fails() {
        // 5 generates F_p*, so it is a quadratic non-residue.
        assert!(Fr::from_u64(5).sqrt_mod().is_err());
    }

    #[test]
    fn test_byte_roundtrip() {
        let a = Fr::from_u64(0xdeadbeef);
        let bytes = a.to_be_bytes();
        assert_eq!(Fr::from_be_bytes(&bytes).unwrap(), a);

        // Values >= p are rejected.
        let mut p_bytes = [0u8; 32];
        for i in 0..4 {
            p_bytes[(3 - i) * 8..(4 - i) * 8].copy_from_slice(&FR_MODULUS[i].to_be_bytes());
        }
        assert!(Fr::from_be_bytes(&p_bytes).is_none());
    }

    #[test]
    fn test_hex_roundtrip() {
        let a = Fr::from_u64(0x12345678);
        let parsed = Fr::from_hex(&a.to_hex()).unwrap();
        assert_eq!(a, parsed);
    }

    #[test]
    fn test_decimal_roundtrip() {
        let a = Fr::from_u128(340282366920938463463374607431768211455);
        let parsed = Fr::from_decimal(&a.to_decimal()).unwrap();
        assert_eq!(a, parsed);
    }

    #[test]
    fn test_random_is_reduced_and_varied() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = Fr::random(&mut rng);
        let b = Fr::random(&mut rng);
        assert_ne!(a, b);
        assert!(!a.gte(&Fr { limbs: FR_MODULUS }));
    }

    #[test]
    fn test_random_scalar_below_order() {
        let mut rng = StdRng::seed_from_u64(9);
        let order = Fr { limbs: SUBGROUP_ORDER };
        for _ in 0..32 {
            let s = Fr::random_scalar(&mut rng);
            assert!(!s.is_zero());
            assert!(!s.gte(&order));
        }
    }

    #[test]
    fn test_reduce_bytes_mod_order() {
        // 2^512 - 1 reduced mod l, cross-checked against BigUint directly.
        let bytes = [0xffu8; 64];
        let reduced = Fr::reduce_bytes_mod_order(&bytes);
        let expected = BigUint::from_bytes_be(&bytes) % &*L_BIGUINT;
        assert_eq!(reduced.to_biguint(), expected);
    }
}
