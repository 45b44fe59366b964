// Baby Jubjub Curve Operations for the eERC Protocol
//
// Implements the twisted Edwards curve embedded in the BN254 scalar field:
// a*x^2 + y^2 = 1 + d*x^2*y^2 with a = 168700, d = 168696. This module is
// kept compatible with the circuit gadgets: the published Base8 generator of
// the prime-order subgroup, identity at (0, 1), and scalars reduced mod the
// subgroup order l before multiplication.
//
// # Architecture
//
// - Public API is affine; every entry point rejects off-curve inputs with
//   `InvalidPoint`.
// - Scalar multiplication runs on projective (X:Y:Z) coordinates so the
//   ladder never pays a field inversion per step, with one normalization on
//   exit. a is a square and d a non-square mod p, so the addition law is
//   complete and needs no special cases.
// - ElGamal over the curve (EGCT): C1 = r*Base8, C2 = v*Base8 + r*pk.
//   Decryption recovers the point v*Base8, not v; the protocol carries the
//   plaintext in a companion Poseidon ciphertext instead of solving a DLP.

use lazy_static::lazy_static;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{EercError, EercResult};
use crate::field::{Fr, SUBGROUP_ORDER};

// =============================================================================
// Curve Parameters
// =============================================================================

/// Edwards coefficient a.
pub const EDWARDS_A: Fr = Fr::from_raw([168700, 0, 0, 0]);

/// Edwards coefficient d.
pub const EDWARDS_D: Fr = Fr::from_raw([168696, 0, 0, 0]);

/// Generator of the prime-order subgroup.
/// x = 5299619240641551281634865583518297030282874472190772894086521144482721001553
/// y = 16950150798460657717958625567821834550301663161624707787222815936182638968203
pub const BASE8: AffinePoint = AffinePoint {
    x: Fr::from_raw([
        0x2893f3f6bb957051,
        0x2ab8d8010534e0b6,
        0x4eacb2e09d6277c1,
        0x0bb77a6ad63e739b,
    ]),
    y: Fr::from_raw([
        0x4b3c257a872d7d8b,
        0xfce0051fb9e13377,
        0x25572e1cd16bf9ed,
        0x25797203f7a0b249,
    ]),
};

/// Bit length of the subgroup order; scalar ladders run a fixed number of
/// iterations regardless of the scalar value.
const SCALAR_BITS: usize = 251;

lazy_static! {
    /// Precomputed doublings of Base8: table[i] = 2^i * Base8. Fixed-base
    /// multiplications (public keys, amount encodings, EGCT randomness)
    /// walk this table instead of re-doubling.
    static ref BASE8_DOUBLINGS: Vec<ProjectivePoint> = {
        let mut table = Vec::with_capacity(SCALAR_BITS);
        let mut current = ProjectivePoint::from_affine(&BASE8);
        for _ in 0..SCALAR_BITS {
            table.push(current);
            current = current.double();
        }
        table
    };
}

// =============================================================================
// Affine Points
// =============================================================================

/// A point on Baby Jubjub in affine coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffinePoint {
    pub x: Fr,
    pub y: Fr,
}

impl AffinePoint {
    /// Identity element (0, 1).
    pub const IDENTITY: Self = AffinePoint {
        x: Fr::ZERO,
        y: Fr::ONE,
    };

    pub fn new(x: Fr, y: Fr) -> Self {
        AffinePoint { x, y }
    }

    /// Check if this is the identity point.
    pub fn is_identity(&self) -> bool {
        self.x.is_zero() && self.y == Fr::ONE
    }

    /// Check the curve equation: a*x^2 + y^2 == 1 + d*x^2*y^2.
    pub fn is_on_curve(&self) -> bool {
        let x2 = self.x.mul_mod(&self.x);
        let y2 = self.y.mul_mod(&self.y);
        let lhs = EDWARDS_A.mul_mod(&x2).add_mod(&y2);
        let rhs = Fr::ONE.add_mod(&EDWARDS_D.mul_mod(&x2).mul_mod(&y2));
        lhs == rhs
    }

    /// Check prime-subgroup membership: l * P == identity. Off-curve points
    /// are never members.
    pub fn in_prime_subgroup(&self) -> bool {
        if !self.is_on_curve() {
            return false;
        }
        let result = mul_bits(&ProjectivePoint::from_affine(self), &SUBGROUP_ORDER);
        result.is_identity()
    }

    /// Point addition via the complete twisted Edwards law.
    pub fn add(&self, other: &Self) -> EercResult<Self> {
        self.check_on_curve()?;
        other.check_on_curve()?;
        ProjectivePoint::from_affine(self)
            .add(&ProjectivePoint::from_affine(other))
            .to_affine()
    }

    /// Point doubling.
    pub fn double(&self) -> EercResult<Self> {
        self.check_on_curve()?;
        ProjectivePoint::from_affine(self).double().to_affine()
    }

    /// Point negation: (-x, y).
    pub fn neg(&self) -> Self {
        AffinePoint {
            x: self.x.neg_mod(),
            y: self.y,
        }
    }

    /// Point subtraction: self + (-other).
    pub fn sub(&self, other: &Self) -> EercResult<Self> {
        self.add(&other.neg())
    }

    /// Scalar multiplication with the scalar pre-reduced mod l. The ladder
    /// runs a fixed number of iterations.
    pub fn mul_scalar(&self, k: &Fr) -> EercResult<Self> {
        self.check_on_curve()?;
        let reduced = k.reduce_mod_order();
        mul_bits(&ProjectivePoint::from_affine(self), &reduced.limbs).to_affine()
    }

    /// Serialize to 64 bytes: x || y, big-endian.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[0..32].copy_from_slice(&self.x.to_be_bytes());
        bytes[32..64].copy_from_slice(&self.y.to_be_bytes());
        bytes
    }

    /// Deserialize from 64 bytes; the point must be on the curve.
    pub fn from_bytes(bytes: &[u8; 64]) -> EercResult<Self> {
        let x = Fr::from_be_bytes(bytes[0..32].try_into().expect("fixed slice"))
            .ok_or(EercError::InvalidPoint("x coordinate not a field element"))?;
        let y = Fr::from_be_bytes(bytes[32..64].try_into().expect("fixed slice"))
            .ok_or(EercError::InvalidPoint("y coordinate not a field element"))?;
        let point = AffinePoint { x, y };
        point.check_on_curve()?;
        Ok(point)
    }

    /// Compress to 32 bytes: y little-endian with the top bit carrying the
    /// sign of x (set when x > (p-1)/2).
    pub fn compress(&self) -> [u8; 32] {
        let mut bytes = self.y.to_be_bytes();
        bytes.reverse();
        if x_is_negative(&self.x) {
            bytes[31] |= 0x80;
        }
        bytes
    }

    /// Decompress from the 32-byte form; recovers x via a square root.
    pub fn decompress(bytes: &[u8; 32]) -> EercResult<Self> {
        let mut y_bytes = *bytes;
        let sign = y_bytes[31] & 0x80 != 0;
        y_bytes[31] &= 0x7f;
        y_bytes.reverse();
        let y = Fr::from_be_bytes(&y_bytes)
            .ok_or(EercError::InvalidPoint("y coordinate not a field element"))?;

        // x^2 = (1 - y^2) / (a - d*y^2)
        let y2 = y.mul_mod(&y);
        let numerator = Fr::ONE.sub_mod(&y2);
        let denominator = EDWARDS_A.sub_mod(&EDWARDS_D.mul_mod(&y2));
        let x2 = numerator.mul_mod(
            &denominator
                .inv_mod()
                .map_err(|_| EercError::InvalidPoint("degenerate y coordinate"))?,
        );
        let mut x = x2
            .sqrt_mod()
            .map_err(|_| EercError::InvalidPoint("no curve point for y"))?;
        if x_is_negative(&x) != sign {
            x = x.neg_mod();
        }
        let point = AffinePoint { x, y };
        point.check_on_curve()?;
        Ok(point)
    }

    fn check_on_curve(&self) -> EercResult<()> {
        if self.is_on_curve() {
            Ok(())
        } else {
            Err(EercError::InvalidPoint("point is not on the curve"))
        }
    }
}

impl Default for AffinePoint {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn x_is_negative(x: &Fr) -> bool {
    // Negative means above (p-1)/2.
    const HALF: Fr = Fr::from_raw([
        0xa1f0fac9f8000000,
        0x9419f4243cdcb848,
        0xdc2822db40c0ac2e,
        0x183227397098d014,
    ]);
    *x > HALF
}

// =============================================================================
// Projective Arithmetic (internal)
// =============================================================================

/// Homogeneous projective coordinates (X : Y : Z), affine = (X/Z, Y/Z).
#[derive(Debug, Clone, Copy)]
struct ProjectivePoint {
    x: Fr,
    y: Fr,
    z: Fr,
}

impl ProjectivePoint {
    const IDENTITY: Self = ProjectivePoint {
        x: Fr::ZERO,
        y: Fr::ONE,
        z: Fr::ONE,
    };

    fn from_affine(p: &AffinePoint) -> Self {
        ProjectivePoint {
            x: p.x,
            y: p.y,
            z: Fr::ONE,
        }
    }

    fn to_affine(self) -> EercResult<AffinePoint> {
        let z_inv = self
            .z
            .inv_mod()
            .map_err(|_| EercError::InvalidPoint("degenerate projective point"))?;
        Ok(AffinePoint {
            x: self.x.mul_mod(&z_inv),
            y: self.y.mul_mod(&z_inv),
        })
    }

    fn is_identity(&self) -> bool {
        self.x.is_zero() && self.y == self.z
    }

    /// Complete projective addition (add-2008-bbjlp).
    fn add(&self, other: &Self) -> Self {
        let a = self.z.mul_mod(&other.z);
        let b = a.mul_mod(&a);
        let c = self.x.mul_mod(&other.x);
        let d = self.y.mul_mod(&other.y);
        let e = EDWARDS_D.mul_mod(&c).mul_mod(&d);
        let f = b.sub_mod(&e);
        let g = b.add_mod(&e);

        let x1py1 = self.x.add_mod(&self.y);
        let x2py2 = other.x.add_mod(&other.y);
        let x3 = a
            .mul_mod(&f)
            .mul_mod(&x1py1.mul_mod(&x2py2).sub_mod(&c).sub_mod(&d));
        let y3 = a.mul_mod(&g).mul_mod(&d.sub_mod(&EDWARDS_A.mul_mod(&c)));
        let z3 = f.mul_mod(&g);

        ProjectivePoint { x: x3, y: y3, z: z3 }
    }

    /// Projective doubling (dbl-2008-bbjlp).
    fn double(&self) -> Self {
        let xpy = self.x.add_mod(&self.y);
        let b = xpy.mul_mod(&xpy);
        let c = self.x.mul_mod(&self.x);
        let d = self.y.mul_mod(&self.y);
        let e = EDWARDS_A.mul_mod(&c);
        let f = e.add_mod(&d);
        let h = self.z.mul_mod(&self.z);
        let j = f.sub_mod(&h.add_mod(&h));

        ProjectivePoint {
            x: b.sub_mod(&c).sub_mod(&d).mul_mod(&j),
            y: f.mul_mod(&e.sub_mod(&d)),
            z: f.mul_mod(&j),
        }
    }
}

/// Double-and-add over a fixed SCALAR_BITS window of the limbs.
fn mul_bits(base: &ProjectivePoint, limbs: &[u64; 4]) -> ProjectivePoint {
    let mut acc = ProjectivePoint::IDENTITY;
    let mut current = *base;
    for i in 0..SCALAR_BITS {
        if (limbs[i / 64] >> (i % 64)) & 1 == 1 {
            acc = acc.add(&current);
        }
        current = current.double();
    }
    acc
}

/// Fixed-base multiplication against the Base8 doubling table.
fn mul_base8_reduced(k: &Fr) -> ProjectivePoint {
    let mut acc = ProjectivePoint::IDENTITY;
    for i in 0..SCALAR_BITS {
        if (k.limbs[i / 64] >> (i % 64)) & 1 == 1 {
            acc = acc.add(&BASE8_DOUBLINGS[i]);
        }
    }
    acc
}

// =============================================================================
// Key Material
// =============================================================================

/// Derive a public key: (sk mod l) * Base8.
pub fn generate_public_key(sk: &Fr) -> EercResult<AffinePoint> {
    let reduced = sk.reduce_mod_order();
    if reduced.is_zero() {
        return Err(EercError::WeakKey);
    }
    mul_base8_reduced(&reduced).to_affine()
}

/// Canonical encoding of an amount as a curve point: v * Base8.
pub fn mul_with_scalar(v: &Fr) -> EercResult<AffinePoint> {
    mul_base8_reduced(&v.reduce_mod_order()).to_affine()
}

/// An ElGamal keypair over Baby Jubjub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPair {
    pub secret: Fr,
    pub public: AffinePoint,
}

impl KeyPair {
    /// Build a keypair from a secret scalar (reduced mod l).
    pub fn from_secret(secret: Fr) -> EercResult<Self> {
        let secret = secret.reduce_mod_order();
        let public = generate_public_key(&secret)?;
        Ok(KeyPair { secret, public })
    }

    /// Sample a fresh keypair from the given rng.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> EercResult<Self> {
        Self::from_secret(Fr::random_scalar(rng))
    }
}

// =============================================================================
// Secure Randomness Generation
// =============================================================================

/// Sample a non-zero scalar in [1, l) from OS entropy via getrandom
/// (/dev/urandom and platform equivalents). Production entry point; the
/// operation engine takes an injected rng instead so tests can replay
/// witnesses deterministically.
pub fn generate_randomness() -> EercResult<Fr> {
    loop {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes)
            .map_err(|_| EercError::ArithmeticError("entropy source failed"))?;
        // l is 251 bits; clear the top five so most draws land.
        bytes[0] &= 0x07;
        let candidate = Fr::from_be_bytes_reduced(&bytes);
        if !candidate.is_zero() && !candidate.gte(&Fr { limbs: SUBGROUP_ORDER }) {
            return Ok(candidate);
        }
    }
}

/// Generate a fresh keypair from OS entropy.
pub fn generate_keypair() -> EercResult<KeyPair> {
    KeyPair::from_secret(generate_randomness()?)
}

// =============================================================================
// EGCT - ElGamal Ciphertext
// =============================================================================

/// ElGamal ciphertext of an amount: (C1, C2) with C1 = r*Base8 and
/// C2 = v*Base8 + r*pk. Homomorphic under componentwise addition; the
/// contract aggregates running balances this way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElGamalCiphertext {
    pub c1: AffinePoint,
    pub c2: AffinePoint,
}

impl ElGamalCiphertext {
    /// Ciphertext with both components at the identity; the contract's
    /// initial balance state.
    pub fn zero() -> Self {
        ElGamalCiphertext {
            c1: AffinePoint::IDENTITY,
            c2: AffinePoint::IDENTITY,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.c1.is_identity() && self.c2.is_identity()
    }

    /// Homomorphic addition: Enc(a) + Enc(b) = Enc(a + b).
    pub fn add(&self, other: &Self) -> EercResult<Self> {
        Ok(ElGamalCiphertext {
            c1: self.c1.add(&other.c1)?,
            c2: self.c2.add(&other.c2)?,
        })
    }

    /// Homomorphic subtraction: Enc(a) - Enc(b) = Enc(a - b).
    pub fn sub(&self, other: &Self) -> EercResult<Self> {
        Ok(ElGamalCiphertext {
            c1: self.c1.sub(&other.c1)?,
            c2: self.c2.sub(&other.c2)?,
        })
    }

    /// Serialize to 128 bytes: c1.x || c1.y || c2.x || c2.y.
    pub fn to_bytes(&self) -> [u8; 128] {
        let mut bytes = [0u8; 128];
        bytes[0..64].copy_from_slice(&self.c1.to_bytes());
        bytes[64..128].copy_from_slice(&self.c2.to_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 128]) -> EercResult<Self> {
        Ok(ElGamalCiphertext {
            c1: AffinePoint::from_bytes(bytes[0..64].try_into().expect("fixed slice"))?,
            c2: AffinePoint::from_bytes(bytes[64..128].try_into().expect("fixed slice"))?,
        })
    }
}

/// Encrypt an amount under a public key. Returns the ciphertext together
/// with the encryption randomness, which the circuits take as a private
/// witness input.
pub fn encrypt_message<R: RngCore + CryptoRng>(
    pk: &AffinePoint,
    amount: u64,
    rng: &mut R,
) -> EercResult<(ElGamalCiphertext, Fr)> {
    if !pk.is_on_curve() {
        return Err(EercError::InvalidPoint("public key is not on the curve"));
    }
    let r = Fr::random_scalar(rng);

    let c1 = mul_base8_reduced(&r).to_affine()?;
    let m = mul_base8_reduced(&Fr::from_u64(amount)).to_affine()?;
    let shared = pk.mul_scalar(&r)?;
    let c2 = m.add(&shared)?;

    Ok((ElGamalCiphertext { c1, c2 }, r))
}

/// Decrypt an EGCT to the encoded message point: C2 - sk*C1 = v*Base8.
pub fn elgamal_decryption(sk: &Fr, ct: &ElGamalCiphertext) -> EercResult<AffinePoint> {
    let shared = ct.c1.mul_scalar(sk)?;
    ct.c2.sub(&shared)
}

// =============================================================================
// Tests
// =============================================================================
