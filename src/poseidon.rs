// Poseidon Permutation over the BN254 Scalar Field
//
// The protocol's only hash. Fixed-arity instances cover the registration
// hash (3 inputs) and the mint nullifier (5 inputs); a rate-2 sponge over
// the width-3 permutation drives the Poseidon-ECDH cipher. Outputs must
// match the circuit's Poseidon gadget bit-for-bit or proofs stop verifying.
//
// Parameters (round constants and MDS matrix) are not embedded as literals:
// they are derived once per width by the same Grain LFSR procedure that
// produced the circuit constants, and pinned against the published vectors
// in the tests below.
//
// - Round numbers: RF = 8 full rounds for every width; RP = 57 / 56 / 60
//   partial rounds for widths 3 / 4 / 6.
// - Round constants: 254-bit draws, rejection-sampled below p.
// - MDS: Cauchy matrix M[i][j] = 1/(x_i + y_j) over the next 2t draws,
//   reduced mod p without rejection.

use lazy_static::lazy_static;

use crate::field::Fr;

/// Full rounds, all widths.
const FULL_ROUNDS: usize = 8;

lazy_static! {
    static ref PARAMS_W3: PoseidonParams = PoseidonParams::generate(3);
    static ref PARAMS_W4: PoseidonParams = PoseidonParams::generate(4);
    static ref PARAMS_W6: PoseidonParams = PoseidonParams::generate(6);
}

// =============================================================================
// Grain LFSR Parameter Derivation
// =============================================================================

/// 80-bit Grain LFSR seeded from the instance description, as specified for
/// Poseidon parameter generation (field tag 1, S-box tag 0, n = 254).
struct GrainLfsr {
    bits: [u8; 80],
}

impl GrainLfsr {
    fn new(t: u32, rf: u32, rp: u32) -> Self {
        let mut bits = [0u8; 80];
        let mut pos = 0usize;
        let mut push = |value: u32, width: usize| {
            for i in (0..width).rev() {
                bits[pos] = ((value >> i) & 1) as u8;
                pos += 1;
            }
        };
        push(1, 2); // prime field
        push(0, 4); // x^alpha S-box
        push(254, 12); // field size in bits
        push(t, 12);
        push(rf, 10);
        push(rp, 10);
        push(0x3fff_ffff, 30); // trailing ones
        let mut lfsr = GrainLfsr { bits };
        for _ in 0..160 {
            lfsr.next_raw();
        }
        lfsr
    }

    fn next_raw(&mut self) -> u8 {
        let b = &self.bits;
        let new = b[62] ^ b[51] ^ b[38] ^ b[23] ^ b[13] ^ b[0];
        self.bits.copy_within(1..80, 0);
        self.bits[79] = new;
        new
    }

    /// Self-shrinking filter: evaluate raw bits pairwise, emit the second
    /// bit of a pair only when the first is set.
    fn next_bit(&mut self) -> u8 {
        loop {
            let first = self.next_raw();
            let second = self.next_raw();
            if first == 1 {
                return second;
            }
        }
    }

    fn next_bytes(&mut self) -> [u8; 32] {
        // 254 bits assembled MSB-first into a 32-byte big-endian buffer.
        let mut bytes = [0u8; 32];
        for i in 0..254 {
            let bit = self.next_bit();
            let pos = i + 2;
            bytes[pos / 8] |= bit << (7 - (pos % 8));
        }
        bytes
    }

    /// Field element by rejection sampling (round constants).
    fn next_field(&mut self) -> Fr {
        loop {
            if let Some(fe) = Fr::from_be_bytes(&self.next_bytes()) {
                return fe;
            }
        }
    }

    /// Field element by plain reduction (MDS construction).
    fn next_field_reduced(&mut self) -> Fr {
        Fr::from_be_bytes_reduced(&self.next_bytes())
    }
}

// =============================================================================
// Parameters and Permutation
// =============================================================================

struct PoseidonParams {
    t: usize,
    partial_rounds: usize,
    round_constants: Vec<Fr>,
    mds: Vec<Vec<Fr>>,
}

impl PoseidonParams {
    fn generate(t: usize) -> Self {
        let partial_rounds = match t {
            3 => 57,
            4 => 56,
            6 => 60,
            _ => unreachable!("unsupported poseidon width"),
        };
        let mut grain = GrainLfsr::new(t as u32, FULL_ROUNDS as u32, partial_rounds as u32);

        let round_constants = (0..t * (FULL_ROUNDS + partial_rounds))
            .map(|_| grain.next_field())
            .collect();

        let xs: Vec<Fr> = (0..t).map(|_| grain.next_field_reduced()).collect();
        let ys: Vec<Fr> = (0..t).map(|_| grain.next_field_reduced()).collect();
        let mds = (0..t)
            .map(|i| {
                (0..t)
                    .map(|j| {
                        xs[i].add_mod(&ys[j])
                            .inv_mod()
                            .expect("Cauchy denominators are non-zero for the protocol parameters")
                    })
                    .collect()
            })
            .collect();

        PoseidonParams {
            t,
            partial_rounds,
            round_constants,
            mds,
        }
    }

    fn permute(&self, state: &mut [Fr]) {
        debug_assert_eq!(state.len(), self.t);
        let rounds = FULL_ROUNDS + self.partial_rounds;
        let half_full = FULL_ROUNDS / 2;

        for r in 0..rounds {
            for i in 0..self.t {
                state[i] = state[i].add_mod(&self.round_constants[r * self.t + i]);
            }

            if r < half_full || r >= half_full + self.partial_rounds {
                for item in state.iter_mut() {
                    *item = sbox(item);
                }
            } else {
                state[0] = sbox(&state[0]);
            }

            let old: Vec<Fr> = state.to_vec();
            for i in 0..self.t {
                let mut acc = Fr::ZERO;
                for j in 0..self.t {
                    acc = acc.add_mod(&self.mds[i][j].mul_mod(&old[j]));
                }
                state[i] = acc;
            }
        }
    }
}

/// S-box x^5.
fn sbox(x: &Fr) -> Fr {
    let x2 = x.mul_mod(x);
    let x4 = x2.mul_mod(&x2);
    x4.mul_mod(x)
}

fn hash_fixed(params: &PoseidonParams, inputs: &[Fr]) -> Fr {
    let mut state = vec![Fr::ZERO; params.t];
    state[1..].copy_from_slice(inputs);
    params.permute(&mut state);
    state[0]
}

// =============================================================================
// Fixed-Arity Hashes
// =============================================================================

/// Poseidon hash of two field elements.
pub fn poseidon2(a: &Fr, b: &Fr) -> Fr {
    hash_fixed(&PARAMS_W3, &[*a, *b])
}

/// Poseidon hash of three field elements (registration hash).
pub fn poseidon3(a: &Fr, b: &Fr, c: &Fr) -> Fr {
    hash_fixed(&PARAMS_W4, &[*a, *b, *c])
}

/// Poseidon hash of five field elements (mint nullifier).
pub fn poseidon5(a: &Fr, b: &Fr, c: &Fr, d: &Fr, e: &Fr) -> Fr {
    hash_fixed(&PARAMS_W6, &[*a, *b, *c, *d, *e])
}

// =============================================================================
// Sponge (rate 2, capacity 1)
// =============================================================================

/// Duplex sponge over the width-3 permutation. Element 0 is the capacity;
/// elements 1 and 2 form the rate. The Poseidon-ECDH cipher absorbs the
/// shared-secret coordinates and the nonce, then squeezes its keystream.
pub struct PoseidonSponge {
    state: [Fr; 3],
    squeeze_offset: usize,
}

impl PoseidonSponge {
    pub fn new() -> Self {
        PoseidonSponge {
            state: [Fr::ZERO; 3],
            squeeze_offset: 0,
        }
    }

    /// Absorb field elements two at a time; a trailing odd element is
    /// absorbed into the first rate slot. Permutes after every block.
    pub fn absorb(&mut self, inputs: &[Fr]) {
        for block in inputs.chunks(2) {
            self.state[1] = self.state[1].add_mod(&block[0]);
            if block.len() > 1 {
                self.state[2] = self.state[2].add_mod(&block[1]);
            }
            PARAMS_W3.permute(&mut self.state);
        }
        self.squeeze_offset = 0;
    }

    /// Squeeze one field element.
    pub fn squeeze(&mut self) -> Fr {
        if self.squeeze_offset == 2 {
            PARAMS_W3.permute(&mut self.state);
            self.squeeze_offset = 0;
        }
        let out = self.state[1 + self.squeeze_offset];
        self.squeeze_offset += 1;
        out
    }

    /// Squeeze `n` field elements.
    pub fn squeeze_many(&mut self, n: usize) -> Vec<Fr> {
        (0..n).map(|_| self.squeeze()).collect()
    }
}

impl Default for PoseidonSponge {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
