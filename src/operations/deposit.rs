// Deposit payload assembly (converter deployments).
//
// Deposits carry no proof: the contract escrows the ERC-20 amount and
// credits an EGCT it computes itself, so the client only supplies a fresh
// amount PCT of the deposited value at the protocol's decimal width.
// Downscaling truncates; the remainder stays in the depositor's ERC-20
// balance and the flag lets the host warn about it.

use rand::{CryptoRng, RngCore};
use serde::Serialize;
use tracing::info;

use super::{DeploymentMode, OperationEngine};
use crate::curve::AffinePoint;
use crate::error::{EercError, EercResult};
use crate::field::Fr;
use crate::pct::pct_encrypt;

/// Decimal width of protocol-internal amounts.
pub const PROTOCOL_DECIMALS: u8 = 2;

/// Rescale an ERC-20 amount between decimal widths. Downscaling divides
/// and truncates; the second return value reports whether precision was
/// lost.
pub fn convert_token_decimals(amount: u128, from: u8, to: u8) -> (u128, bool) {
    match from.cmp(&to) {
        std::cmp::Ordering::Equal => (amount, false),
        std::cmp::Ordering::Less => {
            let factor = 10u128.pow((to - from) as u32);
            (amount.saturating_mul(factor), false)
        }
        std::cmp::Ordering::Greater => {
            let factor = 10u128.pow((from - to) as u32);
            (amount / factor, amount % factor != 0)
        }
    }
}

/// Deposit payloads. `scaled_amount` is the protocol-width value the
/// contract credits; `truncated` is set when downscaling dropped dust.
#[derive(Debug, Serialize)]
pub struct DepositOutput {
    pub scaled_amount: u64,
    pub truncated: bool,
    pub amount_pct: [Fr; 7],
}

impl<R: RngCore + CryptoRng> OperationEngine<R> {
    /// Assemble the deposit PCT for `amount` (in the ERC-20's own decimal
    /// width). Only valid in converter mode.
    pub fn deposit(
        &mut self,
        depositor_pk: &AffinePoint,
        amount: u128,
        token_decimals: u8,
    ) -> EercResult<DepositOutput> {
        self.require_mode(DeploymentMode::Converter)?;
        Self::require_registered(depositor_pk)?;
        if amount == 0 {
            return Err(EercError::InvalidAmount("amount must be positive".into()));
        }

        let (scaled, truncated) = convert_token_decimals(amount, token_decimals, PROTOCOL_DECIMALS);
        if scaled == 0 {
            return Err(EercError::InvalidAmount(
                "amount truncates to zero at protocol decimals".into(),
            ));
        }
        let scaled: u64 = scaled
            .try_into()
            .map_err(|_| EercError::InvalidAmount("amount exceeds protocol range".into()))?;

        let (pct, _) = pct_encrypt(&[Fr::from_u64(scaled)], depositor_pk, self.rng())?;

        info!(scaled, truncated, "assembled deposit payload");

        Ok(DepositOutput {
            scaled_amount: scaled,
            truncated,
            amount_pct: pct.to_fields()?,
        })
    }
}
