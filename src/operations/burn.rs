// Private burn witness assembly (standalone deployments).
//
// A burn has the spending shape of a withdrawal plus a self-addressed EGCT
// of the amount, which the contract records as the "transfer to the burn
// user" artifact. The rolling balance PCT is always rewritten and
// submitted with the proof; there is no burn variant without it.

use rand::{CryptoRng, RngCore};
use serde::Serialize;
use tracing::info;

use super::{cipher_input, fr_input, point_input, DeploymentMode, OperationEngine, SenderBalance};
use crate::curve::{encrypt_message, AffinePoint, ElGamalCiphertext};
use crate::error::EercResult;
use crate::field::Fr;
use crate::keys::SessionKey;
use crate::pct::pct_encrypt;

/// Private inputs of the burn circuit; names fixed by the circuit.
#[derive(Debug, Clone, Serialize)]
pub struct BurnWitness {
    #[serde(rename = "ValueToBurn")]
    pub value_to_burn: String,
    #[serde(rename = "SenderPrivateKey")]
    pub sender_private_key: String,
    #[serde(rename = "SenderPublicKey")]
    pub sender_public_key: [String; 2],
    #[serde(rename = "SenderBalance")]
    pub sender_balance: String,
    #[serde(rename = "SenderBalanceC1")]
    pub sender_balance_c1: [String; 2],
    #[serde(rename = "SenderBalanceC2")]
    pub sender_balance_c2: [String; 2],
    #[serde(rename = "SenderVTTC1")]
    pub sender_vtt_c1: [String; 2],
    #[serde(rename = "SenderVTTC2")]
    pub sender_vtt_c2: [String; 2],
    #[serde(rename = "SenderVTTRandom")]
    pub sender_vtt_random: String,
    #[serde(rename = "AuditorPublicKey")]
    pub auditor_public_key: [String; 2],
    #[serde(rename = "AuditorPCT")]
    pub auditor_pct: [String; 4],
    #[serde(rename = "AuditorPCTAuthKey")]
    pub auditor_pct_auth_key: [String; 2],
    #[serde(rename = "AuditorPCTNonce")]
    pub auditor_pct_nonce: String,
    #[serde(rename = "AuditorPCTRandom")]
    pub auditor_pct_random: String,
}

#[derive(Debug)]
pub struct BurnOutput {
    pub witness: BurnWitness,
    pub new_balance: u64,
    pub sender_balance_pct: [Fr; 7],
    pub burn_egct: ElGamalCiphertext,
    pub auditor_pct: [Fr; 7],
}

impl<R: RngCore + CryptoRng> OperationEngine<R> {
    /// Assemble a burn of `amount`. Only valid in standalone mode.
    pub fn private_burn(
        &mut self,
        key: &SessionKey,
        amount: u64,
        balance: &SenderBalance,
        auditor_pk: &AffinePoint,
    ) -> EercResult<BurnOutput> {
        self.require_mode(DeploymentMode::Standalone)?;
        Self::require_auditor(auditor_pk)?;
        let new_balance = Self::check_spend(amount, balance)?;

        let amount_field = Fr::from_u64(amount);

        let (burn_egct, vtt_random) = encrypt_message(key.public(), amount, self.rng())?;
        let (auditor_pct, auditor_random) = pct_encrypt(&[amount_field], auditor_pk, self.rng())?;
        let (balance_pct, _) =
            pct_encrypt(&[Fr::from_u64(new_balance)], key.public(), self.rng())?;

        let witness = BurnWitness {
            value_to_burn: fr_input(&amount_field),
            sender_private_key: fr_input(key.secret()),
            sender_public_key: point_input(key.public()),
            sender_balance: fr_input(&Fr::from_u64(balance.plaintext)),
            sender_balance_c1: point_input(&balance.egct.c1),
            sender_balance_c2: point_input(&balance.egct.c2),
            sender_vtt_c1: point_input(&burn_egct.c1),
            sender_vtt_c2: point_input(&burn_egct.c2),
            sender_vtt_random: fr_input(&vtt_random),
            auditor_public_key: point_input(auditor_pk),
            auditor_pct: cipher_input(&auditor_pct.cipher),
            auditor_pct_auth_key: point_input(&auditor_pct.auth_key),
            auditor_pct_nonce: fr_input(&auditor_pct.nonce),
            auditor_pct_random: fr_input(&auditor_random),
        };

        info!(amount, new_balance, "assembled burn witness");

        Ok(BurnOutput {
            witness,
            new_balance,
            sender_balance_pct: balance_pct.to_fields()?,
            burn_egct,
            auditor_pct: auditor_pct.to_fields()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::decrypt_pct_amount;
    use crate::curve::{elgamal_decryption, mul_with_scalar, KeyPair};
    use crate::error::EercError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(plaintext: u64) -> (OperationEngine<StdRng>, SessionKey, KeyPair, SenderBalance) {
        let mut rng = StdRng::seed_from_u64(4100);
        let sender = SessionKey::from_secret(Fr::random_scalar(&mut rng)).unwrap();
        let auditor = KeyPair::random(&mut rng).unwrap();
        let (egct, _) = encrypt_message(sender.public(), plaintext, &mut rng).unwrap();
        (
            OperationEngine::new(
                DeploymentMode::Standalone,
                43114,
                StdRng::seed_from_u64(4200),
            ),
            sender,
            auditor,
            SenderBalance { egct, plaintext },
        )
    }

    #[test]
    fn test_burn_payloads() {
        let (mut engine, sender, auditor, balance) = setup(90);
        let output = engine
            .private_burn(&sender, 25, &balance, &auditor.public)
            .unwrap();

        assert_eq!(output.new_balance, 65);
        assert_eq!(
            decrypt_pct_amount(&output.sender_balance_pct, sender.secret()).unwrap(),
            Fr::from_u64(65)
        );
        assert_eq!(
            decrypt_pct_amount(&output.auditor_pct, &auditor.secret).unwrap(),
            Fr::from_u64(25)
        );

        // The self-addressed EGCT carries the burned amount.
        let point = elgamal_decryption(sender.secret(), &output.burn_egct).unwrap();
        assert_eq!(point, mul_with_scalar(&Fr::from_u64(25)).unwrap());
    }

    #[test]
    fn test_burn_rejected_in_converter_mode() {
        let mut rng = StdRng::seed_from_u64(4300);
        let sender = SessionKey::from_secret(Fr::random_scalar(&mut rng)).unwrap();
        let auditor = KeyPair::random(&mut rng).unwrap();
        let (egct, _) = encrypt_message(sender.public(), 10, &mut rng).unwrap();

        let mut engine =
            OperationEngine::new(DeploymentMode::Converter, 43114, StdRng::seed_from_u64(4400));
        let balance = SenderBalance { egct, plaintext: 10 };
        assert!(matches!(
            engine.private_burn(&sender, 5, &balance, &auditor.public),
            Err(EercError::NotPermittedInMode(_))
        ));
    }

    #[test]
    fn test_burn_bounds_and_auditor() {
        let (mut engine, sender, auditor, balance) = setup(10);

        assert!(matches!(
            engine.private_burn(&sender, 11, &balance, &auditor.public),
            Err(EercError::InvalidAmount(_))
        ));
        assert!(matches!(
            engine.private_burn(&sender, 5, &balance, &AffinePoint::IDENTITY),
            Err(EercError::AuditorNotSet)
        ));
    }
}
