/// End-to-end operation flows against a simulated contract ledger.
///
/// Exercises the full path a wallet drives: derive a session key, register,
/// mint, transfer, withdraw and burn, with the contract's homomorphic
/// balance updates replayed locally and every payload decrypted back by
/// its addressee and by the auditor.

use rand::rngs::StdRng;
use rand::SeedableRng;

use eerc_sdk::balance::{calculate_total_balance, AmountPct, BalanceEncoding};
use eerc_sdk::curve::{elgamal_decryption, mul_with_scalar, ElGamalCiphertext, KeyPair};
use eerc_sdk::keys::SessionKey;
use eerc_sdk::operations::{DeploymentMode, OperationEngine, SenderBalance};
use eerc_sdk::poseidon::poseidon3;
use eerc_sdk::prover::{validate_proof_shape, Circuit, ProofOutput, ProofPoints, ProverOracle};
use eerc_sdk::{
    decrypt_metadata, encrypt_metadata, derive_key_from_signature, registration_message,
    EercError, Fr,
};

const CHAIN_ID: u64 = 43114;
const ADDRESS: &str = "0xabc0000000000000000000000000000000000def";

/// A user's record as the contract would hold it.
struct LedgerEntry {
    egct: ElGamalCiphertext,
    amount_pcts: Vec<AmountPct>,
    balance_pct: [Fr; 7],
}

impl LedgerEntry {
    fn fresh() -> Self {
        LedgerEntry {
            egct: ElGamalCiphertext::zero(),
            amount_pcts: Vec::new(),
            balance_pct: [Fr::ZERO; 7],
        }
    }

    fn encoding(&self) -> BalanceEncoding {
        BalanceEncoding {
            egct: self.egct.clone(),
            nonce: 0,
            amount_pcts: self.amount_pcts.clone(),
            balance_pct: self.balance_pct,
        }
    }

    /// Incoming credit: EGCT aggregation plus an appended amount PCT.
    fn credit(&mut self, egct: &ElGamalCiphertext, amount_pct: [Fr; 7]) {
        self.egct = if self.egct.is_zero() {
            egct.clone()
        } else {
            self.egct.add(egct).unwrap()
        };
        let index = self.amount_pcts.len() as u64;
        self.amount_pcts.push(AmountPct {
            pct: amount_pct,
            index,
        });
    }

    /// Outgoing spend: EGCT subtraction, queue folded into the rewritten
    /// balance PCT.
    fn spend(&mut self, egct: &ElGamalCiphertext, new_balance_pct: [Fr; 7]) {
        self.egct = self.egct.sub(egct).unwrap();
        self.amount_pcts.clear();
        self.balance_pct = new_balance_pct;
    }
}

fn session_key(seed: u64) -> SessionKey {
    let mut rng = StdRng::seed_from_u64(seed);
    SessionKey::from_secret(Fr::random_scalar(&mut rng)).unwrap()
}

#[test]
fn registration_flow_matches_spec_template() {
    // sk = 0x01...01, an arbitrary legal scalar below the subgroup order.
    let sk = Fr::from_be_bytes_reduced(&[0x01; 32]);
    let key = SessionKey::from_secret(sk).unwrap();

    let engine = OperationEngine::new(
        DeploymentMode::Standalone,
        CHAIN_ID,
        StdRng::seed_from_u64(0),
    );
    let output = engine.register(&key, ADDRESS).unwrap();

    // pk = sk * Base8.
    let expected_pk = eerc_sdk::generate_public_key(&sk).unwrap();
    assert_eq!(output.public_key, expected_pk);

    // registrationHash = Poseidon3(chainId, sk, address-as-field).
    let address_field = eerc_sdk::keys::address_to_field(ADDRESS).unwrap();
    assert_eq!(
        output.registration_hash,
        poseidon3(&Fr::from_u64(CHAIN_ID), &sk, &address_field)
    );

    // Witness dictionary carries exactly the circuit's field names.
    let inputs = eerc_sdk::operations::witness_inputs(&output.witness).unwrap();
    let map = inputs.as_object().unwrap();
    assert_eq!(map["ChainID"], CHAIN_ID.to_string());
    assert_eq!(map["SenderAddress"], address_field.to_decimal());
    assert_eq!(map["RegistrationHash"], output.registration_hash.to_decimal());

    // The signed message that produced the key is bit-exact.
    assert_eq!(
        registration_message(ADDRESS).unwrap(),
        format!("eERC\nRegistering user with\n Address:{ADDRESS}")
    );
}

#[test]
fn key_derivation_is_deterministic_per_signature() {
    let mut signature = [0u8; 65];
    signature[..64].copy_from_slice(&[0xab; 64]);
    let k1 = derive_key_from_signature(&signature).unwrap();
    let k2 = derive_key_from_signature(&signature).unwrap();
    assert_eq!(k1, k2);
}

#[test]
fn mint_transfer_withdraw_ledger_flow() {
    let alice = session_key(11);
    let bob = session_key(22);
    let auditor = KeyPair::random(&mut StdRng::seed_from_u64(33)).unwrap();

    let mut standalone = OperationEngine::new(
        DeploymentMode::Standalone,
        CHAIN_ID,
        StdRng::seed_from_u64(44),
    );

    let mut alice_ledger = LedgerEntry::fresh();
    let mut bob_ledger = LedgerEntry::fresh();

    // --- Mint 100 to Alice ---
    let mint = standalone
        .private_mint(alice.public(), 100, &auditor.public)
        .unwrap();
    alice_ledger.credit(&mint.receiver_egct, mint.receiver_amount_pct);

    let total = calculate_total_balance(&alice_ledger.encoding(), alice.secret()).unwrap();
    assert_eq!(total, Fr::from_u64(100));

    // Auditor reads the minted amount from the event PCT.
    assert_eq!(
        eerc_sdk::contract::decrypt_auditor_amount(&mint.auditor_pct, &auditor.secret).unwrap(),
        Fr::from_u64(100)
    );

    // --- Alice transfers 30 to Bob ---
    let balance = SenderBalance {
        egct: alice_ledger.egct.clone(),
        plaintext: 100,
    };
    let transfer = standalone
        .transfer(&alice, bob.public(), 30, &balance, &auditor.public)
        .unwrap();

    alice_ledger.spend(&transfer.sender_egct, transfer.sender_balance_pct);
    bob_ledger.credit(&transfer.receiver_egct, transfer.receiver_amount_pct);

    // Both sides reconstruct, cross-checked against the homomorphic EGCTs.
    assert_eq!(
        calculate_total_balance(&alice_ledger.encoding(), alice.secret()).unwrap(),
        Fr::from_u64(70)
    );
    assert_eq!(
        calculate_total_balance(&bob_ledger.encoding(), bob.secret()).unwrap(),
        Fr::from_u64(30)
    );
    assert_eq!(
        eerc_sdk::contract::decrypt_auditor_amount(&transfer.auditor_pct, &auditor.secret)
            .unwrap(),
        Fr::from_u64(30)
    );

    // Receiver EGCT decrypts to 30 * Base8.
    assert_eq!(
        elgamal_decryption(bob.secret(), &transfer.receiver_egct).unwrap(),
        mul_with_scalar(&Fr::from_u64(30)).unwrap()
    );

    // --- Alice burns 20 (standalone's supply exit) ---
    let balance = SenderBalance {
        egct: alice_ledger.egct.clone(),
        plaintext: 70,
    };
    let burn = standalone
        .private_burn(&alice, 20, &balance, &auditor.public)
        .unwrap();
    alice_ledger.spend(&burn.burn_egct, burn.sender_balance_pct);

    assert_eq!(
        calculate_total_balance(&alice_ledger.encoding(), alice.secret()).unwrap(),
        Fr::from_u64(50)
    );
}

#[test]
fn withdraw_flow_in_converter_mode() {
    let user = session_key(55);
    let auditor = KeyPair::random(&mut StdRng::seed_from_u64(66)).unwrap();
    let mut rng = StdRng::seed_from_u64(77);

    let mut converter =
        OperationEngine::new(DeploymentMode::Converter, CHAIN_ID, StdRng::seed_from_u64(88));

    // Seed a balance of 70 as the contract would after deposits.
    let (egct, _) = eerc_sdk::encrypt_message(user.public(), 70, &mut rng).unwrap();
    let balance = SenderBalance { egct, plaintext: 70 };

    let withdraw = converter
        .withdraw(&user, 40, &balance, &auditor.public)
        .unwrap();
    assert_eq!(withdraw.new_balance, 30);
    assert_eq!(
        eerc_sdk::balance::decrypt_pct_amount(&withdraw.sender_balance_pct, user.secret())
            .unwrap(),
        Fr::from_u64(30)
    );
    assert_eq!(
        eerc_sdk::balance::decrypt_pct_amount(&withdraw.auditor_pct, &auditor.secret).unwrap(),
        Fr::from_u64(40)
    );

    // Withdrawing 71 from 70 rejects.
    assert!(matches!(
        converter.withdraw(&user, 71, &balance, &auditor.public),
        Err(EercError::InvalidAmount(_))
    ));

    // Deposit path: 2.5 tokens at 18 decimals become 250 protocol units.
    let deposit = converter
        .deposit(user.public(), 2_500_000_000_000_000_000, 18)
        .unwrap();
    assert_eq!(deposit.scaled_amount, 250);
    assert_eq!(
        eerc_sdk::balance::decrypt_pct_amount(&deposit.amount_pct, user.secret()).unwrap(),
        Fr::from_u64(250)
    );
}

#[test]
fn reconstruction_detects_tampering() {
    let user = session_key(99);
    let mut rng = StdRng::seed_from_u64(111);

    let pct = |amount: u64, rng: &mut StdRng| {
        let (ct, _) =
            eerc_sdk::pct_encrypt(&[Fr::from_u64(amount)], user.public(), rng).unwrap();
        ct.to_fields().unwrap()
    };

    let (egct, _) = eerc_sdk::encrypt_message(user.public(), 100, &mut rng).unwrap();
    let mut encoding = BalanceEncoding {
        egct,
        nonce: 0,
        amount_pcts: vec![
            AmountPct { pct: pct(10, &mut rng), index: 0 },
            AmountPct { pct: pct(20, &mut rng), index: 1 },
        ],
        balance_pct: pct(70, &mut rng),
    };

    assert_eq!(
        calculate_total_balance(&encoding, user.secret()).unwrap(),
        Fr::from_u64(100)
    );

    // A single flipped cipher element desynchronizes the record.
    encoding.balance_pct[0] = encoding.balance_pct[0].add_mod(&Fr::ONE);
    assert!(matches!(
        calculate_total_balance(&encoding, user.secret()),
        Err(EercError::InconsistentBalance)
    ));
}

#[test]
fn message_roundtrip_with_transaction() {
    let recipient = session_key(123);
    let mut rng = StdRng::seed_from_u64(321);

    let text = "hello, auditor 🙂";
    let envelope = encrypt_metadata(text, recipient.public(), &mut rng).unwrap();

    // Through the on-wire byte layout and back.
    let restored = eerc_sdk::EncryptedMessage::from_bytes(&envelope.to_bytes()).unwrap();
    assert_eq!(decrypt_metadata(&restored, recipient.secret()).unwrap(), text);
}

/// A prover stub that returns a correctly-shaped proof without proving
/// anything; the SDK only checks shape, the contract checks validity.
struct StubProver;

#[async_trait::async_trait]
impl eerc_sdk::ProverOracle for StubProver {
    async fn prove(
        &self,
        _assets: &eerc_sdk::CircuitAssets,
        witness: &serde_json::Value,
    ) -> eerc_sdk::EercResult<ProofOutput> {
        assert!(witness.is_object());
        Ok(ProofOutput {
            points: ProofPoints {
                a: ["1".into(), "2".into()],
                b: [["3".into(), "4".into()], ["5".into(), "6".into()]],
                c: ["7".into(), "8".into()],
            },
            public_signals: vec!["0".to_string(); Circuit::Transfer.public_signal_count()],
        })
    }
}

#[tokio::test]
async fn transfer_witness_feeds_the_prover() {
    let alice = session_key(7);
    let bob = session_key(8);
    let auditor = KeyPair::random(&mut StdRng::seed_from_u64(9)).unwrap();
    let mut rng = StdRng::seed_from_u64(10);

    let mut engine = OperationEngine::new(
        DeploymentMode::Standalone,
        CHAIN_ID,
        StdRng::seed_from_u64(12),
    );

    let (egct, _) = eerc_sdk::encrypt_message(alice.public(), 50, &mut rng).unwrap();
    let balance = SenderBalance { egct, plaintext: 50 };
    let transfer = engine
        .transfer(&alice, bob.public(), 10, &balance, &auditor.public)
        .unwrap();

    let witness = eerc_sdk::operations::witness_inputs(&transfer.witness).unwrap();
    let assets = eerc_sdk::CircuitAssets {
        wasm_url: "file:///circuits/transfer.wasm".into(),
        zkey_url: "file:///circuits/transfer.zkey".into(),
    };

    let proof = StubProver.prove(&assets, &witness).await.unwrap();
    validate_proof_shape(Circuit::Transfer, &proof).unwrap();

    // Composed call arguments carry the rewritten balance PCT.
    let call = eerc_sdk::contract::TransferCall {
        to: ADDRESS.into(),
        token_id: 0,
        proof,
        balance_pct: transfer.sender_balance_pct,
        message: None,
    };
    assert_eq!(
        eerc_sdk::contract::pct_to_words(&call.balance_pct)[0],
        transfer.sender_balance_pct[0].to_be_bytes()
    );
}
