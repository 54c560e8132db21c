//! Concurrency tests for key rotation
//!
//! Readers must only ever observe a key id together with the private key
//! registered under that id, and concurrent rotations must each produce a
//! distinct generation.

use common::secret::ExposeSecret;
use issuer_test_utils::{decode_header, verify_token, SequencedRegistrar};
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use token_issuer::services::{Claims, KeyRotator, TokenIssuer, Tokenizer};

const ROTATIONS: usize = 5;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_mismatched_key_and_id() -> Result<(), anyhow::Error> {
    let registrar = Arc::new(SequencedRegistrar::new());
    let rotator = Arc::new(KeyRotator::new(registrar.clone()).await?);
    let tokenizer = Tokenizer::new(rotator.clone());
    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..3 {
        let rotator = Arc::clone(&rotator);
        let tokenizer = tokenizer.clone();
        let done = Arc::clone(&done);

        readers.push(tokio::spawn(async move {
            let mut observed = Vec::new();
            while !done.load(Ordering::SeqCst) {
                let snapshot = rotator.get_latest();
                let token = tokenizer
                    .tokenize(&Claims::new().with_subject("user_1"))
                    .expect("tokenize should succeed during rotation");
                observed.push((snapshot, token));
                tokio::task::yield_now().await;
            }
            observed
        }));
    }

    for _ in 0..ROTATIONS {
        rotator.rotate().await?;
    }
    done.store(true, Ordering::SeqCst);

    let mut seen_key_ids = HashSet::new();
    for reader in readers {
        for (snapshot, token) in reader.await? {
            let registered = registrar
                .public_key_for(&snapshot.key_id)
                .expect("snapshot key id must have been registered");

            let private_key = RsaPrivateKey::from_pkcs8_pem(snapshot.private_key.expose_secret())?;
            let derived = private_key.to_public_key().to_public_key_pem(LineEnding::LF)?;
            assert_eq!(
                derived, registered,
                "snapshot for {} carried another key's private half",
                snapshot.key_id
            );

            let kid = decode_header(&token).kid.expect("token must carry kid");
            let registered = registrar
                .public_key_for(&kid)
                .expect("token kid must have been registered");
            verify_token(&token, &registered);

            seen_key_ids.insert(kid);
        }
    }

    assert!(!seen_key_ids.is_empty());
    assert_eq!(rotator.generation(), 1 + ROTATIONS as u64);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotations_each_get_a_generation() -> Result<(), anyhow::Error> {
    let registrar = Arc::new(SequencedRegistrar::new());
    let rotator = Arc::new(KeyRotator::new(registrar.clone()).await?);

    let mut rotations = Vec::new();
    for _ in 0..4 {
        let rotator = Arc::clone(&rotator);
        rotations.push(tokio::spawn(async move { rotator.rotate().await }));
    }

    let mut generations = Vec::new();
    let mut key_ids = HashSet::new();
    for rotation in rotations {
        let outcome = rotation.await??;
        generations.push(outcome.generation);
        key_ids.insert(outcome.key_id);
    }
    generations.sort_unstable();

    assert_eq!(generations, vec![2, 3, 4, 5]);
    assert_eq!(key_ids.len(), 4);
    assert_eq!(rotator.generation(), 5);
    assert_eq!(registrar.calls(), 5);

    let active = rotator.get_latest();
    assert_eq!(active.generation, 5);
    assert_eq!(
        registrar.public_key_for(&active.key_id).as_deref(),
        Some(rotator.public_key().as_str())
    );

    Ok(())
}
