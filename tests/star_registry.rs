//! Integration tests for the ledger's public surface

use serde_json::json;
use std::sync::Arc;
use starchain::blockchain::{BlockBody, Ledger};
use starchain::clock::ManualTimeSource;
use starchain::crypto::{verify_message, KeyPair};
use starchain::LedgerError;

fn bootstrap(start: i64) -> Result<(Arc<ManualTimeSource>, Arc<Ledger>), LedgerError> {
    let clock = Arc::new(ManualTimeSource::new(start));
    let ledger = Ledger::bootstrap(clock.clone())?;
    Ok((clock, Arc::new(ledger)))
}

#[test]
fn test_challenge_message_format() -> Result<(), Box<dyn std::error::Error>> {
    let (_, ledger) = bootstrap(1_650_000_000)?;
    let keypair = KeyPair::generate();

    let message = ledger.request_ownership_challenge(&keypair.address());
    assert_eq!(message, format!("{}:1650000000:starRegistry", keypair.address()));

    // The signature a wallet produces over it verifies with the same primitive
    let signature = keypair.sign_message(&message);
    assert!(verify_message(&message, &keypair.address(), &signature));

    Ok(())
}

#[test]
fn test_registered_star_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    let (clock, ledger) = bootstrap(1_650_000_000)?;
    let keypair = KeyPair::generate();
    let address = keypair.address();

    let message = ledger.request_ownership_challenge(&address);
    clock.advance(120);
    let star = json!({"ra": "13h 03m 33.35s", "dec": "-49° 31' 38.1", "story": "Found star using https://www.google.com/sky/"});
    let block = ledger.submit_star(&address, &message, &keypair.sign_message(&message), star.clone())?;

    assert_eq!(block.height, 1);
    assert_eq!(block.time, 1_650_000_120);
    assert_eq!(block.decode_body()?, BlockBody::star(address.clone(), star.clone()));

    let hash = block.hash.ok_or("sealed block has no hash")?;
    assert_eq!(ledger.get_block_by_hash(&hash)?, block);
    assert_eq!(ledger.get_block_by_height(1), Some(block));

    let stars = ledger.get_stars_by_owner(&address);
    assert_eq!(stars.len(), 1);
    assert_eq!(stars[0].star, star);

    Ok(())
}

#[test]
fn test_rejected_submissions_leave_chain_untouched() -> Result<(), Box<dyn std::error::Error>> {
    let (clock, ledger) = bootstrap(1_650_000_000)?;
    let owner = KeyPair::generate();
    let other = KeyPair::generate();
    let address = owner.address();

    // Challenge issued to someone else
    let foreign = ledger.request_ownership_challenge(&other.address());
    let result = ledger.submit_star(&address, &foreign, &owner.sign_message(&foreign), json!({}));
    assert!(matches!(result, Err(LedgerError::MalformedMessage(_))));

    // Signature over a different message
    let message = ledger.request_ownership_challenge(&address);
    let result = ledger.submit_star(&address, &message, &owner.sign_message("something else"), json!({}));
    assert!(matches!(result, Err(LedgerError::OwnershipVerificationFailed)));

    // Garbage signature
    let result = ledger.submit_star(&address, &message, "AAAA", json!({}));
    assert!(matches!(result, Err(LedgerError::OwnershipVerificationFailed)));

    // Expired, even with a valid signature
    clock.advance(301);
    let result = ledger.submit_star(&address, &message, &owner.sign_message(&message), json!({}));
    assert!(matches!(result, Err(LedgerError::ChallengeExpired { .. })));

    assert_eq!(ledger.height(), 0);
    assert!(ledger.validate_chain().is_empty());

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_submitters_build_one_chain() -> Result<(), Box<dyn std::error::Error>> {
    const SUBMITTERS: usize = 12;
    let (_, ledger) = bootstrap(1_650_000_000)?;

    let mut handles = Vec::new();
    for i in 0..SUBMITTERS {
        let ledger = ledger.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let keypair = KeyPair::generate();
            let address = keypair.address();
            let message = ledger.request_ownership_challenge(&address);
            ledger.submit_star(&address, &message, &keypair.sign_message(&message), json!({ "i": i }))
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(ledger.height(), SUBMITTERS as i64);
    let blocks = ledger.blocks();
    let mut heights: Vec<u64> = blocks.iter().map(|b| b.height).collect();
    heights.dedup();
    assert_eq!(heights.len(), SUBMITTERS + 1);
    assert!(ledger.validate_chain().is_empty());

    Ok(())
}
