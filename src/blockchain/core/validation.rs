use crate::blockchain::core::block::{hash_to_hex, Block, Sha256Hash};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// One structural problem found while walking the chain. Every issue names
/// the block it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainIssue {
    #[error("Block {height} ({}) does not match its stored hash", display_hash(.hash))]
    Tampered {
        height: u64,
        hash: Option<String>,
    },

    #[error("Block {height} links to {} but the block before it is {}", display_hash(.previous_block_hash), display_hash(.expected))]
    BrokenLink {
        height: u64,
        previous_block_hash: Option<String>,
        expected: Option<String>,
    },
}

fn display_hash(hash: &Option<String>) -> &str {
    hash.as_deref().unwrap_or("<none>")
}

fn opt_hex(hash: &Option<Sha256Hash>) -> Option<String> {
    hash.as_ref().map(hash_to_hex)
}

/// Walks a snapshot of the chain. Self-validation of each block is
/// independent and runs in parallel; link checks compare neighbours.
pub fn validate_blocks(blocks: &[Block]) -> Vec<ChainIssue> {
    let mut issues: Vec<ChainIssue> = blocks
        .par_iter()
        .filter(|block| !block.validate())
        .map(|block| ChainIssue::Tampered {
            height: block.height,
            hash: opt_hex(&block.hash),
        })
        .collect();

    issues.extend(blocks.windows(2).filter_map(|pair| {
        let (previous, block) = (&pair[0], &pair[1]);
        if block.previous_block_hash.is_some() && block.previous_block_hash == previous.hash {
            None
        } else {
            Some(ChainIssue::BrokenLink {
                height: block.height,
                previous_block_hash: opt_hex(&block.previous_block_hash),
                expected: opt_hex(&previous.hash),
            })
        }
    }));

    issues
}
