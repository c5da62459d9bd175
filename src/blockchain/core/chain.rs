use crate::blockchain::core::block::{hash_to_hex, Block, BlockBody, Sha256Hash, StarClaim};
use crate::blockchain::core::ownership::Challenge;
use crate::blockchain::core::validation::{validate_blocks, ChainIssue};
use crate::clock::{SystemTimeSource, TimeSource};
use crate::crypto::{normalize_address, verify_message};
use crate::error::{LedgerError, Result};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The star registry ledger.
///
/// Blocks live in an append-only vector behind a read/write lock: reads share
/// it, and every append holds the write lock from its integrity pre-check to
/// the push, so there is never more than one writer. The height is derived
/// from the vector length and therefore moves together with the tail block.
pub struct Ledger {
    blocks: RwLock<Vec<Block>>,
    genesis: OnceCell<()>,
    clock: Arc<dyn TimeSource>,
}

impl Ledger {
    /// An empty ledger on the system clock. Call [`Ledger::initialize`]
    /// before handing it out.
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(clock: Arc<dyn TimeSource>) -> Self {
        Ledger {
            blocks: RwLock::new(Vec::new()),
            genesis: OnceCell::new(),
            clock,
        }
    }

    /// Construct and initialize in one step.
    pub fn bootstrap(clock: Arc<dyn TimeSource>) -> Result<Self> {
        let ledger = Self::with_time_source(clock);
        ledger.initialize()?;
        Ok(ledger)
    }

    /// Creates the genesis block if the chain is empty. Runs once; later and
    /// concurrent callers wait for the first call and then return.
    pub fn initialize(&self) -> Result<()> {
        self.genesis
            .get_or_try_init(|| -> Result<()> {
                let mut blocks = self.blocks.write();
                if blocks.is_empty() {
                    let genesis = self.append_locked(&mut blocks, &BlockBody::genesis())?;
                    info!(hash = %hex_or_none(&genesis.hash), "genesis block created");
                }
                Ok(())
            })
            .map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.genesis.get().is_some()
    }

    /// Height of the tail block, `-1` while the ledger is still empty.
    pub fn height(&self) -> i64 {
        self.blocks.read().len() as i64 - 1
    }

    /// The only way blocks enter the chain.
    pub(crate) fn append(&self, body: &BlockBody) -> Result<Block> {
        if !self.is_initialized() {
            return Err(LedgerError::Uninitialized);
        }
        let mut blocks = self.blocks.write();
        self.append_locked(&mut blocks, body)
    }

    fn append_locked(&self, blocks: &mut Vec<Block>, body: &BlockBody) -> Result<Block> {
        let issues = validate_blocks(blocks.as_slice());
        if !issues.is_empty() {
            warn!(issues = issues.len(), "refusing to append to a corrupted chain");
            return Err(LedgerError::ChainCorrupted(issues));
        }

        let mut block = Block::new(body)?;
        block.previous_block_hash = blocks.last().and_then(|last| last.hash);
        block.time = self.clock.now();
        block.height = blocks.len() as u64;
        block.seal();

        if !block.validate() {
            return Err(LedgerError::BlockInvalid {
                height: block.height,
            });
        }

        blocks.push(block.clone());
        info!(height = block.height, hash = %hex_or_none(&block.hash), "block appended");
        Ok(block)
    }

    /// Message the owner of `address` has to sign before submitting a star.
    pub fn request_ownership_challenge(&self, address: &str) -> String {
        let message = Challenge::message(address, self.clock.now());
        debug!(%address, %message, "ownership challenge issued");
        message
    }

    /// Registers `star` for `address` once the signed challenge checks out.
    pub fn submit_star(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        star: serde_json::Value,
    ) -> Result<Block> {
        let address = normalize_address(address);
        let challenge = Challenge::parse(message)?;
        if let Err(e) = challenge.check(&address, self.clock.now()) {
            debug!(%address, error = %e, "star submission rejected");
            return Err(e);
        }
        if !verify_message(message, &address, signature) {
            debug!(%address, "signature does not match address");
            return Err(LedgerError::OwnershipVerificationFailed);
        }

        self.append(&BlockBody::star(address, star))
    }

    /// Every structural problem in the current chain. An empty list means
    /// the chain is intact.
    pub fn validate_chain(&self) -> Vec<ChainIssue> {
        let blocks = self.blocks.read();
        validate_blocks(&blocks)
    }

    pub fn get_block_by_hash(&self, hash: &Sha256Hash) -> Result<Block> {
        self.blocks
            .read()
            .iter()
            .find(|block| block.hash.as_ref() == Some(hash))
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("block with hash {}", hash_to_hex(hash))))
    }

    pub fn get_block_by_height(&self, height: u64) -> Option<Block> {
        let index = usize::try_from(height).ok()?;
        self.blocks.read().get(index).cloned()
    }

    /// Stars registered by `address`, oldest first. Addresses are compared in
    /// normalized form. Blocks whose body cannot be decoded are skipped so
    /// they cannot hide the rest.
    pub fn get_stars_by_owner(&self, address: &str) -> Vec<StarClaim> {
        let address = normalize_address(address);
        let blocks = self.blocks.read();
        let mut stars = Vec::new();

        for block in blocks.iter().skip(1) {
            match block.decode_body() {
                Ok(BlockBody::Star(claim)) if claim.owner == address => stars.push(claim),
                Ok(_) => {}
                Err(e) => warn!(height = block.height, error = %e, "skipping undecodable block body"),
            }
        }
        stars
    }

    /// Snapshot of the whole chain.
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    #[cfg(test)]
    pub(crate) fn tamper<F: FnOnce(&mut Vec<Block>)>(&self, f: F) {
        f(&mut self.blocks.write());
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_or_none(hash: &Option<Sha256Hash>) -> String {
    hash.as_ref().map(hash_to_hex).unwrap_or_default()
}
