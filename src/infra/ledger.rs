//! Append-only hash-chained ledger
//!
//! All mutation goes through [`LedgerWriter`], which holds the chain's write
//! lock for the whole read-tail, compute, extend, persist sequence. Readers take
//! the read lock and only ever receive cloned blocks, so an uncommitted tail
//! block is never visible outside its writer.

use serde::Serialize;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, error, info};

use crate::domain::{now_micros, Block, BlockPayload, GENESIS_PREVIOUS_HASH};

use super::{KycError, Result};

/// Where and why a chain failed verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityViolation {
    pub index: u64,
    pub reason: String,
}

impl IntegrityViolation {
    fn new(index: u64, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

impl From<IntegrityViolation> for KycError {
    fn from(v: IntegrityViolation) -> Self {
        KycError::LedgerIntegrity {
            index: v.index,
            reason: v.reason,
        }
    }
}

/// Outcome of a full chain check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub length: usize,
    pub head_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<IntegrityViolation>,
}

/// Check genesis sentinel, index continuity, hash links and stored hashes
pub fn verify_chain(blocks: &[Block]) -> std::result::Result<(), IntegrityViolation> {
    let genesis = blocks
        .first()
        .ok_or_else(|| IntegrityViolation::new(0, "ledger has no genesis block"))?;

    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(IntegrityViolation::new(
            genesis.index,
            "genesis previous hash is not the sentinel",
        ));
    }
    if !genesis.payload.is_genesis() {
        return Err(IntegrityViolation::new(
            genesis.index,
            "first block does not carry a genesis payload",
        ));
    }

    for (position, block) in blocks.iter().enumerate() {
        let expected_index = position as u64;
        if block.index != expected_index {
            return Err(IntegrityViolation::new(
                block.index,
                format!("expected index {expected_index}"),
            ));
        }
        if position > 0 {
            let parent = &blocks[position - 1];
            if block.previous_hash != parent.hash {
                return Err(IntegrityViolation::new(
                    block.index,
                    "previous hash does not match parent hash",
                ));
            }
            if block.payload.is_genesis() {
                return Err(IntegrityViolation::new(
                    block.index,
                    "genesis payload after index 0",
                ));
            }
        }
        if !block.has_valid_hash() {
            return Err(IntegrityViolation::new(
                block.index,
                "stored hash does not match recomputed hash",
            ));
        }
    }

    Ok(())
}

#[derive(Debug)]
struct ChainState {
    blocks: Vec<Block>,
    violation: Option<IntegrityViolation>,
}

impl ChainState {
    fn tail(&self) -> Result<&Block> {
        self.blocks
            .last()
            .ok_or_else(|| KycError::Internal("ledger has no blocks".to_string()))
    }
}

/// Hash-chained sequence of blocks, created with a genesis block
#[derive(Debug)]
pub struct Ledger {
    state: RwLock<ChainState>,
}

impl Ledger {
    /// Fresh chain holding only a genesis block
    pub fn new() -> Result<Self> {
        let genesis = Block::genesis(now_micros())?;
        Ok(Self::with_state(vec![genesis], None))
    }

    /// Rebuild a chain from a persisted block log.
    ///
    /// An empty log yields a fresh chain. A log that fails verification is
    /// still loaded so it can be inspected, but the ledger starts poisoned.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        if blocks.is_empty() {
            return Self::new();
        }

        let violation = verify_chain(&blocks).err();
        match &violation {
            None => info!(length = blocks.len(), "ledger restored"),
            Some(v) => error!(
                index = v.index,
                reason = %v.reason,
                "restored ledger failed verification; appends disabled"
            ),
        }
        Ok(Self::with_state(blocks, violation))
    }

    fn with_state(blocks: Vec<Block>, violation: Option<IntegrityViolation>) -> Self {
        Self {
            state: RwLock::new(ChainState { blocks, violation }),
        }
    }

    /// Enter the append critical section.
    ///
    /// Fails with [`KycError::LedgerIntegrity`] while the ledger is poisoned.
    pub async fn writer(&self) -> Result<LedgerWriter<'_>> {
        let guard = self.state.write().await;
        if let Some(v) = &guard.violation {
            return Err(v.clone().into());
        }
        let base_len = guard.blocks.len();
        Ok(LedgerWriter {
            guard,
            base_len,
            committed: false,
        })
    }

    /// Append and commit a single block with no external persistence
    pub async fn append(&self, payload: BlockPayload) -> Result<Block> {
        let mut writer = self.writer().await?;
        let block = writer.append(payload)?;
        writer.commit();
        Ok(block)
    }

    /// Frozen copy of the chain
    pub async fn snapshot(&self) -> Vec<Block> {
        self.state.read().await.blocks.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.blocks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.blocks.is_empty()
    }

    pub async fn head(&self) -> Option<Block> {
        self.state.read().await.blocks.last().cloned()
    }

    /// Current poison state, if any
    pub async fn is_poisoned(&self) -> bool {
        self.state.read().await.violation.is_some()
    }

    /// Re-check the whole chain.
    ///
    /// A failure poisons the ledger; a clean pass lifts an earlier poison.
    pub async fn verify(&self) -> ChainVerification {
        let mut state = self.state.write().await;
        let result = verify_chain(&state.blocks);

        match (&result, &state.violation) {
            (Err(v), _) => error!(index = v.index, reason = %v.reason, "ledger integrity violation"),
            (Ok(()), Some(_)) => info!("ledger verified clean; appends re-enabled"),
            (Ok(()), None) => debug!(length = state.blocks.len(), "ledger verified"),
        }

        state.violation = result.err();
        ChainVerification {
            valid: state.violation.is_none(),
            length: state.blocks.len(),
            head_hash: state.blocks.last().map(|b| b.hash.clone()),
            violation: state.violation.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) async fn tamper<F: FnOnce(&mut Vec<Block>)>(&self, f: F) {
        f(&mut self.state.write().await.blocks)
    }
}

/// Exclusive handle on the chain tail.
///
/// Blocks appended through a writer become part of the chain only after
/// [`LedgerWriter::commit`]. Dropping an uncommitted writer, including when
/// the owning future is cancelled, discards them.
pub struct LedgerWriter<'a> {
    guard: RwLockWriteGuard<'a, ChainState>,
    base_len: usize,
    committed: bool,
}

impl LedgerWriter<'_> {
    /// Link a new block to the current tail
    pub fn append(&mut self, payload: BlockPayload) -> Result<Block> {
        let tail = self.guard.tail()?;
        let block = tail.successor(now_micros(), payload)?;
        debug!(index = block.index, hash = %block.hash, "ledger block appended");
        self.guard.blocks.push(block.clone());
        Ok(block)
    }

    /// Current tail, including uncommitted blocks
    pub fn head(&self) -> Option<&Block> {
        self.guard.blocks.last()
    }

    /// Keep appended blocks and release the lock
    pub fn commit(mut self) {
        self.committed = true;
    }

    /// Discard appended blocks and release the lock
    pub fn rollback(self) {}
}

impl Drop for LedgerWriter<'_> {
    fn drop(&mut self) {
        let pending = self.guard.blocks.len() - self.base_len;
        if !self.committed && pending > 0 {
            self.guard.blocks.truncate(self.base_len);
            debug!(discarded = pending, "uncommitted ledger blocks discarded");
        }
    }
}
