/// Holder Buffer Module
///
/// A holder account stages a transaction payload that does not fit into one
/// Solana instruction. `WriteHolderAccount` instructions deliver it as
/// (offset, data) chunks in any order; the buffer is usable once the chunks
/// cover a gap-free range from offset 0.
use solana_pubkey::Pubkey;
use std::collections::BTreeMap;
use std::fmt;

use super::NeonIndexedStatus;
use crate::models::{NeonTxSig, SolIxInfo};

/// Holder records are keyed by the holder account and the claimed tx hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NeonHolderKey {
    pub holder_account: Pubkey,
    pub neon_tx_sig: NeonTxSig,
}

impl NeonHolderKey {
    pub fn new(holder_account: Pubkey, neon_tx_sig: NeonTxSig) -> Self {
        Self { holder_account, neon_tx_sig }
    }
}

impl fmt::Display for NeonHolderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.holder_account, self.neon_tx_sig)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChunk {
    pub offset: u64,
    pub length: usize,
    pub data: Vec<u8>,
}

impl DataChunk {
    pub fn new(offset: u64, data: Vec<u8>) -> Self {
        Self { offset, length: data.len(), data }
    }
}

impl fmt::Display for DataChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataChunk(offset {}, length {})", self.offset, self.length)
    }
}

#[derive(Debug, Clone)]
pub struct NeonIndexedHolder {
    key: NeonHolderKey,
    chunk_map: BTreeMap<u64, DataChunk>,
    status: NeonIndexedStatus,
    start_sol_ix: SolIxInfo,
}

impl NeonIndexedHolder {
    pub fn new(key: NeonHolderKey, start_sol_ix: SolIxInfo) -> Self {
        Self { key, chunk_map: BTreeMap::new(), status: NeonIndexedStatus::InProgress, start_sol_ix }
    }

    pub fn key(&self) -> &NeonHolderKey {
        &self.key
    }

    pub fn neon_tx_sig(&self) -> &NeonTxSig {
        &self.key.neon_tx_sig
    }

    pub fn start_sol_ix(&self) -> &SolIxInfo {
        &self.start_sol_ix
    }

    pub fn is_done(&self) -> bool {
        self.status == NeonIndexedStatus::Done
    }

    pub(crate) fn mark_done(&mut self) {
        self.status = NeonIndexedStatus::Done;
    }

    pub fn chunk_cnt(&self) -> usize {
        self.chunk_map.len()
    }

    /// Store a chunk, replacing an earlier one written at the same offset
    ///
    /// Returns false if the identical chunk is already stored.
    pub fn add_data_chunk(&mut self, chunk: DataChunk) -> bool {
        if self.chunk_map.get(&chunk.offset) == Some(&chunk) {
            return false;
        }
        self.chunk_map.insert(chunk.offset, chunk);
        true
    }

    /// Reassembled buffer, `None` while the chunks leave a gap
    pub fn data(&self) -> Option<Vec<u8>> {
        if self.chunk_map.is_empty() {
            return None;
        }

        let mut data = Vec::new();
        for chunk in self.chunk_map.values() {
            let offset = usize::try_from(chunk.offset).ok()?;
            if offset > data.len() {
                return None;
            }

            let end = offset + chunk.length;
            if end > data.len() {
                data.resize(end, 0);
            }
            data[offset..end].copy_from_slice(&chunk.data);
        }

        Some(data)
    }
}

impl fmt::Display for NeonIndexedHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NeonHolder({}, {} chunks, {:?})", self.key, self.chunk_map.len(), self.status)
    }
}
