/// WriteHolderAccount Instruction Decoder
///
/// Layout: 0x26 | neon tx hash (32) | offset (u64 LE) | chunk; account[0] is
/// the holder. Chunks are collected per (holder, tx hash) until the
/// transaction that reads the holder resolves its payload.
use super::{read_neon_tx_sig, read_u64_le, IxDecoder};
use crate::indexer::block::NeonBlockStore;
use crate::indexer::holder::{DataChunk, NeonHolderKey, NeonIndexedHolder};
use crate::tx_codec::TxCodec;

const NEON_TX_SIG_OFFSET: usize = 1;
const CHUNK_OFFSET_OFFSET: usize = NEON_TX_SIG_OFFSET + 32;
const CHUNK_DATA_OFFSET: usize = CHUNK_OFFSET_OFFSET + 8;
const HOLDER_ACCOUNT_IDX: usize = 0;

impl<S: NeonBlockStore, C: TxCodec> IxDecoder<'_, S, C> {
    pub(super) fn execute_write_holder_account(&mut self) -> bool {
        let Some(holder_account) = self.ix.get_account(HOLDER_ACCOUNT_IDX).copied() else {
            return Self::decoding_skip("no enough accounts");
        };
        if self.ix.ix_data.len() < CHUNK_DATA_OFFSET + 1 {
            return Self::decoding_skip(format!("no enough data to get Neon tx data chunk {}", self.ix.ix_data.len()));
        }
        let (Some(neon_tx_sig), Some(offset)) = (
            read_neon_tx_sig(&self.ix.ix_data, NEON_TX_SIG_OFFSET),
            read_u64_le(&self.ix.ix_data, CHUNK_OFFSET_OFFSET),
        ) else {
            return Self::decoding_skip("no enough data to get Neon tx data chunk header");
        };
        if self.ix.neon_tx_sig != Some(neon_tx_sig) {
            return Self::decoding_skip(format!("Neon tx hash {:?} != tx log hash {:?}", neon_tx_sig, self.ix.neon_tx_sig));
        }

        let chunk = DataChunk::new(offset, self.ix.ix_data[CHUNK_DATA_OFFSET..].to_vec());

        if let Some(tx) = self.block.find_neon_tx(&neon_tx_sig) {
            if tx.neon_tx().is_some() {
                return Self::decoding_success(&chunk, "add surplus data chunk to tx");
            }
        }

        let key = NeonHolderKey::new(holder_account, neon_tx_sig);
        if self.block.find_neon_tx_holder(&key).is_none() {
            self.block.add_neon_tx_holder(NeonIndexedHolder::new(key, self.ix.sol_ix));
        }
        let Some(holder) = self.block.find_neon_tx_holder_mut(&key) else {
            return Self::decoding_skip(format!("cannot find holder {}", key));
        };
        if !holder.add_data_chunk(chunk) {
            tracing::debug!("{} already has the chunk at offset {}", holder, offset);
        }
        tracing::debug!("add data chunk to {}", holder);

        if self.block.find_neon_tx(&neon_tx_sig).is_some() {
            self.decode_neon_tx_from_holder(&neon_tx_sig);
        }
        true
    }
}
