/// Iterative Execution Decoders
///
/// A step instruction advances the Neon transaction by a bounded number of
/// EVM steps. Layout: opcode | treasury idx (4) | step cnt (4) | unique idx (4)
/// followed, for TransactionStepFromInstruction, by the signed transaction.
/// account[0] is the holder, accounts from index 6 on are the blocked accounts.
use super::{read_u32_le, IxDecoder};
use crate::indexer::block::NeonBlockStore;
use crate::indexer::tx::NeonIndexedTxType;
use crate::models::NeonTxSig;
use crate::tx_codec::TxCodec;

const STEP_CNT_OFFSET: usize = 1 + 4;
const STEP_HEADER_LEN: usize = STEP_CNT_OFFSET + 4;
const STEP_PAYLOAD_OFFSET: usize = STEP_HEADER_LEN + 4;
const HOLDER_ACCOUNT_IDX: usize = 0;
const FIRST_BLOCKED_ACCOUNT_IDX: usize = 6;

impl<S: NeonBlockStore, C: TxCodec> IxDecoder<'_, S, C> {
    /// Parse the step header and find or create the transaction
    fn get_step_neon_tx(&mut self, tx_type: NeonIndexedTxType) -> Option<NeonTxSig> {
        if self.ix.account_cnt() < FIRST_BLOCKED_ACCOUNT_IDX {
            Self::decoding_skip("no enough accounts");
            return None;
        }
        let Some(neon_step_cnt) = read_u32_le(&self.ix.ix_data, STEP_CNT_OFFSET) else {
            Self::decoding_skip("no enough data to get Neon step cnt");
            return None;
        };
        self.ix.set_neon_step_cnt(neon_step_cnt);

        let holder_account = self.ix.get_account(HOLDER_ACCOUNT_IDX).copied();
        let blocked_account_list = self.ix.iter_account(FIRST_BLOCKED_ACCOUNT_IDX).to_vec();
        self.get_neon_tx(tx_type, holder_account, blocked_account_list)
    }

    pub(super) fn execute_tx_step_from_data(&mut self) -> bool {
        let Some(neon_tx_sig) = self.get_step_neon_tx(NeonIndexedTxType::IterFromData) else {
            return false;
        };

        let has_neon_tx = self.block.find_neon_tx(&neon_tx_sig).is_some_and(|tx| tx.neon_tx().is_some());
        if has_neon_tx {
            return self.decode_tx(&neon_tx_sig, "Neon tx continue step from data");
        }

        if self.ix.ix_data.len() < STEP_PAYLOAD_OFFSET + 1 {
            return Self::decoding_skip("no enough data to get Neon tx");
        }
        let neon_tx = match self.codec.decode_raw_tx(&self.ix.ix_data[STEP_PAYLOAD_OFFSET..]) {
            Ok(neon_tx) => neon_tx,
            Err(e) => return Self::decoding_skip(format!("Neon tx rlp error \"{}\"", e)),
        };
        if neon_tx.sig != neon_tx_sig {
            return Self::decoding_skip(format!("Neon tx hash {:?} != tx log hash {:?}", neon_tx.sig, neon_tx_sig));
        }

        if let Some(tx) = self.block.find_neon_tx_mut(&neon_tx_sig) {
            tx.set_neon_tx(neon_tx);
        }
        self.decode_tx(&neon_tx_sig, "Neon tx init step from data")
    }

    pub(super) fn execute_tx_step_from_account(&mut self, tx_type: NeonIndexedTxType, msg: &str) -> bool {
        let Some(neon_tx_sig) = self.get_step_neon_tx(tx_type) else {
            return false;
        };
        self.decode_tx(&neon_tx_sig, msg)
    }

    /// Events of a step instruction whose Solana transaction failed
    ///
    /// They are kept on the Neon transaction as reverted and hidden, ordered
    /// by arrival, and the result is not touched.
    pub fn decode_failed_neon_tx_event_list(&mut self) -> bool {
        if !self.desc.kind.is_step() {
            return Self::decoding_skip(format!("failed Solana tx for {}", self));
        }
        let Some(neon_tx_sig) = self.ix.neon_tx_sig else {
            return Self::decoding_skip("no Neon tx hash in logs");
        };

        let ix = &*self.ix;
        let Some(tx) = self.block.find_neon_tx_mut(&neon_tx_sig) else {
            return Self::decoding_skip(format!("cannot find Neon tx {:?} for failed Solana tx", neon_tx_sig));
        };
        if !tx.mark_sol_ix_merged(ix.sol_ix) {
            return Self::decoding_success(&*tx, "reverted events are already merged");
        }

        for event in &ix.neon_tx_event_list {
            let mut event = event.placed_at(tx.len_neon_event_list() as u64, ix.sol_ix);
            event.is_reverted = true;
            event.is_hidden = true;
            tx.add_neon_event(event);
        }
        Self::decoding_success(&*tx, "add reverted events from failed Solana tx")
    }
}
