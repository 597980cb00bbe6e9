/// CancelWithHash Instruction Decoder
///
/// Layout: 0x23 | neon tx hash (32). The canceled transaction gets its result
/// from the cancel path of the shared pipeline.
use super::{read_neon_tx_sig, IxDecoder};
use crate::indexer::block::NeonBlockStore;
use crate::tx_codec::TxCodec;

const NEON_TX_SIG_OFFSET: usize = 1;
const FIRST_BLOCKED_ACCOUNT_IDX: usize = 3;

impl<S: NeonBlockStore, C: TxCodec> IxDecoder<'_, S, C> {
    pub(super) fn execute_cancel_with_hash(&mut self) -> bool {
        if self.ix.account_cnt() < FIRST_BLOCKED_ACCOUNT_IDX + 1 {
            return Self::decoding_skip("no enough accounts");
        }
        let Some(neon_tx_sig) = read_neon_tx_sig(&self.ix.ix_data, NEON_TX_SIG_OFFSET) else {
            return Self::decoding_skip(format!("no enough data to get Neon tx hash {}", self.ix.ix_data.len()));
        };
        if self.ix.neon_tx_sig != Some(neon_tx_sig) {
            return Self::decoding_skip(format!("Neon tx hash {:?} != {:?}", self.ix.neon_tx_sig, neon_tx_sig));
        }

        let Some(tx) = self.block.find_neon_tx_mut(&neon_tx_sig) else {
            return Self::decoding_skip(format!("cannot find Neon tx {:?}", neon_tx_sig));
        };
        tx.set_canceled();

        self.decode_tx(&neon_tx_sig, "cancel Neon tx")
    }
}
