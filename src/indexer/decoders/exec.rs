/// Single-Instruction Execution Decoders
///
/// The whole Neon transaction is executed by one Solana instruction:
/// - TransactionExecuteFromInstruction: 0x1f | treasury idx (4) | signed tx
/// - TransactionExecFromAccount: 0x2a | treasury idx (4); account[0] is the holder
use super::IxDecoder;
use crate::indexer::block::NeonBlockStore;
use crate::indexer::tx::NeonIndexedTxType;
use crate::tx_codec::TxCodec;

const TREASURY_IDX_END: usize = 1 + 4;
const HOLDER_ACCOUNT_IDX: usize = 0;

impl<S: NeonBlockStore, C: TxCodec> IxDecoder<'_, S, C> {
    pub(super) fn execute_tx_exec_from_data(&mut self) -> bool {
        if self.ix.ix_data.len() < TREASURY_IDX_END + 1 {
            return Self::decoding_skip("no enough data to get Neon tx");
        }

        let neon_tx = match self.codec.decode_raw_tx(&self.ix.ix_data[TREASURY_IDX_END..]) {
            Ok(neon_tx) => neon_tx,
            Err(e) => return Self::decoding_skip(format!("Neon tx rlp error: \"{}\"", e)),
        };
        if self.ix.neon_tx_sig != Some(neon_tx.sig) {
            return Self::decoding_skip(format!("Neon tx hash {:?} != {:?}", neon_tx.sig, self.ix.neon_tx_sig));
        }

        let Some(neon_tx_sig) = self.get_neon_tx(NeonIndexedTxType::Single, None, Vec::new()) else {
            return false;
        };
        if let Some(tx) = self.block.find_neon_tx_mut(&neon_tx_sig) {
            tx.set_neon_tx(neon_tx);
        }
        self.decode_tx(&neon_tx_sig, "Neon tx exec from data")
    }

    pub(super) fn execute_tx_exec_from_account(&mut self) -> bool {
        if self.ix.ix_data.len() < TREASURY_IDX_END {
            return Self::decoding_skip("no enough data for ix data");
        }
        let Some(holder_account) = self.ix.get_account(HOLDER_ACCOUNT_IDX).copied() else {
            return Self::decoding_skip("no enough accounts to get holder account");
        };

        let Some(neon_tx_sig) =
            self.get_neon_tx(NeonIndexedTxType::SingleFromAccount, Some(holder_account), Vec::new())
        else {
            return false;
        };
        self.decode_tx(&neon_tx_sig, "Neon tx exec from account")
    }
}
