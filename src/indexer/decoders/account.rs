/// CreateAccount3 Instruction Decoder
///
/// Layout: 0x28 | neon address (20 bytes); account[2] is the account PDA.
use ethereum_types::H160;

use super::IxDecoder;
use crate::indexer::block::NeonBlockStore;
use crate::models::NeonAccountInfo;
use crate::tx_codec::TxCodec;

const NEON_ADDRESS_END: usize = 1 + 20;
const PDA_ACCOUNT_IDX: usize = 2;

impl<S: NeonBlockStore, C: TxCodec> IxDecoder<'_, S, C> {
    pub(super) fn execute_create_account3(&mut self) -> bool {
        let ix = &*self.ix;
        if ix.ix_data.len() < NEON_ADDRESS_END {
            return Self::decoding_skip(format!("not enough data to get Neon account {}", ix.ix_data.len()));
        }
        let Some(pda_account) = ix.get_account(PDA_ACCOUNT_IDX) else {
            return Self::decoding_skip(format!("not enough accounts to get Neon account PDA {}", ix.account_cnt()));
        };

        let account = NeonAccountInfo {
            neon_address: H160::from_slice(&ix.ix_data[1..NEON_ADDRESS_END]),
            pda_account: *pda_account,
            block_slot: ix.block_slot(),
            sol_sig: ix.sol_ix.sol_sig,
        };
        let msg = account.to_string();
        self.block.add_neon_account(account);
        Self::decoding_success(&msg, "create Neon account")
    }
}
