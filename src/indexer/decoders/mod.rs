/// Decoders Module
///
/// One decoder per Neon program instruction. The static table maps the
/// instruction code (first data byte) to a decoder kind; `IxDecoder` runs the
/// kind against one instruction and the block store.
///
/// Every decoder reports `true` when the instruction was processed and `false`
/// when it was skipped. A skip is expected for malformed, irrelevant or not yet
/// resolvable instructions and never stops the scan.
pub mod account;
pub mod cancel;
pub mod exec;
pub mod holder;
pub mod step;

use std::collections::HashMap;
use std::fmt;

use super::block::NeonBlockStore;
use super::holder::NeonHolderKey;
use super::tx::{NeonIndexedTx, NeonIndexedTxType, NeonTxResult};
use crate::models::{NeonLogTxEvent, NeonLogTxEventType, NeonTxSig, SolNeonIx};
use crate::tx_codec::TxCodec;

/// Added to the gas used of a terminal event so it sorts after every real event
pub const TERMINAL_EVENT_GAS_OFFSET: u64 = 5000;

/// Fatal registry misconfiguration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{name} (0x{ix_code:02x}) is deprecated")]
    Deprecated { ix_code: u8, name: &'static str },

    #[error("{name} (0x{ix_code:02x}) duplicates {prev_name}")]
    Duplicate { ix_code: u8, name: &'static str, prev_name: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IxDecoderKind {
    CreateAccount3,
    CollectTreasure,
    TxExecFromData,
    TxExecFromAccount,
    TxStepFromData,
    TxStepFromAccount,
    TxStepFromAccountNoChainId,
    CancelWithHash,
    CreateHolderAccount,
    DeleteHolderAccount,
    WriteHolderAccount,
    Deposit3,
    Dummy,
}

/// Which ways to resolve a missing result a decoder family may use,
/// besides the return status printed into the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnStrategy {
    pub is_cancel_enabled: bool,
    pub is_lost_enabled: bool,
}

impl IxDecoderKind {
    pub fn return_strategy(&self) -> ReturnStrategy {
        match self {
            Self::TxStepFromData | Self::CancelWithHash => {
                ReturnStrategy { is_cancel_enabled: true, is_lost_enabled: false }
            }
            Self::TxStepFromAccount | Self::TxStepFromAccountNoChainId => {
                ReturnStrategy { is_cancel_enabled: true, is_lost_enabled: true }
            }
            _ => ReturnStrategy { is_cancel_enabled: false, is_lost_enabled: false },
        }
    }

    pub fn is_step(&self) -> bool {
        matches!(self, Self::TxStepFromData | Self::TxStepFromAccount | Self::TxStepFromAccountNoChainId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IxDecoderDesc {
    pub ix_code: u8,
    pub name: &'static str,
    pub is_deprecated: bool,
    pub kind: IxDecoderKind,
}

impl IxDecoderDesc {
    const fn active(ix_code: u8, name: &'static str, kind: IxDecoderKind) -> Self {
        Self { ix_code, name, is_deprecated: false, kind }
    }
}

/// Decoder for instruction codes missing from the registry
pub const DUMMY_IX_DECODER: IxDecoderDesc =
    IxDecoderDesc { ix_code: 0xff, name: "Unknown", is_deprecated: true, kind: IxDecoderKind::Dummy };

pub const NEON_IX_DECODER_LIST: [IxDecoderDesc; 12] = [
    IxDecoderDesc::active(0x28, "CreateAccount3", IxDecoderKind::CreateAccount3),
    IxDecoderDesc::active(0x1e, "CollectTreasure", IxDecoderKind::CollectTreasure),
    IxDecoderDesc::active(0x1f, "TransactionExecuteFromInstruction", IxDecoderKind::TxExecFromData),
    IxDecoderDesc::active(0x2a, "TransactionExecFromAccount", IxDecoderKind::TxExecFromAccount),
    IxDecoderDesc::active(0x20, "TransactionStepFromInstruction", IxDecoderKind::TxStepFromData),
    IxDecoderDesc::active(0x21, "TransactionStepFromAccount", IxDecoderKind::TxStepFromAccount),
    IxDecoderDesc::active(0x22, "TransactionStepFromAccountNoChainId", IxDecoderKind::TxStepFromAccountNoChainId),
    IxDecoderDesc::active(0x23, "CancelWithHash", IxDecoderKind::CancelWithHash),
    IxDecoderDesc::active(0x24, "CreateHolderAccount", IxDecoderKind::CreateHolderAccount),
    IxDecoderDesc::active(0x25, "DeleteHolderAccount", IxDecoderKind::DeleteHolderAccount),
    IxDecoderDesc::active(0x26, "WriteHolderAccount", IxDecoderKind::WriteHolderAccount),
    IxDecoderDesc::active(0x27, "Deposit3", IxDecoderKind::Deposit3),
];

/// The active decoder list, validated
pub fn register_all() -> Result<Vec<IxDecoderDesc>, RegistryError> {
    validate_decoder_list(&NEON_IX_DECODER_LIST)
}

/// Reject deprecated decoders and duplicate instruction codes
pub fn validate_decoder_list(decoder_list: &[IxDecoderDesc]) -> Result<Vec<IxDecoderDesc>, RegistryError> {
    let mut seen: HashMap<u8, &'static str> = HashMap::new();

    for desc in decoder_list {
        if desc.is_deprecated {
            return Err(RegistryError::Deprecated { ix_code: desc.ix_code, name: desc.name });
        }
        if let Some(prev_name) = seen.insert(desc.ix_code, desc.name) {
            return Err(RegistryError::Duplicate { ix_code: desc.ix_code, name: desc.name, prev_name });
        }
    }

    Ok(decoder_list.to_vec())
}

/// Instruction code -> decoder lookup
#[derive(Debug, Clone)]
pub struct IxDecoderRegistry {
    decoder_map: HashMap<u8, IxDecoderDesc>,
}

impl IxDecoderRegistry {
    pub fn new() -> Result<Self, RegistryError> {
        Ok(Self::from_list(register_all()?))
    }

    pub fn with_decoder_list(decoder_list: &[IxDecoderDesc]) -> Result<Self, RegistryError> {
        Ok(Self::from_list(validate_decoder_list(decoder_list)?))
    }

    fn from_list(decoder_list: Vec<IxDecoderDesc>) -> Self {
        let decoder_map = decoder_list.into_iter().map(|desc| (desc.ix_code, desc)).collect();
        Self { decoder_map }
    }

    /// Unknown instruction codes get the dummy decoder
    pub fn get(&self, ix_code: u8) -> &IxDecoderDesc {
        self.decoder_map.get(&ix_code).unwrap_or(&DUMMY_IX_DECODER)
    }

    pub fn decoder_for(&self, ix: &SolNeonIx) -> &IxDecoderDesc {
        match ix.ix_code() {
            Some(ix_code) => self.get(ix_code),
            None => &DUMMY_IX_DECODER,
        }
    }

    pub fn len(&self) -> usize {
        self.decoder_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoder_map.is_empty()
    }
}

pub(crate) fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

pub(crate) fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset + 8)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

pub(crate) fn read_neon_tx_sig(data: &[u8], offset: usize) -> Option<NeonTxSig> {
    data.get(offset..offset + 32).map(NeonTxSig::from_slice)
}

/// One decoder run: one instruction against the block store
pub struct IxDecoder<'a, S: NeonBlockStore, C: TxCodec> {
    desc: IxDecoderDesc,
    ix: &'a mut SolNeonIx,
    block: &'a mut S,
    codec: &'a C,
}

impl<'a, S: NeonBlockStore, C: TxCodec> IxDecoder<'a, S, C> {
    pub fn new(desc: IxDecoderDesc, ix: &'a mut SolNeonIx, block: &'a mut S, codec: &'a C) -> Self {
        let decoder = Self { desc, ix, block, codec };
        tracing::debug!("{} ...", decoder);
        decoder
    }

    pub fn desc(&self) -> &IxDecoderDesc {
        &self.desc
    }

    pub fn execute(&mut self) -> bool {
        match self.desc.kind {
            IxDecoderKind::CreateAccount3 => self.execute_create_account3(),
            IxDecoderKind::TxExecFromData => self.execute_tx_exec_from_data(),
            IxDecoderKind::TxExecFromAccount => self.execute_tx_exec_from_account(),
            IxDecoderKind::TxStepFromData => self.execute_tx_step_from_data(),
            IxDecoderKind::TxStepFromAccount => {
                self.execute_tx_step_from_account(NeonIndexedTxType::IterFromAccount, "Neon tx step from account")
            }
            IxDecoderKind::TxStepFromAccountNoChainId => self.execute_tx_step_from_account(
                NeonIndexedTxType::IterFromAccountWoChainId,
                "Neon tx wo chain-id step from account",
            ),
            IxDecoderKind::CancelWithHash => self.execute_cancel_with_hash(),
            IxDecoderKind::WriteHolderAccount => self.execute_write_holder_account(),
            IxDecoderKind::CollectTreasure
            | IxDecoderKind::CreateHolderAccount
            | IxDecoderKind::DeleteHolderAccount
            | IxDecoderKind::Deposit3
            | IxDecoderKind::Dummy => self.execute_pass_through(),
        }
    }

    /// Instructions without Neon transaction payload
    fn execute_pass_through(&self) -> bool {
        let prefix: String = hex::encode(&self.ix.ix_data).chars().take(8).collect();
        Self::decoding_skip(format!("no logic to decode the instruction {}({})", self, prefix))
    }

    fn decoding_success(indexed_obj: &impl fmt::Display, msg: &str) -> bool {
        tracing::debug!("decoding success: {} - {}", msg, indexed_obj);
        true
    }

    fn decoding_skip(reason: impl AsRef<str>) -> bool {
        tracing::warn!("decoding skip: {}", reason.as_ref());
        false
    }

    fn decoding_done_tx(&mut self, neon_tx_sig: &NeonTxSig, msg: &str) -> bool {
        self.block.done_neon_tx(neon_tx_sig, &self.ix.sol_ix);
        tracing::debug!("decoding done: {} - {:?}", msg, neon_tx_sig);
        true
    }

    fn decoding_done_holder(&mut self, key: &NeonHolderKey, msg: &str) -> bool {
        self.block.done_neon_tx_holder(key);
        tracing::debug!("decoding done: {} - {}", msg, key);
        true
    }

    /// Find the transaction named in the log, creating it on first sight
    fn get_neon_tx(
        &mut self,
        tx_type: NeonIndexedTxType,
        holder_account: Option<solana_pubkey::Pubkey>,
        blocked_account_list: Vec<solana_pubkey::Pubkey>,
    ) -> Option<NeonTxSig> {
        let Some(neon_tx_sig) = self.ix.neon_tx_sig else {
            Self::decoding_skip("no Neon tx hash in logs");
            return None;
        };

        if self.block.find_neon_tx(&neon_tx_sig).is_none() {
            let tx = NeonIndexedTx::new(tx_type, neon_tx_sig, holder_account, blocked_account_list, self.ix.sol_ix);
            self.block.add_neon_tx(tx);
        }
        Some(neon_tx_sig)
    }

    /// Shared update applied by every transaction-producing decoder
    fn decode_tx(&mut self, neon_tx_sig: &NeonTxSig, msg: &str) -> bool {
        self.decode_neon_tx_return(neon_tx_sig);
        self.decode_neon_tx_event_list(neon_tx_sig);
        self.decode_neon_tx_from_holder(neon_tx_sig);

        let Some(tx) = self.block.find_neon_tx(neon_tx_sig) else {
            return Self::decoding_skip(format!("Neon tx {:?} disappeared", neon_tx_sig));
        };
        if tx.neon_tx_res().is_some() && !tx.is_done() {
            return self.decoding_done_tx(neon_tx_sig, msg);
        }
        Self::decoding_success(tx, msg)
    }

    fn decode_neon_tx_return(&mut self, neon_tx_sig: &NeonTxSig) {
        let strategy = self.desc.kind.return_strategy();
        let ix = &*self.ix;
        let Some(tx) = self.block.find_neon_tx_mut(neon_tx_sig) else {
            return;
        };
        if tx.neon_tx_res().is_some() {
            return;
        }

        let res = if let Some(ret) = ix.neon_tx_return {
            NeonTxResult::new(ret.status, ret.gas_used)
        } else if strategy.is_cancel_enabled && tx.tx_type().is_multi_step() && tx.is_canceled() {
            NeonTxResult::canceled(ix.neon_total_gas_used)
        } else if strategy.is_lost_enabled && ix.is_log_truncated {
            NeonTxResult::lost(ix.neon_total_gas_used)
        } else {
            return;
        };

        let event_type = if tx.is_canceled() { NeonLogTxEventType::Cancel } else { NeonLogTxEventType::Return };
        let event = NeonLogTxEvent::new_terminal(
            event_type,
            res.status,
            res.gas_used.saturating_add(TERMINAL_EVENT_GAS_OFFSET),
            ix.sol_ix,
        );

        tx.set_neon_tx_res(res.with_sol_ix(ix.sol_ix));
        tx.add_neon_event(event);
    }

    fn decode_neon_tx_event_list(&mut self, neon_tx_sig: &NeonTxSig) {
        let ix = &*self.ix;
        let Some(tx) = self.block.find_neon_tx_mut(neon_tx_sig) else {
            return;
        };
        if !tx.mark_sol_ix_merged(ix.sol_ix) {
            tracing::debug!("Events of {} are already merged into {}", ix, tx);
            return;
        }

        let mut total_gas_used = ix.neon_total_gas_used;
        for event in &ix.neon_tx_event_list {
            tx.add_neon_event(event.placed_at(total_gas_used, ix.sol_ix));
            total_gas_used = total_gas_used.saturating_add(1);
        }
    }

    /// Rebuild the payload from the holder once the result is known
    fn decode_neon_tx_from_holder(&mut self, neon_tx_sig: &NeonTxSig) {
        let Some(tx) = self.block.find_neon_tx(neon_tx_sig) else {
            return;
        };
        if tx.neon_tx().is_some() || tx.neon_tx_res().is_none() || !tx.tx_type().is_holder_sourced() {
            return;
        }
        let Some(holder_account) = tx.holder_account().copied() else {
            return;
        };

        let key = NeonHolderKey::new(holder_account, *neon_tx_sig);
        let Some(holder) = self.block.find_neon_tx_holder(&key) else {
            return;
        };
        let Some(data) = holder.data() else {
            tracing::debug!("{} has gaps, wait for more chunks", holder);
            return;
        };

        let neon_tx = match self.codec.decode_raw_tx(&data) {
            Ok(neon_tx) => neon_tx,
            Err(e) => {
                Self::decoding_skip(format!("Neon tx rlp error: {}", e));
                return;
            }
        };
        if neon_tx.sig != *holder.neon_tx_sig() {
            Self::decoding_skip(format!("Neon tx hash {:?} != holder hash {:?}", neon_tx.sig, holder.neon_tx_sig()));
            return;
        }
        if neon_tx.sig != *neon_tx_sig {
            Self::decoding_skip(format!("Neon tx hash {:?} != tx log hash {:?}", neon_tx.sig, neon_tx_sig));
            return;
        }

        let msg = format!("init Neon tx {} from holder", neon_tx);
        if let Some(tx) = self.block.find_neon_tx_mut(neon_tx_sig) {
            tx.set_neon_tx(neon_tx);
        }
        self.decoding_done_holder(&key, &msg);
    }
}

impl<S: NeonBlockStore, C: TxCodec> fmt::Display for IxDecoder<'_, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.desc.is_deprecated {
            write!(f, "DEPRECATED ")?;
        }
        write!(f, "0x{:02x}:{} {}", self.desc.ix_code, self.desc.name, self.ix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::block::NeonIndexedBlock;
    use crate::indexer::tx::NeonTxStage;
    use crate::models::NeonLogTxReturn;
    use crate::test_utils::{account_list, legacy_tx_bytes, log_event, neon_ix, step_ix_data, tx_sig};
    use crate::tx_codec::RlpTxCodec;

    fn run(registry: &IxDecoderRegistry, ix: &mut SolNeonIx, block: &mut NeonIndexedBlock) -> bool {
        let desc = *registry.decoder_for(ix);
        IxDecoder::new(desc, ix, block, &RlpTxCodec).execute()
    }

    #[test]
    fn test_register_all_has_no_deprecated_decoder() {
        let decoder_list = register_all().unwrap();
        assert_eq!(decoder_list.len(), 12);
        assert!(decoder_list.iter().all(|desc| !desc.is_deprecated));
    }

    #[test]
    fn test_deprecated_decoder_is_rejected() {
        let mut decoder_list = NEON_IX_DECODER_LIST.to_vec();
        decoder_list.push(IxDecoderDesc {
            ix_code: 0x1d,
            name: "TransactionStepFromAccountV1",
            is_deprecated: true,
            kind: IxDecoderKind::TxStepFromAccount,
        });

        let err = IxDecoderRegistry::with_decoder_list(&decoder_list).unwrap_err();
        assert_eq!(err, RegistryError::Deprecated { ix_code: 0x1d, name: "TransactionStepFromAccountV1" });
    }

    #[test]
    fn test_duplicate_ix_code_is_rejected() {
        let mut decoder_list = NEON_IX_DECODER_LIST.to_vec();
        decoder_list.push(IxDecoderDesc::active(0x28, "CreateAccount4", IxDecoderKind::CreateAccount3));

        assert!(matches!(validate_decoder_list(&decoder_list), Err(RegistryError::Duplicate { ix_code: 0x28, .. })));
    }

    #[test]
    fn test_unknown_ix_code_is_skipped() {
        let registry = IxDecoderRegistry::new().unwrap();
        let mut block = NeonIndexedBlock::new();

        assert_eq!(registry.get(0x99).kind, IxDecoderKind::Dummy);
        let mut ix = neon_ix(1, vec![0x99, 1, 2, 3], account_list(8), None);
        assert!(!run(&registry, &mut ix, &mut block));

        let mut empty_ix = neon_ix(1, Vec::new(), Vec::new(), None);
        assert!(!run(&registry, &mut empty_ix, &mut block));
        assert_eq!(block.neon_tx_cnt(), 0);
    }

    #[test]
    fn test_pass_through_decoders_skip() {
        let registry = IxDecoderRegistry::new().unwrap();
        let mut block = NeonIndexedBlock::new();

        for ix_code in [0x1eu8, 0x24, 0x25, 0x27] {
            let mut ix = neon_ix(1, vec![ix_code, 0, 0, 0, 0], account_list(8), Some(NeonTxSig::repeat_byte(1)));
            assert!(!run(&registry, &mut ix, &mut block));
        }
        assert_eq!(block.neon_tx_cnt(), 0);
    }

    #[test]
    fn test_return_strategy_per_family() {
        assert!(!IxDecoderKind::TxExecFromData.return_strategy().is_cancel_enabled);
        assert!(!IxDecoderKind::TxExecFromAccount.return_strategy().is_lost_enabled);
        assert!(!IxDecoderKind::TxStepFromData.return_strategy().is_lost_enabled);
        assert!(IxDecoderKind::TxStepFromAccount.return_strategy().is_lost_enabled);
        assert!(IxDecoderKind::TxStepFromAccountNoChainId.return_strategy().is_lost_enabled);
        assert!(IxDecoderKind::CancelWithHash.return_strategy().is_cancel_enabled);
    }

    #[test]
    fn test_events_get_running_gas_order() {
        let registry = IxDecoderRegistry::new().unwrap();
        let mut block = NeonIndexedBlock::new();
        let payload = legacy_tx_bytes(1, Some(1));
        let sig = tx_sig(&payload);

        let mut ix = neon_ix(1, step_ix_data(0x20, 100, &payload), account_list(7), Some(sig));
        ix.neon_total_gas_used = 1_000;
        ix.neon_tx_event_list = vec![log_event(1), log_event(2), log_event(3)];
        assert!(run(&registry, &mut ix, &mut block));

        let tx = block.find_neon_tx(&sig).unwrap();
        let order_list: Vec<_> = tx.neon_event_list().iter().map(|e| e.total_gas_used).collect();
        assert_eq!(order_list, vec![1_000, 1_001, 1_002]);
        assert!(tx.neon_event_list().iter().all(|e| e.sol_ix == Some(ix.sol_ix)));
        assert_eq!(tx.stage(), NeonTxStage::PayloadKnown);
    }

    #[test]
    fn test_redecoding_same_ix_does_not_duplicate_events() {
        let registry = IxDecoderRegistry::new().unwrap();
        let mut block = NeonIndexedBlock::new();
        let payload = legacy_tx_bytes(1, Some(1));
        let sig = tx_sig(&payload);

        let mut ix = neon_ix(1, step_ix_data(0x20, 100, &payload), account_list(7), Some(sig));
        ix.neon_tx_event_list = vec![log_event(1), log_event(2)];
        assert!(run(&registry, &mut ix, &mut block));
        assert!(run(&registry, &mut ix, &mut block));

        assert_eq!(block.find_neon_tx(&sig).unwrap().len_neon_event_list(), 2);
    }

    #[test]
    fn test_terminal_event_sorts_last() {
        let registry = IxDecoderRegistry::new().unwrap();
        let mut block = NeonIndexedBlock::new();
        let payload = legacy_tx_bytes(1, Some(1));
        let sig = tx_sig(&payload);

        let mut ix = neon_ix(1, step_ix_data(0x20, 100, &payload), account_list(7), Some(sig));
        ix.neon_total_gas_used = 40_000;
        ix.neon_tx_event_list = (1..=20).map(log_event).collect();
        ix.neon_tx_return = Some(NeonLogTxReturn { status: 1, gas_used: 40_020 });
        assert!(run(&registry, &mut ix, &mut block));

        let tx = block.find_neon_tx(&sig).unwrap();
        assert!(tx.is_done());
        let last = tx.neon_event_list().last().unwrap();
        assert_eq!(last.event_type, NeonLogTxEventType::Return);
        assert_eq!(last.total_gas_used, 40_020 + TERMINAL_EVENT_GAS_OFFSET);
        assert!(tx.neon_event_list().iter().all(|e| e.total_gas_used <= last.total_gas_used));
    }

    #[test]
    fn test_terminal_event_sorts_last_near_gas_limit() {
        let registry = IxDecoderRegistry::new().unwrap();
        let mut block = NeonIndexedBlock::new();
        let payload = legacy_tx_bytes(1, Some(1));
        let sig = tx_sig(&payload);

        let mut ix = neon_ix(1, step_ix_data(0x20, 100, &payload), account_list(7), Some(sig));
        ix.neon_total_gas_used = u64::MAX - 1;
        ix.neon_tx_event_list = vec![log_event(1), log_event(2), log_event(3)];
        ix.neon_tx_return = Some(NeonLogTxReturn { status: 1, gas_used: u64::MAX - 10 });
        assert!(run(&registry, &mut ix, &mut block));

        let tx = block.find_neon_tx(&sig).unwrap();
        assert!(tx.is_done());
        let key_list: Vec<_> = tx.neon_event_list().iter().map(|e| e.total_gas_used).collect();
        assert_eq!(key_list, vec![u64::MAX - 1, u64::MAX, u64::MAX, u64::MAX]);

        let last = tx.neon_event_list().last().unwrap();
        assert_eq!(last.event_type, NeonLogTxEventType::Return);
        assert!(last.is_terminal());
    }

    #[test]
    fn test_read_helpers() {
        let data = [0x20u8, 1, 0, 0, 0, 0xff, 0xff, 0, 0];
        assert_eq!(read_u32_le(&data, 1), Some(1));
        assert_eq!(read_u32_le(&data, 5), Some(0xffff));
        assert_eq!(read_u32_le(&data, 6), None);
        assert_eq!(read_u64_le(&data, 1), Some(0x0000_ffff_0000_0001));
        assert_eq!(read_neon_tx_sig(&data, 0), None);
    }
}
