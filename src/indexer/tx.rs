/// Neon Transaction Record
///
/// A Neon transaction is rebuilt from any number of Solana instructions. The
/// record accumulates the payload, the result and the event list until the
/// result is known, and is finalized exactly once.
use solana_pubkey::Pubkey;
use std::collections::HashSet;
use std::fmt;

use super::NeonIndexedStatus;
use crate::models::{NeonLogTxEvent, NeonTxSig, SolIxInfo};
use crate::tx_codec::NeonTxInfo;

/// How the transaction was executed by the Neon program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeonIndexedTxType {
    Single,
    SingleFromAccount,
    IterFromData,
    IterFromAccount,
    IterFromAccountWoChainId,
}

impl NeonIndexedTxType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Single => "Single",
            Self::SingleFromAccount => "SingleFromAccount",
            Self::IterFromData => "IterFromData",
            Self::IterFromAccount => "IterFromAccount",
            Self::IterFromAccountWoChainId => "IterFromAccountWoChainId",
        }
    }

    /// Payload is staged in a holder account instead of the instruction data
    pub fn is_holder_sourced(&self) -> bool {
        matches!(self, Self::SingleFromAccount | Self::IterFromAccount | Self::IterFromAccountWoChainId)
    }

    /// Executed by several step instructions
    pub fn is_multi_step(&self) -> bool {
        !matches!(self, Self::Single | Self::SingleFromAccount)
    }
}

/// Lifecycle of a transaction record, derived from its content
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NeonTxStage {
    Created,
    PayloadKnown,
    ResultKnown,
    Done,
}

/// Outcome of a Neon transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeonTxResult {
    pub status: u8,
    pub gas_used: u64,
    pub is_canceled: bool,
    pub is_lost: bool,
    pub sol_ix: Option<SolIxInfo>,
}

impl NeonTxResult {
    pub fn new(status: u8, gas_used: u64) -> Self {
        Self { status, gas_used, is_canceled: false, is_lost: false, sol_ix: None }
    }

    /// Result of a transaction canceled before it completed
    pub fn canceled(gas_used: u64) -> Self {
        Self { is_canceled: true, ..Self::new(0, gas_used) }
    }

    /// Result of a transaction whose return status did not fit into the truncated log
    pub fn lost(gas_used: u64) -> Self {
        Self { is_lost: true, ..Self::new(0, gas_used) }
    }

    pub fn with_sol_ix(self, sol_ix: SolIxInfo) -> Self {
        Self { sol_ix: Some(sol_ix), ..self }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status,
            "gas_used": self.gas_used,
            "is_canceled": self.is_canceled,
            "is_lost": self.is_lost,
            "sol_ix": self.sol_ix.map(|ix| ix.to_json()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct NeonIndexedTx {
    neon_tx_sig: NeonTxSig,
    tx_type: NeonIndexedTxType,
    holder_account: Option<Pubkey>,
    blocked_account_list: Vec<Pubkey>,
    neon_tx: Option<NeonTxInfo>,
    neon_tx_res: Option<NeonTxResult>,
    neon_event_list: Vec<NeonLogTxEvent>,
    is_canceled: bool,
    status: NeonIndexedStatus,
    start_sol_ix: SolIxInfo,
    merged_sol_ix_set: HashSet<SolIxInfo>,
}

impl NeonIndexedTx {
    pub fn new(
        tx_type: NeonIndexedTxType,
        neon_tx_sig: NeonTxSig,
        holder_account: Option<Pubkey>,
        blocked_account_list: Vec<Pubkey>,
        start_sol_ix: SolIxInfo,
    ) -> Self {
        Self {
            neon_tx_sig,
            tx_type,
            holder_account,
            blocked_account_list,
            neon_tx: None,
            neon_tx_res: None,
            neon_event_list: Vec::new(),
            is_canceled: false,
            status: NeonIndexedStatus::InProgress,
            start_sol_ix,
            merged_sol_ix_set: HashSet::new(),
        }
    }

    pub fn neon_tx_sig(&self) -> &NeonTxSig {
        &self.neon_tx_sig
    }

    pub fn tx_type(&self) -> NeonIndexedTxType {
        self.tx_type
    }

    pub fn holder_account(&self) -> Option<&Pubkey> {
        self.holder_account.as_ref()
    }

    pub fn blocked_account_list(&self) -> &[Pubkey] {
        &self.blocked_account_list
    }

    pub fn start_sol_ix(&self) -> &SolIxInfo {
        &self.start_sol_ix
    }

    pub fn neon_tx(&self) -> Option<&NeonTxInfo> {
        self.neon_tx.as_ref()
    }

    /// Attach the decoded payload
    ///
    /// Returns false if the payload is already known or belongs to another transaction.
    pub fn set_neon_tx(&mut self, neon_tx: NeonTxInfo) -> bool {
        if self.neon_tx.is_some() || neon_tx.sig != self.neon_tx_sig {
            return false;
        }
        self.neon_tx = Some(neon_tx);
        true
    }

    pub fn neon_tx_res(&self) -> Option<&NeonTxResult> {
        self.neon_tx_res.as_ref()
    }

    /// The result can be set only once
    pub fn set_neon_tx_res(&mut self, neon_tx_res: NeonTxResult) -> bool {
        if self.neon_tx_res.is_some() {
            return false;
        }
        self.neon_tx_res = Some(neon_tx_res);
        true
    }

    pub fn is_canceled(&self) -> bool {
        self.is_canceled
    }

    pub fn set_canceled(&mut self) {
        self.is_canceled = true;
    }

    pub fn status(&self) -> NeonIndexedStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status == NeonIndexedStatus::Done
    }

    pub(crate) fn mark_done(&mut self) {
        self.status = NeonIndexedStatus::Done;
    }

    pub fn stage(&self) -> NeonTxStage {
        if self.is_done() {
            NeonTxStage::Done
        } else if self.neon_tx_res.is_some() {
            NeonTxStage::ResultKnown
        } else if self.neon_tx.is_some() {
            NeonTxStage::PayloadKnown
        } else {
            NeonTxStage::Created
        }
    }

    pub fn neon_event_list(&self) -> &[NeonLogTxEvent] {
        &self.neon_event_list
    }

    pub fn len_neon_event_list(&self) -> usize {
        self.neon_event_list.len()
    }

    /// Events reaching a finalized transaction are put in order right away
    pub fn add_neon_event(&mut self, event: NeonLogTxEvent) {
        self.neon_event_list.push(event);
        if self.is_done() {
            self.sort_neon_event_list();
        }
    }

    /// Stable sort by the gas-ordering key; the terminal event wins ties
    pub fn sort_neon_event_list(&mut self) {
        self.neon_event_list.sort_by_key(|event| (event.total_gas_used, event.is_terminal()));
    }

    /// Remember that the log events of `sol_ix` were merged
    ///
    /// Returns false if they were merged before.
    pub fn mark_sol_ix_merged(&mut self, sol_ix: SolIxInfo) -> bool {
        self.merged_sol_ix_set.insert(sol_ix)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "neon_tx_sig": format!("{:?}", self.neon_tx_sig),
            "tx_type": self.tx_type.as_str(),
            "holder_account": self.holder_account.map(|a| a.to_string()),
            "blocked_account_list": self.blocked_account_list.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
            "is_canceled": self.is_canceled,
            "neon_tx": self.neon_tx.as_ref().map(|tx| tx.to_json()),
            "neon_tx_res": self.neon_tx_res.as_ref().map(|res| res.to_json()),
            "neon_event_list": self.neon_event_list.iter().map(|e| e.to_json()).collect::<Vec<_>>(),
            "start_sol_ix": self.start_sol_ix.to_json(),
        })
    }
}

impl fmt::Display for NeonIndexedTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NeonTx({:?}, {}, {:?})", self.neon_tx_sig, self.tx_type.as_str(), self.stage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NeonLogTxEventType;
    use crate::test_utils::{legacy_tx_bytes, log_event, sol_ix, tx_sig};
    use crate::tx_codec::{RlpTxCodec, TxCodec};

    fn new_tx(tx_type: NeonIndexedTxType, sig: NeonTxSig) -> NeonIndexedTx {
        NeonIndexedTx::new(tx_type, sig, None, Vec::new(), sol_ix(1, 0))
    }

    #[test]
    fn test_tx_type_families() {
        assert!(NeonIndexedTxType::SingleFromAccount.is_holder_sourced());
        assert!(!NeonIndexedTxType::IterFromData.is_holder_sourced());
        assert!(!NeonIndexedTxType::Single.is_multi_step());
        assert!(!NeonIndexedTxType::SingleFromAccount.is_multi_step());
        assert!(NeonIndexedTxType::IterFromAccountWoChainId.is_multi_step());
    }

    #[test]
    fn test_stage_transitions() {
        let data = legacy_tx_bytes(1, Some(1));
        let mut tx = new_tx(NeonIndexedTxType::IterFromData, tx_sig(&data));
        assert_eq!(tx.stage(), NeonTxStage::Created);

        assert!(tx.set_neon_tx(RlpTxCodec.decode_raw_tx(&data).unwrap()));
        assert_eq!(tx.stage(), NeonTxStage::PayloadKnown);

        assert!(tx.set_neon_tx_res(NeonTxResult::new(1, 21_000)));
        assert_eq!(tx.stage(), NeonTxStage::ResultKnown);

        tx.mark_done();
        assert_eq!(tx.stage(), NeonTxStage::Done);
    }

    #[test]
    fn test_result_and_payload_are_set_once() {
        let data = legacy_tx_bytes(1, Some(1));
        let other = legacy_tx_bytes(2, Some(1));
        let mut tx = new_tx(NeonIndexedTxType::Single, tx_sig(&data));

        assert!(!tx.set_neon_tx(RlpTxCodec.decode_raw_tx(&other).unwrap()));
        assert!(tx.neon_tx().is_none());

        assert!(tx.set_neon_tx_res(NeonTxResult::new(1, 100)));
        assert!(!tx.set_neon_tx_res(NeonTxResult::new(0, 200)));
        assert_eq!(tx.neon_tx_res().unwrap().gas_used, 100);
    }

    #[test]
    fn test_sort_keeps_insertion_order_for_equal_keys() {
        let mut tx = new_tx(NeonIndexedTxType::IterFromAccount, NeonTxSig::repeat_byte(1));
        tx.add_neon_event(NeonLogTxEvent::new_terminal(NeonLogTxEventType::Return, 1, 5_100, sol_ix(1, 2)));
        tx.add_neon_event(log_event(1).placed_at(100, sol_ix(1, 2)));
        tx.add_neon_event(log_event(2).placed_at(100, sol_ix(1, 2)));
        tx.add_neon_event(log_event(3).placed_at(50, sol_ix(1, 1)));

        tx.sort_neon_event_list();
        let data_list: Vec<_> = tx.neon_event_list().iter().map(|e| e.data.clone()).collect();
        assert_eq!(data_list, vec![vec![3u8], vec![1u8], vec![2u8], vec![1u8]]);
        assert_eq!(tx.neon_event_list().last().unwrap().event_type, NeonLogTxEventType::Return);
    }

    #[test]
    fn test_terminal_event_wins_saturated_key() {
        let mut tx = new_tx(NeonIndexedTxType::IterFromData, NeonTxSig::repeat_byte(1));
        tx.add_neon_event(NeonLogTxEvent::new_terminal(NeonLogTxEventType::Return, 1, u64::MAX, sol_ix(1, 0)));
        tx.add_neon_event(log_event(1).placed_at(u64::MAX, sol_ix(1, 0)));

        tx.sort_neon_event_list();
        assert!(tx.neon_event_list().last().unwrap().is_terminal());
    }

    #[test]
    fn test_event_added_after_done_is_sorted() {
        let mut tx = new_tx(NeonIndexedTxType::IterFromAccount, NeonTxSig::repeat_byte(1));
        tx.add_neon_event(log_event(1).placed_at(100, sol_ix(1, 0)));
        tx.add_neon_event(NeonLogTxEvent::new_terminal(NeonLogTxEventType::Return, 1, 5_200, sol_ix(1, 0)));
        tx.set_neon_tx_res(NeonTxResult::new(1, 200));
        tx.sort_neon_event_list();
        tx.mark_done();

        tx.add_neon_event(log_event(2).placed_at(150, sol_ix(1, 1)));

        let key_list: Vec<_> = tx.neon_event_list().iter().map(|e| e.total_gas_used).collect();
        assert_eq!(key_list, vec![100, 150, 5_200]);
        assert!(tx.neon_event_list().last().unwrap().is_terminal());
    }

    #[test]
    fn test_mark_sol_ix_merged() {
        let mut tx = new_tx(NeonIndexedTxType::IterFromAccount, NeonTxSig::repeat_byte(1));
        assert!(tx.mark_sol_ix_merged(sol_ix(1, 0)));
        assert!(!tx.mark_sol_ix_merged(sol_ix(1, 0)));
        assert!(tx.mark_sol_ix_merged(sol_ix(1, 1)));
    }
}
