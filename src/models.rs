/// Data Models Module
///
/// Core data structures shared by the decoders: the per-instruction context
/// (`SolNeonIx`), the events and return status extracted from Neon program
/// logs, and the Neon account entries registered by `CreateAccount3`.
use ethereum_types::{H160, H256};
use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use std::fmt;

/// Hash of a signed Neon (EVM) transaction
pub type NeonTxSig = H256;

/// Position of one Solana instruction in the ledger
///
/// Instructions are processed strictly in `order_key()` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SolIxInfo {
    pub block_slot: u64,
    pub sol_sig: Signature,
    pub tx_idx: u32,
    pub idx: u32,
    pub inner_idx: Option<u32>,
}

impl SolIxInfo {
    pub fn new(block_slot: u64, sol_sig: Signature, tx_idx: u32, idx: u32, inner_idx: Option<u32>) -> Self {
        Self { block_slot, sol_sig, tx_idx, idx, inner_idx }
    }

    /// Ledger order: slot, transaction index, instruction index, inner index
    pub fn order_key(&self) -> (u64, u32, u32, Option<u32>) {
        (self.block_slot, self.tx_idx, self.idx, self.inner_idx)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "block_slot": self.block_slot,
            "sol_sig": self.sol_sig.to_string(),
            "tx_idx": self.tx_idx,
            "idx": self.idx,
            "inner_idx": self.inner_idx,
        })
    }
}

impl fmt::Display for SolIxInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner_idx {
            Some(inner_idx) => write!(f, "{}:{}:{}:{}", self.block_slot, self.sol_sig, self.idx, inner_idx),
            None => write!(f, "{}:{}:{}", self.block_slot, self.sol_sig, self.idx),
        }
    }
}

/// Kinds of events the Neon EVM program reports in its logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeonLogTxEventType {
    Log,
    EnterCall,
    EnterCallCode,
    EnterStaticCall,
    EnterDelegateCall,
    EnterCreate,
    EnterCreate2,
    ExitStop,
    ExitReturn,
    ExitSelfDestruct,
    ExitRevert,
    ExitSendAll,
    Return,
    Cancel,
}

impl NeonLogTxEventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Log => "Log",
            Self::EnterCall => "EnterCall",
            Self::EnterCallCode => "EnterCallCode",
            Self::EnterStaticCall => "EnterStaticCall",
            Self::EnterDelegateCall => "EnterDelegateCall",
            Self::EnterCreate => "EnterCreate",
            Self::EnterCreate2 => "EnterCreate2",
            Self::ExitStop => "ExitStop",
            Self::ExitReturn => "ExitReturn",
            Self::ExitSelfDestruct => "ExitSelfDestruct",
            Self::ExitRevert => "ExitRevert",
            Self::ExitSendAll => "ExitSendAll",
            Self::Return => "Return",
            Self::Cancel => "Cancel",
        }
    }
}

/// One event decoded from the logs of a Solana instruction
///
/// `total_gas_used` is the ordering key inside a Neon transaction and `sol_ix`
/// is the provenance; both are filled in when the event is merged into a
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeonLogTxEvent {
    pub event_type: NeonLogTxEventType,
    pub is_hidden: bool,
    pub address: Option<H160>,
    pub topic_list: Vec<H256>,
    pub data: Vec<u8>,
    pub total_gas_used: u64,
    pub is_reverted: bool,
    pub sol_ix: Option<SolIxInfo>,
}

impl NeonLogTxEvent {
    pub fn new(event_type: NeonLogTxEventType, address: Option<H160>, topic_list: Vec<H256>, data: Vec<u8>) -> Self {
        Self {
            event_type,
            is_hidden: false,
            address,
            topic_list,
            data,
            total_gas_used: 0,
            is_reverted: false,
            sol_ix: None,
        }
    }

    /// Hidden terminal event carrying the one-byte status of the transaction
    pub fn new_terminal(event_type: NeonLogTxEventType, status: u8, total_gas_used: u64, sol_ix: SolIxInfo) -> Self {
        Self {
            event_type,
            is_hidden: true,
            address: None,
            topic_list: Vec::new(),
            data: vec![status],
            total_gas_used,
            is_reverted: false,
            sol_ix: Some(sol_ix),
        }
    }

    /// Hidden Return or Cancel event closing the transaction
    pub fn is_terminal(&self) -> bool {
        self.is_hidden && matches!(self.event_type, NeonLogTxEventType::Return | NeonLogTxEventType::Cancel)
    }

    /// Copy of the event placed at `total_gas_used` and attributed to `sol_ix`
    pub fn placed_at(&self, total_gas_used: u64, sol_ix: SolIxInfo) -> Self {
        Self { total_gas_used, sol_ix: Some(sol_ix), ..self.clone() }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "event_type": self.event_type.as_str(),
            "is_hidden": self.is_hidden,
            "is_reverted": self.is_reverted,
            "address": self.address.map(|a| format!("{:?}", a)),
            "topic_list": self.topic_list.iter().map(|t| format!("{:?}", t)).collect::<Vec<_>>(),
            "data": format!("0x{}", hex::encode(&self.data)),
            "total_gas_used": self.total_gas_used,
            "sol_ix": self.sol_ix.map(|ix| ix.to_json()),
        })
    }
}

/// Return status reported by the Neon program when a transaction completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeonLogTxReturn {
    pub status: u8,
    pub gas_used: u64,
}

/// A Neon account created on-chain by `CreateAccount3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeonAccountInfo {
    pub neon_address: H160,
    pub pda_account: Pubkey,
    pub block_slot: u64,
    pub sol_sig: Signature,
}

impl fmt::Display for NeonAccountInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NeonAccount({:?} -> {} at slot {})", self.neon_address, self.pda_account, self.block_slot)
    }
}

/// Per-instruction view handed to a decoder
///
/// Holds the raw instruction (opcode + payload, accounts), the data already
/// extracted from the program logs, and the ledger position.
#[derive(Debug, Clone)]
pub struct SolNeonIx {
    pub sol_ix: SolIxInfo,
    pub ix_data: Vec<u8>,
    pub account_list: Vec<Pubkey>,
    pub neon_tx_sig: Option<NeonTxSig>,
    pub neon_tx_event_list: Vec<NeonLogTxEvent>,
    pub neon_tx_return: Option<NeonLogTxReturn>,
    pub neon_total_gas_used: u64,
    pub is_log_truncated: bool,
    pub is_sol_tx_failed: bool,
    neon_step_cnt: Option<u32>,
}

impl SolNeonIx {
    pub fn new(sol_ix: SolIxInfo, ix_data: Vec<u8>, account_list: Vec<Pubkey>) -> Self {
        Self {
            sol_ix,
            ix_data,
            account_list,
            neon_tx_sig: None,
            neon_tx_event_list: Vec::new(),
            neon_tx_return: None,
            neon_total_gas_used: 0,
            is_log_truncated: false,
            is_sol_tx_failed: false,
            neon_step_cnt: None,
        }
    }

    /// First byte of the instruction data
    pub fn ix_code(&self) -> Option<u8> {
        self.ix_data.first().copied()
    }

    pub fn block_slot(&self) -> u64 {
        self.sol_ix.block_slot
    }

    pub fn account_cnt(&self) -> usize {
        self.account_list.len()
    }

    pub fn get_account(&self, idx: usize) -> Option<&Pubkey> {
        self.account_list.get(idx)
    }

    /// Accounts starting at `start_idx`, empty if there are not that many
    pub fn iter_account(&self, start_idx: usize) -> &[Pubkey] {
        self.account_list.get(start_idx..).unwrap_or(&[])
    }

    pub fn neon_step_cnt(&self) -> Option<u32> {
        self.neon_step_cnt
    }

    /// The step count can only be declared once per instruction
    pub fn set_neon_step_cnt(&mut self, neon_step_cnt: u32) {
        match self.neon_step_cnt {
            None => self.neon_step_cnt = Some(neon_step_cnt),
            Some(prev) if prev != neon_step_cnt => {
                tracing::warn!("Ignore Neon step cnt {} for {}: already declared as {}", neon_step_cnt, self, prev);
            }
            Some(_) => {}
        }
    }
}

impl fmt::Display for SolNeonIx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sol_ix)
    }
}
