/// Extract Module
///
/// Reads a JSON dump of Neon instruction contexts: one record per Solana
/// instruction of the Neon program, with the data already extracted from
/// its logs. Ledger keys and signatures are base58, byte fields are hex
/// (`0x` prefix optional), EVM hashes and addresses are `0x`-hex.
use crate::models::{NeonLogTxEvent, NeonLogTxEventType, NeonLogTxReturn, NeonTxSig, SolIxInfo, SolNeonIx};
use ethereum_types::{H160, H256};
use serde::Deserialize;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read instruction dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed instruction dump: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record {record_idx}: invalid account key {value}")]
    InvalidPubkey { record_idx: usize, value: String },

    #[error("record {record_idx}: invalid Solana signature {value}")]
    InvalidSignature { record_idx: usize, value: String },

    #[error("record {record_idx}: invalid hex in {field}: {source}")]
    Hex {
        record_idx: usize,
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },
}

/// One event as it appears in the dump
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub event_type: NeonLogTxEventType,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_reverted: bool,
    #[serde(default)]
    pub address: Option<H160>,
    #[serde(default)]
    pub topic_list: Vec<H256>,
    #[serde(default)]
    pub data: String,
}

/// One instruction as it appears in the dump
#[derive(Debug, Clone, Deserialize)]
pub struct IxRecord {
    pub block_slot: u64,
    pub sol_sig: String,
    #[serde(default)]
    pub tx_idx: u32,
    pub idx: u32,
    #[serde(default)]
    pub inner_idx: Option<u32>,
    pub ix_data: String,
    #[serde(default)]
    pub account_list: Vec<String>,
    #[serde(default)]
    pub neon_tx_sig: Option<NeonTxSig>,
    #[serde(default)]
    pub neon_tx_event_list: Vec<EventRecord>,
    #[serde(default)]
    pub neon_tx_return: Option<NeonLogTxReturn>,
    #[serde(default)]
    pub neon_total_gas_used: u64,
    #[serde(default)]
    pub is_log_truncated: bool,
    #[serde(default)]
    pub is_sol_tx_failed: bool,
}

fn decode_hex(record_idx: usize, field: &'static str, value: &str) -> Result<Vec<u8>, ExtractError> {
    let value = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(value).map_err(|source| ExtractError::Hex { record_idx, field, source })
}

impl IxRecord {
    /// Convert into the instruction context handed to the decoders
    pub fn into_neon_ix(self, record_idx: usize) -> Result<SolNeonIx, ExtractError> {
        let sol_sig = Signature::from_str(&self.sol_sig)
            .map_err(|_| ExtractError::InvalidSignature { record_idx, value: self.sol_sig.clone() })?;

        let account_list = self
            .account_list
            .iter()
            .map(|key| Pubkey::from_str(key).map_err(|_| ExtractError::InvalidPubkey { record_idx, value: key.clone() }))
            .collect::<Result<Vec<_>, _>>()?;

        let ix_data = decode_hex(record_idx, "ix_data", &self.ix_data)?;

        let mut neon_tx_event_list = Vec::with_capacity(self.neon_tx_event_list.len());
        for event in self.neon_tx_event_list {
            let data = decode_hex(record_idx, "event data", &event.data)?;
            let mut neon_event = NeonLogTxEvent::new(event.event_type, event.address, event.topic_list, data);
            neon_event.is_hidden = event.is_hidden;
            neon_event.is_reverted = event.is_reverted;
            neon_tx_event_list.push(neon_event);
        }

        let sol_ix = SolIxInfo::new(self.block_slot, sol_sig, self.tx_idx, self.idx, self.inner_idx);
        let mut ix = SolNeonIx::new(sol_ix, ix_data, account_list);
        ix.neon_tx_sig = self.neon_tx_sig;
        ix.neon_tx_event_list = neon_tx_event_list;
        ix.neon_tx_return = self.neon_tx_return;
        ix.neon_total_gas_used = self.neon_total_gas_used;
        ix.is_log_truncated = self.is_log_truncated;
        ix.is_sol_tx_failed = self.is_sol_tx_failed;
        Ok(ix)
    }
}

/// Parse a JSON array of instruction records
pub fn parse_ix_dump(json: &str) -> Result<Vec<SolNeonIx>, ExtractError> {
    let record_list: Vec<IxRecord> = serde_json::from_str(json)?;
    tracing::debug!("Parsed {} instruction records", record_list.len());

    record_list.into_iter().enumerate().map(|(record_idx, record)| record.into_neon_ix(record_idx)).collect()
}

/// Read and parse an instruction dump file
pub fn load_ix_dump(path: impl AsRef<Path>) -> Result<Vec<SolNeonIx>, ExtractError> {
    let json = std::fs::read_to_string(path.as_ref())?;
    let ix_list = parse_ix_dump(&json)?;
    tracing::info!("Loaded {} instructions from {}", ix_list.len(), path.as_ref().display());
    Ok(ix_list)
}
