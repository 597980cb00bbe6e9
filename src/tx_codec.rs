/// Transaction Codec Module
///
/// Turns the signed RLP bytes of a Neon (EVM) transaction into `NeonTxInfo`.
/// The transaction hash is keccak-256 over the signed bytes, which is what the
/// Neon program prints into its logs.
use ethereum_types::{H160, H256, U256};
use rlp::Rlp;
use std::fmt;

use crate::models::NeonTxSig;

/// Error returned when raw transaction bytes cannot be decoded
#[derive(Debug, thiserror::Error)]
pub enum TxDecodeError {
    #[error("empty transaction data")]
    Empty,

    #[error("unsupported transaction type 0x{0:02x}")]
    UnsupportedType(u8),

    #[error("expected {expected} rlp items, got {actual}")]
    ItemCount { expected: usize, actual: usize },

    #[error("{0} trailing bytes after rlp payload")]
    TrailingBytes(usize),

    #[error("rlp error: {0}")]
    Rlp(#[from] rlp::DecoderError),
}

/// Decoded Neon transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeonTxInfo {
    pub sig: NeonTxSig,
    pub tx_type: u8,
    pub chain_id: Option<u64>,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub to_address: Option<H160>,
    pub value: U256,
    pub call_data: Vec<u8>,
}

impl NeonTxInfo {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sig": format!("{:?}", self.sig),
            "tx_type": self.tx_type,
            "chain_id": self.chain_id,
            "nonce": self.nonce,
            "gas_price": self.gas_price.to_string(),
            "gas_limit": self.gas_limit.to_string(),
            "to_address": self.to_address.map(|a| format!("{:?}", a)),
            "value": self.value.to_string(),
            "call_data": format!("0x{}", hex::encode(&self.call_data)),
        })
    }
}

impl fmt::Display for NeonTxInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NeonTx({:?}, nonce {})", self.sig, self.nonce)
    }
}

/// Decoder for signed transaction bytes
///
/// Implementations must never panic on malformed input.
pub trait TxCodec {
    fn decode_raw_tx(&self, data: &[u8]) -> Result<NeonTxInfo, TxDecodeError>;
}

const LEGACY_TX_TYPE: u8 = 0x00;
const ACCESS_LIST_TX_TYPE: u8 = 0x01;
const DYNAMIC_FEE_TX_TYPE: u8 = 0x02;

/// Codec for legacy, EIP-2930 and EIP-1559 transactions
#[derive(Debug, Default, Clone, Copy)]
pub struct RlpTxCodec;

impl TxCodec for RlpTxCodec {
    fn decode_raw_tx(&self, data: &[u8]) -> Result<NeonTxInfo, TxDecodeError> {
        let first = *data.first().ok_or(TxDecodeError::Empty)?;
        let sig = keccak_hash::keccak(data);

        match first {
            0xc0..=0xff => decode_legacy(sig, data),
            ACCESS_LIST_TX_TYPE | DYNAMIC_FEE_TX_TYPE => decode_typed(sig, first, &data[1..]),
            _ => Err(TxDecodeError::UnsupportedType(first)),
        }
    }
}

/// Open the rlp list and check it spans the whole input
fn open_list(data: &[u8], expected: usize) -> Result<Rlp<'_>, TxDecodeError> {
    let rlp = Rlp::new(data);
    let total = rlp.payload_info()?.total();
    if total > data.len() {
        return Err(TxDecodeError::Rlp(rlp::DecoderError::RlpIsTooShort));
    } else if total < data.len() {
        return Err(TxDecodeError::TrailingBytes(data.len() - total));
    }

    let actual = rlp.item_count()?;
    if actual != expected {
        return Err(TxDecodeError::ItemCount { expected, actual });
    }

    Ok(rlp)
}

fn decode_to_address(rlp: &Rlp<'_>, idx: usize) -> Result<Option<H160>, TxDecodeError> {
    let item = rlp.at(idx)?;
    if item.is_empty() {
        return Ok(None);
    }
    Ok(Some(item.as_val::<H160>()?))
}

// [nonce, gas_price, gas_limit, to, value, data, v, r, s]
fn decode_legacy(sig: H256, data: &[u8]) -> Result<NeonTxInfo, TxDecodeError> {
    let rlp = open_list(data, 9)?;

    // EIP-155: v = chain_id * 2 + 35 + {0, 1}; 27/28 means no chain-id
    let v: u64 = rlp.val_at(6)?;
    let chain_id = if v >= 35 { Some((v - 35) / 2) } else { None };

    Ok(NeonTxInfo {
        sig,
        tx_type: LEGACY_TX_TYPE,
        chain_id,
        nonce: rlp.val_at(0)?,
        gas_price: rlp.val_at(1)?,
        gas_limit: rlp.val_at(2)?,
        to_address: decode_to_address(&rlp, 3)?,
        value: rlp.val_at(4)?,
        call_data: rlp.val_at(5)?,
    })
}

// 0x01: [chain_id, nonce, gas_price, gas_limit, to, value, data, access_list, y, r, s]
// 0x02: [chain_id, nonce, max_priority_fee, max_fee, gas_limit, to, value, data, access_list, y, r, s]
fn decode_typed(sig: H256, tx_type: u8, data: &[u8]) -> Result<NeonTxInfo, TxDecodeError> {
    let shift = if tx_type == DYNAMIC_FEE_TX_TYPE { 1 } else { 0 };
    let rlp = open_list(data, 11 + shift)?;

    Ok(NeonTxInfo {
        sig,
        tx_type,
        chain_id: Some(rlp.val_at(0)?),
        nonce: rlp.val_at(1)?,
        gas_price: rlp.val_at(2 + shift)?,
        gas_limit: rlp.val_at(3 + shift)?,
        to_address: decode_to_address(&rlp, 4 + shift)?,
        value: rlp.val_at(5 + shift)?,
        call_data: rlp.val_at(6 + shift)?,
    })
}
