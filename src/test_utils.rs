/// Test Fixtures
///
/// Hand-built transactions, accounts and instruction layouts shared by the unit tests.
use ethereum_types::{H160, U256};
use rlp::RlpStream;
use solana_pubkey::Pubkey;
use solana_signature::Signature;

use crate::models::{NeonLogTxEvent, NeonLogTxEventType, NeonTxSig, SolIxInfo, SolNeonIx};

/// Signed legacy transaction; `chain_id = None` gives the pre-EIP-155 form
pub fn legacy_tx_bytes(nonce: u64, chain_id: Option<u64>) -> Vec<u8> {
    let v = chain_id.map(|id| id * 2 + 35).unwrap_or(27);

    let mut s = RlpStream::new_list(9);
    s.append(&nonce);
    s.append(&U256::from(1_000_000_000u64));
    s.append(&U256::from(21_000u64));
    s.append(&H160::repeat_byte(0x11));
    s.append(&U256::from(1_000_000u64));
    s.append(&vec![0xdeu8, 0xad, 0xbe, 0xef]);
    s.append(&v);
    s.append(&U256::from(0x1234u64));
    s.append(&U256::from(0x5678u64));
    s.out().to_vec()
}

/// Signed EIP-1559 contract deployment
pub fn typed_tx_bytes(nonce: u64) -> Vec<u8> {
    let mut s = RlpStream::new_list(12);
    s.append(&111u64);
    s.append(&nonce);
    s.append(&U256::from(2u64));
    s.append(&U256::from(30u64));
    s.append(&U256::from(100_000u64));
    s.append_empty_data();
    s.append(&U256::zero());
    s.append(&vec![0x60u8, 0x80]);
    s.begin_list(0);
    s.append(&1u64);
    s.append(&U256::from(0x1234u64));
    s.append(&U256::from(0x5678u64));

    let mut data = vec![0x02u8];
    data.extend_from_slice(&s.out());
    data
}

pub fn tx_sig(data: &[u8]) -> NeonTxSig {
    keccak_hash::keccak(data)
}

pub fn pubkey(n: u8) -> Pubkey {
    Pubkey::new_from_array([n; 32])
}

pub fn account_list(cnt: u8) -> Vec<Pubkey> {
    (1..=cnt).map(pubkey).collect()
}

pub fn sol_ix(slot: u64, idx: u32) -> SolIxInfo {
    SolIxInfo::new(slot, Signature::from([slot as u8; 64]), 0, idx, None)
}

/// Instruction context with the given log signature and no log events
pub fn neon_ix(slot: u64, ix_data: Vec<u8>, account_list: Vec<Pubkey>, neon_tx_sig: Option<NeonTxSig>) -> SolNeonIx {
    let mut ix = SolNeonIx::new(sol_ix(slot, 0), ix_data, account_list);
    ix.neon_tx_sig = neon_tx_sig;
    ix
}

pub fn log_event(n: u8) -> NeonLogTxEvent {
    NeonLogTxEvent::new(NeonLogTxEventType::Log, Some(H160::repeat_byte(n)), Vec::new(), vec![n])
}

/// opcode | treasury idx | step cnt | unique idx | payload
pub fn step_ix_data(ix_code: u8, step_cnt: u32, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![ix_code];
    data.extend_from_slice(&3u32.to_le_bytes());
    data.extend_from_slice(&step_cnt.to_le_bytes());
    data.extend_from_slice(&42u32.to_le_bytes());
    data.extend_from_slice(payload);
    data
}

/// opcode | treasury idx | payload
pub fn exec_ix_data(ix_code: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![ix_code];
    data.extend_from_slice(&3u32.to_le_bytes());
    data.extend_from_slice(payload);
    data
}

/// 0x26 | tx hash | offset | chunk
pub fn write_holder_ix_data(neon_tx_sig: &NeonTxSig, offset: u64, chunk: &[u8]) -> Vec<u8> {
    let mut data = vec![0x26u8];
    data.extend_from_slice(neon_tx_sig.as_bytes());
    data.extend_from_slice(&offset.to_le_bytes());
    data.extend_from_slice(chunk);
    data
}
