/// Block Store Module
///
/// The store owns every transaction, holder and account record of the open
/// slot window. Decoders only borrow records for one instruction and address
/// them by key.
use ethereum_types::H160;
use std::collections::HashMap;

use super::holder::{NeonHolderKey, NeonIndexedHolder};
use super::tx::NeonIndexedTx;
use crate::models::{NeonAccountInfo, NeonTxSig, SolIxInfo};

/// Record store the decoders work against
pub trait NeonBlockStore {
    fn find_neon_tx(&self, neon_tx_sig: &NeonTxSig) -> Option<&NeonIndexedTx>;

    fn find_neon_tx_mut(&mut self, neon_tx_sig: &NeonTxSig) -> Option<&mut NeonIndexedTx>;

    /// Insert a new record; an existing record with the same key is kept
    fn add_neon_tx(&mut self, tx: NeonIndexedTx) -> &mut NeonIndexedTx;

    /// Finalize the transaction; called once per record
    fn done_neon_tx(&mut self, neon_tx_sig: &NeonTxSig, sol_ix: &SolIxInfo);

    fn find_neon_tx_holder(&self, key: &NeonHolderKey) -> Option<&NeonIndexedHolder>;

    fn find_neon_tx_holder_mut(&mut self, key: &NeonHolderKey) -> Option<&mut NeonIndexedHolder>;

    /// Insert a new record; an existing record with the same key is kept
    fn add_neon_tx_holder(&mut self, holder: NeonIndexedHolder) -> &mut NeonIndexedHolder;

    fn done_neon_tx_holder(&mut self, key: &NeonHolderKey);

    /// Register an account; the first registration of an address wins
    fn add_neon_account(&mut self, account: NeonAccountInfo);
}

/// In-memory store for one replay pass
#[derive(Debug, Default)]
pub struct NeonIndexedBlock {
    tx_map: HashMap<NeonTxSig, NeonIndexedTx>,
    holder_map: HashMap<NeonHolderKey, NeonIndexedHolder>,
    account_map: HashMap<H160, NeonAccountInfo>,
    done_tx_list: Vec<NeonTxSig>,
    done_holder_cnt: usize,
}

impl NeonIndexedBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn neon_tx_cnt(&self) -> usize {
        self.tx_map.len()
    }

    pub fn neon_tx_holder_cnt(&self) -> usize {
        self.holder_map.len()
    }

    pub fn done_neon_tx_holder_cnt(&self) -> usize {
        self.done_holder_cnt
    }

    /// Finalized transactions in the order they were completed
    pub fn iter_done_neon_tx(&self) -> impl Iterator<Item = &NeonIndexedTx> {
        self.done_tx_list.iter().filter_map(|sig| self.tx_map.get(sig))
    }

    /// Transactions that are still waiting for their result or payload
    pub fn iter_pending_neon_tx(&self) -> impl Iterator<Item = &NeonIndexedTx> {
        self.tx_map.values().filter(|tx| !tx.is_done())
    }

    pub fn neon_account(&self, neon_address: &H160) -> Option<&NeonAccountInfo> {
        self.account_map.get(neon_address)
    }

    pub fn neon_account_cnt(&self) -> usize {
        self.account_map.len()
    }
}

impl NeonBlockStore for NeonIndexedBlock {
    fn find_neon_tx(&self, neon_tx_sig: &NeonTxSig) -> Option<&NeonIndexedTx> {
        self.tx_map.get(neon_tx_sig)
    }

    fn find_neon_tx_mut(&mut self, neon_tx_sig: &NeonTxSig) -> Option<&mut NeonIndexedTx> {
        self.tx_map.get_mut(neon_tx_sig)
    }

    fn add_neon_tx(&mut self, tx: NeonIndexedTx) -> &mut NeonIndexedTx {
        tracing::debug!("Add {}", tx);
        self.tx_map.entry(*tx.neon_tx_sig()).or_insert(tx)
    }

    fn done_neon_tx(&mut self, neon_tx_sig: &NeonTxSig, sol_ix: &SolIxInfo) {
        let Some(tx) = self.tx_map.get_mut(neon_tx_sig) else {
            tracing::warn!("Cannot finalize unknown Neon tx {:?} at {}", neon_tx_sig, sol_ix);
            return;
        };
        if tx.is_done() {
            return;
        }

        tx.sort_neon_event_list();
        tx.mark_done();
        self.done_tx_list.push(*neon_tx_sig);
        tracing::debug!("Done {} at {}", tx, sol_ix);
    }

    fn find_neon_tx_holder(&self, key: &NeonHolderKey) -> Option<&NeonIndexedHolder> {
        self.holder_map.get(key)
    }

    fn find_neon_tx_holder_mut(&mut self, key: &NeonHolderKey) -> Option<&mut NeonIndexedHolder> {
        self.holder_map.get_mut(key)
    }

    fn add_neon_tx_holder(&mut self, holder: NeonIndexedHolder) -> &mut NeonIndexedHolder {
        tracing::debug!("Add {}", holder);
        self.holder_map.entry(*holder.key()).or_insert(holder)
    }

    fn done_neon_tx_holder(&mut self, key: &NeonHolderKey) {
        if let Some(holder) = self.holder_map.get_mut(key) {
            if !holder.is_done() {
                holder.mark_done();
                self.done_holder_cnt += 1;
            }
        }
    }

    fn add_neon_account(&mut self, account: NeonAccountInfo) {
        if let Some(prev) = self.account_map.get(&account.neon_address) {
            tracing::debug!("Keep {}: already registered as {}", account, prev);
            return;
        }
        self.account_map.insert(account.neon_address, account);
    }
}
