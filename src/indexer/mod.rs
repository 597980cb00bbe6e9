/// Indexer Module
///
/// Assembly of Neon transactions out of Solana instructions:
/// - tx: the resumable Neon transaction record
/// - holder: the chunked buffer staging an oversized transaction payload
/// - block: the store owning both for the open slot window
/// - decoders: one decoder per Neon program instruction
pub mod block;
pub mod decoders;
pub mod holder;
pub mod tx;

pub use block::{NeonBlockStore, NeonIndexedBlock};
pub use holder::{DataChunk, NeonHolderKey, NeonIndexedHolder};
pub use tx::{NeonIndexedTx, NeonIndexedTxType, NeonTxResult, NeonTxStage};

/// Terminal state shared by transaction and holder records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeonIndexedStatus {
    #[default]
    InProgress,
    Done,
}
