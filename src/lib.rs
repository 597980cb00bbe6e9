/// Neon EVM Instruction Decoder
///
/// Rebuilds Neon (EVM) transactions from the stream of Neon program
/// instructions recorded on Solana. Each instruction is decoded by its opcode
/// against a block store; multi-instruction transactions are assembled across
/// calls and finalized once their result is known.
pub mod extract;
pub mod indexer;
pub mod models;
pub mod pipeline;
pub mod tx_codec;

#[cfg(test)]
mod test_utils;

pub use indexer::decoders::{IxDecoder, IxDecoderRegistry, RegistryError};
pub use pipeline::{Pipeline, PipelineConfig, PipelineStats};
pub use tx_codec::{NeonTxInfo, RlpTxCodec, TxCodec, TxDecodeError};
