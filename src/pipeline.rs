/// Pipeline Module
///
/// Replays an ordered stream of Neon instruction contexts through the decoder
/// registry against one block store, with statistics tracking.
use crate::indexer::block::NeonIndexedBlock;
use crate::indexer::decoders::{IxDecoder, IxDecoderRegistry, RegistryError};
use crate::models::SolNeonIx;
use crate::tx_codec::{RlpTxCodec, TxCodec};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Per-opcode counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IxCodeStats {
    pub name: &'static str,
    pub decoded: usize,
    pub skipped: usize,
}

/// Pipeline execution statistics
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub ixs_attempted: usize,
    pub ixs_decoded: usize,
    pub ixs_skipped: usize,
    pub ixs_out_of_range: usize,
    pub failed_sol_txs: usize,
    pub txs_done: usize,
    pub txs_pending: usize,
    pub holders_done: usize,
    pub accounts_registered: usize,
    pub ix_code_stats: BTreeMap<u8, IxCodeStats>,
    pub elapsed_time: Duration,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_rate(&self) -> f64 {
        if self.ixs_attempted == 0 {
            0.0
        } else {
            (self.ixs_decoded as f64 / self.ixs_attempted as f64) * 100.0
        }
    }

    pub fn ixs_per_second(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.ixs_attempted as f64 / secs
        }
    }

    fn add_ix_result(&mut self, ix_code: u8, name: &'static str, is_decoded: bool) {
        let entry = self.ix_code_stats.entry(ix_code).or_insert_with(|| IxCodeStats { name, ..Default::default() });
        if is_decoded {
            self.ixs_decoded += 1;
            entry.decoded += 1;
        } else {
            self.ixs_skipped += 1;
            entry.skipped += 1;
        }
    }
}

/// Configuration for pipeline execution
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub start_slot: Option<u64>,
    pub end_slot: Option<u64>,
}

impl PipelineConfig {
    pub fn contains(&self, block_slot: u64) -> bool {
        self.start_slot.map_or(true, |start| block_slot >= start) && self.end_slot.map_or(true, |end| block_slot <= end)
    }
}

/// Main decoding pipeline
pub struct Pipeline<C: TxCodec = RlpTxCodec> {
    registry: IxDecoderRegistry,
    block: NeonIndexedBlock,
    codec: C,
    config: PipelineConfig,
}

impl Pipeline<RlpTxCodec> {
    /// Create a pipeline with the active decoder registry and the RLP codec
    pub fn new(config: PipelineConfig) -> Result<Self, RegistryError> {
        Ok(Self::with_codec(IxDecoderRegistry::new()?, RlpTxCodec, config))
    }
}

impl<C: TxCodec> Pipeline<C> {
    pub fn with_codec(registry: IxDecoderRegistry, codec: C, config: PipelineConfig) -> Self {
        Self { registry, block: NeonIndexedBlock::new(), codec, config }
    }

    pub fn block(&self) -> &NeonIndexedBlock {
        &self.block
    }

    /// Decode one instruction; returns true if it was processed
    pub fn process_ix(&mut self, ix: &mut SolNeonIx) -> bool {
        let desc = *self.registry.decoder_for(ix);
        let is_sol_tx_failed = ix.is_sol_tx_failed;
        let mut decoder = IxDecoder::new(desc, ix, &mut self.block, &self.codec);
        if is_sol_tx_failed {
            decoder.decode_failed_neon_tx_event_list()
        } else {
            decoder.execute()
        }
    }

    /// Run the instruction stream in ledger order
    pub fn run(&mut self, mut ix_list: Vec<SolNeonIx>) -> PipelineStats {
        let start_time = Instant::now();
        let mut stats = PipelineStats::new();

        tracing::info!(
            "Starting pipeline for {} instructions, slots {:?} to {:?}",
            ix_list.len(),
            self.config.start_slot,
            self.config.end_slot
        );

        ix_list.sort_by_key(|ix| ix.sol_ix.order_key());

        for ix in ix_list.iter_mut() {
            if !self.config.contains(ix.block_slot()) {
                stats.ixs_out_of_range += 1;
                continue;
            }

            stats.ixs_attempted += 1;
            if ix.is_sol_tx_failed {
                stats.failed_sol_txs += 1;
            }

            let desc = *self.registry.decoder_for(ix);
            let is_decoded = self.process_ix(ix);
            stats.add_ix_result(ix.ix_code().unwrap_or(desc.ix_code), desc.name, is_decoded);
        }

        stats.txs_done = self.block.iter_done_neon_tx().count();
        stats.txs_pending = self.block.iter_pending_neon_tx().count();
        stats.holders_done = self.block.done_neon_tx_holder_cnt();
        stats.accounts_registered = self.block.neon_account_cnt();
        stats.elapsed_time = start_time.elapsed();

        tracing::info!(
            "Pipeline complete: {} decoded, {} skipped, {} Neon txs done, {} pending",
            stats.ixs_decoded,
            stats.ixs_skipped,
            stats.txs_done,
            stats.txs_pending
        );

        stats
    }

    /// Print final statistics
    pub fn print_final_stats(&self, stats: &PipelineStats) {
        println!("\n📊 Pipeline Statistics:");
        println!("   ⏱️  Total time: {:.2}s", stats.elapsed_time.as_secs_f64());
        println!(
            "   📦 Instructions: {} attempted, {} decoded, {} skipped, {} out of range",
            stats.ixs_attempted, stats.ixs_decoded, stats.ixs_skipped, stats.ixs_out_of_range
        );
        println!("   ✅ Success rate: {:.1}%", stats.success_rate());
        println!("   ❌ Failed Solana txs: {}", stats.failed_sol_txs);
        println!("   📝 Neon txs: {} done, {} pending", stats.txs_done, stats.txs_pending);
        println!("   💾 Holders done: {}", stats.holders_done);
        println!("   👤 Neon accounts registered: {}", stats.accounts_registered);
        println!("   ⚡ Speed: {:.0} ixs/sec", stats.ixs_per_second());

        if !stats.ix_code_stats.is_empty() {
            println!("\n🔍 By instruction:");
            for (ix_code, ix_stats) in &stats.ix_code_stats {
                println!(
                    "   0x{:02x} {:<40} {} decoded, {} skipped",
                    ix_code, ix_stats.name, ix_stats.decoded, ix_stats.skipped
                );
            }
        }
    }
}
