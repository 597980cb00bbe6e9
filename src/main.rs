/// Neon EVM Instruction Decoder
///
/// Replays a dump of Neon program instructions and rebuilds the Neon transactions.
mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use neon_ix_decoder::extract::load_ix_dump;
use neon_ix_decoder::{Pipeline, PipelineConfig};

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    cli.validate().context("Invalid command-line arguments")?;

    println!("🚀 Starting Neon instruction decoder...");
    println!("📂 Instruction dump: {}", cli.input.display());

    let ix_list = load_ix_dump(&cli.input)
        .with_context(|| format!("Failed to load instruction dump {}", cli.input.display()))?;
    println!("✅ Loaded {} instructions", format_number(ix_list.len() as u64));

    let pipeline_config = PipelineConfig { start_slot: cli.start_slot, end_slot: cli.end_slot };
    let mut pipeline = Pipeline::new(pipeline_config).context("Failed to initialize decoder registry")?;

    let stats = pipeline.run(ix_list);
    pipeline.print_final_stats(&stats);

    if cli.json {
        let tx_list: Vec<_> = pipeline.block().iter_done_neon_tx().map(|tx| tx.to_json()).collect();
        let report = serde_json::to_string_pretty(&tx_list).context("Failed to serialize Neon transactions")?;
        println!("{}", report);
    }

    if cli.strict && stats.ixs_skipped > 0 {
        anyhow::bail!("{} instructions were skipped", stats.ixs_skipped);
    }

    tracing::info!("Neon instruction decoder finished");
    Ok(())
}

/// Format a number with thousand separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}
