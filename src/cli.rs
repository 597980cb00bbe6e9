/// CLI Module
///
/// Command-line interface configuration using clap.
use clap::Parser;
use std::path::PathBuf;

/// Neon EVM Instruction Decoder
///
/// Replay a JSON dump of Neon program instructions and rebuild the Neon transactions
#[derive(Parser, Debug)]
#[command(name = "neon-ix-decoder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Instruction dump to replay (JSON array of instruction records)
    #[arg(value_name = "FILE", env = "NEON_IX_DUMP")]
    pub input: PathBuf,

    /// First slot to decode
    #[arg(short = 's', long, value_name = "SLOT")]
    pub start_slot: Option<u64>,

    /// Last slot to decode
    #[arg(short = 'e', long, value_name = "SLOT")]
    pub end_slot: Option<u64>,

    /// Print finalized Neon transactions as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with an error if any instruction was skipped
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if let (Some(start), Some(end)) = (self.start_slot, self.end_slot) {
            if start > end {
                anyhow::bail!("Start slot ({}) must be less than or equal to end slot ({})", start, end);
            }
        }

        if self.input.as_os_str().is_empty() {
            anyhow::bail!("Instruction dump path must not be empty");
        }

        Ok(())
    }
}
