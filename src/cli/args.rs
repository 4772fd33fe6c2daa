// CLI argument definitions using Clap

use clap::Parser;
use std::path::PathBuf;

/// Streaming JSONL test-event reporter
#[derive(Parser, Debug)]
#[command(name = "specstream")]
#[command(author = "specstream team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stream test lifecycle events as JSON Lines", long_about = None)]
pub struct Cli {
    /// Write the event stream to a file instead of stdout
    #[arg(short = 'o', long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,

    /// Tag every emitted record with a sender field
    #[arg(long, value_name = "TAG")]
    pub sender: Option<String>,

    /// Disable per-example stdout capture
    #[arg(long, default_value_t = false)]
    pub no_capture: bool,

    /// Enable verbose debug output
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Install shell completion (bash, zsh, fish, elvish, powershell)
    #[arg(long, value_name = "SHELL_TYPE", value_parser = ["bash", "zsh", "fish", "elvish", "powershell"])]
    pub completion: Option<String>,
}

impl Cli {
    /// Whether example bodies run under stdout capture
    pub fn capture_enabled(&self) -> bool {
        !self.no_capture
    }
}
