//! Flag overlay on top of the env-var configuration (spec.md §9
//! "Configuration"), in the style of the teacher's `clap::Parser` derive
//! on its top-level `Cli` struct — a handful of operational overrides,
//! everything else stays env-var only.

use clap::Parser;
use std::net::SocketAddr;

#[derive(Debug, Parser)]
#[command(name = "chessmate", about = "Chess game search server and embedding workers")]
pub struct Cli {
    /// Overrides CHESSMATE_BIND_ADDR.
    #[arg(long)]
    pub bind_addr: Option<SocketAddr>,

    /// Overrides CHESSMATE_WORKER_COUNT.
    #[arg(long)]
    pub worker_count: Option<usize>,
}
