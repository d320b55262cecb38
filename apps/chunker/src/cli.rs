//! Command-line surface: `chunk` on the sending side, `assemble` to replay a
//! received transcript through the assembler.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use saveme_transfer::{Assembler, EncodeOptions, encode_transfer};

use crate::config::Config;
use crate::transcript::split_messages;

#[derive(Debug, Parser)]
#[command(version, about = "Send and receive files as chunked chat messages")]
pub struct Cli {
    /// Config file (defaults to the platform config path).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encode a file into protocol messages, separated by blank lines.
    Chunk(ChunkArgs),
    /// Feed a transcript of messages to the assembler and print one ack per message.
    Assemble(AssembleArgs),
}

#[derive(Debug, Args)]
pub struct ChunkArgs {
    /// File to send.
    #[arg(short, long)]
    pub file: PathBuf,

    /// Destination path below the receiver's root.
    #[arg(short, long)]
    pub dst: String,

    /// Base64 characters per chunk.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Send the file uncompressed.
    #[arg(long)]
    pub no_gzip: bool,

    /// Transfer id (random UUID when omitted).
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Debug, Args)]
pub struct AssembleArgs {
    /// Transcript file with one message per block.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Root directory for received files.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Channel the messages are attributed to.
    #[arg(long, default_value = "demo")]
    pub channel: String,
}

impl Cli {
    pub fn run(self, out: &mut impl Write) -> anyhow::Result<()> {
        let config = Config::load(self.config.as_deref())?;
        match self.command {
            Command::Chunk(args) => chunk(args, &config, out),
            Command::Assemble(args) => assemble(args, config, out),
        }
    }
}

fn chunk(args: ChunkArgs, config: &Config, out: &mut impl Write) -> anyhow::Result<()> {
    let data = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let options = EncodeOptions {
        chunk_size: args.chunk_size.unwrap_or(config.chunk_size),
        gzip: config.gzip && !args.no_gzip,
        transfer_id: args.id,
    };
    let encoded = encode_transfer(&data, &args.dst, &options)?;

    tracing::info!(
        id = %encoded.transfer_id,
        bytes = data.len(),
        total_parts = encoded.total_parts,
        sha256 = %encoded.sha256,
        "file chunked"
    );

    for message in &encoded.messages {
        writeln!(out, "{message}\n")?;
    }
    Ok(())
}

fn assemble(args: AssembleArgs, mut config: Config, out: &mut impl Write) -> anyhow::Result<()> {
    if let Some(root) = args.root {
        config.assembler.root_dir = root;
    }
    let assembler = Assembler::new(&config.assembler)?;
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    for block in split_messages(&text) {
        let outcome = assembler.on_message(&block, &args.channel);
        writeln!(out, "ACK: {}", serde_json::to_string(&outcome)?)?;
    }

    tracing::info!(
        channel = %args.channel,
        open_sessions = assembler.active_sessions(),
        "transcript replayed"
    );
    Ok(())
}
