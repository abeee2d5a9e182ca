//! sgeproto - compile schemas and encode/decode records from the shell

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sge_proto::{CodecConfig, Record, Schema};

#[derive(Parser)]
#[command(name = "sgeproto")]
#[command(about = "Compile block schemas and encode or decode records.", long_about = None)]
struct Cli {
    /// JSON file with codec limits (max_depth, max_payload)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a schema and print its blocks
    Check {
        schema: PathBuf,

        /// Print the compiled schema as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode a JSON record as the named block
    Encode {
        schema: PathBuf,
        block: String,

        /// JSON file holding the record, or `-` for stdin
        input: PathBuf,

        /// Write the frame here instead of printing it as hex
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a frame and print the record as JSON
    Decode {
        schema: PathBuf,

        /// Frame file, or `-` for stdin
        input: PathBuf,

        /// Input is hex text rather than raw bytes
        #[arg(long)]
        hex: bool,
    },
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match try_main() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Check { schema, json } => {
            let schema = load_schema(&schema)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                print!("{}", schema.dump());
            }
        }
        Command::Encode {
            schema,
            block,
            input,
            output,
        } => {
            let schema = load_schema(&schema)?;
            let text = read_input(&input)?;
            let json: serde_json::Value = serde_json::from_slice(&text)
                .with_context(|| format!("parse JSON from {}", input.display()))?;
            let record = Record::from_json(&json)?;

            let frame = sge_proto::encode_record_with(&schema, &block, &record, &config)?;
            match output {
                Some(path) => std::fs::write(&path, &frame)
                    .with_context(|| format!("write {}", path.display()))?,
                None => println!("{}", hex::encode(&frame)),
            }
            tracing::info!(block = %block, bytes = frame.len(), "frame written");
        }
        Command::Decode { schema, input, hex } => {
            let schema = load_schema(&schema)?;
            let raw = read_input(&input)?;
            let frame = if hex {
                let text = String::from_utf8(raw).context("hex input is not UTF-8")?;
                hex::decode(text.trim()).context("invalid hex input")?
            } else {
                raw
            };

            let (id, record) = sge_proto::decode_record_with(&schema, &frame, &config)?;
            let name = schema.block_by_id(id).map_or("?", |b| b.name.as_str());
            tracing::info!(block = name, id, "frame decoded");
            println!("{}", serde_json::to_string_pretty(&record.to_json())?);
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let Some(path) = path else {
        return Ok(CodecConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    CodecConfig::from_json(&text).with_context(|| format!("parse config {}", path.display()))
}

fn load_schema(path: &Path) -> Result<Schema> {
    Schema::from_file(path).with_context(|| format!("compile schema {}", path.display()))
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("read {}", path.display()))
}
