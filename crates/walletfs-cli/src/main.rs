//! Walletfs CLI - inspect and edit a wallet's filesystem on local disk
//!
//! Usage:
//!   walletfs -i 0xABC ls ~/Desktop                 # List a directory
//!   walletfs -i 0xABC write ~/Desktop/notes.txt hi # Write from an argument
//!   echo hi | walletfs -i 0xABC write ~/notes.txt  # Write from stdin
//!   walletfs -i 0xABC cat --range 0-1 ~/notes.txt  # Partial read
//!   walletfs -i 0xABC rm ~/notes.txt               # Move to Trash
//!   walletfs id encode /0xABC/Desktop/notes.txt    # Path to identifier
//!
//! State lives under `--root` (`WALLETFS_ROOT`): `metadata.json` plus a
//! `blobs/` directory. Everything except `cat` prints JSON.

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;
use walletfs::{
    ByteRange, CanonicalPath, EngineConfig, FsEngine, Identity, JsonMetadataStore,
    LocalContentStore, codec,
};

/// Walletfs - per-wallet filesystem over content-addressed storage
#[derive(Parser, Debug)]
#[command(name = "walletfs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data directory holding metadata.json and blobs/
    #[arg(long, env = "WALLETFS_ROOT", default_value = ".walletfs")]
    root: PathBuf,

    /// Wallet identity to act as
    #[arg(short = 'i', long, env = "WALLETFS_IDENTITY")]
    identity: Option<String>,

    /// JSON engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe an entry
    Stat { target: String },
    /// List a directory
    Ls {
        #[arg(default_value = "~")]
        target: String,
    },
    /// Print a file's bytes
    Cat {
        target: String,
        /// Byte range, `S-E`, `S-` or `-N` (a `bytes=` prefix is optional)
        #[arg(long)]
        range: Option<String>,
        /// Print JSON with base64 content instead of raw bytes
        #[arg(long)]
        base64: bool,
    },
    /// Create or overwrite a file from an argument, a file or stdin
    Write {
        target: String,
        content: Option<String>,
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Input is base64
        #[arg(long)]
        base64: bool,
        #[arg(long)]
        media_type: Option<String>,
    },
    /// Create a directory and its parents
    Mkdir { target: String },
    /// Move to Trash, or purge when already in Trash
    Rm { target: String },
    /// Move an entry
    Mv {
        from: String,
        to: String,
        /// New name at the destination
        #[arg(long)]
        name: Option<String>,
    },
    /// Rename an entry in place
    Rename { target: String, name: String },
    /// Storage usage of the identity
    Du,
    /// Identifier codec
    Id {
        #[command(subcommand)]
        op: IdOp,
    },
}

#[derive(Subcommand, Debug)]
enum IdOp {
    /// Path to identifier
    Encode { path: String },
    /// Identifier to candidate path
    Decode { id: String },
}

/// What a command produced.
#[derive(Debug, PartialEq)]
enum Output {
    Json(Value),
    Bytes(Vec<u8>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let output = match &args.command {
        Command::Id { op } => id_command(op, args.identity.as_deref())?,
        command => {
            let identity = Identity::new(args.identity.clone().unwrap_or_default())
                .context("an identity is required (--identity or WALLETFS_IDENTITY)")?;
            let config = load_config(args.config.as_deref()).await?;
            let engine = open_engine(&args.root, config).await?;
            let input = match command {
                Command::Write { content, file, .. } => {
                    Some(read_input(content.as_deref(), file.as_deref()).await?)
                }
                _ => None,
            };
            execute(&engine, &identity, command, input).await?
        }
    };

    match output {
        Output::Json(value) => {
            let text = if args.pretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            };
            println!("{text}");
        }
        Output::Bytes(bytes) => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&bytes).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WALLETFS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    EngineConfig::from_json(&text)
        .with_context(|| format!("Invalid config: {}", path.display()))
}

async fn open_engine(root: &Path, config: EngineConfig) -> Result<FsEngine> {
    let metadata = JsonMetadataStore::open(root.join("metadata.json"))
        .await
        .with_context(|| format!("Failed to open metadata in {}", root.display()))?;
    let content = LocalContentStore::open(root.join("blobs"))
        .await
        .with_context(|| format!("Failed to open blobs in {}", root.display()))?;
    Ok(FsEngine::builder()
        .metadata(Arc::new(metadata))
        .content(Arc::new(content))
        .config(config)
        .build())
}

async fn read_input(content: Option<&str>, file: Option<&Path>) -> Result<Vec<u8>> {
    if let Some(content) = content {
        return Ok(content.as_bytes().to_vec());
    }
    if let Some(file) = file {
        return tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read input file: {}", file.display()));
    }
    let mut buf = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut buf)
        .await
        .context("Failed to read stdin")?;
    Ok(buf)
}

/// Accept `1-3` as well as `bytes=1-3`.
fn parse_range(raw: &str) -> Result<ByteRange> {
    let raw = raw.trim();
    let header = if raw.starts_with("bytes=") {
        raw.to_string()
    } else {
        format!("bytes={raw}")
    };
    header
        .parse()
        .with_context(|| format!("Invalid range: {raw}"))
}

fn id_command(op: &IdOp, identity: Option<&str>) -> Result<Output> {
    Ok(Output::Json(match op {
        IdOp::Encode { path } => {
            let path = match identity {
                Some(raw) => {
                    let identity = Identity::new(raw).context("Invalid identity")?;
                    FsEngine::new().resolve_path(path, &identity)
                }
                None => CanonicalPath::normalize(path),
            };
            let id = codec::encode(&path);
            json!({ "path": path, "id": id })
        }
        IdOp::Decode { id } => json!({ "id": id, "path": codec::decode(id) }),
    }))
}

async fn execute(
    engine: &FsEngine,
    identity: &Identity,
    command: &Command,
    input: Option<Vec<u8>>,
) -> Result<Output> {
    let value = match command {
        Command::Stat { target } => serde_json::to_value(
            engine
                .stat(target, identity)
                .await
                .with_context(|| format!("stat {target}"))?,
        )?,
        Command::Ls { target } => serde_json::to_value(
            engine
                .list(target, identity)
                .await
                .with_context(|| format!("ls {target}"))?,
        )?,
        Command::Cat {
            target,
            range,
            base64,
        } => {
            let range = range.as_deref().map(parse_range).transpose()?;
            let out = engine
                .read(target, identity, range)
                .await
                .with_context(|| format!("cat {target}"))?;
            if !*base64 {
                return Ok(Output::Bytes(out.bytes));
            }
            json!({
                "path": out.path,
                "media_type": out.media_type,
                "total_size": out.total_size,
                "status": out.status(),
                "content_range": out.content_range(),
                "content": STANDARD.encode(&out.bytes),
            })
        }
        Command::Write {
            target,
            base64,
            media_type,
            ..
        } => {
            let raw = input.unwrap_or_default();
            let bytes = if *base64 {
                let text = String::from_utf8_lossy(&raw);
                STANDARD
                    .decode(text.trim())
                    .context("Input is not valid base64")?
            } else {
                raw
            };
            serde_json::to_value(
                engine
                    .write(target, &bytes, identity, media_type.as_deref())
                    .await
                    .with_context(|| format!("write {target}"))?,
            )?
        }
        Command::Mkdir { target } => serde_json::to_value(
            engine
                .mkdir(target, identity)
                .await
                .with_context(|| format!("mkdir {target}"))?,
        )?,
        Command::Rm { target } => serde_json::to_value(
            engine
                .delete(target, identity)
                .await
                .with_context(|| format!("rm {target}"))?,
        )?,
        Command::Mv { from, to, name } => serde_json::to_value(
            engine
                .move_entry(from, to, identity, name.as_deref())
                .await
                .with_context(|| format!("mv {from} {to}"))?,
        )?,
        Command::Rename { target, name } => serde_json::to_value(
            engine
                .rename(target, name, identity)
                .await
                .with_context(|| format!("rename {target}"))?,
        )?,
        Command::Du => serde_json::to_value(engine.usage(identity).await.context("du")?)?,
        Command::Id { op } => return id_command(op, Some(identity.as_str())),
    };
    Ok(Output::Json(value))
}
