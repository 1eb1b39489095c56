//! stocra CLI: fetch and stream blockchain data from the terminal.
//!
//! Usage:
//! ```bash
//! # Latest bitcoin block
//! stocra block --chain bitcoin
//!
//! # Follow new ethereum blocks with 4 heights in flight
//! stocra stream-blocks --chain ethereum --look-ahead 4
//!
//! # Human-readable USDT amount
//! stocra scale --chain ethereum --contract 0xdac17f958d2ee523a2206206994597c13d831ec7 --value 2500000
//! ```

mod logging;

use std::env;
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use rust_decimal::Decimal;
use serde::Serialize;

use stocra_client::Stocra;
use stocra_core::{BlockId, ClientConfig, StocraError, StreamConfig};
use stocra_http::HttpTransport;

use crate::logging::{init_tracing, LogConfig};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let rest = &args[2..];
    init_tracing(&LogConfig::from_env(has_flag(rest, "--log-json")));

    let result = match args[1].as_str() {
        "block" => cmd_block(rest).await,
        "tx" => cmd_tx(rest).await,
        "tokens" => cmd_tokens(rest).await,
        "scale" => cmd_scale(rest).await,
        "stream-blocks" => cmd_stream_blocks(rest).await,
        "stream-txs" => cmd_stream_txs(rest).await,
        "version" | "--version" | "-V" => {
            println!("stocra {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(exit_code(&e));
    }
}

/// 2 when retrying the same command cannot help, 1 otherwise.
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<StocraError>() {
        Some(e) if e.is_fatal() => 2,
        _ => 1,
    }
}

fn print_usage() {
    println!("stocra {}", env!("CARGO_PKG_VERSION"));
    println!("Fetch and stream blocks from the Stocra indexing service\n");
    println!("USAGE:");
    println!("    stocra <COMMAND> --chain <NAME> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    block          Fetch a block (--id <height|hash|latest>, default latest)");
    println!("    tx             Fetch a transaction (--hash <HASH>)");
    println!("    tokens         List the token table of a blockchain");
    println!("    scale          Scale a raw token amount (--contract <ADDR> --value <RAW>)");
    println!("    stream-blocks  Follow new blocks (--start, --look-ahead, --interval, --limit)");
    println!("    stream-txs     Follow transactions of new blocks (same flags)");
    println!("    version        Print version");
    println!("    help           Print this help\n");
    println!("GLOBAL FLAGS:");
    println!("    --chain <NAME>            Blockchain, e.g. bitcoin, ethereum  [required]");
    println!("    --token <KEY>             API key (or STOCRA_API_KEY)");
    println!("    --max-concurrency <N>     Bound on in-flight requests");
    println!("    --log-json                JSON logs on stderr (level via STOCRA_LOG,");
    println!("                              per crate via STOCRA_LOG_<CRATE>)\n");
    println!("STREAM FLAGS:");
    println!("    --start <ID>              First block (default latest)");
    println!("    --look-ahead <N>          Heights fetched ahead (default 1)");
    println!("    --interval <SECS>         Poll interval for unmined blocks (default 10)");
    println!("    --limit <N>               Stop after N items");
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn cmd_block(args: &[String]) -> Result<()> {
    let chain = required_flag(args, "--chain")?;
    let id = parse_flag(args, "--id").map(block_id).unwrap_or_default();
    let client = build_client(args)?;

    let block = client.get_block(&chain, id).await?;
    print_json(&block)?;
    client.close().await;
    Ok(())
}

async fn cmd_tx(args: &[String]) -> Result<()> {
    let chain = required_flag(args, "--chain")?;
    let hash = required_flag(args, "--hash")?;
    let client = build_client(args)?;

    let tx = client.get_transaction(&chain, &hash).await?;
    print_json(&tx)?;
    client.close().await;
    Ok(())
}

async fn cmd_tokens(args: &[String]) -> Result<()> {
    let chain = required_flag(args, "--chain")?;
    let client = build_client(args)?;

    let tokens = client.get_tokens(&chain).await?;
    print_json(&*tokens)?;
    client.close().await;
    Ok(())
}

async fn cmd_scale(args: &[String]) -> Result<()> {
    let chain = required_flag(args, "--chain")?;
    let contract = required_flag(args, "--contract")?;
    let raw: Decimal = parse_value(args, "--value")?.ok_or_else(|| anyhow!("--value is required"))?;
    let client = build_client(args)?;

    let scaled = client.scale_token_value(&chain, &contract, raw).await?;
    println!("{scaled}");
    client.close().await;
    Ok(())
}

async fn cmd_stream_blocks(args: &[String]) -> Result<()> {
    let chain = required_flag(args, "--chain")?;
    let start = parse_flag(args, "--start").map(block_id).unwrap_or_default();
    let config = stream_config(args)?;
    let limit: Option<usize> = parse_value(args, "--limit")?;
    let client = build_client(args)?;

    let blocks = client.stream_new_blocks(&chain, start, config)?;
    let mut blocks = blocks.take(limit.unwrap_or(usize::MAX));
    while let Some(block) = blocks.next().await {
        let block = block?;
        println!(
            "{} {} {} txs={}",
            block.height(),
            block.hash(),
            block.timestamp().to_rfc3339(),
            block.transactions().len()
        );
    }
    client.close().await;
    Ok(())
}

async fn cmd_stream_txs(args: &[String]) -> Result<()> {
    let chain = required_flag(args, "--chain")?;
    let start = parse_flag(args, "--start").map(block_id).unwrap_or_default();
    let config = stream_config(args)?;
    let limit: Option<usize> = parse_value(args, "--limit")?;
    let client = build_client(args)?;

    let txs = client.stream_new_transactions(&chain, start, config)?;
    let mut txs = txs.take(limit.unwrap_or(usize::MAX));
    while let Some(item) = txs.next().await {
        let (block, tx) = item?;
        let line = serde_json::json!({ "height": block.height(), "transaction": tx });
        println!("{line}");
    }
    client.close().await;
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn build_client(args: &[String]) -> Result<Stocra> {
    let mut config = ClientConfig::from_env()?;
    if let Some(token) = parse_flag(args, "--token") {
        config.api_key = Some(token);
    }
    if let Some(limit) = parse_value(args, "--max-concurrency")? {
        config.max_concurrent_requests = Some(limit);
    }

    tracing::debug!(
        host = %config.host,
        version = %config.version,
        authenticated = config.api_key.is_some(),
        max_concurrent_requests = ?config.max_concurrent_requests,
        "client configured"
    );
    let transport = HttpTransport::new(config.clone())?;
    let client = Stocra::builder(Arc::new(transport)).config(&config).build()?;
    Ok(client)
}

fn stream_config(args: &[String]) -> Result<StreamConfig> {
    let mut config = StreamConfig::default();
    if let Some(window) = parse_value(args, "--look-ahead")? {
        config.look_ahead_window = window;
    }
    if let Some(secs) = parse_value::<u64>(args, "--interval")? {
        config.sleep_interval_ms = Duration::from_secs(secs).as_millis() as u64;
    }
    config.validate()?;
    Ok(config)
}

/// Numeric ids select a height, anything else a hash or `latest`.
fn block_id(raw: String) -> BlockId {
    match raw.parse::<u64>() {
        Ok(height) => BlockId::Height(height),
        Err(_) => BlockId::from(raw),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn required_flag(args: &[String], flag: &str) -> Result<String> {
    parse_flag(args, flag).ok_or_else(|| anyhow!("{flag} is required"))
}

fn parse_value<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_flag(args, flag)
        .map(|raw| raw.parse::<T>().with_context(|| format!("invalid value for {flag}: '{raw}'")))
        .transpose()
}
