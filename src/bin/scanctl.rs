//! Command-line client for a running scale-barcode server
//!
//! Usage:
//!   cargo run --bin scanctl -- parse 2025874002804
//!   cargo run --bin scanctl -- config get
//!   cargo run --bin scanctl -- config set --enabled --product-code 1-5 --weight 6-10 --unit g

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(name = "scanctl")]
#[command(about = "Parse barcodes and manage the barcode layout over HTTP")]
struct Args {
    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode, resolve and price one barcode
    Parse { barcode: String },
    /// Read or replace the barcode layout
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Get,
    Set {
        #[arg(long)]
        enabled: bool,
        /// Product code positions, e.g. 1-5
        #[arg(long, default_value = "1-5", value_parser = parse_range)]
        product_code: (usize, usize),
        /// Weight positions, e.g. 6-10
        #[arg(long, default_value = "6-10", value_parser = parse_range)]
        weight: (usize, usize),
        #[arg(long, default_value = "g")]
        unit: String,
        /// Divide encoded weight by this before pricing
        #[arg(long)]
        divisor: Option<u32>,
    },
}

fn parse_range(s: &str) -> Result<(usize, usize), String> {
    let (start, end) = s.split_once('-').ok_or_else(|| format!("expected START-END, got {s}"))?;
    let start = start.trim().parse().map_err(|_| format!("invalid start position in {s}"))?;
    let end = end.trim().parse().map_err(|_| format!("invalid end position in {s}"))?;
    Ok((start, end))
}

async fn print_response(resp: reqwest::Response) -> anyhow::Result<()> {
    let status = resp.status();
    let body: Value = resp.json().await.context("Response was not JSON")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        anyhow::bail!("server returned {status}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = reqwest::Client::new();
    let base = args.url.trim_end_matches('/');

    let resp = match args.command {
        Command::Parse { barcode } => client
            .post(format!("{base}/barcode/parse"))
            .json(&json!({ "barcode": barcode }))
            .send()
            .await
            .with_context(|| format!("Failed to reach {base}"))?,
        Command::Config { action: ConfigAction::Get } => client
            .get(format!("{base}/barcode/config"))
            .send()
            .await
            .with_context(|| format!("Failed to reach {base}"))?,
        Command::Config {
            action: ConfigAction::Set { enabled, product_code, weight, unit, divisor },
        } => {
            let mut body = json!({
                "enabled": enabled,
                "productCodeStart": product_code.0,
                "productCodeEnd": product_code.1,
                "weightStart": weight.0,
                "weightEnd": weight.1,
                "weightUnit": unit,
            });
            if let Some(divisor) = divisor {
                body["weightDivisor"] = json!(divisor);
            }
            client
                .put(format!("{base}/admin/barcode/config"))
                .json(&body)
                .send()
                .await
                .with_context(|| format!("Failed to reach {base}"))?
        }
    };

    print_response(resp).await
}
