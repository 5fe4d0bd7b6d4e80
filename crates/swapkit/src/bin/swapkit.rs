//! Command-line front end: list tokens, read allowances, fetch a quote.
//!
//! ```text
//! swapkit tokens <chain-id>
//! swapkit allowances <chain-id> <owner> <spender>
//! swapkit quote <from-chain> <from-token> <to-chain> <to-token> <amount> [slippage-bps]
//! ```
//!
//! Configuration comes from an optional JSON file named by `SWAPKIT_CONFIG`
//! plus `SWAPKIT_*` overrides.

use std::sync::Arc;

use swapkit::amount::format_base_units;
use swapkit::error::ConfigError;
use swapkit::http::{build_client, HttpRouteAggregator, HttpSdkInfoSource, JsonRpcReader};
use swapkit::types::quote::DEFAULT_SLIPPAGE_BPS;
use swapkit::{
    AllowanceAggregator, Config, Error, FileStorage, MemoryStorage, QuoteEngine, QuoteInputs,
    RegistryCache, Storage,
};

const USAGE: &str = "usage:
  swapkit tokens <chain-id>
  swapkit allowances <chain-id> <owner> <spender>
  swapkit quote <from-chain> <from-token> <to-chain> <to-token> <amount> [slippage-bps]";

fn load_config() -> Result<Config, ConfigError> {
    let config = match std::env::var("SWAPKIT_CONFIG") {
        Ok(path) => Config::from_file(path)?,
        Err(_) => Config::default(),
    };
    config.with_env_overrides()
}

/// Human-readable amount, or the raw base units if they do not parse.
fn display_amount(raw: &str, decimals: Option<u8>) -> String {
    match decimals {
        Some(decimals) => format_base_units(raw, decimals).unwrap_or_else(|_| raw.to_string()),
        None => raw.to_string(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("swapkit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<(), Error> {
    let config = load_config()?;
    let client = build_client(&config)?;

    let storage: Arc<dyn Storage> = match &config.storage_dir {
        Some(dir) => Arc::new(FileStorage::new(dir)?),
        None => Arc::new(MemoryStorage::new()),
    };
    let registry = RegistryCache::init(
        Arc::new(HttpSdkInfoSource::new(client.clone(), &config.api_url)),
        storage,
        &config,
    );

    let arg = |i: usize| args.get(i).map(String::as_str);

    match (arg(0), arg(1)) {
        (Some("tokens"), Some(chain_id)) => {
            registry.ensure_fresh().await?;
            for token in registry.tokens_for_chain(chain_id) {
                println!("{:<10} {:>3}  {}", token.symbol, token.decimals, token.address);
            }
        }
        (Some("allowances"), Some(chain_id)) => {
            registry.ensure_fresh().await?;
            let reader = JsonRpcReader::new(client.clone(), &config.rpc_url);
            let allowances = AllowanceAggregator::new(Arc::new(reader), &config);
            let set = swapkit::tokens_with_allowances(
                &registry,
                &allowances,
                arg(2),
                arg(3),
                Some(chain_id),
            )
            .await;
            for token in set.approved_tokens() {
                let allowance = set.allowance_of(&token.key()).unwrap_or("0");
                println!(
                    "{:<10} {}",
                    token.symbol,
                    display_amount(allowance, Some(token.decimals))
                );
            }
        }
        (Some("quote"), Some(from_chain)) if args.len() >= 6 => {
            registry.ensure_fresh().await?;
            let decimals = registry.find_token(from_chain, &args[2]).map(|t| t.decimals);
            let destination_decimals = registry.find_token(&args[3], &args[4]).map(|t| t.decimals);
            let slippage_bps = match arg(6) {
                Some(s) => s.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "slippage-bps".to_string(),
                    value: s.to_string(),
                })?,
                None => DEFAULT_SLIPPAGE_BPS,
            };
            let inputs = QuoteInputs {
                source_chain_id: Some(from_chain.to_string()),
                source_token_address: Some(args[2].clone()),
                destination_chain_id: Some(args[3].clone()),
                destination_token_address: Some(args[4].clone()),
                amount: Some(args[5].clone()),
                slippage_bps,
                source_token_decimals: decimals,
            };

            let engine = QuoteEngine::new(
                Arc::new(HttpRouteAggregator::new(client, &config.api_url)),
                &config,
            );
            engine.set_inputs(&inputs);
            match engine.read().await? {
                Some(quote) => println!(
                    "{} -> {} (min {}, rate {}, ~{}s)",
                    display_amount(&quote.from_amount, decimals),
                    display_amount(&quote.to_amount, destination_decimals),
                    display_amount(&quote.to_amount_min, destination_decimals),
                    quote.exchange_rate,
                    quote.estimated_route_duration
                ),
                None => println!("no available route"),
            }
        }
        _ => {
            eprintln!("{USAGE}");
        }
    }

    registry.teardown();
    Ok(())
}
