use std::env;
use std::sync::Arc;

use ethers::providers::{Http, Middleware, Provider};
use futures::StreamExt;
use sentinel_core::traits::ChainProvider;
use sentinel_feeds::{AlertFeedClient, EtherscanClient, ScamSnifferClient};
use sentinel_ice_phishing::{BlockEvent, IcePhishingConfig, IcePhishingDetector, TxEvent};
use sentinel_rpc::{RpcConfig, SentinelRpcClient};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Uso: {} <RPC_ENDPOINT> [CONFIG_JSON]", args[0]);
        eprintln!("Exemplo: EXPLORER_API_KEY=chave {} https://mainnet.infura.io/v3/YOURKEY config.json", args[0]);
        std::process::exit(1);
    }
    let endpoint = args[1].clone();

    let mut config = match args.get(2) {
        Some(path) => IcePhishingConfig::from_file(path)?,
        None => IcePhishingConfig::default(),
    };
    if let Ok(key) = env::var("EXPLORER_API_KEY") {
        config = config.with_api_key(&key);
    }

    let rpc = Arc::new(SentinelRpcClient::new(RpcConfig { endpoint: endpoint.clone(), ..Default::default() })?);
    let chain_id = rpc.chain_id().await?;
    let timeout = config.request_timeout();

    let explorer = Arc::new(EtherscanClient::new(config.explorer_for(chain_id)?.clone(), timeout)?);
    let scam_feed = Arc::new(ScamSnifferClient::new(timeout)?);
    let suspicious = Arc::new(AlertFeedClient::new(config.alert_feed.clone(), chain_id, timeout)?);
    let mut detector = IcePhishingDetector::new(config, rpc, explorer, scam_feed, suspicious);

    // Stream de novos blocos via polling do node
    let provider = Provider::<Http>::try_from(endpoint.as_str())?;
    let mut blocks = provider.watch_blocks().await?;
    info!(chain_id, "monitorando novos blocos");

    while let Some(hash) = blocks.next().await {
        let Some(block) = provider.get_block_with_txs(hash).await? else {
            continue;
        };
        let number = block.number.map(|n| n.as_u64()).unwrap_or_default();
        let timestamp = block.timestamp.as_u64();

        for finding in detector.handle_block(&BlockEvent { number, timestamp }).await? {
            println!("{}", serde_json::to_string(&finding)?);
        }

        for tx in &block.transactions {
            let Some(receipt) = provider.get_transaction_receipt(tx.hash).await? else {
                continue;
            };
            let mut event = TxEvent::from_parts(tx, &receipt.logs, timestamp);
            if !receipt.logs.is_empty() {
                // nem todo node expõe trace_transaction
                match provider.trace_transaction(tx.hash).await {
                    Ok(traces) => event = event.with_traces(&traces),
                    Err(e) => debug!(tx = ?tx.hash, error = %e, "traces indisponíveis"),
                }
            }
            if event.permits.is_empty() && event.approvals.is_empty() && event.transfers.is_empty() {
                continue;
            }
            match detector.handle_transaction(&event).await {
                Ok(findings) => {
                    for finding in findings {
                        println!("{}", serde_json::to_string(&finding)?);
                    }
                }
                Err(e) => error!(tx = ?tx.hash, error = %e, "falha ao processar transação"),
            }
        }
    }

    Ok(())
}
