//! Feed de contratos suspeitos publicado como alertas por outro detector.
//!
//! Cada alerta descreve o par criador/contrato no formato
//! `"<criador> created contract <contrato>"`.

use async_trait::async_trait;
use ethereum_types::Address;
use sentinel_core::{utils::hex_to_address, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::{build_client, http_error};

const ALERTS_QUERY: &str = "query recentAlerts($input: AlertsInput) { alerts(input: $input) { pageInfo { hasNextPage endCursor { alertId blockNumber } } alerts { description } } }";

/// Limite de páginas por consulta
const MAX_PAGES: usize = 50;

/// Contrato marcado como suspeito e seu criador
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuspiciousContract {
    pub address: Address,
    pub creator: Address,
}

impl SuspiciousContract {
    /// Extrai o par a partir da descrição do alerta: os primeiros e os
    /// últimos 42 caracteres são endereços.
    pub fn from_description(description: &str) -> Option<Self> {
        let description = description.trim();
        if description.len() < 84 || !description.is_ascii() {
            return None;
        }
        let creator = hex_to_address(&description[..42])?;
        let address = hex_to_address(&description[description.len() - 42..])?;
        Some(Self { address, creator })
    }
}

/// Fonte de contratos suspeitos
#[async_trait]
pub trait SuspiciousContractSource: Send + Sync {
    /// Com `full_reload` retorna todo o histórico recente; caso contrário
    /// apenas os alertas próximos de `block_number`.
    async fn fetch(&self, block_number: u64, full_reload: bool) -> Result<Vec<SuspiciousContract>>;
}

/// Parâmetros do feed de alertas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFeedConfig {
    pub url: String,
    pub bot_id: String,
    /// Janela, em blocos, das consultas incrementais
    pub block_lookback: u64,
    /// Janela, em dias, da carga completa
    pub created_since_days: u64,
    pub page_size: usize,
}

impl Default for AlertFeedConfig {
    fn default() -> Self {
        Self {
            url: "https://api.forta.network/graphql".to_string(),
            bot_id: "0x0b241032ca430d9c02eaa6a52d217bbff046f0d1b3f3d2aa928e42a97150ec91".to_string(),
            block_lookback: 240,
            created_since_days: 60,
            page_size: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlReply {
    data: Option<AlertsData>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AlertsData {
    alerts: AlertsPage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertsPage {
    page_info: PageInfo,
    #[serde(default)]
    alerts: Vec<AlertEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
    end_cursor: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AlertEntry {
    #[serde(default)]
    description: String,
}

/// Cliente GraphQL do feed de alertas
pub struct AlertFeedClient {
    client: reqwest::Client,
    config: AlertFeedConfig,
    chain_id: u64,
}

impl AlertFeedClient {
    pub fn new(config: AlertFeedConfig, chain_id: u64, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
            chain_id,
        })
    }

    fn input(&self, block_number: u64, full_reload: bool, cursor: Option<&serde_json::Value>) -> serde_json::Value {
        let mut input = json!({
            "bots": [self.config.bot_id],
            "chainId": self.chain_id,
            "first": self.config.page_size,
        });
        if full_reload {
            input["createdSince"] = json!(self.config.created_since_days * 86_400 * 1000);
        } else {
            input["blockNumberRange"] = json!({
                "startBlockNumber": block_number.saturating_sub(self.config.block_lookback),
                "endBlockNumber": block_number,
            });
        }
        if let Some(cursor) = cursor {
            input["after"] = cursor.clone();
        }
        input
    }

    async fn page(&self, input: serde_json::Value) -> Result<AlertsPage> {
        let body = json!({ "query": ALERTS_QUERY, "variables": { "input": input } });
        let reply: GraphQlReply = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?
            .json()
            .await
            .map_err(|e| Error::DecodeError(format!("Resposta do feed de alertas inválida: {}", e)))?;

        if let Some(first) = reply.errors.first() {
            return Err(Error::HttpError(format!("Feed de alertas retornou erro: {}", first)));
        }
        reply
            .data
            .map(|d| d.alerts)
            .ok_or_else(|| Error::DecodeError("Feed de alertas sem campo data".into()))
    }
}

#[async_trait]
impl SuspiciousContractSource for AlertFeedClient {
    async fn fetch(&self, block_number: u64, full_reload: bool) -> Result<Vec<SuspiciousContract>> {
        let mut contracts = Vec::new();
        let mut cursor: Option<serde_json::Value> = None;

        for _ in 0..MAX_PAGES {
            let page = self.page(self.input(block_number, full_reload, cursor.as_ref())).await?;
            for alert in &page.alerts {
                match SuspiciousContract::from_description(&alert.description) {
                    Some(c) => contracts.push(c),
                    None => debug!(description = %alert.description, "alerta sem par criador/contrato"),
                }
            }
            match (page.page_info.has_next_page, page.page_info.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(contracts)
    }
}
