//! Cliente para APIs de block explorer no formato Etherscan.

use async_trait::async_trait;
use ethereum_types::Address;
use sentinel_core::{utils::{format_address, hex_to_address}, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{build_client, http_error};

/// Resposta de um explorer: o valor pedido ou aviso de limite de requisições.
///
/// `RateLimited` não é um erro: quem chama apenas pula a verificação neste
/// ciclo, sem cachear nada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerResponse<T> {
    Ok(T),
    RateLimited,
}

/// Consultas de verificação e atividade de contratos
#[async_trait]
pub trait ExplorerApi: Send + Sync {
    /// ABI publicada do contrato; `None` quando o código não é verificado
    async fn contract_abi(&self, address: Address) -> Result<ExplorerResponse<Option<String>>>;

    /// Quantidade de transações do endereço, limitada a `limit`
    async fn transaction_count(&self, address: Address, limit: usize) -> Result<ExplorerResponse<usize>>;

    /// Criador do contrato, quando o explorer o conhece
    async fn contract_creator(&self, address: Address) -> Result<ExplorerResponse<Option<Address>>>;
}

/// Endpoints de um explorer para uma chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerEndpoints {
    pub key: String,
    pub url_contract: String,
    pub url_account: String,
    pub url_contract_creation: String,
}

impl ExplorerEndpoints {
    fn for_host(host: &str) -> Self {
        Self {
            key: "YourApiKeyToken".to_string(),
            url_contract: format!("https://{}/api?module=contract&action=getabi", host),
            url_account: format!("https://{}/api?module=account&action=txlist", host),
            url_contract_creation: format!("https://{}/api?module=contract&action=getcontractcreation", host),
        }
    }

    pub fn contract_url(&self, address: &Address) -> String {
        format!("{}&address={}&apikey={}", self.url_contract, format_address(address), self.key)
    }

    pub fn account_url(&self, address: &Address, offset: usize) -> String {
        format!(
            "{}&address={}&startblock=0&endblock=99999999&page=1&offset={}&sort=asc&apikey={}",
            self.url_account,
            format_address(address),
            offset,
            self.key
        )
    }

    pub fn creation_url(&self, address: &Address) -> String {
        format!(
            "{}&contractaddresses={}&apikey={}",
            self.url_contract_creation,
            format_address(address),
            self.key
        )
    }
}

/// Explorers conhecidos por chain id
pub fn default_explorers() -> BTreeMap<u64, ExplorerEndpoints> {
    [
        (1, "api.etherscan.io"),
        (10, "api-optimistic.etherscan.io"),
        (56, "api.bscscan.com"),
        (137, "api.polygonscan.com"),
        (250, "api.ftmscan.com"),
        (42161, "api.arbiscan.io"),
        (43114, "api.snowtrace.io"),
    ]
    .into_iter()
    .map(|(chain, host)| (chain, ExplorerEndpoints::for_host(host)))
    .collect()
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

impl ApiReply {
    fn rate_limited(&self) -> bool {
        self.message == "NOTOK"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractCreation {
    contract_creator: String,
}

/// Cliente HTTP de um explorer compatível com a API do Etherscan
pub struct EtherscanClient {
    client: reqwest::Client,
    endpoints: ExplorerEndpoints,
}

impl EtherscanClient {
    pub fn new(endpoints: ExplorerEndpoints, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoints,
        })
    }

    async fn get(&self, url: &str) -> Result<ApiReply> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?
            .json::<ApiReply>()
            .await
            .map_err(|e| Error::DecodeError(format!("Resposta do explorer inválida: {}", e)))
    }
}

#[async_trait]
impl ExplorerApi for EtherscanClient {
    async fn contract_abi(&self, address: Address) -> Result<ExplorerResponse<Option<String>>> {
        let reply = self.get(&self.endpoints.contract_url(&address)).await?;
        if reply.rate_limited() {
            warn!(address = %format_address(&address), "limite do explorer atingido; verificação adiada");
            return Ok(ExplorerResponse::RateLimited);
        }
        let abi = (reply.status == "1").then(|| match reply.result {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        Ok(ExplorerResponse::Ok(abi))
    }

    async fn transaction_count(&self, address: Address, limit: usize) -> Result<ExplorerResponse<usize>> {
        let reply = self.get(&self.endpoints.account_url(&address, limit)).await?;
        if reply.rate_limited() {
            warn!(address = %format_address(&address), "limite do explorer atingido; contagem adiada");
            return Ok(ExplorerResponse::RateLimited);
        }
        let count = reply.result.as_array().map(Vec::len).unwrap_or(0);
        Ok(ExplorerResponse::Ok(count))
    }

    async fn contract_creator(&self, address: Address) -> Result<ExplorerResponse<Option<Address>>> {
        let reply = self.get(&self.endpoints.creation_url(&address)).await?;
        if reply.rate_limited() {
            warn!(address = %format_address(&address), "limite do explorer atingido; criador desconhecido");
            return Ok(ExplorerResponse::RateLimited);
        }
        if reply.status != "1" {
            debug!(address = %format_address(&address), message = %reply.message, "criador não encontrado");
            return Ok(ExplorerResponse::Ok(None));
        }
        let creations: Vec<ContractCreation> = serde_json::from_value(reply.result)
            .map_err(|e| Error::DecodeError(format!("getcontractcreation inválido: {}", e)))?;
        let creator = creations
            .first()
            .and_then(|c| hex_to_address(&c.contract_creator));
        Ok(ExplorerResponse::Ok(creator))
    }
}
