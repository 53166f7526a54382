//! Base pública de endereços e domínios de scam (ScamSniffer).

use async_trait::async_trait;
use ethereum_types::Address;
use sentinel_core::{utils::hex_to_address, Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

use crate::{build_client, http_error};

pub const SCAM_ADDRESSES_URL: &str =
    "https://raw.githubusercontent.com/scamsniffer/scam-database/main/blacklist/address.json";
pub const SCAM_DOMAINS_URL: &str =
    "https://raw.githubusercontent.com/scamsniffer/scam-database/main/blacklist/combined.json";

/// Fonte da lista de endereços de scam e do mapa domínio → endereços
#[async_trait]
pub trait ScamFeed: Send + Sync {
    async fn scam_addresses(&self) -> Result<Vec<Address>>;

    async fn scam_domains(&self) -> Result<BTreeMap<String, Vec<Address>>>;
}

/// Cliente HTTP para os arquivos JSON publicados pelo ScamSniffer
pub struct ScamSnifferClient {
    client: reqwest::Client,
    addresses_url: String,
    domains_url: String,
}

impl ScamSnifferClient {
    /// Cliente apontando para os arquivos públicos
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_urls(SCAM_ADDRESSES_URL, SCAM_DOMAINS_URL, timeout)
    }

    pub fn with_urls(addresses_url: impl Into<String>, domains_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            addresses_url: addresses_url.into(),
            domains_url: domains_url.into(),
        })
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?
            .json::<T>()
            .await
            .map_err(|e| Error::DecodeError(format!("Lista de scam inválida em {}: {}", url, e)))
    }
}

fn parse_addresses(raw: &[String]) -> Vec<Address> {
    raw.iter()
        .filter_map(|s| {
            let parsed = hex_to_address(s.trim());
            if parsed.is_none() {
                debug!(entry = %s, "entrada ignorada na lista de scam");
            }
            parsed
        })
        .collect()
}

#[async_trait]
impl ScamFeed for ScamSnifferClient {
    async fn scam_addresses(&self) -> Result<Vec<Address>> {
        let raw: Vec<String> = self.fetch(&self.addresses_url).await?;
        Ok(parse_addresses(&raw))
    }

    async fn scam_domains(&self) -> Result<BTreeMap<String, Vec<Address>>> {
        let raw: HashMap<String, Vec<String>> = self.fetch(&self.domains_url).await?;
        Ok(raw
            .into_iter()
            .map(|(domain, addresses)| (domain, parse_addresses(&addresses)))
            .collect())
    }
}
