use ethereum_types::Address;
use lru::LruCache;
use sentinel_core::{traits::ChainProvider, utils::format_address, Result};
use sentinel_feeds::{ExplorerApi, ExplorerResponse};
use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

use crate::address_type::{AddressType, CachedClassification};
use crate::config::IcePhishingConfig;

const CACHE_CAPACITY: usize = 100_000;

/// Papel do endereço no evento sendo classificado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Dono dos ativos: a classificação em cache nunca é refeita e contratos
    /// não consultam o explorer
    Owner,
    /// Spender, remetente da transação ou destinatário
    Counterparty,
}

/// Classifica endereços consultando o node e o block explorer, com cache
/// LRU e a lista de scam em memória.
pub struct AddressClassifier {
    provider: Arc<dyn ChainProvider>,
    explorer: Arc<dyn ExplorerApi>,
    cache: LruCache<Address, CachedClassification>,
    creators: LruCache<Address, Option<Address>>,
    scam_addresses: HashSet<Address>,
    scam_domains: BTreeMap<String, Vec<Address>>,
    nonce_threshold: u64,
    contract_txs_threshold: usize,
    verified_contract_txs_threshold: usize,
}

fn capacity() -> NonZeroUsize {
    NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN)
}

impl AddressClassifier {
    pub fn new(provider: Arc<dyn ChainProvider>, explorer: Arc<dyn ExplorerApi>, config: &IcePhishingConfig) -> Self {
        Self {
            provider,
            explorer,
            cache: LruCache::new(capacity()),
            creators: LruCache::new(capacity()),
            scam_addresses: HashSet::new(),
            scam_domains: BTreeMap::new(),
            nonce_threshold: config.nonce_threshold,
            contract_txs_threshold: config.contract_txs_threshold,
            verified_contract_txs_threshold: config.verified_contract_txs_threshold,
        }
    }

    pub fn provider(&self) -> &Arc<dyn ChainProvider> {
        &self.provider
    }

    /// Substitui a lista de endereços de scam
    pub fn set_scam_addresses(&mut self, addresses: Vec<Address>) {
        self.scam_addresses = addresses.into_iter().collect();
    }

    /// Substitui o mapa domínio → endereços de scam
    pub fn set_scam_domains(&mut self, domains: BTreeMap<String, Vec<Address>>) {
        self.scam_domains = domains;
    }

    pub fn scam_list_len(&self) -> usize {
        self.scam_addresses.len()
    }

    pub fn is_scam(&self, address: &Address) -> bool {
        self.scam_addresses.contains(address)
    }

    /// Domínios de scam associados a qualquer um dos endereços
    pub fn scam_domains_for(&self, addresses: &[Address]) -> Vec<String> {
        self.scam_domains
            .iter()
            .filter(|(_, listed)| listed.iter().any(|a| addresses.contains(a)))
            .map(|(domain, _)| domain.clone())
            .collect()
    }

    /// Registra o endereço como scam no cache
    pub fn mark_scam(&mut self, address: Address) {
        self.cache.put(address, CachedClassification::new(AddressType::ScamAddress));
    }

    /// Ignora o endereço até a próxima limpeza
    pub fn set_ignored(&mut self, address: Address) {
        if let Some(entry) = self.cache.get_mut(&address) {
            entry.ignored = true;
        }
    }

    /// Remove todas as marcas de "ignorado"; retorna quantas existiam
    pub fn clear_ignored(&mut self) -> usize {
        let mut cleared = 0;
        for (_, entry) in self.cache.iter_mut() {
            if entry.ignored {
                entry.ignored = false;
                cleared += 1;
            }
        }
        cleared
    }

    /// Tipo efetivo em cache, sem alterar a ordem do LRU
    pub fn cached(&self, address: &Address) -> Option<AddressType> {
        self.cache.peek(address).map(CachedClassification::effective)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Classifica `address` no bloco `block`.
    ///
    /// `Ok(None)` significa classificação inconclusiva (limite do explorer):
    /// o evento deve ser ignorado neste ciclo.
    pub async fn classify(&mut self, address: Address, role: Role, block: u64) -> Result<Option<AddressType>> {
        if self.is_scam(&address) {
            self.mark_scam(address);
            return Ok(Some(AddressType::ScamAddress));
        }

        if let Some(entry) = self.cache.get(&address).copied() {
            if entry.kind == AddressType::ScamAddress {
                // saiu da lista desde a última atualização
                self.cache.pop(&address);
            } else {
                let effective = entry.effective();
                if role == Role::Owner || effective.is_terminal() {
                    return Ok(Some(effective));
                }
                let fresh = if entry.kind.is_eoa() {
                    Some(self.eoa_type(address, block).await?)
                } else {
                    self.contract_type(address).await?
                };
                if let Some(kind) = fresh {
                    if kind != entry.kind {
                        debug!(address = %format_address(&address), from = ?entry.kind, to = ?kind, "classificação atualizada");
                        self.cache.put(address, CachedClassification::new(kind));
                    }
                }
                return Ok(fresh);
            }
        }

        let code = self.provider.get_code(address).await?;
        let is_eoa = code.is_empty();

        if role == Role::Owner && !is_eoa {
            return Ok(Some(AddressType::LowNumTxsUnverifiedContract));
        }

        let kind = if is_eoa {
            Some(self.eoa_type(address, block).await?)
        } else {
            self.contract_type(address).await?
        };
        if let Some(kind) = kind {
            self.cache.put(address, CachedClassification::new(kind));
        }
        Ok(kind)
    }

    async fn eoa_type(&self, address: Address, block: u64) -> Result<AddressType> {
        let nonce = self.provider.get_transaction_count(address, block).await?;
        Ok(if nonce > self.nonce_threshold.into() {
            AddressType::EoaHighNonce
        } else {
            AddressType::EoaLowNonce
        })
    }

    async fn contract_type(&self, address: Address) -> Result<Option<AddressType>> {
        let verified = match self.explorer.contract_abi(address).await? {
            ExplorerResponse::Ok(abi) => abi.is_some(),
            ExplorerResponse::RateLimited => return Ok(None),
        };

        let threshold = if verified {
            self.verified_contract_txs_threshold
        } else {
            self.contract_txs_threshold
        };
        let count = match self.explorer.transaction_count(address, threshold + 1).await? {
            ExplorerResponse::Ok(count) => count,
            ExplorerResponse::RateLimited => return Ok(None),
        };

        let high = count > threshold;
        Ok(Some(match (verified, high) {
            (true, true) => AddressType::HighNumTxsVerifiedContract,
            (true, false) => AddressType::LowNumTxsVerifiedContract,
            (false, true) => AddressType::HighNumTxsUnverifiedContract,
            (false, false) => AddressType::LowNumTxsUnverifiedContract,
        }))
    }

    /// Criador do contrato segundo o explorer, com cache. Respostas
    /// limitadas não são cacheadas.
    pub async fn contract_creator(&mut self, address: Address) -> Result<Option<Address>> {
        if let Some(creator) = self.creators.get(&address) {
            return Ok(*creator);
        }
        match self.explorer.contract_creator(address).await? {
            ExplorerResponse::Ok(creator) => {
                self.creators.put(address, creator);
                Ok(creator)
            }
            ExplorerResponse::RateLimited => Ok(None),
        }
    }
}
