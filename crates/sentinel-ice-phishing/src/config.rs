use sentinel_core::{Error, Result};
use sentinel_feeds::{default_explorers, AlertFeedConfig, ExplorerEndpoints};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const ONE_DAY: u64 = 24 * 60 * 60;

/// Limiares e integrações do detector de ice phishing.
///
/// Lido de JSON em camelCase; campos ausentes assumem o valor padrão.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IcePhishingConfig {
    /// Approvals ERC-20/721 por spender dentro da janela antes do alerta
    pub approve_count_threshold: usize,
    /// ApprovalForAll por spender dentro da janela antes do alerta
    pub approve_for_all_count_threshold: usize,
    /// Transfers aprovados por spender dentro da janela antes do alerta
    pub transfer_count_threshold: usize,
    /// Tamanho da janela de correlação
    pub time_period_days: u64,
    /// EOAs com nonce acima disso são consideradas de alto volume (exchanges)
    pub nonce_threshold: u64,
    pub contract_txs_threshold: usize,
    pub verified_contract_txs_threshold: usize,
    /// Approvals acumulados a partir dos quais o spender é ignorado até a próxima limpeza
    pub max_address_alerts_per_period: usize,
    /// Blocos entre atualizações da lista de scam
    pub refresh_interval_blocks: u64,
    pub request_timeout_secs: u64,
    pub explorers: BTreeMap<u64, ExplorerEndpoints>,
    pub alert_feed: AlertFeedConfig,
}

impl Default for IcePhishingConfig {
    fn default() -> Self {
        Self {
            approve_count_threshold: 30,
            approve_for_all_count_threshold: 3,
            transfer_count_threshold: 30,
            time_period_days: 30,
            nonce_threshold: 100,
            contract_txs_threshold: 5000,
            verified_contract_txs_threshold: 1,
            max_address_alerts_per_period: 1000,
            refresh_interval_blocks: 1,
            request_timeout_secs: 10,
            explorers: default_explorers(),
            alert_feed: AlertFeedConfig::default(),
        }
    }
}

impl IcePhishingConfig {
    /// Carrega a configuração de um arquivo JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Falha ao ler {}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| Error::ConfigError(format!("JSON de configuração inválido: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.time_period_days == 0 {
            return Err(Error::ConfigError("timePeriodDays deve ser maior que zero".into()));
        }
        if self.refresh_interval_blocks == 0 {
            return Err(Error::ConfigError("refreshIntervalBlocks deve ser maior que zero".into()));
        }
        Ok(())
    }

    /// Janela de correlação em segundos
    pub fn time_period(&self) -> u64 {
        self.time_period_days.saturating_mul(ONE_DAY)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Endpoints do explorer da chain
    pub fn explorer_for(&self, chain_id: u64) -> Result<&ExplorerEndpoints> {
        self.explorers
            .get(&chain_id)
            .ok_or_else(|| Error::ConfigError(format!("Nenhum explorer configurado para a chain {}", chain_id)))
    }

    /// Substitui a chave de API de todos os explorers
    pub fn with_api_key(mut self, key: &str) -> Self {
        for endpoints in self.explorers.values_mut() {
            endpoints.key = key.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_bot_thresholds() {
        let config = IcePhishingConfig::default();
        assert_eq!(config.approve_count_threshold, 30);
        assert_eq!(config.approve_for_all_count_threshold, 3);
        assert_eq!(config.time_period(), 30 * 86_400);
        assert!(config.explorer_for(1).is_ok());
        assert!(config.explorer_for(999).is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = IcePhishingConfig::from_json(r#"{"approveCountThreshold": 2, "timePeriodDays": 1}"#).unwrap();
        assert_eq!(config.approve_count_threshold, 2);
        assert_eq!(config.time_period(), 86_400);
        assert_eq!(config.nonce_threshold, 100);
        assert_eq!(config.explorers.len(), 7);
    }

    #[test]
    fn explorer_map_uses_chain_id_keys() {
        let raw = r#"{"explorers": {"137": {"key": "k", "urlContract": "c", "urlAccount": "a", "urlContractCreation": "cc"}}}"#;
        let config = IcePhishingConfig::from_json(raw).unwrap();
        assert_eq!(config.explorer_for(137).unwrap().key, "k");
        assert!(config.explorer_for(1).is_err());
    }

    #[test]
    fn rejects_empty_window() {
        assert!(IcePhishingConfig::from_json(r#"{"timePeriodDays": 0}"#).is_err());
        assert!(IcePhishingConfig::from_json("not json").is_err());
    }

    #[test]
    fn huge_window_saturates() {
        let config = IcePhishingConfig::from_json(&format!(r#"{{"timePeriodDays": {}}}"#, u64::MAX)).unwrap();
        assert_eq!(config.time_period(), u64::MAX);
    }

    #[test]
    fn api_key_override_applies_to_every_chain() {
        let config = IcePhishingConfig::default().with_api_key("secret");
        assert!(config.explorers.values().all(|e| e.key == "secret"));
    }
}
