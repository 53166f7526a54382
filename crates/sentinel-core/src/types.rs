/*!
 * Sentinel Types
 *
 * Tipos comuns usados em toda a workspace Sentinel
 */

use ethereum_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severidade de um alerta
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Natureza do alerta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FindingType {
    Exploit,
    Suspicious,
    Info,
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingType::Exploit => write!(f, "Exploit"),
            FindingType::Suspicious => write!(f, "Suspicious"),
            FindingType::Info => write!(f, "Info"),
        }
    }
}

/// Alerta emitido por um detector.
///
/// `alert_id` é o contrato público consumido pelos assinantes: os valores
/// são constantes estáveis (por exemplo `ICE-PHISHING-SCAM-TRANSFER`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub name: String,
    pub description: String,
    pub alert_id: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub addresses: Vec<Address>,
}

impl Finding {
    /// Cria um alerta sem metadados nem endereços
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        alert_id: impl Into<String>,
        severity: Severity,
        finding_type: FindingType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            alert_id: alert_id.into(),
            severity,
            finding_type,
            metadata: BTreeMap::new(),
            addresses: Vec::new(),
        }
    }

    /// Adiciona uma entrada de metadado
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Define a lista de endereços afetados
    pub fn with_addresses(mut self, addresses: Vec<Address>) -> Self {
        self.addresses = addresses;
        self
    }

    /// Retorna um metadado como string, se existir
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}
