use serde::{Deserialize, Serialize};

/// Classificação de um endereço quanto ao risco como spender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    EoaLowNonce,
    EoaHighNonce,
    LowNumTxsUnverifiedContract,
    HighNumTxsUnverifiedContract,
    LowNumTxsVerifiedContract,
    HighNumTxsVerifiedContract,
    IgnoredEoa,
    IgnoredContract,
    ScamAddress,
}

/// Faixa de severidade das tabelas de rastreamento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Spender suspeito: alertas com severidade cheia
    Standard,
    /// Spender provavelmente legítimo: variantes `-INFO` / `-LOW` / `-MEDIUM`
    Info,
}

impl AddressType {
    pub fn is_eoa(self) -> bool {
        matches!(self, AddressType::EoaLowNonce | AddressType::EoaHighNonce | AddressType::IgnoredEoa)
    }

    pub fn is_contract(self) -> bool {
        matches!(
            self,
            AddressType::LowNumTxsUnverifiedContract
                | AddressType::HighNumTxsUnverifiedContract
                | AddressType::LowNumTxsVerifiedContract
                | AddressType::HighNumTxsVerifiedContract
                | AddressType::IgnoredContract
        )
    }

    pub fn is_ignored(self) -> bool {
        matches!(self, AddressType::IgnoredEoa | AddressType::IgnoredContract)
    }

    /// Tipos que nunca são reclassificados enquanto estiverem em cache
    pub fn is_terminal(self) -> bool {
        matches!(self, AddressType::EoaHighNonce | AddressType::HighNumTxsVerifiedContract) || self.is_ignored()
    }

    /// Tabela em que um spender deste tipo é registrado; `None` quando não é
    /// rastreado
    pub fn tier(self) -> Option<Tier> {
        match self {
            AddressType::EoaLowNonce | AddressType::LowNumTxsUnverifiedContract | AddressType::ScamAddress => {
                Some(Tier::Standard)
            }
            AddressType::EoaHighNonce
            | AddressType::LowNumTxsVerifiedContract
            | AddressType::HighNumTxsUnverifiedContract => Some(Tier::Info),
            AddressType::HighNumTxsVerifiedContract | AddressType::IgnoredEoa | AddressType::IgnoredContract => None,
        }
    }
}

/// Entrada do cache de classificação.
///
/// O tipo estrutural e a marca temporária de "ignorado" ficam separados para
/// que a limpeza periódica possa remover a marca sem perder o tipo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedClassification {
    pub kind: AddressType,
    pub ignored: bool,
}

impl CachedClassification {
    pub fn new(kind: AddressType) -> Self {
        Self { kind, ignored: false }
    }

    /// Tipo visto pelo detector
    pub fn effective(&self) -> AddressType {
        match (self.ignored, self.kind.is_eoa()) {
            (false, _) => self.kind,
            (true, true) => AddressType::IgnoredEoa,
            (true, false) => AddressType::IgnoredContract,
        }
    }
}
