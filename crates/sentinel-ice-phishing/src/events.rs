//! Modelo de eventos já decodificados consumido pelo detector.

use ethereum_types::{Address, H256, U256};
use ethers::types::{Action, Log, Trace, Transaction};

use crate::decoder;

/// Chamada `permit` (EIP-2612 ou estilo DAI)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitCall {
    /// Token que implementa o `permit`
    pub asset: Address,
    pub owner: Address,
    pub spender: Address,
    /// Timestamp limite da permissão
    pub deadline: u64,
    /// `None` para permits DAI, que liberam valor ilimitado
    pub value: Option<U256>,
}

impl PermitCall {
    /// Permit EIP-2612 de valor zero não concede nada
    pub fn is_revoke(&self) -> bool {
        self.value.map_or(false, |v| v.is_zero())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalKind {
    Erc20 { value: U256 },
    Erc721 { token_id: U256 },
    ForAll { approved: bool },
}

/// Evento `Approval` ou `ApprovalForAll`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEvent {
    pub asset: Address,
    pub owner: Address,
    pub spender: Address,
    pub kind: ApprovalKind,
}

impl ApprovalEvent {
    pub fn is_approval_for_all(&self) -> bool {
        matches!(self.kind, ApprovalKind::ForAll { .. })
    }

    pub fn token_id(&self) -> Option<U256> {
        match self.kind {
            ApprovalKind::Erc721 { token_id } => Some(token_id),
            _ => None,
        }
    }

    /// Revogações e approvals de valor zero não concedem nada
    pub fn is_revoke(&self) -> bool {
        match &self.kind {
            ApprovalKind::Erc20 { value } => value.is_zero(),
            ApprovalKind::ForAll { approved } => !approved,
            ApprovalKind::Erc721 { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferKind {
    Erc20 { value: U256 },
    Erc721 { token_id: U256 },
    Erc1155Single { id: U256, value: U256 },
    Erc1155Batch { ids: Vec<U256>, values: Vec<U256> },
}

/// Evento `Transfer`, `TransferSingle` ou `TransferBatch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub asset: Address,
    pub from: Address,
    pub to: Address,
    pub kind: TransferKind,
}

impl TransferEvent {
    /// Ids de NFT movidos; vazio para ERC-20
    pub fn token_ids(&self) -> Vec<U256> {
        match &self.kind {
            TransferKind::Erc20 { .. } => Vec::new(),
            TransferKind::Erc721 { token_id } => vec![*token_id],
            TransferKind::Erc1155Single { id, .. } => vec![*id],
            TransferKind::Erc1155Batch { ids, .. } => ids.clone(),
        }
    }

    /// Valor ERC-20 transferido
    pub fn erc20_value(&self) -> Option<U256> {
        match self.kind {
            TransferKind::Erc20 { value } => Some(value),
            _ => None,
        }
    }
}

/// Transação com chamadas e logs relevantes já decodificados
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxEvent {
    pub hash: H256,
    pub from: Address,
    pub timestamp: u64,
    pub block_number: u64,
    pub permits: Vec<PermitCall>,
    pub approvals: Vec<ApprovalEvent>,
    pub transfers: Vec<TransferEvent>,
}

impl TxEvent {
    /// Monta o evento a partir da transação, dos logs do recibo e do
    /// timestamp do bloco
    pub fn from_parts(tx: &Transaction, logs: &[Log], timestamp: u64) -> Self {
        let permits = tx
            .to
            .and_then(|to| decoder::decode_permit(to, &tx.input))
            .into_iter()
            .collect();
        let (approvals, transfers) = decoder::decode_logs(logs);

        Self {
            hash: tx.hash,
            from: tx.from,
            timestamp,
            block_number: tx.block_number.map(|n| n.as_u64()).unwrap_or_default(),
            permits,
            approvals,
            transfers,
        }
    }

    /// Acrescenta permits chamados por contratos intermediários (routers,
    /// multicall), a partir de pares (contrato chamado, calldata)
    pub fn with_internal_calls<'a>(mut self, calls: impl IntoIterator<Item = (Address, &'a [u8])>) -> Self {
        for (to, input) in calls {
            if let Some(permit) = decoder::decode_permit(to, input) {
                if !self.permits.contains(&permit) {
                    self.permits.push(permit);
                }
            }
        }
        self
    }

    /// Permits internos a partir do resultado de `trace_transaction`.
    /// Chamadas revertidas são ignoradas.
    pub fn with_traces(self, traces: &[Trace]) -> Self {
        let calls = traces
            .iter()
            .filter(|t| t.error.is_none())
            .filter_map(|t| match &t.action {
                Action::Call(call) => Some((call.to, &call.input[..])),
                _ => None,
            });
        self.with_internal_calls(calls)
    }
}

/// Bloco processado pela manutenção periódica
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockEvent {
    pub number: u64,
    pub timestamp: u64,
}
