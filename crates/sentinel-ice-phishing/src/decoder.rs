use ethers::abi::{AbiParser, Event, EventExt, Function, RawLog, Token};
use ethers::types::{Address, Log, H256, U256};
use ethers::utils::keccak256;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::events::{ApprovalEvent, ApprovalKind, PermitCall, TransferEvent, TransferKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogKind {
    Erc20Approval,
    Erc721Approval,
    ApprovalForAll,
    Erc20Transfer,
    Erc721Transfer,
    TransferSingle,
    TransferBatch,
}

/// ERC-20 e ERC-721 compartilham a assinatura de `Approval` e `Transfer`;
/// a diferença está no número de tópicos (o token id é indexado).
const EVENT_ABIS: &[(LogKind, usize, &str)] = &[
    (LogKind::Erc20Approval, 3, "event Approval(address indexed owner, address indexed spender, uint256 value)"),
    (LogKind::Erc721Approval, 4, "event Approval(address indexed owner, address indexed spender, uint256 indexed tokenId)"),
    (LogKind::ApprovalForAll, 3, "event ApprovalForAll(address indexed owner, address indexed spender, bool approved)"),
    (LogKind::Erc20Transfer, 3, "event Transfer(address indexed from, address indexed to, uint256 value)"),
    (LogKind::Erc721Transfer, 4, "event Transfer(address indexed from, address indexed to, uint256 indexed tokenId)"),
    (LogKind::TransferSingle, 4, "event TransferSingle(address indexed operator, address indexed from, address indexed to, uint256 tokenId, uint256 value)"),
    (LogKind::TransferBatch, 4, "event TransferBatch(address indexed operator, address indexed from, address indexed to, uint256[] tokenIds, uint256[] values)"),
];

fn build_event_map() -> HashMap<(H256, usize), (LogKind, Event)> {
    let mut map = HashMap::new();
    let mut parser = AbiParser::default();
    for (kind, topics, abi) in EVENT_ABIS {
        if let Ok(ev) = parser.parse_event(abi) {
            let topic = H256::from_slice(keccak256(ev.abi_signature()).as_slice());
            map.insert((topic, *topics), (*kind, ev));
        }
    }
    map
}

static EVENT_MAP: Lazy<HashMap<(H256, usize), (LogKind, Event)>> = Lazy::new(build_event_map);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermitStyle {
    Eip2612,
    Dai,
}

const PERMIT_ABIS: &[(PermitStyle, &str)] = &[
    (
        PermitStyle::Eip2612,
        "function permit(address owner, address spender, uint256 value, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external",
    ),
    (
        PermitStyle::Dai,
        "function permit(address holder, address spender, uint256 nonce, uint256 expiry, bool allowed, uint8 v, bytes32 r, bytes32 s) external",
    ),
];

static PERMIT_FUNCTIONS: Lazy<Vec<(PermitStyle, Function)>> = Lazy::new(|| {
    PERMIT_ABIS
        .iter()
        .filter_map(|(style, abi)| {
            AbiParser::default()
                .parse_function(abi)
                .ok()
                .map(|f| (*style, f))
        })
        .collect()
});

fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.as_u64()
    }
}

fn uint_array(token: Token) -> Option<Vec<U256>> {
    token.into_array()?.into_iter().map(Token::into_uint).collect()
}

/// Decodifica o calldata de um `permit` enviado para `asset`.
///
/// Permits DAI com `allowed == false` são revogações e retornam `None`.
pub fn decode_permit(asset: Address, input: &[u8]) -> Option<PermitCall> {
    if input.len() < 4 {
        return None;
    }
    let (style, function) = PERMIT_FUNCTIONS
        .iter()
        .find(|(_, f)| f.short_signature() == input[..4])?;
    let mut tokens = function.decode_input(&input[4..]).ok()?.into_iter();
    let owner = tokens.next()?.into_address()?;
    let spender = tokens.next()?.into_address()?;

    match style {
        PermitStyle::Eip2612 => {
            let value = tokens.next()?.into_uint()?;
            let deadline = tokens.next()?.into_uint()?;
            Some(PermitCall { asset, owner, spender, deadline: saturating_u64(deadline), value: Some(value) })
        }
        PermitStyle::Dai => {
            let _nonce = tokens.next()?;
            let expiry = tokens.next()?.into_uint()?;
            let allowed = tokens.next()?.into_bool()?;
            allowed.then(|| PermitCall { asset, owner, spender, deadline: saturating_u64(expiry), value: None })
        }
    }
}

enum Decoded {
    Approval(ApprovalEvent),
    Transfer(TransferEvent),
}

fn decode_log(log: &Log) -> Option<Decoded> {
    let topic0 = log.topics.first()?;
    let (kind, event) = EVENT_MAP.get(&(*topic0, log.topics.len()))?;
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    let parsed = event.parse_log(raw).ok()?;
    let mut values = parsed.params.into_iter().map(|p| p.value);
    let asset = log.address;

    let decoded = match kind {
        LogKind::Erc20Approval | LogKind::Erc721Approval | LogKind::ApprovalForAll => {
            let owner = values.next()?.into_address()?;
            let spender = values.next()?.into_address()?;
            let last = values.next()?;
            let kind = match kind {
                LogKind::Erc20Approval => ApprovalKind::Erc20 { value: last.into_uint()? },
                LogKind::Erc721Approval => ApprovalKind::Erc721 { token_id: last.into_uint()? },
                _ => ApprovalKind::ForAll { approved: last.into_bool()? },
            };
            Decoded::Approval(ApprovalEvent { asset, owner, spender, kind })
        }
        LogKind::Erc20Transfer | LogKind::Erc721Transfer => {
            let from = values.next()?.into_address()?;
            let to = values.next()?.into_address()?;
            let last = values.next()?.into_uint()?;
            let kind = if *kind == LogKind::Erc20Transfer {
                TransferKind::Erc20 { value: last }
            } else {
                TransferKind::Erc721 { token_id: last }
            };
            Decoded::Transfer(TransferEvent { asset, from, to, kind })
        }
        LogKind::TransferSingle | LogKind::TransferBatch => {
            let _operator = values.next()?;
            let from = values.next()?.into_address()?;
            let to = values.next()?.into_address()?;
            let kind = if *kind == LogKind::TransferSingle {
                TransferKind::Erc1155Single {
                    id: values.next()?.into_uint()?,
                    value: values.next()?.into_uint()?,
                }
            } else {
                TransferKind::Erc1155Batch {
                    ids: uint_array(values.next()?)?,
                    values: uint_array(values.next()?)?,
                }
            };
            Decoded::Transfer(TransferEvent { asset, from, to, kind })
        }
    };
    Some(decoded)
}

/// Separa approvals e transfers conhecidos entre os logs de uma transação,
/// preservando a ordem de emissão. Logs desconhecidos ou malformados são
/// descartados.
pub fn decode_logs(logs: &[Log]) -> (Vec<ApprovalEvent>, Vec<TransferEvent>) {
    let mut approvals = Vec::new();
    let mut transfers = Vec::new();
    for log in logs {
        match decode_log(log) {
            Some(Decoded::Approval(a)) => approvals.push(a),
            Some(Decoded::Transfer(t)) => transfers.push(t),
            None => {}
        }
    }
    (approvals, transfers)
}
