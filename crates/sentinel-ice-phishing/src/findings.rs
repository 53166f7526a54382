//! Construção dos alertas emitidos pelo detector.

use ethereum_types::{Address, U256};
use sentinel_core::{utils::{days_between, format_address, format_h256}, Finding, FindingType, Severity};
use sentinel_feeds::SuspiciousContract;
use serde_json::Value;

use crate::address_type::Tier;
use crate::tables::Timestamped;

pub const ERC20_PERMIT: &str = "ICE-PHISHING-ERC20-PERMIT";
pub const ERC20_SUSPICIOUS_PERMIT: &str = "ICE-PHISHING-ERC20-SUSPICIOUS-PERMIT";
pub const ERC20_SCAM_PERMIT: &str = "ICE-PHISHING-ERC20-SCAM-PERMIT";
pub const ERC20_SCAM_CREATOR_PERMIT: &str = "ICE-PHISHING-ERC20-SCAM-CREATOR-PERMIT";
pub const ERC721_APPROVAL_FOR_ALL: &str = "ICE-PHISHING-ERC721-APPROVAL-FOR-ALL";
pub const ERC1155_APPROVAL_FOR_ALL: &str = "ICE-PHISHING-ERC1155-APPROVAL-FOR-ALL";
pub const HIGH_NUM_ERC20_APPROVALS: &str = "ICE-PHISHING-HIGH-NUM-ERC20-APPROVALS";
pub const HIGH_NUM_ERC721_APPROVALS: &str = "ICE-PHISHING-HIGH-NUM-ERC721-APPROVALS";
pub const HIGH_NUM_APPROVED_TRANSFERS: &str = "ICE-PHISHING-HIGH-NUM-APPROVED-TRANSFERS";
pub const PERMITTED_ERC20_TRANSFER: &str = "ICE-PHISHING-PERMITTED-ERC20-TRANSFER";
pub const SCAM_APPROVAL: &str = "ICE-PHISHING-SCAM-APPROVAL";
pub const SCAM_TRANSFER: &str = "ICE-PHISHING-SCAM-TRANSFER";
pub const SUSPICIOUS_TRANSFER: &str = "ICE-PHISHING-SUSPICIOUS-TRANSFER";

/// Padrão de token de um alerta agregado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStandard {
    Erc20,
    Erc721,
    Erc1155,
}

impl TokenStandard {
    fn label(self) -> &'static str {
        match self {
            TokenStandard::Erc20 => "ERC-20",
            TokenStandard::Erc721 => "ERC-721",
            TokenStandard::Erc1155 => "ERC-1155",
        }
    }
}

fn addr(a: &Address) -> Value {
    Value::String(format_address(a))
}

fn addr_list(list: &[Address]) -> Value {
    Value::Array(list.iter().map(addr).collect())
}

fn string_list(list: Vec<String>) -> Value {
    Value::Array(list.into_iter().map(Value::String).collect())
}

/// Variante de baixa severidade para spenders da faixa informativa
fn tiered(
    tier: Tier,
    alert_id: &str,
    suffix: &str,
    standard: (Severity, FindingType),
    reduced: (Severity, FindingType),
) -> (String, Severity, FindingType) {
    match tier {
        Tier::Standard => (alert_id.to_string(), standard.0, standard.1),
        Tier::Info => (format!("{}-{}", alert_id, suffix), reduced.0, reduced.1),
    }
}

fn permit_description(msg_sender: &Address, spender: &Address, owner: &Address) -> String {
    format!(
        "{} gave permission to {} for {}'s ERC-20 tokens",
        format_address(msg_sender),
        format_address(spender),
        format_address(owner)
    )
}

fn transfer_description(msg_sender: &Address, owner: &Address, receiver: &Address) -> String {
    format!(
        "{} transferred assets from {} to {}",
        format_address(msg_sender),
        format_address(owner),
        format_address(receiver)
    )
}

pub fn permit(tier: Tier, msg_sender: &Address, spender: &Address, owner: &Address, asset: &Address) -> Finding {
    let (alert_id, severity, finding_type) = tiered(
        tier,
        ERC20_PERMIT,
        "INFO",
        (Severity::Low, FindingType::Suspicious),
        (Severity::Info, FindingType::Info),
    );
    Finding::new(
        "Account got permission for ERC-20 tokens",
        permit_description(msg_sender, spender, owner),
        alert_id,
        severity,
        finding_type,
    )
    .with_metadata("msgSender", addr(msg_sender))
    .with_metadata("owner", addr(owner))
    .with_metadata("spender", addr(spender))
    .with_addresses(vec![*asset])
}

pub fn suspicious_permit(
    msg_sender: &Address,
    spender: &Address,
    owner: &Address,
    asset: &Address,
    contract: &SuspiciousContract,
) -> Finding {
    Finding::new(
        "Suspicious contract was involved in an ERC-20 permission",
        permit_description(msg_sender, spender, owner),
        ERC20_SUSPICIOUS_PERMIT,
        Severity::Medium,
        FindingType::Suspicious,
    )
    .with_metadata("msgSender", addr(msg_sender))
    .with_metadata("owner", addr(owner))
    .with_metadata("spender", addr(spender))
    .with_metadata("suspiciousContract", addr(&contract.address))
    .with_metadata("suspiciousContractCreator", addr(&contract.creator))
    .with_addresses(vec![*asset])
}

pub fn scam_permit(
    msg_sender: &Address,
    spender: &Address,
    owner: &Address,
    asset: &Address,
    scam_addresses: &[Address],
    scam_domains: Vec<String>,
) -> Finding {
    Finding::new(
        "Known scam address was involved in an ERC-20 permission",
        permit_description(msg_sender, spender, owner),
        ERC20_SCAM_PERMIT,
        Severity::High,
        FindingType::Suspicious,
    )
    .with_metadata("scamAddresses", addr_list(scam_addresses))
    .with_metadata("scamDomains", string_list(scam_domains))
    .with_metadata("msgSender", addr(msg_sender))
    .with_metadata("spender", addr(spender))
    .with_metadata("owner", addr(owner))
    .with_addresses(vec![*asset])
}

pub fn scam_creator_permit(
    msg_sender: &Address,
    spender: &Address,
    owner: &Address,
    asset: &Address,
    scam_creators: &[Address],
    scam_domains: Vec<String>,
) -> Finding {
    Finding::new(
        "Contract created by a known scam address was involved in an ERC-20 permission",
        permit_description(msg_sender, spender, owner),
        ERC20_SCAM_CREATOR_PERMIT,
        Severity::High,
        FindingType::Suspicious,
    )
    .with_metadata("scamAddresses", addr_list(scam_creators))
    .with_metadata("scamDomains", string_list(scam_domains))
    .with_metadata("msgSender", addr(msg_sender))
    .with_metadata("spender", addr(spender))
    .with_metadata("owner", addr(owner))
    .with_addresses(vec![*asset])
}

pub fn approval_for_all(tier: Tier, standard: TokenStandard, spender: &Address, owner: &Address, asset: &Address) -> Finding {
    let base = match standard {
        TokenStandard::Erc1155 => ERC1155_APPROVAL_FOR_ALL,
        _ => ERC721_APPROVAL_FOR_ALL,
    };
    let (alert_id, severity, finding_type) = tiered(
        tier,
        base,
        "INFO",
        (Severity::Low, FindingType::Suspicious),
        (Severity::Info, FindingType::Info),
    );
    Finding::new(
        format!("Account got approval for all {} tokens", standard.label()),
        format!(
            "{} obtained transfer approval for all {} tokens from {}",
            format_address(spender),
            standard.label(),
            format_address(owner)
        ),
        alert_id,
        severity,
        finding_type,
    )
    .with_metadata("spender", addr(spender))
    .with_metadata("owner", addr(owner))
    .with_addresses(vec![*asset])
}

/// Dados agregados de uma lista de registros de um spender
struct Summary {
    first_tx_hash: String,
    last_tx_hash: String,
    assets: Vec<Address>,
    accounts: usize,
    days: u64,
}

fn summarize<T: Timestamped>(records: &[T]) -> Summary {
    let mut assets: Vec<Address> = Vec::new();
    let mut accounts: Vec<Address> = Vec::new();
    for r in records {
        if !assets.contains(&r.asset()) {
            assets.push(r.asset());
        }
        if !accounts.contains(&r.owner()) {
            accounts.push(r.owner());
        }
    }
    let (first, last) = match (records.first(), records.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => {
            return Summary {
                first_tx_hash: String::new(),
                last_tx_hash: String::new(),
                assets,
                accounts: 0,
                days: 0,
            }
        }
    };
    Summary {
        first_tx_hash: format_h256(&first.tx_hash()),
        last_tx_hash: format_h256(&last.tx_hash()),
        days: days_between(first.timestamp(), last.timestamp()),
        accounts: accounts.len(),
        assets,
    }
}

pub fn high_num_approvals<T: Timestamped>(tier: Tier, standard: TokenStandard, spender: &Address, records: &[T]) -> Finding {
    let base = match standard {
        TokenStandard::Erc20 => HIGH_NUM_ERC20_APPROVALS,
        _ => HIGH_NUM_ERC721_APPROVALS,
    };
    let (alert_id, severity, finding_type) = tiered(
        tier,
        base,
        "INFO",
        (Severity::Low, FindingType::Suspicious),
        (Severity::Info, FindingType::Info),
    );
    let s = summarize(records);
    Finding::new(
        format!("High number of accounts granted approvals for {} tokens", standard.label()),
        format!(
            "{} obtained transfer approval for {} {} tokens by {} accounts over period of {} days.",
            format_address(spender),
            s.assets.len(),
            standard.label(),
            s.accounts,
            s.days
        ),
        alert_id,
        severity,
        finding_type,
    )
    .with_metadata("firstTxHash", s.first_tx_hash)
    .with_metadata("lastTxHash", s.last_tx_hash)
    .with_addresses(s.assets)
}

pub fn high_num_transfers<T: Timestamped>(tier: Tier, spender: &Address, records: &[T]) -> Finding {
    let (alert_id, severity, finding_type) = tiered(
        tier,
        HIGH_NUM_APPROVED_TRANSFERS,
        "LOW",
        (Severity::High, FindingType::Exploit),
        (Severity::Low, FindingType::Suspicious),
    );
    let s = summarize(records);
    Finding::new(
        "Previously approved assets transferred",
        format!(
            "{} transferred {} assets from {} accounts over period of {} days.",
            format_address(spender),
            s.assets.len(),
            s.accounts,
            s.days
        ),
        alert_id,
        severity,
        finding_type,
    )
    .with_metadata("firstTxHash", s.first_tx_hash)
    .with_metadata("lastTxHash", s.last_tx_hash)
    .with_addresses(s.assets)
}

pub fn permitted_transfer(
    tier: Tier,
    spender: &Address,
    owner: &Address,
    receiver: &Address,
    asset: &Address,
    value: U256,
) -> Finding {
    let (alert_id, severity, finding_type) = tiered(
        tier,
        PERMITTED_ERC20_TRANSFER,
        "MEDIUM",
        (Severity::Critical, FindingType::Exploit),
        (Severity::Medium, FindingType::Suspicious),
    );
    Finding::new(
        "Previously permitted assets transferred",
        format!(
            "{} transferred {} tokens from {} to {}",
            format_address(spender),
            value,
            format_address(owner),
            format_address(receiver)
        ),
        alert_id,
        severity,
        finding_type,
    )
    .with_metadata("owner", addr(owner))
    .with_metadata("receiver", addr(receiver))
    .with_metadata("spender", addr(spender))
    .with_addresses(vec![*asset])
}

pub fn scam_approval(spender: &Address, owner: &Address, asset: &Address, scam_domains: Vec<String>) -> Finding {
    Finding::new(
        "Known scam address got approval to spend assets",
        format!("Scam address {} got approval for {}'s assets", format_address(spender), format_address(owner)),
        SCAM_APPROVAL,
        Severity::High,
        FindingType::Suspicious,
    )
    .with_metadata("scamDomains", string_list(scam_domains))
    .with_metadata("scamSpender", addr(spender))
    .with_metadata("owner", addr(owner))
    .with_addresses(vec![*asset])
}

pub fn scam_transfer(
    msg_sender: &Address,
    owner: &Address,
    receiver: &Address,
    asset: &Address,
    scam_addresses: &[Address],
    scam_domains: Vec<String>,
) -> Finding {
    Finding::new(
        "Known scam address was involved in an asset transfer",
        transfer_description(msg_sender, owner, receiver),
        SCAM_TRANSFER,
        Severity::Critical,
        FindingType::Exploit,
    )
    .with_metadata("scamAddresses", addr_list(scam_addresses))
    .with_metadata("scamDomains", string_list(scam_domains))
    .with_metadata("msgSender", addr(msg_sender))
    .with_metadata("owner", addr(owner))
    .with_metadata("receiver", addr(receiver))
    .with_addresses(vec![*asset])
}

pub fn suspicious_transfer(
    msg_sender: &Address,
    owner: &Address,
    receiver: &Address,
    asset: &Address,
    contract: &SuspiciousContract,
) -> Finding {
    Finding::new(
        "Suspicious contract was involved in an asset transfer",
        transfer_description(msg_sender, owner, receiver),
        SUSPICIOUS_TRANSFER,
        Severity::High,
        FindingType::Suspicious,
    )
    .with_metadata("msgSender", addr(msg_sender))
    .with_metadata("owner", addr(owner))
    .with_metadata("receiver", addr(receiver))
    .with_metadata("suspiciousContract", addr(&contract.address))
    .with_metadata("suspiciousContractCreator", addr(&contract.creator))
    .with_addresses(vec![*asset])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ApprovalRecord;
    use ethereum_types::H256;

    #[test]
    fn info_tier_uses_reduced_variant() {
        let a = Address::repeat_byte(1);
        let f = permit(Tier::Info, &a, &a, &Address::repeat_byte(2), &Address::repeat_byte(3));
        assert_eq!(f.alert_id, "ICE-PHISHING-ERC20-PERMIT-INFO");
        assert_eq!(f.severity, Severity::Info);
        assert_eq!(f.finding_type, FindingType::Info);

        let f = permitted_transfer(Tier::Info, &a, &a, &a, &a, U256::from(5u64));
        assert_eq!(f.alert_id, "ICE-PHISHING-PERMITTED-ERC20-TRANSFER-MEDIUM");
        assert_eq!(f.severity, Severity::Medium);

        let f = high_num_transfers::<ApprovalRecord>(Tier::Info, &a, &[]);
        assert_eq!(f.alert_id, "ICE-PHISHING-HIGH-NUM-APPROVED-TRANSFERS-LOW");
    }

    #[test]
    fn high_num_approvals_summarizes_records() {
        let spender = Address::repeat_byte(0xee);
        let records: Vec<ApprovalRecord> = (0..4u8)
            .map(|i| ApprovalRecord {
                asset: Address::repeat_byte(0xa0 + (i % 2)),
                owner: Address::repeat_byte(i + 1),
                tx_hash: H256::repeat_byte(i + 1),
                timestamp: 1_000 + u64::from(i) * 86_400,
                token_id: None,
                is_approval_for_all: false,
            })
            .collect();

        let f = high_num_approvals(Tier::Standard, TokenStandard::Erc20, &spender, &records);
        assert_eq!(f.alert_id, HIGH_NUM_ERC20_APPROVALS);
        assert_eq!(
            f.description,
            format!(
                "{} obtained transfer approval for 2 ERC-20 tokens by 4 accounts over period of 3 days.",
                format_address(&spender)
            )
        );
        assert_eq!(f.metadata_str("firstTxHash"), Some(format_h256(&H256::repeat_byte(1)).as_str()));
        assert_eq!(f.metadata_str("lastTxHash"), Some(format_h256(&H256::repeat_byte(4)).as_str()));
        assert_eq!(f.addresses, vec![Address::repeat_byte(0xa0), Address::repeat_byte(0xa1)]);
    }

    #[test]
    fn scam_permit_lists_every_scam_party() {
        let spender = Address::repeat_byte(0x50);
        let sender = Address::repeat_byte(0x51);
        let f = scam_permit(&sender, &spender, &Address::repeat_byte(1), &Address::repeat_byte(2), &[spender, sender], vec!["scam.xyz".into()]);
        assert_eq!(f.metadata["scamAddresses"].as_array().unwrap().len(), 2);
        assert_eq!(f.metadata["scamDomains"][0], "scam.xyz");
        assert_eq!(f.severity, Severity::High);
    }
}
