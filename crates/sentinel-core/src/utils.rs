/*!
 * Sentinel Utils
 *
 * Utilitários comuns usados em toda a workspace Sentinel
 */

use ethereum_types::{Address, H256};
use std::str::FromStr;

/// Converte uma string hexadecimal para Address
pub fn hex_to_address(hex: &str) -> Option<Address> {
    let hex_str = hex.strip_prefix("0x").unwrap_or(hex);
    Address::from_str(hex_str).ok()
}

/// Formata um Address para exibição (minúsculo, com prefixo)
pub fn format_address(address: &Address) -> String {
    format!("0x{:x}", address)
}

/// Formata um H256 para exibição
pub fn format_h256(hash: &H256) -> String {
    format!("0x{:x}", hash)
}

/// Verifica se o bytecode contém o seletor informado em qualquer posição
pub fn bytecode_contains_selector(code: &[u8], selector: [u8; 4]) -> bool {
    code.windows(4).any(|w| w == selector)
}

/// Número de dias (arredondado para cima) entre dois timestamps
pub fn days_between(first: u64, last: u64) -> u64 {
    let secs = last.saturating_sub(first);
    (secs + 86_399) / 86_400
}
