/*!
 * Sentinel Feeds
 *
 * Colaboradores HTTP dos detectores: block explorers no estilo Etherscan,
 * a base de endereços de scam do ScamSniffer e o feed de contratos
 * suspeitos publicado por outro detector.
 */

pub mod explorer;
pub mod scam;
pub mod suspicious;

pub use explorer::{default_explorers, EtherscanClient, ExplorerApi, ExplorerEndpoints, ExplorerResponse};
pub use scam::{ScamFeed, ScamSnifferClient, SCAM_ADDRESSES_URL, SCAM_DOMAINS_URL};
pub use suspicious::{AlertFeedClient, AlertFeedConfig, SuspiciousContract, SuspiciousContractSource};

use sentinel_core::Error;
use std::time::Duration;

/// Converte erros do reqwest preservando a distinção de timeout
pub(crate) fn http_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::TimeoutError(e.to_string())
    } else {
        Error::HttpError(e.to_string())
    }
}

/// Cliente HTTP compartilhado com timeout por requisição
pub(crate) fn build_client(timeout: Duration) -> sentinel_core::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::HttpError(format!("Falha ao criar cliente HTTP: {}", e)))
}
