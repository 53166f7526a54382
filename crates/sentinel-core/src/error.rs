use thiserror::Error;

/// Erros comuns dos detectores Sentinel
#[derive(Error, Debug)]
pub enum Error {
    /// Erro de comunicação com o node Ethereum
    #[error("Erro de RPC: {0}")]
    RpcError(String),

    /// Erro em chamada HTTP para serviços externos (explorer, feeds)
    #[error("Erro HTTP: {0}")]
    HttpError(String),

    /// Erro de decodificação de dados
    #[error("Erro de decodificação: {0}")]
    DecodeError(String),

    /// Configuração inválida ou ausente
    #[error("Erro de configuração: {0}")]
    ConfigError(String),

    /// Erro de timeout
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Recurso não encontrado
    #[error("Não encontrado: {0}")]
    NotFound(String),

    /// Erro genérico
    #[error("{0}")]
    Other(String),
}

/// Tipo de resultado usado em toda a workspace
pub type Result<T> = std::result::Result<T, Error>;
