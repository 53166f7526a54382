/*!
 * Sentinel Ice Phishing
 *
 * Motor de correlação que acompanha approvals, permits e transferências
 * de tokens ERC-20, ERC-721 e ERC-1155 e emite findings quando um mesmo
 * spender acumula permissões de muitas contas ou drena ativos aprovados.
 */

pub mod address_type;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod detector;
pub mod events;
pub mod findings;
pub mod tables;

pub use address_type::{AddressType, CachedClassification, Tier};
pub use classifier::{AddressClassifier, Role};
pub use config::IcePhishingConfig;
pub use detector::IcePhishingDetector;
pub use events::*;
pub use tables::{TrackingTables, TierTables, TableStats};
