/*!
 * Sentinel Core
 *
 * Tipos, erros e traits compartilhados pelos detectores Sentinel
 */

pub mod types;
pub mod traits;
pub mod utils;
pub mod error;

// Re-exportações públicas
pub use error::{Error, Result};
pub use types::*;
