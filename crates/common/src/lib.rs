#![forbid(unsafe_code)]

mod error;

pub use error::*;

use std::time::Duration;

/// TTL padrão das chaves quando nenhum outro é configurado.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
/// Intervalo máximo entre duas passagens do sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
