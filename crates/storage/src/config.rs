use std::time::Duration;

use hotkv_common::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL, StoreError, StoreResult};

/// Estratégia usada para recolher chaves que nunca foram lidas.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryMode {
    /// Uma task de expiração por chave viva.
    #[default]
    Watcher,
    /// Checagem lazy no `get` + uma única task que purga chaves vencidas.
    /// `interval` limita o tempo máximo que o sweep fica dormindo.
    Sweep { interval: Duration },
}

impl ExpiryMode {
    /// Sweep com o intervalo padrão.
    pub fn sweep() -> Self {
        ExpiryMode::Sweep {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Configuração do store.
///
/// ```
/// use std::time::Duration;
/// use hotkv_storage::{ExpiryMode, StoreConfig};
///
/// let config = StoreConfig::new(Duration::from_secs(10))
///     .with_expiry_mode(ExpiryMode::sweep());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// TTL padrão aplicado por `set`.
    pub ttl: Duration,
    pub expiry_mode: ExpiryMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            expiry_mode: ExpiryMode::default(),
        }
    }
}

impl StoreConfig {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_expiry_mode(mut self, mode: ExpiryMode) -> Self {
        self.expiry_mode = mode;
        self
    }

    /// Rejeita TTL ou intervalo de sweep nulos.
    pub fn validate(&self) -> StoreResult<()> {
        validate_ttl(self.ttl)?;
        if let ExpiryMode::Sweep { interval } = self.expiry_mode
            && interval.is_zero()
        {
            return Err(StoreError::InvalidConfiguration(
                "intervalo do sweep deve ser positivo".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_ttl(ttl: Duration) -> StoreResult<()> {
    if ttl.is_zero() {
        return Err(StoreError::InvalidConfiguration(
            "ttl deve ser positivo".into(),
        ));
    }
    Ok(())
}

/// Converte milissegundos com sinal (vindos de arquivo de config ou de uma
/// requisição) em TTL. Zero e valores negativos são rejeitados.
pub fn ttl_from_millis(ms: i64) -> StoreResult<Duration> {
    if ms <= 0 {
        return Err(StoreError::InvalidConfiguration(format!(
            "ttl deve ser positivo, recebido {ms}ms"
        )));
    }
    Ok(Duration::from_millis(ms as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.ttl, DEFAULT_TTL);
        assert_eq!(config.expiry_mode, ExpiryMode::Watcher);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_chaining() {
        let config = StoreConfig::default()
            .with_ttl(Duration::from_millis(250))
            .with_expiry_mode(ExpiryMode::sweep());
        assert_eq!(config.ttl, Duration::from_millis(250));
        assert_eq!(
            config.expiry_mode,
            ExpiryMode::Sweep {
                interval: DEFAULT_SWEEP_INTERVAL
            }
        );
    }

    #[test]
    fn zero_ttl_rejected() {
        let config = StoreConfig::new(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_sweep_interval_rejected() {
        let config = StoreConfig::new(Duration::from_secs(1)).with_expiry_mode(ExpiryMode::Sweep {
            interval: Duration::ZERO,
        });
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn ttl_from_millis_bounds() {
        assert_eq!(ttl_from_millis(1).unwrap(), Duration::from_millis(1));
        assert_eq!(
            ttl_from_millis(100 * 60 * 1000).unwrap(),
            Duration::from_secs(6000)
        );
        assert!(ttl_from_millis(0).is_err());
        assert!(matches!(
            ttl_from_millis(-10 * 3600 * 1000),
            Err(StoreError::InvalidConfiguration(_))
        ));
    }
}
