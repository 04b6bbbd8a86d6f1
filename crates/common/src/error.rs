/// Erros do store de chaves quentes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("configuração inválida: {0}")]
    InvalidConfiguration(String),
    #[error("chave {0} não encontrada")]
    KeyNotFound(String),
    #[error("nenhum runtime tokio ativo para agendar a expiração")]
    RuntimeUnavailable,
}

impl StoreError {
    /// `true` para o caso rotineiro de chave ausente (nunca setada, já lida ou expirada).
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound(_))
    }
}

/// Result type alias.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configuration_display() {
        let err = StoreError::InvalidConfiguration("ttl deve ser positivo".into());
        assert_eq!(
            err.to_string(),
            "configuração inválida: ttl deve ser positivo"
        );
    }

    #[test]
    fn key_not_found_display() {
        let err = StoreError::KeyNotFound("ProductID".into());
        assert_eq!(err.to_string(), "chave ProductID não encontrada");
    }

    #[test]
    fn runtime_unavailable_display() {
        let err = StoreError::RuntimeUnavailable;
        assert_eq!(
            err.to_string(),
            "nenhum runtime tokio ativo para agendar a expiração"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn is_not_found() {
        assert!(StoreError::KeyNotFound("k".into()).is_not_found());
        assert!(!StoreError::InvalidConfiguration("x".into()).is_not_found());
    }

    #[test]
    fn store_result_propagates_with_question_mark() {
        fn lookup() -> StoreResult<u32> {
            Err(StoreError::KeyNotFound("k".into()))
        }
        fn caller() -> StoreResult<u32> {
            let v = lookup()?;
            Ok(v + 1)
        }
        assert!(matches!(caller(), Err(StoreError::KeyNotFound(k)) if k == "k"));
    }
}
