use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};

/// Teto para deadlines: ~30 anos, o mesmo limite de `Instant::far_future` do tokio.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Instante em que algo agendado agora com `ttl` vence. TTLs que não cabem
/// em um `Instant` são limitados a `FAR_FUTURE`.
pub(crate) fn deadline_after(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl.min(FAR_FUTURE))
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Capacidade de cancelar a remoção agendada de uma entrada.
///
/// Pertence à `Entry` e é consumida uma única vez: `cancel` explícito no
/// `get`/overwrite ou drop junto com a entrada. Em ambos os casos o watcher
/// acorda pelo lado do cancelamento e termina sem tocar no mapa.
#[derive(Debug)]
pub(crate) enum ExpiryHandle {
    Watcher(oneshot::Sender<()>),
    /// Deadline registrado na fila do sweep; removido junto com a entrada.
    Sweep,
}

impl ExpiryHandle {
    pub(crate) fn cancel(self) {
        if let ExpiryHandle::Watcher(tx) = self {
            // Receiver já encerrado significa que o watcher já saiu.
            let _ = tx.send(());
        }
    }
}

/// Entrada no store: valor + geração + deadline.
#[derive(Debug)]
pub(crate) struct Entry<V> {
    value: V,
    pub generation: u64,
    pub expires_at: Instant,
    handle: ExpiryHandle,
}

impl<V> Entry<V> {
    pub fn new(value: V, generation: u64, expires_at: Instant, handle: ExpiryHandle) -> Self {
        Self {
            value,
            generation,
            expires_at,
            handle,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Consome a entrada cancelando o handle e devolve o valor.
    pub fn into_value(self) -> V {
        self.handle.cancel();
        self.value
    }

    /// Descarta a entrada (overwrite ou expiração), cancelando o handle.
    pub fn discard(self) {
        self.handle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn into_value_cancels_watcher() {
        let (tx, rx) = oneshot::channel();
        let entry = Entry::new(
            "v",
            1,
            Instant::now() + Duration::from_secs(60),
            ExpiryHandle::Watcher(tx),
        );
        assert!(!entry.is_expired());
        assert_eq!(entry.into_value(), "v");
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn dropping_entry_closes_channel() {
        let (tx, rx) = oneshot::channel();
        let entry = Entry::new(
            1u8,
            1,
            Instant::now() + Duration::from_secs(60),
            ExpiryHandle::Watcher(tx),
        );
        drop(entry);
        assert!(rx.await.is_err());
    }

    #[test]
    fn deadline_after_clamps_huge_ttl() {
        let before = Instant::now();
        let deadline = deadline_after(Duration::MAX);
        assert!(deadline >= before + FAR_FUTURE);
        assert!(deadline <= Instant::now() + FAR_FUTURE);

        let short = deadline_after(Duration::from_millis(10));
        assert!(short < before + Duration::from_secs(60));
    }

    #[tokio::test]
    async fn expired_entry() {
        let entry = Entry::new(
            (),
            7,
            Instant::now() - Duration::from_millis(1),
            ExpiryHandle::Sweep,
        );
        assert!(entry.is_expired());
        entry.discard();
    }
}
