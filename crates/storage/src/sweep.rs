use std::sync::{Arc, Weak};

use tokio::sync::Notify;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::entry::deadline_after;
use crate::store::Shared;

/// Background task que purga chaves expiradas em `ExpiryMode::Sweep`.
///
/// Dorme até o deadline mais próximo (no máximo `interval`) e acorda antes
/// quando um `set` registra um deadline ainda mais cedo. Segura só um `Weak`
/// entre as esperas; termina quando o store é dropado.
pub(crate) async fn run<V>(shared: Weak<Shared<V>>, wake: Arc<Notify>, interval: Duration) {
    debug!("sweep de expiração iniciado (intervalo {interval:?})");

    loop {
        let next_expiry = match shared.upgrade() {
            Some(store) => store.next_deadline(),
            None => break,
        };

        let fallback = deadline_after(interval);
        let until = next_expiry.map_or(fallback, |when| when.min(fallback));

        tokio::select! {
            _ = tokio::time::sleep_until(until) => {}
            _ = wake.notified() => { continue; }
        }

        let Some(store) = shared.upgrade() else {
            break;
        };
        let purged = store.purge_expired(Instant::now());
        if purged > 0 {
            debug!("{purged} chaves expiradas removidas pelo sweep");
        }
    }

    debug!("sweep de expiração encerrado");
}
