use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{Notify, oneshot};
use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

use hotkv_common::{StoreError, StoreResult};

use crate::config::{ExpiryMode, StoreConfig, validate_ttl};
use crate::entry::{Entry, ExpiryHandle, deadline_after};
use crate::sweep;

/// Estado protegido pelo lock único do store.
struct State<V> {
    entries: HashMap<String, Entry<V>>,
    /// (deadline, geração) → chave. Só é populado em `ExpiryMode::Sweep`.
    deadlines: BTreeMap<(Instant, u64), String>,
    next_generation: u64,
}

impl<V> State<V> {
    fn take(&mut self, key: &str) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.deadlines.remove(&(entry.expires_at, entry.generation));
        Some(entry)
    }
}

pub(crate) struct Shared<V> {
    state: Mutex<State<V>>,
    config: StoreConfig,
    runtime: Handle,
    wake_sweeper: Arc<Notify>,
}

impl<V> Shared<V> {
    /// Remove `key` somente se ainda for a geração `generation`.
    /// Devolve `false` quando um `get` ou overwrite chegou antes.
    pub(crate) fn reclaim(&self, key: &str, generation: u64) -> bool {
        let reclaimed = {
            let mut state = self.state.lock();
            let current = state
                .entries
                .get(key)
                .is_some_and(|entry| entry.generation == generation);
            if current { state.take(key) } else { None }
        };

        match reclaimed {
            Some(entry) => {
                entry.discard();
                debug!("chave expirada removida: {key}");
                true
            }
            None => false,
        }
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        let state = self.state.lock();
        state.deadlines.first_key_value().map(|((when, _), _)| *when)
    }

    /// Purga todas as chaves cujo deadline é <= `now`. Retorna quantas saíram.
    pub(crate) fn purge_expired(&self, now: Instant) -> usize {
        let mut expired = Vec::new();
        {
            let mut state = self.state.lock();
            // Tudo com deadline <= now fica em `due`; o resto volta para a fila.
            let pending = state.deadlines.split_off(&(now, u64::MAX));
            let due = std::mem::replace(&mut state.deadlines, pending);

            for ((_, generation), key) in due {
                let current = state
                    .entries
                    .get(&key)
                    .is_some_and(|entry| entry.generation == generation);
                if current && let Some(entry) = state.entries.remove(&key) {
                    expired.push((key, entry));
                }
            }
        }

        let count = expired.len();
        for (key, entry) in expired {
            entry.discard();
            trace!("chave expirada removida pelo sweep: {key}");
        }
        count
    }
}

impl<V> Drop for Shared<V> {
    fn drop(&mut self) {
        // Acorda o sweep para que ele perceba que o store sumiu.
        self.wake_sweeper.notify_one();
    }
}

/// Store in-memory de chaves quentes: cada valor é entregue no máximo uma
/// vez e descartado após o TTL mesmo se nunca for lido.
///
/// O handle é barato de clonar; todos os clones compartilham o mesmo mapa.
/// Quando o último clone é dropado, watchers pendentes e o sweep terminam.
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use std::time::Duration;
/// use hotkv_storage::TtlStore;
///
/// let store = TtlStore::new(Duration::from_secs(30)).unwrap();
/// store.set("Hello", "World");
/// assert_eq!(store.get("Hello").unwrap(), "World");
/// assert!(store.get("Hello").unwrap_err().is_not_found());
/// # }
/// ```
pub struct TtlStore<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for TtlStore<V> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<V: Send + 'static> TtlStore<V> {
    /// Cria um store com o TTL padrão `ttl` e watcher por chave.
    pub fn new(ttl: Duration) -> StoreResult<Self> {
        Self::with_config(StoreConfig::new(ttl))
    }

    /// Precisa ser chamado dentro de um runtime tokio.
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| StoreError::RuntimeUnavailable)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                entries: HashMap::new(),
                deadlines: BTreeMap::new(),
                next_generation: 0,
            }),
            config,
            runtime,
            wake_sweeper: Arc::new(Notify::new()),
        });

        if let ExpiryMode::Sweep { interval } = shared.config.expiry_mode {
            let weak = Arc::downgrade(&shared);
            let wake = shared.wake_sweeper.clone();
            shared.runtime.spawn(sweep::run(weak, wake, interval));
        }

        Ok(Self { shared })
    }

    /// Escrita incondicional com o TTL padrão. Um valor anterior da mesma
    /// chave é substituído e o relógio recomeça.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.insert(key.into(), value, self.shared.config.ttl);
    }

    /// Igual a `set`, mas com TTL próprio para esta escrita.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) -> StoreResult<()> {
        validate_ttl(ttl)?;
        self.insert(key.into(), value, ttl);
        Ok(())
    }

    /// Leitura consume-once: devolve o valor e remove a chave.
    pub fn get(&self, key: &str) -> StoreResult<V> {
        let mut state = self.shared.state.lock();
        match state.take(key) {
            Some(entry) if !entry.is_expired() => Ok(entry.into_value()),
            Some(entry) => {
                // Venceu mas o watcher/sweep ainda não pegou o lock.
                entry.discard();
                trace!("chave expirada descartada no get: {key}");
                Err(StoreError::KeyNotFound(key.to_string()))
            }
            None => Err(StoreError::KeyNotFound(key.to_string())),
        }
    }

    fn insert(&self, key: String, value: V, ttl: Duration) {
        let expires_at = deadline_after(ttl);

        let replaced = {
            let mut state = self.shared.state.lock();
            let generation = state.next_generation;
            state.next_generation += 1;

            let handle = match self.shared.config.expiry_mode {
                ExpiryMode::Watcher => {
                    // Spawn sob o lock: o watcher só consegue reclamar depois
                    // que a entrada estiver no mapa.
                    let (tx, rx) = oneshot::channel();
                    self.shared.runtime.spawn(watch(
                        Arc::downgrade(&self.shared),
                        key.clone(),
                        generation,
                        expires_at,
                        rx,
                    ));
                    ExpiryHandle::Watcher(tx)
                }
                ExpiryMode::Sweep { .. } => {
                    let earliest = state
                        .deadlines
                        .first_key_value()
                        .is_none_or(|((when, _), _)| expires_at < *when);
                    state.deadlines.insert((expires_at, generation), key.clone());
                    if earliest {
                        self.shared.wake_sweeper.notify_one();
                    }
                    ExpiryHandle::Sweep
                }
            };

            let entry = Entry::new(value, generation, expires_at, handle);
            let replaced = state.entries.insert(key, entry);
            if let Some(ref old) = replaced {
                state.deadlines.remove(&(old.expires_at, old.generation));
            }
            replaced
        };

        // Cancela o watcher antigo para que ele não apague o valor novo.
        if let Some(old) = replaced {
            old.discard();
        }
    }

    /// Número de entradas no mapa. Em modo sweep pode incluir entradas já
    /// vencidas que ainda não foram purgadas.
    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// TTL padrão do store.
    pub fn ttl(&self) -> Duration {
        self.shared.config.ttl
    }

    pub fn expiry_mode(&self) -> ExpiryMode {
        self.shared.config.expiry_mode
    }
}

impl<V> fmt::Debug for TtlStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlStore")
            .field("ttl", &self.shared.config.ttl)
            .field("expiry_mode", &self.shared.config.expiry_mode)
            .field("len", &self.shared.state.lock().entries.len())
            .finish()
    }
}

/// Watcher de uma geração de chave: espera o deadline ou o cancelamento.
async fn watch<V>(
    shared: Weak<Shared<V>>,
    key: String,
    generation: u64,
    deadline: Instant,
    cancelled: oneshot::Receiver<()>,
) {
    tokio::select! {
        _ = tokio::time::sleep_until(deadline) => {}
        _ = cancelled => {
            trace!("watcher cancelado: {key} (geração {generation})");
            return;
        }
    }

    // Store já dropado: nada a remover.
    if let Some(shared) = shared.upgrade() {
        shared.reclaim(&key, generation);
    }
}
