use gridhost_common::{ConfigError, InstanceKey};
use gridhost_instance::{Lifecycle, MapHandle, MapInstance};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Host-injected registry parameters. No defaults: tick cadence and grace
/// teardown are deployment decisions.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// Cadence of each instance's tick loop.
    pub tick_interval: Duration,
    /// How long an instance may sit empty before it destroys itself.
    pub grace_period: Duration,
}

/// Errors from registry lookups.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("instance creation failed: {0}")]
    Creation(#[from] ConfigError),
    #[error("failed to spawn instance tick thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Content-layer seam constructing instances for a key: map configuration,
/// terrain, courier, and policies all come from here.
pub trait InstanceFactory: Send + Sync {
    fn create(&self, key: &InstanceKey, grace: Duration) -> Result<MapInstance, ConfigError>;
}

impl<F> InstanceFactory for F
where
    F: Fn(&InstanceKey, Duration) -> Result<MapInstance, ConfigError> + Send + Sync,
{
    fn create(&self, key: &InstanceKey, grace: Duration) -> Result<MapInstance, ConfigError> {
        self(key, grace)
    }
}

struct Slot {
    handle: MapHandle,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Slot {
    /// A slot counts as live while its instance is not destroyed and still
    /// healthy; anything else is replaced on the next lookup or sweep.
    fn is_live(&self) -> bool {
        self.handle.lifecycle() != Lifecycle::Destroyed && self.handle.is_healthy()
    }

    fn retire(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Registry of live map instances, keyed by [`InstanceKey`].
pub struct Registry {
    config: RegistryConfig,
    factory: Box<dyn InstanceFactory>,
    slots: Mutex<BTreeMap<InstanceKey, Slot>>,
    creation_locks: Mutex<BTreeMap<InstanceKey, Arc<Mutex<()>>>>,
    sweeper: Mutex<Option<(Arc<AtomicBool>, JoinHandle<()>)>>,
}

impl Registry {
    pub fn new(config: RegistryConfig, factory: impl InstanceFactory + 'static) -> Self {
        Self {
            config,
            factory: Box::new(factory),
            slots: Mutex::new(BTreeMap::new()),
            creation_locks: Mutex::new(BTreeMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    /// Look up the live instance for a key, creating it if absent.
    ///
    /// Concurrent callers for the same key always receive handles to the
    /// same instance: creation runs under a per-key lock with a re-check, so
    /// exactly one of the racers constructs.
    pub fn get_or_create(&self, key: &InstanceKey) -> Result<MapHandle, RegistryError> {
        if let Some(slot) = self.slots.lock().get(key) {
            if slot.is_live() {
                return Ok(slot.handle.clone());
            }
        }

        let key_lock = {
            let mut locks = self.creation_locks.lock();
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let _creating = key_lock.lock();

        // Re-check: another creator may have won the race while we waited.
        if let Some(slot) = self.slots.lock().get(key) {
            if slot.is_live() {
                return Ok(slot.handle.clone());
            }
        }

        let instance = self.factory.create(key, self.config.grace_period)?;
        let handle = instance.handle();
        let stop = Arc::new(AtomicBool::new(false));
        let thread = spawn_tick_thread(instance, Arc::clone(&stop), self.config.tick_interval)?;

        let replaced = self.slots.lock().insert(
            key.clone(),
            Slot {
                handle: handle.clone(),
                stop,
                thread: Some(thread),
            },
        );
        if let Some(old) = replaced {
            // A dead predecessor for this key; reap its thread.
            old.retire();
        }
        tracing::info!(%key, uid = %handle.instance_uid(), "instance registered");
        Ok(handle)
    }

    /// Handle for a key only if a live instance already exists.
    pub fn get(&self, key: &InstanceKey) -> Option<MapHandle> {
        self.slots
            .lock()
            .get(key)
            .filter(|slot| slot.is_live())
            .map(|slot| slot.handle.clone())
    }

    /// Remove every destroyed or unhealthy instance, joining their tick
    /// threads. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let retired: Vec<(InstanceKey, Slot)> = {
            let mut slots = self.slots.lock();
            let dead: Vec<InstanceKey> = slots
                .iter()
                .filter(|(_, slot)| !slot.is_live())
                .map(|(key, _)| key.clone())
                .collect();
            dead.into_iter()
                .filter_map(|key| slots.remove(&key).map(|slot| (key, slot)))
                .collect()
        };
        let count = retired.len();
        for (key, slot) in retired {
            tracing::info!(%key, "instance swept");
            slot.retire();
            // Prune the key's creation lock only while nobody else holds a
            // clone of it. Removing an entry a creator is holding would let a
            // second creator install a fresh lock and sidestep the re-check,
            // constructing a duplicate instance for the key.
            let mut locks = self.creation_locks.lock();
            if locks.get(&key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(&key);
            }
        }
        count
    }

    /// Number of registered instances, live or awaiting sweep.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Keys of currently live instances.
    pub fn live_keys(&self) -> Vec<InstanceKey> {
        self.slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.is_live())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Run [`sweep`](Self::sweep) periodically on a background thread until
    /// shutdown (or until the registry is dropped).
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        let stop = Arc::new(AtomicBool::new(false));
        let registry: Weak<Registry> = Arc::downgrade(self);
        let stop_in_thread = Arc::clone(&stop);
        let thread = std::thread::spawn(move || {
            while !stop_in_thread.load(Ordering::Acquire) {
                std::thread::sleep(interval);
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.sweep();
            }
        });
        let mut sweeper = self.sweeper.lock();
        if let Some((old_stop, old_thread)) = sweeper.replace((stop, thread)) {
            old_stop.store(true, Ordering::Release);
            let _ = old_thread.join();
        }
    }

    /// Stop the sweeper and every instance tick thread and join them.
    pub fn shutdown(&self) {
        if let Some((stop, thread)) = self.sweeper.lock().take() {
            stop.store(true, Ordering::Release);
            let _ = thread.join();
        }
        let slots = std::mem::take(&mut *self.slots.lock());
        for (key, slot) in slots {
            tracing::debug!(%key, "stopping instance");
            slot.retire();
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_tick_thread(
    mut instance: MapInstance,
    stop: Arc<AtomicBool>,
    interval: Duration,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("map-{}", instance.key()))
        .spawn(move || {
            tracing::debug!(key = %instance.key(), "tick thread started");
            while !stop.load(Ordering::Acquire) {
                instance.tick(Instant::now());
                if instance.lifecycle() == Lifecycle::Destroyed {
                    break;
                }
                std::thread::sleep(interval);
            }
            tracing::debug!(key = %instance.key(), "tick thread exited");
        })
}
