use crate::session::Session;
use chrono::{DateTime, Utc};
use intake_core::{IntakeError, IntakeResult, SessionId};
use parking_lot::{Mutex as SyncMutex, RwLock};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A session plus a liveness flag.
///
/// A slot is marked dead when its session is evicted. Tasks that were queued
/// on the slot's mutex at that moment observe the flag and look the key up
/// again instead of resurrecting the evicted session.
struct Slot {
    session: Session,
    live: bool,
}

type SlotHandle = Arc<Mutex<Slot>>;

/// Concurrent in-memory session store.
///
/// The key map sits behind a short-lived [`parking_lot::RwLock`] that is
/// never held across an `.await`. Each session has its own
/// [`tokio::sync::Mutex`], so exclusive access to one session never blocks
/// another, and waiters for the same session are served in FIFO order.
#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<SessionId, SlotHandle>>,
    /// Sessions removed by the idle sweep, with the time of removal.
    expired: SyncMutex<HashMap<SessionId, DateTime<Utc>>>,
}

/// Exclusive access to one live session.
///
/// Dereferences to [`Session`]. Dropping the guard releases the session;
/// [`SessionGuard::evict`] removes it from the store instead.
pub struct SessionGuard<'a> {
    store: &'a SessionStore,
    handle: SlotHandle,
    slot: OwnedMutexGuard<Slot>,
    created: bool,
    replaces_expired: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Waits for exclusive access to an existing session.
    pub async fn lock(&self, id: SessionId) -> Option<SessionGuard<'_>> {
        self.acquire(id, false).await
    }

    /// Waits for exclusive access to a session, creating it in the initial
    /// state if it does not exist. [`SessionGuard::is_new`] tells which.
    pub async fn lock_or_create(&self, id: SessionId) -> SessionGuard<'_> {
        loop {
            if let Some(guard) = self.acquire(id, true).await {
                return guard;
            }
        }
    }

    /// Returns a snapshot of the session, creating it if needed.
    pub async fn get_or_create(&self, id: SessionId) -> Session {
        self.lock_or_create(id).await.clone()
    }

    /// Returns a snapshot of the session if it exists.
    pub async fn get(&self, id: SessionId) -> Option<Session> {
        self.lock(id).await.map(|guard| guard.clone())
    }

    /// Applies `f` to the session under exclusive access and stamps
    /// `updated_at`. Fails with [`IntakeError::NotFound`] if the session
    /// does not exist.
    pub async fn mutate<F, R>(&self, id: SessionId, f: F) -> IntakeResult<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut guard = self.lock(id).await.ok_or(IntakeError::NotFound(id))?;
        let result = f(&mut guard);
        guard.touch();
        Ok(result)
    }

    /// Removes the session. Returns whether anything was removed; deleting
    /// a missing session is not an error.
    pub async fn delete(&self, id: SessionId) -> bool {
        match self.lock(id).await {
            Some(guard) => {
                guard.evict();
                true
            }
            None => false,
        }
    }

    /// Evicts every session idle for at least `max_idle` as of `now`.
    ///
    /// Sessions currently locked by an in-flight event are skipped; they are
    /// by definition not idle. An evicted id is remembered for another
    /// `max_idle`, so the session that next takes its place can report
    /// [`SessionGuard::replaces_expired`]. Returns how many sessions were
    /// evicted.
    pub fn sweep_idle_at(&self, now: DateTime<Utc>, max_idle: chrono::Duration) -> usize {
        let handles: Vec<(SessionId, SlotHandle)> = self
            .slots
            .read()
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect();

        let mut evicted = 0;
        for (id, handle) in handles {
            let Ok(mut slot) = handle.clone().try_lock_owned() else {
                continue;
            };
            if slot.live && slot.session.is_idle(now, max_idle) {
                slot.live = false;
                self.remove_handle(id, &handle);
                self.expired.lock().insert(id, now);
                evicted += 1;
                debug!(
                    session_id = %id,
                    state = slot.session.state.as_str(),
                    "Idle session evicted"
                );
            }
        }
        self.expired
            .lock()
            .retain(|_, swept_at| now.signed_duration_since(*swept_at) <= max_idle);
        evicted
    }

    /// [`Self::sweep_idle_at`] with the current time.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let max_idle = chrono::Duration::from_std(max_idle)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        self.sweep_idle_at(Utc::now(), max_idle)
    }

    /// Spawns a background task that sweeps idle sessions every `interval`.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        max_idle: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = self.sweep_idle(max_idle);
                if evicted > 0 {
                    info!(evicted, remaining = self.len(), "Idle session sweep");
                }
            }
        })
    }

    async fn acquire(&self, id: SessionId, create: bool) -> Option<SessionGuard<'_>> {
        loop {
            let existing = self.slots.read().get(&id).cloned();
            let (handle, created) = match existing {
                Some(handle) => (handle, false),
                None if !create => return None,
                None => {
                    let mut slots = self.slots.write();
                    match slots.get(&id) {
                        Some(handle) => (handle.clone(), false),
                        None => {
                            let handle = Arc::new(Mutex::new(Slot {
                                session: Session::new(id),
                                live: true,
                            }));
                            slots.insert(id, handle.clone());
                            (handle, true)
                        }
                    }
                }
            };

            let slot = handle.clone().lock_owned().await;
            if slot.live {
                let replaces_expired = created && self.expired.lock().remove(&id).is_some();
                if created {
                    debug!(session_id = %id, replaces_expired, "Session created");
                }
                return Some(SessionGuard {
                    store: self,
                    handle,
                    slot,
                    created,
                    replaces_expired,
                });
            }
        }
    }

    fn remove_handle(&self, id: SessionId, handle: &SlotHandle) {
        let mut slots = self.slots.write();
        if slots.get(&id).is_some_and(|current| Arc::ptr_eq(current, handle)) {
            slots.remove(&id);
        }
    }
}

impl SessionGuard<'_> {
    /// Whether this acquisition created the session.
    pub fn is_new(&self) -> bool {
        self.created
    }

    /// Whether this acquisition created the session in place of one the
    /// idle sweep removed.
    pub fn replaces_expired(&self) -> bool {
        self.replaces_expired
    }

    /// Removes the session from the store and returns its final value.
    ///
    /// Events already waiting on this session will find it gone and start
    /// a fresh one.
    pub fn evict(mut self) -> Session {
        self.slot.live = false;
        self.store.remove_handle(self.slot.session.session_id, &self.handle);
        self.slot.session.clone()
    }
}

impl Deref for SessionGuard<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.slot.session
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.slot.session
    }
}
