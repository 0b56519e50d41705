// bulkmux-core/src/registry.rs

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::Rng;
use tracing::{debug, info};

use crate::Status;
use crate::config::BulkConfig;
use crate::error::BulkError;
use crate::session::{Session, SessionId};

/// Session ids are drawn from `1..=MAX_SESSION_ID`.
pub const MAX_SESSION_ID: u32 = 0x0fff_ffff;

// ════════════════════════════════════════════════════════════════════
// Registry
// ════════════════════════════════════════════════════════════════════

/// The connection table. Callers hold one of these (usually behind an `Arc`)
/// and go through it for every boundary operation.
///
/// One mutex guards the whole table. `receive` runs the session pipeline while
/// holding it, which is what keeps per-session state single-threaded.
#[derive(Debug)]
pub struct SessionRegistry {
    config: BulkConfig,
    table: Mutex<Table>,
}

/// Live sessions plus the ids whose writers are still being joined.
/// An id stays reserved until its old writers are gone, so a new session
/// can never share an artifact namespace with one still draining.
#[derive(Debug, Default)]
struct Table {
    sessions: HashMap<SessionId, Session>,
    closing: HashSet<SessionId>,
}

impl Table {
    fn is_taken(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id) || self.closing.contains(&id)
    }
}

impl SessionRegistry {
    /// Creates the output directory up front; there is no way to build a
    /// registry that skips this.
    pub fn new(config: BulkConfig) -> Result<Self, BulkError> {
        config.prepare()?;
        Ok(Self {
            config,
            table: Mutex::new(Table::default()),
        })
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    // ────────────────────────────────────────────────────────────────
    // Boundary operations
    // ────────────────────────────────────────────────────────────────

    /// Open a session batching `max_pool_size` commands per static bulk.
    pub fn connect(&self, max_pool_size: usize) -> Result<SessionId, BulkError> {
        let max_pool_size = NonZeroUsize::new(max_pool_size).ok_or(BulkError::ZeroPoolSize)?;

        let mut table = self.lock();
        let id = generate_id(&table, &mut rand::rng(), 1..=MAX_SESSION_ID);
        let session = Session::open(id, max_pool_size, &self.config)?;
        table.sessions.insert(id, session);

        info!(session = %id, max_pool_size = max_pool_size.get(), live = table.sessions.len(), "session connected");
        Ok(id)
    }

    /// Feed one command to a live session. The payload is carried as-is
    /// all the way to the artifact files.
    pub fn receive(&self, id: SessionId, payload: impl Into<Vec<u8>>) -> Status {
        let mut table = self.lock();
        match table.sessions.get_mut(&id) {
            Some(session) => {
                session.receive(payload);
                Status::Ok
            }
            None => {
                debug!(session = %id, "receive on unknown session");
                Status::ContextNotFound
            }
        }
    }

    /// `receive` for raw buffers coming over a byte boundary. Bytes need not
    /// be UTF-8; only the console line renders them lossily.
    pub fn receive_bytes(&self, id: SessionId, bytes: &[u8]) -> Status {
        self.receive(id, bytes)
    }

    /// Remove a session and wait for its writers to finish.
    ///
    /// The entry leaves the map under the lock and its id is parked in the
    /// closing set. The teardown flush and the join run without the lock;
    /// the id is released only after they return.
    pub fn disconnect(&self, id: SessionId) -> Status {
        let removed = {
            let mut table = self.lock();
            let removed = table.sessions.remove(&id);
            if removed.is_some() {
                table.closing.insert(id);
            }
            removed
        };
        match removed {
            Some(session) => {
                session.close();
                self.lock().closing.remove(&id);
                info!(session = %id, "session disconnected");
                Status::Ok
            }
            None => {
                debug!(session = %id, "disconnect on unknown session");
                Status::ContextNotFound
            }
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Introspection
    // ────────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.lock().sessions.contains_key(&id)
    }

    /// Live ids, sorted.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.lock().sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Disconnect everything. Each session drains as in `disconnect`.
    pub fn shutdown(&self) {
        let drained: Vec<Session> = {
            let mut table = self.lock();
            let drained: Vec<Session> = table.sessions.drain().map(|(_, session)| session).collect();
            table.closing.extend(drained.iter().map(Session::id));
            drained
        };
        if drained.is_empty() {
            return;
        }
        info!(sessions = drained.len(), "shutting down session registry");
        for session in drained {
            let id = session.id();
            session.close();
            self.lock().closing.remove(&id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Rejection-sample until the id is neither live nor still closing.
/// Must run under the registry lock.
fn generate_id(table: &Table, rng: &mut impl Rng, range: RangeInclusive<u32>) -> SessionId {
    loop {
        let id = SessionId::new(rng.random_range(range.clone()));
        if !table.is_taken(id) {
            return id;
        }
    }
}
