//! Client registry
//!
//! Fixed-capacity table of sessions shared by every connection handler.
//! All access goes through one mutex whose critical sections only scan or
//! mutate the in-memory table; no lock is held across socket I/O or an
//! `.await`.
//!
//! Slots move through three states:
//!
//! ```text
//! Empty ──reserve──→ Reserved ──authenticate──→ Authenticated
//!   ↑                   │                             │
//!   └──────release──────┴───────────release───────────┘
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::AppError;
use crate::message::ServerMessage;
use crate::types::{SessionId, SlotId};

/// Outbound queue of one connection, cloned out of the registry for delivery
pub type ConnectionHandle = mpsc::Sender<ServerMessage>;

#[derive(Debug)]
enum Slot {
    Empty,
    Reserved {
        session: SessionId,
    },
    Authenticated {
        session: SessionId,
        username: String,
        handle: ConnectionHandle,
    },
}

/// Capacity-bounded table of sessions
#[derive(Debug)]
pub struct Registry {
    slots: Mutex<Vec<Slot>>,
}

impl Registry {
    /// Create a registry with `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| Slot::Empty).collect();
        Self {
            slots: Mutex::new(slots),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots().len()
    }

    /// Every mutation is a single slot assignment, so a panic elsewhere
    /// cannot leave the table half-written; recover instead of propagating.
    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the first empty slot for a new connection
    pub fn reserve(&self, session: SessionId) -> Result<SlotId, AppError> {
        let mut slots = self.slots();
        let index = slots
            .iter()
            .position(|slot| matches!(slot, Slot::Empty))
            .ok_or(AppError::CapacityExceeded)?;

        slots[index] = Slot::Reserved { session };
        debug!("Session {} reserved slot #{}", session, index);
        Ok(SlotId(index))
    }

    /// Bind a username to a reserved slot
    ///
    /// Fails with `UsernameTaken` if any authenticated slot already holds
    /// `username`. The uniqueness check and the transition happen under the
    /// same lock, so two concurrent attempts cannot both succeed.
    pub fn authenticate(
        &self,
        slot: SlotId,
        username: &str,
        handle: ConnectionHandle,
    ) -> Result<(), AppError> {
        let mut slots = self.slots();

        let taken = slots.iter().any(|s| match s {
            Slot::Authenticated { username: held, .. } => held == username,
            _ => false,
        });
        if taken {
            return Err(AppError::UsernameTaken(username.to_string()));
        }

        let entry = slots.get_mut(slot.0).ok_or(AppError::SlotNotReserved(slot))?;
        let Slot::Reserved { session } = *entry else {
            return Err(AppError::SlotNotReserved(slot));
        };

        *entry = Slot::Authenticated {
            session,
            username: username.to_string(),
            handle,
        };
        debug!("Session {} authenticated as '{}' in slot {}", session, username, slot);
        Ok(())
    }

    /// Find the connection handle of an authenticated user
    pub fn lookup(&self, username: &str) -> Option<ConnectionHandle> {
        self.slots().iter().find_map(|slot| match slot {
            Slot::Authenticated {
                username: held,
                handle,
                ..
            } if held == username => Some(handle.clone()),
            _ => None,
        })
    }

    /// Snapshot of authenticated usernames in slot order
    pub fn list_usernames(&self) -> Vec<String> {
        self.slots()
            .iter()
            .filter_map(|slot| match slot {
                Slot::Authenticated { username, .. } => Some(username.clone()),
                _ => None,
            })
            .collect()
    }

    /// Reset a slot to empty, whatever state it was in
    pub fn release(&self, slot: SlotId) {
        let mut slots = self.slots();
        if let Some(entry) = slots.get_mut(slot.0) {
            let previous = std::mem::replace(entry, Slot::Empty);
            match previous {
                Slot::Empty => debug!("Slot {} released while already empty", slot),
                Slot::Reserved { session } | Slot::Authenticated { session, .. } => {
                    debug!("Session {} released slot {}", session, slot)
                }
            }
        }
    }
}
