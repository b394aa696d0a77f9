//! Reference-counted table of live mount points.
//!
//! Live mount points sit in an arena of slots. Acquiring a mount point returns
//! a [`MountGuard`] holding a [`MountTicket`] for its slot; dropping the guard
//! decrements the slot counter. A slot is torn down at zero, which closes the
//! backing store and releases the parent of a nested mount.

use super::{MountPoint, MountPointFactory, MountPointInfo, MountRequest};
use crate::environment::EngineEnvironment;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};
use uuid::Uuid;

/// Source of persisted mount point records and of factories by id.
pub trait MountResolver {
    /// The persisted record for `id`, if known.
    fn mount_point_info(&self, id: Uuid) -> Option<MountPointInfo>;

    /// The registered factory with `factory_id`, if any.
    fn factory(&self, factory_id: Uuid) -> Option<Arc<dyn MountPointFactory>>;
}

/// Slot index of a live mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountTicket(usize);

struct Slot {
    id: Uuid,
    mount: Arc<dyn MountPoint>,
    references: usize,
    // Held for the lifetime of the slot; dropping it releases the parent
    _parent: Option<MountGuard>,
}

#[derive(Default)]
struct HandleTable {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    by_id: HashMap<Uuid, usize>,
}

impl HandleTable {
    fn acquire(&mut self, id: Uuid) -> Option<(MountTicket, Arc<dyn MountPoint>)> {
        let index = *self.by_id.get(&id)?;
        let slot = self.slots.get_mut(index)?.as_mut()?;
        slot.references += 1;
        Some((MountTicket(index), Arc::clone(&slot.mount)))
    }

    fn insert(&mut self, slot: Slot) -> MountTicket {
        let id = slot.id;
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                index
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.by_id.insert(id, index);
        MountTicket(index)
    }

    fn release(&mut self, ticket: MountTicket) -> Option<Slot> {
        let entry = self.slots.get_mut(ticket.0)?;
        let slot = entry.as_mut()?;
        slot.references = slot.references.saturating_sub(1);
        if slot.references > 0 {
            return None;
        }

        let slot = entry.take()?;
        self.by_id.remove(&slot.id);
        self.free.push(ticket.0);
        Some(slot)
    }
}

/// Owns every live mount point of the process.
pub struct MountPointManager {
    environment: Arc<EngineEnvironment>,
    table: Mutex<HandleTable>,
}

impl MountPointManager {
    pub fn new(environment: Arc<EngineEnvironment>) -> Arc<Self> {
        Arc::new(Self {
            environment,
            table: Mutex::new(HandleTable::default()),
        })
    }

    pub fn environment(&self) -> &Arc<EngineEnvironment> {
        &self.environment
    }

    fn table(&self) -> MutexGuard<'_, HandleTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the mount point `id`, mounting it (and its parents) if needed.
    ///
    /// Returns `None` for an unknown id, an unknown factory, or a backing store
    /// the factory can no longer open.
    pub fn try_demand(self: &Arc<Self>, id: Uuid, resolver: &dyn MountResolver) -> Option<MountGuard> {
        if let Some((ticket, mount)) = self.table().acquire(id) {
            trace!("Reusing live mount point {}", id);
            return Some(self.guard(ticket, mount));
        }

        let info = resolver.mount_point_info(id)?;
        let factory = resolver.factory(info.mount_point_factory_id)?;
        let parent = match info.parent_mount_point_id {
            Some(parent_id) => Some(self.try_demand(parent_id, resolver)?),
            None => None,
        };

        let mount = factory.try_mount(
            &self.environment,
            &MountRequest {
                id,
                parent: parent.as_deref(),
                place: &info.place,
            },
        );
        let Some(mount) = mount else {
            debug!("Mount point {} at '{}' could not be mounted", id, info.place);
            return None;
        };

        Some(self.register(mount, parent))
    }

    /// Adds a freshly mounted mount point to the table and acquires it.
    ///
    /// If a mount point with the same id is already live, that one is acquired
    /// and `mount` is dropped.
    pub fn register(
        self: &Arc<Self>,
        mount: Box<dyn MountPoint>,
        parent: Option<MountGuard>,
    ) -> MountGuard {
        let id = mount.info().mount_point_id;
        let mut table = self.table();
        if let Some((ticket, existing)) = table.acquire(id) {
            drop(table);
            return self.guard(ticket, existing);
        }

        let mount: Arc<dyn MountPoint> = Arc::from(mount);
        let ticket = table.insert(Slot {
            id,
            mount: Arc::clone(&mount),
            references: 1,
            _parent: parent,
        });
        drop(table);
        debug!("Mounted {} at '{}'", id, mount.info().place);
        self.guard(ticket, mount)
    }

    fn guard(self: &Arc<Self>, ticket: MountTicket, mount: Arc<dyn MountPoint>) -> MountGuard {
        MountGuard {
            manager: Arc::clone(self),
            ticket,
            mount,
        }
    }

    fn release(&self, ticket: MountTicket) {
        let torn_down = self.table().release(ticket);
        // The slot is dropped outside the lock: its parent guard re-enters release
        if let Some(slot) = torn_down {
            trace!("Released mount point {}", slot.id);
            drop(slot);
        }
    }

    fn share(&self, ticket: MountTicket) {
        if let Some(Some(slot)) = self.table().slots.get_mut(ticket.0) {
            slot.references += 1;
        }
    }

    /// Outstanding references on mount point `id`; zero when not live.
    pub fn reference_count(&self, id: Uuid) -> usize {
        let table = self.table();
        table
            .by_id
            .get(&id)
            .and_then(|index| table.slots.get(*index))
            .and_then(Option::as_ref)
            .map_or(0, |slot| slot.references)
    }

    /// Number of live mount points.
    pub fn live_count(&self) -> usize {
        self.table().by_id.len()
    }
}

/// Acquired mount point; released when dropped.
pub struct MountGuard {
    manager: Arc<MountPointManager>,
    ticket: MountTicket,
    mount: Arc<dyn MountPoint>,
}

impl MountGuard {
    pub fn ticket(&self) -> MountTicket {
        self.ticket
    }
}

impl Clone for MountGuard {
    fn clone(&self) -> Self {
        self.manager.share(self.ticket);
        Self {
            manager: Arc::clone(&self.manager),
            ticket: self.ticket,
            mount: Arc::clone(&self.mount),
        }
    }
}

impl Deref for MountGuard {
    type Target = dyn MountPoint;

    fn deref(&self) -> &Self::Target {
        self.mount.as_ref()
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.manager.release(self.ticket);
    }
}

impl std::fmt::Debug for MountGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountGuard")
            .field("ticket", &self.ticket)
            .field("mount_point_id", &self.mount.info().mount_point_id)
            .finish()
    }
}
