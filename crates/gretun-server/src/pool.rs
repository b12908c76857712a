//! Tunnel pool - fixed-capacity registry of point-to-point address pairs
//!
//! Slots live in an arena addressed by their interface index and are never
//! added or removed after construction. Ownership is tracked twice: in the
//! slot's own state and in an identity → slot map, so that "is this peer
//! already registered" is a single lookup instead of a scan.
//!
//! The pool itself is not synchronized. It is shared as a [`SharedPool`] and
//! every call happens under that one mutex.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use gretun_common::TunnelSpec;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// The pool as shared between request handlers and the shutdown hook.
pub type SharedPool = Arc<Mutex<TunnelPool>>;

/// Server-side and client-side address of one point-to-point sub-range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AddressPair {
    pub server: Ipv4Addr,
    pub client: Ipv4Addr,
}

impl AddressPair {
    pub fn new(server: Ipv4Addr, client: Ipv4Addr) -> Self {
        Self { server, client }
    }
}

/// Ownership state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "owner", rename_all = "lowercase")]
pub enum SlotState {
    /// Available for allocation
    Free,
    /// Held by a peer while a create or destroy call is in flight
    Pending(IpAddr),
    /// Held by a peer with its interface up
    Owned(IpAddr),
}

impl SlotState {
    pub fn owner(&self) -> Option<IpAddr> {
        match self {
            SlotState::Free => None,
            SlotState::Pending(ip) | SlotState::Owned(ip) => Some(*ip),
        }
    }
}

#[derive(Debug, Clone)]
struct TunnelSlot {
    index: u32,
    pair: AddressPair,
    state: SlotState,
}

/// Snapshot of a held slot, handed out by the pool.
///
/// This is a copy, not a live reference: committing or releasing goes back
/// through the pool with the slot's index and owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRef {
    pub index: u32,
    pub owner: IpAddr,
    pub local_endpoint: IpAddr,
    pub server_address: Ipv4Addr,
    pub client_address: Ipv4Addr,
    pub prefix_len: u8,
}

impl SlotRef {
    /// Coordinator-side tunnel spec: the far end is the owning peer.
    pub fn spec(&self) -> TunnelSpec {
        TunnelSpec::new(
            self.index,
            self.local_endpoint,
            self.owner,
            self.server_address,
        )
        .with_prefix_len(self.prefix_len)
    }
}

/// Pool operation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("{} already holds slot {}", .0.owner, .0.index)]
    Conflict(SlotRef),

    #[error("no free slot left")]
    Exhausted,

    #[error("{0} holds no slot")]
    NotFound(IpAddr),

    #[error("slot {} of {} has an operation in flight", .0.index, .0.owner)]
    Busy(SlotRef),

    #[error("pool is closed")]
    Closed,
}

/// Per-slot entry of [`PoolStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub index: u32,
    pub server_address: Ipv4Addr,
    pub client_address: Ipv4Addr,
    #[serde(flatten)]
    pub state: SlotState,
}

/// Serializable view of the whole pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub local_endpoint: IpAddr,
    pub capacity: usize,
    pub occupancy: usize,
    pub closed: bool,
    pub slots: Vec<SlotStatus>,
}

/// Fixed-capacity tunnel slot registry
#[derive(Debug)]
pub struct TunnelPool {
    local_endpoint: IpAddr,
    prefix_len: u8,
    slots: Vec<TunnelSlot>,
    owners: HashMap<IpAddr, usize>,
    closed: bool,
}

impl TunnelPool {
    /// Build a pool with one slot per pair, indexed from 1 in list order.
    pub fn new(
        local_endpoint: IpAddr,
        pairs: impl IntoIterator<Item = AddressPair>,
        prefix_len: u8,
    ) -> Self {
        let slots = pairs
            .into_iter()
            .enumerate()
            .map(|(pos, pair)| TunnelSlot {
                index: pos as u32 + 1,
                pair,
                state: SlotState::Free,
            })
            .collect();

        Self {
            local_endpoint,
            prefix_len,
            slots,
            owners: HashMap::new(),
            closed: false,
        }
    }

    /// Wrap the pool for sharing across handlers.
    pub fn into_shared(self) -> SharedPool {
        Arc::new(Mutex::new(self))
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots held, pending or owned.
    pub fn occupancy(&self) -> usize {
        self.owners.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reserve the lowest-index free slot for `owner`.
    ///
    /// The slot comes back `Pending`; [`commit`](Self::commit) it once its
    /// interface is up, or [`release`](Self::release) it if that failed.
    pub fn allocate(&mut self, owner: IpAddr) -> Result<SlotRef, PoolError> {
        if self.closed {
            return Err(PoolError::Closed);
        }
        if let Some(&pos) = self.owners.get(&owner) {
            return Err(PoolError::Conflict(self.slot_ref(pos, owner)));
        }

        let pos = self
            .slots
            .iter()
            .position(|slot| slot.state == SlotState::Free)
            .ok_or(PoolError::Exhausted)?;

        self.slots[pos].state = SlotState::Pending(owner);
        self.owners.insert(owner, pos);
        debug!(index = self.slots[pos].index, identity = %owner, "Slot reserved");
        Ok(self.slot_ref(pos, owner))
    }

    /// Slot held by `owner`, if any.
    pub fn find(&self, owner: IpAddr) -> Option<SlotRef> {
        self.owners
            .get(&owner)
            .map(|&pos| self.slot_ref(pos, owner))
    }

    /// State of the slot with interface index `index`.
    pub fn state(&self, index: u32) -> Option<SlotState> {
        self.position(index).map(|pos| self.slots[pos].state)
    }

    /// Mark a reserved slot as owned. Returns false if `slot` no longer
    /// describes a pending reservation.
    pub fn commit(&mut self, slot: &SlotRef) -> bool {
        self.transition(slot, SlotState::Pending(slot.owner), SlotState::Owned(slot.owner))
    }

    /// Move `owner`'s slot to `Pending` ahead of a destroy call.
    pub fn begin_teardown(&mut self, owner: IpAddr) -> Result<SlotRef, PoolError> {
        if self.closed {
            return Err(PoolError::Closed);
        }
        let pos = *self.owners.get(&owner).ok_or(PoolError::NotFound(owner))?;
        let slot = self.slot_ref(pos, owner);
        match self.slots[pos].state {
            SlotState::Owned(_) => {
                self.slots[pos].state = SlotState::Pending(owner);
                Ok(slot)
            }
            _ => Err(PoolError::Busy(slot)),
        }
    }

    /// Return a slot to `Owned` after a failed destroy.
    pub fn restore(&mut self, slot: &SlotRef) -> bool {
        self.transition(slot, SlotState::Pending(slot.owner), SlotState::Owned(slot.owner))
    }

    /// Free the slot. Releasing a slot that is already free, or that has
    /// meanwhile changed hands, does nothing.
    pub fn release(&mut self, slot: &SlotRef) {
        let Some(pos) = self.position(slot.index) else {
            return;
        };
        if self.slots[pos].state.owner() != Some(slot.owner) {
            return;
        }
        self.slots[pos].state = SlotState::Free;
        self.owners.remove(&slot.owner);
        debug!(index = slot.index, identity = %slot.owner, "Slot released");
    }

    /// Snapshot of every slot in the `Owned` state.
    pub fn all_owned(&self) -> Vec<SlotRef> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| match slot.state {
                SlotState::Owned(owner) => Some(self.slot_ref(pos, owner)),
                _ => None,
            })
            .collect()
    }

    /// Stop accepting requests and hand back every owned slot, now marked
    /// `Pending`, for teardown. Only the first call returns slots.
    pub fn close(&mut self) -> Vec<SlotRef> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;

        let owned = self.all_owned();
        for slot in &owned {
            if let Some(pos) = self.position(slot.index) {
                self.slots[pos].state = SlotState::Pending(slot.owner);
            }
        }
        owned
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            local_endpoint: self.local_endpoint,
            capacity: self.capacity(),
            occupancy: self.occupancy(),
            closed: self.closed,
            slots: self
                .slots
                .iter()
                .map(|slot| SlotStatus {
                    index: slot.index,
                    server_address: slot.pair.server,
                    client_address: slot.pair.client,
                    state: slot.state,
                })
                .collect(),
        }
    }

    fn position(&self, index: u32) -> Option<usize> {
        let pos = (index as usize).checked_sub(1)?;
        (pos < self.slots.len()).then_some(pos)
    }

    fn slot_ref(&self, pos: usize, owner: IpAddr) -> SlotRef {
        let slot = &self.slots[pos];
        SlotRef {
            index: slot.index,
            owner,
            local_endpoint: self.local_endpoint,
            server_address: slot.pair.server,
            client_address: slot.pair.client,
            prefix_len: self.prefix_len,
        }
    }

    fn transition(&mut self, slot: &SlotRef, from: SlotState, to: SlotState) -> bool {
        match self.position(slot.index) {
            Some(pos) if self.slots[pos].state == from => {
                self.slots[pos].state = to;
                true
            }
            _ => false,
        }
    }
}
