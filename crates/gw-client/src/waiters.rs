//! Per-opcode synchronous wait slots.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use gw_proto::Opcode;

use crate::{ClientError, ClientResult};

enum Slot {
    /// A requester is parked waiting for this opcode.
    Pending,
    /// The listener delivered the response payload.
    Ready(Vec<u8>),
}

/// Rendezvous between requesting threads and the response listener.
///
/// One slot per opcode: a requester registers, sends its frame, and blocks;
/// the listener fills the slot and wakes everyone.  `fail_all` flips the
/// lost flag so present and future waits return [`ClientError::Lost`].
#[derive(Default)]
pub struct WaitMap {
    slots:   Mutex<FxHashMap<Opcode, Slot>>,
    arrived: Condvar,
    lost:    AtomicBool,
}

impl WaitMap {
    pub fn new() -> WaitMap {
        WaitMap::default()
    }

    /// Claim the slot for `opcode`.  Fails if a request on that opcode is
    /// already in flight, or the connection is gone.
    pub fn register(&self, opcode: Opcode) -> ClientResult<()> {
        if self.is_lost() {
            return Err(ClientError::Lost);
        }
        let mut slots = self.slots.lock();
        if slots.contains_key(&opcode) {
            return Err(ClientError::Busy(opcode));
        }
        slots.insert(opcode, Slot::Pending);
        Ok(())
    }

    /// Abandon a claimed slot (send failed after registration).
    pub fn cancel(&self, opcode: Opcode) {
        self.slots.lock().remove(&opcode);
    }

    /// Park until the response for `opcode` arrives or the connection dies.
    pub fn wait(&self, opcode: Opcode) -> ClientResult<Vec<u8>> {
        let mut slots = self.slots.lock();
        loop {
            if matches!(slots.get(&opcode), Some(Slot::Ready(_))) {
                let Some(Slot::Ready(payload)) = slots.remove(&opcode) else {
                    unreachable!();
                };
                return Ok(payload);
            }
            if self.is_lost() {
                slots.remove(&opcode);
                return Err(ClientError::Lost);
            }
            self.arrived.wait(&mut slots);
        }
    }

    /// Deliver a response.  Returns `false` if nobody was waiting (an
    /// unsolicited frame).
    pub fn fulfill(&self, opcode: Opcode, payload: Vec<u8>) -> bool {
        let mut slots = self.slots.lock();
        match slots.get(&opcode) {
            Some(Slot::Pending) => {
                slots.insert(opcode, Slot::Ready(payload));
                self.arrived.notify_all();
                true
            }
            _ => false,
        }
    }

    /// Mark the connection lost and wake every waiter.
    pub fn fail_all(&self) {
        self.lost.store(true, Ordering::SeqCst);
        // Take the slots lock so no waiter can miss the wakeup between its
        // lost-check and its park.
        let _slots = self.slots.lock();
        self.arrived.notify_all();
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }
}
