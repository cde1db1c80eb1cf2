//! Ack-wait registry
//!
//! A fixed table of senders waiting for the ACK of a particular sequence
//! number. The table is only touched under a short blocking lock; waiting
//! happens on a per-slot [`Signal`] outside of it, so one waiter timing out
//! never holds up delivery to another.
//!
//! Free slots are tracked by an index free-list. A slot is returned to it
//! only by the [`AckWait`] that claimed it, when that is dropped.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration};
use heapless::Vec;

use crate::error::{AckTimeout, RegistryFull};

/// Default number of concurrent waiters
pub const ACK_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    occupied: bool,
    acked: bool,
    sequence: u16,
}

struct SlotTable<const S: usize> {
    slots: [Slot; S],
    free: Vec<u8, S>,
}

impl<const S: usize> SlotTable<S> {
    fn new() -> Self {
        let mut free = Vec::new();
        // Reversed so slot 0 is handed out first
        for index in (0..S).rev() {
            let _ = free.push(index as u8);
        }
        Self {
            slots: [Slot::default(); S],
            free,
        }
    }
}

/// Registry of senders waiting for an ACK
pub struct AckRegistry<M: RawMutex, const S: usize = ACK_SLOTS> {
    table: Mutex<M, RefCell<SlotTable<S>>>,
    signals: [Signal<M, u16>; S],
}

impl<M: RawMutex, const S: usize> Default for AckRegistry<M, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const S: usize> AckRegistry<M, S> {
    /// Create an empty registry
    pub fn new() -> Self {
        const { assert!(S <= u8::MAX as usize, "slot index must fit in u8") };
        Self {
            table: Mutex::new(RefCell::new(SlotTable::new())),
            signals: core::array::from_fn(|_| Signal::new()),
        }
    }

    /// Claim a slot to wait for the ACK of `sequence`
    ///
    /// Call this before transmitting the frame, so an ACK that arrives
    /// immediately is not missed.
    pub fn begin_wait(&self, sequence: u16) -> Result<AckWait<'_, M, S>, RegistryFull> {
        let claimed = self.table.lock(|table| {
            let mut table = table.borrow_mut();
            let index = table.free.pop()? as usize;
            table.slots[index] = Slot {
                occupied: true,
                acked: false,
                sequence,
            };
            // Under the lock, so a concurrent deliver_ack cannot be lost
            self.signals[index].reset();
            Some(index)
        });

        match claimed {
            Some(index) => Ok(AckWait {
                registry: self,
                index,
                sequence,
            }),
            None => {
                warn!("ack registry full, seq {} cannot wait", sequence);
                Err(RegistryFull)
            }
        }
    }

    /// Wake the sender waiting for `sequence`
    ///
    /// Returns false if nobody is waiting for it: the ACK arrived after
    /// the wait timed out, was duplicated, or is for an unknown sequence.
    pub fn deliver_ack(&self, sequence: u16) -> bool {
        self.table.lock(|table| {
            let mut table = table.borrow_mut();
            let Some(index) = table
                .slots
                .iter()
                .position(|slot| slot.occupied && !slot.acked && slot.sequence == sequence)
            else {
                return false;
            };
            table.slots[index].acked = true;
            // Under the lock, so the slot cannot be released and claimed
            // for another sequence before the signal lands
            self.signals[index].signal(sequence);
            true
        })
    }

    /// Number of unclaimed slots
    pub fn free_slots(&self) -> usize {
        self.table.lock(|table| table.borrow().free.len())
    }

    fn release(&self, index: usize) {
        self.table.lock(|table| {
            let mut table = table.borrow_mut();
            table.slots[index] = Slot::default();
            let _ = table.free.push(index as u8);
        });
    }
}

/// A claimed ack-wait slot
///
/// Dropping it releases the slot, whether or not the ACK arrived.
pub struct AckWait<'r, M: RawMutex, const S: usize> {
    registry: &'r AckRegistry<M, S>,
    index: usize,
    sequence: u16,
}

impl<M: RawMutex, const S: usize> AckWait<'_, M, S> {
    /// Sequence number being waited for
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Wait until the ACK arrives or `timeout` elapses
    pub async fn wait(self, timeout: Duration) -> Result<(), AckTimeout> {
        let signal = &self.registry.signals[self.index];
        let sequence = self.sequence;
        let acked = async {
            // A wake-up for another sequence is spurious
            while signal.wait().await != sequence {}
        };
        with_timeout(timeout, acked).await.map_err(|_| AckTimeout)
    }
}

impl<M: RawMutex, const S: usize> Drop for AckWait<'_, M, S> {
    fn drop(&mut self) {
        self.registry.release(self.index);
    }
}
