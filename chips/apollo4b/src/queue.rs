// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Single-producer single-consumer word queues shared between cores.
//!
//! Every ordered pair of cores has one queue. Its storage and its receive
//! descriptor live in the receiver's memory. The sender keeps a mirror
//! descriptor in its own memory that points at the receiver's buffer. Each
//! side advances only its own index and copies the new value into the
//! matching index of the other side's descriptor, so the receiver owns
//! `rd_index` and the sender owns `wr_index`.
//!
//! One slot is always kept free, so a queue of `size` words holds at most
//! `size - 1` of them. `wr_index == rd_index` means empty.
//!
//! Descriptors and buffers are reached by address from other cores, so
//! their layout is fixed with `#[repr(C)]` and every field is an
//! `AtomicU32`.

use core::mem::{offset_of, size_of};
use core::sync::atomic::{AtomicU32, Ordering};

use crate::core_id::{CoreId, NUM_CORES};

/// Number of word slots in each receive buffer.
pub const QUEUE_SIZE: usize = 64;

/// Byte offsets of the descriptor fields, as seen by a remote core.
pub const PEER_INDEX: u32 = offset_of!(QueueDescriptor, peer_index) as u32;
pub const WR_INDEX: u32 = offset_of!(QueueDescriptor, wr_index) as u32;
pub const RD_INDEX: u32 = offset_of!(QueueDescriptor, rd_index) as u32;
pub const BUFFER: u32 = offset_of!(QueueDescriptor, buffer) as u32;
pub const SIZE: u32 = offset_of!(QueueDescriptor, size) as u32;

/// One end of a queue.
///
/// `peer_index` holds the address of the index on the other side that must
/// track the index this side advances: the peer's `wr_index` for a send
/// mirror, the peer's `rd_index` for a receive descriptor. `buffer` holds
/// the buffer address in this core's view. A zero `size` marks a descriptor
/// that is not initialized.
#[repr(C)]
pub struct QueueDescriptor {
    pub(crate) peer_index: AtomicU32,
    pub(crate) wr_index: AtomicU32,
    pub(crate) rd_index: AtomicU32,
    pub(crate) buffer: AtomicU32,
    pub(crate) size: AtomicU32,
}

impl QueueDescriptor {
    pub const fn new() -> QueueDescriptor {
        QueueDescriptor {
            peer_index: AtomicU32::new(0),
            wr_index: AtomicU32::new(0),
            rd_index: AtomicU32::new(0),
            buffer: AtomicU32::new(0),
            size: AtomicU32::new(0),
        }
    }

    pub(crate) fn clear(&self) {
        self.peer_index.store(0, Ordering::Relaxed);
        self.wr_index.store(0, Ordering::Relaxed);
        self.rd_index.store(0, Ordering::Relaxed);
        self.buffer.store(0, Ordering::Relaxed);
        self.size.store(0, Ordering::Release);
    }

    pub fn size(&self) -> u32 {
        self.size.load(Ordering::Acquire)
    }

    pub fn is_initialized(&self) -> bool {
        self.size() != 0
    }
}

/// Capacity and occupancy of a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueState {
    /// Number of slots, including the one that is always kept free.
    pub max_size: u32,
    /// Number of words waiting to be received.
    pub num_entries: u32,
}

pub const fn is_empty(wr: u32, rd: u32) -> bool {
    wr == rd
}

pub const fn is_full(wr: u32, rd: u32, size: u32) -> bool {
    if wr.wrapping_add(1) == size {
        rd == 0
    } else {
        wr.wrapping_add(1) == rd
    }
}

/// Number of words between `rd` and `wr`.
pub const fn used(wr: u32, rd: u32, size: u32) -> u32 {
    if wr >= rd {
        wr - rd
    } else {
        size - rd + wr
    }
}

/// The index after `index`, wrapping at `size`.
pub const fn advance(index: u32, size: u32) -> u32 {
    if index + 1 >= size {
        0
    } else {
        index + 1
    }
}

/// Per-core IPC memory: one receive descriptor, one send mirror and one
/// receive buffer for each possible peer, itself included.
///
/// A core exposes this block at a fixed address of its local memory. The
/// other cores reach it through the addresses published in the shared link
/// table.
#[repr(C)]
pub struct IpcMemory {
    pub(crate) rx: [QueueDescriptor; NUM_CORES],
    pub(crate) tx: [QueueDescriptor; NUM_CORES],
    pub(crate) buffers: [[AtomicU32; QUEUE_SIZE]; NUM_CORES],
}

const DESCRIPTOR_BYTES: u32 = size_of::<QueueDescriptor>() as u32;
const BUFFER_BYTES: u32 = (QUEUE_SIZE * size_of::<AtomicU32>()) as u32;

// `as_words` relies on the block being a packed run of words.
const _: () = assert!(size_of::<IpcMemory>() % size_of::<AtomicU32>() == 0);

impl IpcMemory {
    pub const fn new() -> IpcMemory {
        IpcMemory {
            rx: [const { QueueDescriptor::new() }; NUM_CORES],
            tx: [const { QueueDescriptor::new() }; NUM_CORES],
            buffers: [const { [const { AtomicU32::new(0) }; QUEUE_SIZE] }; NUM_CORES],
        }
    }

    /// Byte offset of the receive descriptor for messages from `peer`.
    pub const fn rx_offset(peer: CoreId) -> u32 {
        offset_of!(IpcMemory, rx) as u32 + peer as u32 * DESCRIPTOR_BYTES
    }

    /// Byte offset of the send mirror for messages to `peer`.
    pub const fn tx_offset(peer: CoreId) -> u32 {
        offset_of!(IpcMemory, tx) as u32 + peer as u32 * DESCRIPTOR_BYTES
    }

    /// Byte offset of the receive buffer for messages from `peer`.
    pub const fn buffer_offset(peer: CoreId) -> u32 {
        offset_of!(IpcMemory, buffers) as u32 + peer as u32 * BUFFER_BYTES
    }

    pub fn rx(&self, peer: CoreId) -> &QueueDescriptor {
        &self.rx[peer.index()]
    }

    pub fn tx(&self, peer: CoreId) -> &QueueDescriptor {
        &self.tx[peer.index()]
    }

    /// The whole block as a slice of words, indexed by byte offset / 4.
    pub fn as_words(&self) -> &[AtomicU32] {
        // SAFETY: `IpcMemory` is `repr(C)` and built only from `AtomicU32`,
        // so it has no padding and is a valid `[AtomicU32]` of this length.
        unsafe {
            core::slice::from_raw_parts(
                (self as *const IpcMemory).cast::<AtomicU32>(),
                size_of::<IpcMemory>() / size_of::<AtomicU32>(),
            )
        }
    }

    /// Reset the queues with `peer` and make the local receive side ready.
    pub(crate) fn reset_queues(&self, peer: CoreId, buffer: u32) {
        self.rx[peer.index()].clear();
        self.tx[peer.index()].clear();
        for word in self.buffers[peer.index()].iter() {
            word.store(0, Ordering::Relaxed);
        }
        let rx = &self.rx[peer.index()];
        rx.buffer.store(buffer, Ordering::Relaxed);
        rx.size.store(QUEUE_SIZE as u32, Ordering::Release);
    }

    /// Drop whatever `peer` left in our receive queue, keeping the queue
    /// ready for its next init.
    pub(crate) fn rewind_rx(&self, peer: CoreId) {
        let rx = &self.rx[peer.index()];
        rx.peer_index.store(0, Ordering::Relaxed);
        rx.wr_index.store(0, Ordering::Relaxed);
        rx.rd_index.store(0, Ordering::Release);
    }

    /// Tear down the queues with `peer`.
    pub(crate) fn clear_queues(&self, peer: CoreId) {
        self.rx[peer.index()].clear();
        self.tx[peer.index()].clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn descriptor_layout() {
        assert_eq!(PEER_INDEX, 0);
        assert_eq!(WR_INDEX, 4);
        assert_eq!(RD_INDEX, 8);
        assert_eq!(BUFFER, 12);
        assert_eq!(SIZE, 16);
        assert_eq!(DESCRIPTOR_BYTES, 20);
    }

    #[test]
    fn memory_layout() {
        assert_eq!(IpcMemory::rx_offset(CoreId::Arm), 0);
        assert_eq!(IpcMemory::rx_offset(CoreId::Dsp2), 40);
        assert_eq!(IpcMemory::tx_offset(CoreId::Arm), 60);
        assert_eq!(IpcMemory::buffer_offset(CoreId::Arm), 120);
        assert_eq!(IpcMemory::buffer_offset(CoreId::Dsp1), 120 + 256);
        let mem = IpcMemory::new();
        assert_eq!(mem.as_words().len(), (120 + 3 * 256) / 4);
    }

    #[test]
    fn words_alias_fields() {
        let mem = IpcMemory::new();
        let words = mem.as_words();
        let offset = (IpcMemory::tx_offset(CoreId::Dsp1) + RD_INDEX) as usize / 4;
        words[offset].store(7, Ordering::Relaxed);
        assert_eq!(mem.tx(CoreId::Dsp1).rd_index.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn rewind_keeps_queue_ready() {
        let mem = IpcMemory::new();
        mem.reset_queues(CoreId::Dsp2, 0x40);
        let rx = mem.rx(CoreId::Dsp2);
        rx.peer_index.store(0x80, Ordering::Relaxed);
        rx.wr_index.store(5, Ordering::Relaxed);
        rx.rd_index.store(3, Ordering::Relaxed);

        mem.rewind_rx(CoreId::Dsp2);
        assert_eq!(rx.peer_index.load(Ordering::Relaxed), 0);
        assert_eq!(rx.wr_index.load(Ordering::Relaxed), 0);
        assert_eq!(rx.rd_index.load(Ordering::Relaxed), 0);
        assert_eq!(rx.buffer.load(Ordering::Relaxed), 0x40);
        assert_eq!(rx.size(), QUEUE_SIZE as u32);
    }

    #[test]
    fn empty_and_full() {
        let size = 4;
        assert!(is_empty(0, 0));
        assert!(!is_full(0, 0, size));
        assert!(is_full(3, 0, size));
        assert!(is_full(0, 1, size));
        assert!(is_full(1, 2, size));
        assert!(!is_full(2, 0, size));
    }

    #[test]
    fn never_full_and_empty() {
        for size in 2..8 {
            for wr in 0..size {
                for rd in 0..size {
                    assert!(!(is_full(wr, rd, size) && is_empty(wr, rd)));
                }
            }
        }
    }

    #[test]
    fn uninitialized_is_empty_not_full() {
        assert!(is_empty(0, 0));
        assert!(!is_full(0, 0, 0));
    }

    #[test]
    fn used_count() {
        let size = QUEUE_SIZE as u32;
        assert_eq!(used(0, 0, size), 0);
        assert_eq!(used(5, 2, size), 3);
        assert_eq!(used(1, 60, size), 5);
        assert_eq!(used(59, 60, size), size - 1);
    }

    // Walk the indices round the ring the way a sender and receiver would,
    // checking the predicates at every step.
    #[test]
    fn fill_and_drain_wraps() {
        let size = 8;
        let (mut wr, mut rd) = (5, 5);
        for i in 0..size - 1 {
            assert_eq!(used(wr, rd, size), i);
            assert!(!is_full(wr, rd, size));
            wr = advance(wr, size);
        }
        assert!(is_full(wr, rd, size));
        for i in 0..size - 1 {
            assert_eq!(used(wr, rd, size), size - 1 - i);
            assert!(!is_empty(wr, rd));
            rd = advance(rd, size);
        }
        assert!(is_empty(wr, rd));
    }

    #[test]
    fn reset_prepares_receive_side() {
        let mem = IpcMemory::new();
        mem.tx(CoreId::Arm).wr_index.store(3, Ordering::Relaxed);
        mem.reset_queues(CoreId::Arm, 0x1000);
        assert_eq!(mem.rx(CoreId::Arm).size(), QUEUE_SIZE as u32);
        assert_eq!(mem.rx(CoreId::Arm).buffer.load(Ordering::Relaxed), 0x1000);
        assert!(!mem.tx(CoreId::Arm).is_initialized());
        assert_eq!(mem.tx(CoreId::Arm).wr_index.load(Ordering::Relaxed), 0);
        mem.clear_queues(CoreId::Arm);
        assert!(!mem.rx(CoreId::Arm).is_initialized());
    }
}
