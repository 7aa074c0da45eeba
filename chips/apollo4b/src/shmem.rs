// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Memory region visible at the same address from every core.
//!
//! The region holds the interrupt routing table and the IPC link table. The
//! link table has one row per core. A row holds, for each peer, the
//! addresses of the two descriptors the owner set aside for that peer,
//! along with the owner's event mask, its init generation and the generation
//! of each peer it last linked with. A row is only ever written by its
//! owner, which keeps every field single-writer.
//!
//! An all-zero region is a valid initial state: every route is unset, every
//! descriptor address is null and every mask is empty.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config;
use crate::core_id::{CoreId, NUM_CORES};
use crate::mmap::Address;

/// Number of peripheral interrupt lines that can be routed to a DSP.
pub const IRQ_LINES: usize = 32;

/// Fixed address of the shared region on hardware.
///
/// Placeholder until the shared SRAM section is assigned in the linker
/// script.
pub const SHARED_BASE: usize = 0x1234_5678;

/// Interrupt input pin of a DSP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DspPin(pub u8);

/// Descriptor addresses one core publishes for one peer, in the publisher's
/// view.
#[repr(C)]
pub struct LinkInfo {
    write_descr: AtomicU32,
    read_descr: AtomicU32,
}

impl LinkInfo {
    const fn new() -> LinkInfo {
        LinkInfo {
            write_descr: AtomicU32::new(0),
            read_descr: AtomicU32::new(0),
        }
    }

    /// The publisher's send mirror towards the peer.
    pub fn write_descr(&self) -> Address {
        Address(self.write_descr.load(Ordering::Acquire))
    }

    /// The publisher's receive descriptor for the peer.
    pub fn read_descr(&self) -> Address {
        Address(self.read_descr.load(Ordering::Acquire))
    }
}

#[repr(C)]
pub struct SharedRow {
    links: [LinkInfo; NUM_CORES],
    event_mask: AtomicU32,
    generation: AtomicU32,
    /// Generation of each peer the owner last linked with, `0` for none.
    linked: [AtomicU32; NUM_CORES],
}

impl SharedRow {
    const fn new() -> SharedRow {
        SharedRow {
            links: [const { LinkInfo::new() }; NUM_CORES],
            event_mask: AtomicU32::new(0),
            generation: AtomicU32::new(0),
            linked: [const { AtomicU32::new(0) }; NUM_CORES],
        }
    }
}

/// A row of the link table together with the core that owns it.
#[derive(Clone, Copy)]
pub struct RowHandle<'a> {
    owner: CoreId,
    row: &'a SharedRow,
}

impl<'a> RowHandle<'a> {
    pub fn owner(&self) -> CoreId {
        self.owner
    }

    /// What the owner published for `peer`.
    pub fn link(&self, peer: CoreId) -> &'a LinkInfo {
        &self.row.links[peer.index()]
    }

    /// Events the owner has a handler for.
    pub fn event_mask(&self) -> u32 {
        self.row.event_mask.load(Ordering::Acquire)
    }

    /// Number of times the owner has initialized IPC.
    pub fn generation(&self) -> u32 {
        self.row.generation.load(Ordering::Acquire)
    }

    /// Generation of `peer` the owner last linked with, `0` if it has not
    /// linked with `peer` since its own init.
    pub fn linked_generation(&self, peer: CoreId) -> u32 {
        self.row.linked[peer.index()].load(Ordering::Acquire)
    }

    fn check_writer(&self, writer: CoreId) {
        if config::CONFIG.check_row_ownership {
            assert_eq!(
                writer, self.owner,
                "{:?} wrote the link table row of {:?}",
                writer, self.owner
            );
        }
    }

    /// Publish the descriptor addresses set aside for `peer`. Null addresses
    /// withdraw them.
    pub(crate) fn publish(&self, writer: CoreId, peer: CoreId, write: Address, read: Address) {
        self.check_writer(writer);
        let link = &self.row.links[peer.index()];
        link.write_descr.store(write.0, Ordering::Release);
        link.read_descr.store(read.0, Ordering::Release);
    }

    pub(crate) fn set_event_mask(&self, writer: CoreId, mask: u32) {
        self.check_writer(writer);
        self.row.event_mask.store(mask, Ordering::Release);
    }

    pub(crate) fn set_linked_generation(&self, writer: CoreId, peer: CoreId, generation: u32) {
        self.check_writer(writer);
        self.row.linked[peer.index()].store(generation, Ordering::Release);
    }

    /// Start a new init generation and return it.
    pub(crate) fn next_generation(&self, writer: CoreId) -> u32 {
        self.check_writer(writer);
        self.row.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }
}

#[repr(C)]
pub struct SharedMemory {
    /// Routing of peripheral interrupts to DSP pins. `0` leaves the line
    /// unrouted, otherwise the value is the pin number plus one.
    irq_routes: [u8; IRQ_LINES],
    rows: [SharedRow; NUM_CORES],
}

impl SharedMemory {
    /// A shared region with the given interrupt routes and an empty link
    /// table.
    pub const fn new(irq_routes: [u8; IRQ_LINES]) -> SharedMemory {
        SharedMemory {
            irq_routes,
            rows: [const { SharedRow::new() }; NUM_CORES],
        }
    }

    /// The DSP pin that interrupt line `irq` is routed to, if any.
    pub fn route(&self, irq: u32) -> Option<DspPin> {
        match self.irq_routes.get(irq as usize) {
            Some(0) | None => None,
            Some(&pin) => Some(DspPin(pin - 1)),
        }
    }

    pub fn row(&self, owner: CoreId) -> RowHandle<'_> {
        RowHandle {
            owner,
            row: &self.rows[owner.index()],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn routing() {
        let mut routes = [0; IRQ_LINES];
        routes[3] = 1;
        routes[31] = 8;
        let shared = SharedMemory::new(routes);
        assert_eq!(shared.route(3), Some(DspPin(0)));
        assert_eq!(shared.route(31), Some(DspPin(7)));
        assert_eq!(shared.route(4), None);
        assert_eq!(shared.route(32), None);
    }

    #[test]
    fn owner_writes_own_row() {
        let shared = SharedMemory::new([0; IRQ_LINES]);
        let row = shared.row(CoreId::Dsp1);
        row.publish(CoreId::Dsp1, CoreId::Arm, Address(0x10), Address(0x20));
        row.set_event_mask(CoreId::Dsp1, 0xA);
        assert_eq!(row.next_generation(CoreId::Dsp1), 1);
        row.set_linked_generation(CoreId::Dsp1, CoreId::Arm, 4);

        let row = shared.row(CoreId::Dsp1);
        assert_eq!(row.link(CoreId::Arm).write_descr(), Address(0x10));
        assert_eq!(row.link(CoreId::Arm).read_descr(), Address(0x20));
        assert!(row.link(CoreId::Dsp2).read_descr().is_null());
        assert_eq!(row.event_mask(), 0xA);
        assert_eq!(row.generation(), 1);
        assert_eq!(row.linked_generation(CoreId::Arm), 4);
        assert_eq!(row.linked_generation(CoreId::Dsp2), 0);
        assert_eq!(shared.row(CoreId::Arm).event_mask(), 0);
    }

    #[test]
    #[should_panic]
    fn foreign_row_write_panics() {
        let shared = SharedMemory::new([0; IRQ_LINES]);
        shared
            .row(CoreId::Arm)
            .publish(CoreId::Dsp2, CoreId::Dsp2, Address(0x10), Address(0x20));
    }
}
