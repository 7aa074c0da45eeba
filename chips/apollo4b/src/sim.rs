// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! In-memory model of the three-core IPC fabric.
//!
//! `SimSystem` owns everything the cores share: the shared region, each
//! core's IPC memory, the per-core mailboxes and the mutex registers.
//! `SimPort` is one core's view of it. Each core's IPC memory sits at its own
//! base address, and a core sees another core's memory shifted by the same
//! alias offset that `mmap` undoes, so pointer translation bugs show up as
//! unresolvable addresses or corrupted queues.
//!
//! The model is built only from atomics and may be shared between host
//! threads, one per simulated core.

use core::mem::size_of;
use core::sync::atomic::{fence, AtomicU32, AtomicUsize, Ordering};

use crate::config;
use crate::core_id::{CoreId, NUM_CORES};
use crate::mailbox::{self, Bank};
use crate::mmap::{alias_offset, Address};
use crate::mutex::MUTEX_NUM;
use crate::port::{MutexOp, Port};
use crate::queue::IpcMemory;
use crate::shmem::{SharedMemory, IRQ_LINES};

/// Base address of each core's IPC memory in its own view.
const MEMORY_BASES: [u32; NUM_CORES] = [0x1000_0000, 0x2000_0000, 0x3000_0000];

pub struct SimSystem {
    shared: SharedMemory,
    memory: [IpcMemory; NUM_CORES],
    mailbox: [AtomicU32; NUM_CORES],
    mutex: [AtomicU32; MUTEX_NUM],
    mutex_writes: [AtomicUsize; MUTEX_NUM],
    fences: AtomicUsize,
}

impl SimSystem {
    pub const fn new() -> SimSystem {
        SimSystem::with_routes([0; IRQ_LINES])
    }

    pub const fn with_routes(irq_routes: [u8; IRQ_LINES]) -> SimSystem {
        SimSystem {
            shared: SharedMemory::new(irq_routes),
            memory: [const { IpcMemory::new() }; NUM_CORES],
            mailbox: [const { AtomicU32::new(0) }; NUM_CORES],
            mutex: [const { AtomicU32::new(0) }; MUTEX_NUM],
            mutex_writes: [const { AtomicUsize::new(0) }; MUTEX_NUM],
            fences: AtomicUsize::new(0),
        }
    }

    /// The view of `core`.
    pub fn port(&self, core: CoreId) -> SimPort<'_> {
        SimPort { system: self, core }
    }

    /// Where `viewer` sees the IPC memory of `owner`.
    pub fn memory_base(owner: CoreId, viewer: CoreId) -> Address {
        Address(MEMORY_BASES[owner.index()].wrapping_sub(alias_offset(owner, viewer)))
    }

    pub fn memory(&self, core: CoreId) -> &IpcMemory {
        &self.memory[core.index()]
    }

    pub fn shared(&self) -> &SharedMemory {
        &self.shared
    }

    /// Pending mailbox events of `core`.
    pub fn pending(&self, core: CoreId) -> u32 {
        self.mailbox[core.index()].load(Ordering::Acquire)
    }

    /// Number of `SET` or `CLR` writes made to mutex `slot`.
    pub fn mutex_writes(&self, slot: usize) -> usize {
        self.mutex_writes[slot].load(Ordering::Relaxed)
    }

    /// Number of fences issued by all cores.
    pub fn fences(&self) -> usize {
        self.fences.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy)]
pub struct SimPort<'a> {
    system: &'a SimSystem,
    core: CoreId,
}

impl Port for SimPort<'_> {
    fn core_id(&self) -> CoreId {
        self.core
    }

    fn shared(&self) -> &SharedMemory {
        &self.system.shared
    }

    fn memory(&self) -> &IpcMemory {
        &self.system.memory[self.core.index()]
    }

    fn memory_base(&self) -> Address {
        SimSystem::memory_base(self.core, self.core)
    }

    fn word(&self, addr: Address) -> Option<&AtomicU32> {
        if addr.is_null() || addr.0 % 4 != 0 {
            return None;
        }
        CoreId::ALL.into_iter().find_map(|owner| {
            let base = SimSystem::memory_base(owner, self.core);
            let offset = addr.0.checked_sub(base.0)? as usize;
            if offset < size_of::<IpcMemory>() {
                self.system.memory[owner.index()]
                    .as_words()
                    .get(offset / 4)
            } else {
                None
            }
        })
    }

    fn fence(&self) {
        self.system.fences.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::SeqCst);
    }

    fn mailbox_write(&self, core: CoreId, bank: Bank, value: u32) {
        let status = &self.system.mailbox[core.index()];
        let mut current = status.load(Ordering::Relaxed);
        loop {
            let next = mailbox::apply(current, bank, value);
            match status.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn mailbox_status(&self, core: CoreId) -> u32 {
        self.system.mailbox[core.index()].load(Ordering::Acquire)
    }

    fn mutex_write(&self, slot: usize, op: MutexOp) {
        self.system.mutex_writes[slot].fetch_add(1, Ordering::Relaxed);
        let owner = &self.system.mutex[slot];
        let bit = self.core.bit();
        let (from, to, success) = match op {
            MutexOp::Set => (0, bit, Ordering::AcqRel),
            MutexOp::Clear => (bit, 0, Ordering::Release),
        };
        // A failed exchange leaves the register as it is, like the hardware
        // ignoring a request for a taken mutex or a release by a non-owner.
        let ignored = owner
            .compare_exchange(from, to, success, Ordering::Relaxed)
            .is_err();
        if ignored && config::CONFIG.trace_ipc {
            log::trace!("[{:?}] mutex {} {:?} ignored", self.core, slot, op);
        }
    }

    fn mutex_read(&self, slot: usize) -> u32 {
        self.system.mutex[slot].load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mmap::mmap;
    use crate::queue::WR_INDEX;

    #[test]
    fn views_agree_with_mmap() {
        let system = SimSystem::new();
        for owner in CoreId::ALL {
            let own = SimSystem::memory_base(owner, owner);
            let field = own.offset(IpcMemory::rx_offset(CoreId::Dsp1) + WR_INDEX);
            system.memory(owner).rx(CoreId::Dsp1).wr_index.store(9, Ordering::Relaxed);
            for viewer in CoreId::ALL {
                let port = system.port(viewer);
                let word = port.word(mmap(field, owner, viewer)).unwrap();
                assert_eq!(word.load(Ordering::Relaxed), 9);
            }
        }
    }

    #[test]
    fn mutex_ignores_requests_it_cannot_grant() {
        let system = SimSystem::new();
        let (arm, dsp1) = (system.port(CoreId::Arm), system.port(CoreId::Dsp1));
        arm.mutex_write(2, MutexOp::Set);
        assert_eq!(arm.mutex_read(2), CoreId::Arm.bit());
        dsp1.mutex_write(2, MutexOp::Set);
        dsp1.mutex_write(2, MutexOp::Clear);
        assert_eq!(dsp1.mutex_read(2), CoreId::Arm.bit());
        arm.mutex_write(2, MutexOp::Clear);
        assert_eq!(arm.mutex_read(2), 0);
        assert_eq!(system.mutex_writes(2), 4);
    }

    #[test]
    fn untranslated_alias_misses() {
        let system = SimSystem::new();
        // Dsp2 sees Arm memory through the alias, so Arm's own address is
        // not IPC memory from Dsp2's side.
        let arm_base = SimSystem::memory_base(CoreId::Arm, CoreId::Arm);
        assert!(system.port(CoreId::Dsp2).word(arm_base).is_none());
        assert!(system.port(CoreId::Dsp1).word(arm_base).is_some());
    }

    #[test]
    fn invalid_addresses() {
        let system = SimSystem::new();
        let port = system.port(CoreId::Arm);
        let base = port.memory_base();
        assert!(port.word(Address::NULL).is_none());
        assert!(port.word(base.offset(2)).is_none());
        assert!(port.word(base.offset(size_of::<IpcMemory>() as u32)).is_none());
        assert!(port.word(Address(0x0000_1000)).is_none());
    }

    #[test]
    fn mailbox_model() {
        let system = SimSystem::new();
        let arm = system.port(CoreId::Arm);
        arm.mailbox_write(CoreId::Dsp1, Bank::B, mailbox::MBINT_SET << 20);
        assert_eq!(system.pending(CoreId::Dsp1), 1 << 26);
        assert_eq!(system.pending(CoreId::Arm), 0);
        arm.mailbox_write(CoreId::Dsp1, Bank::B, mailbox::MBINT_CLR << 20);
        assert_eq!(system.pending(CoreId::Dsp1), 0);
    }
}
