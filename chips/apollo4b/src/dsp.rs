// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! DSP subsystem registers: inter-core mailboxes and hardware mutexes.
//!
//! Every core has a mailbox group. Writing bank A or bank B of a group
//! raises or clears events on the owning core; its status register lists the
//! pending events. The four mutex registers read back the one-hot bit of
//! their owner.
//!
//! `DspPort` drives these registers and reaches IPC memory by plain
//! pointers, which is what the IPC layer runs on when built for the chip.

use core::sync::atomic::{fence, AtomicU32, Ordering};

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

use crate::core_id::CoreId;
use crate::mailbox::Bank;
use crate::mmap::Address;
use crate::port::{MutexOp, Port};
use crate::queue::IpcMemory;
use crate::shmem::{SharedMemory, SHARED_BASE};

/// Base of the DSP subsystem register block.
///
/// Placeholder until the register block is added to the chip memory map.
const DSP_BASE: usize = 0x4010_0000;

register_structs! {
    pub MailboxRegisters {
        (0x00 => mbinta: WriteOnly<u32>),
        (0x04 => mbintb: WriteOnly<u32>),
        (0x08 => mbintstat: ReadOnly<u32>),
        (0x0C => _reserved0),
        (0x10 => @END),
    },
    pub DspRegisters {
        (0x000 => mailbox: [MailboxRegisters; 3]),
        (0x030 => _reserved0),
        (0x100 => mutex: [ReadWrite<u32, MUTEX::Register>; 4]),
        (0x110 => @END),
    }
}

// Write `Set` to request a mutex and `Clear` to release it. Reads return the
// one-hot bit of the owner.
register_bitfields![u32,
    MUTEX [
        REQ OFFSET(0) NUMBITS(3) [
            Set = 1,
            Clear = 2
        ]
    ]
];

/// Port for code running on one of the cores of the chip.
pub struct DspPort {
    registers: &'static DspRegisters,
    shared: &'static SharedMemory,
    memory: &'static IpcMemory,
    core: CoreId,
}

impl DspPort {
    /// # Safety
    ///
    /// `DSP_BASE` and `SHARED_BASE` must be the addresses of the DSP register
    /// block and of the shared region, and the shared region must be zeroed
    /// before any core initializes IPC. `memory` must be placed in memory
    /// that the other cores can reach, and only one `DspPort` may exist per
    /// core.
    pub unsafe fn new(core: CoreId, memory: &'static IpcMemory) -> DspPort {
        DspPort {
            registers: &*(DSP_BASE as *const DspRegisters),
            shared: &*(SHARED_BASE as *const SharedMemory),
            memory,
            core,
        }
    }
}

impl Port for DspPort {
    fn core_id(&self) -> CoreId {
        self.core
    }

    fn shared(&self) -> &SharedMemory {
        self.shared
    }

    fn memory(&self) -> &IpcMemory {
        self.memory
    }

    fn memory_base(&self) -> Address {
        Address(self.memory as *const IpcMemory as usize as u32)
    }

    fn word(&self, addr: Address) -> Option<&AtomicU32> {
        if addr.is_null() || addr.0 % 4 != 0 {
            return None;
        }
        // SAFETY: descriptor and buffer addresses come from the link table,
        // which only holds addresses of other cores' `IpcMemory`, translated
        // into this core's view.
        Some(unsafe { &*(addr.0 as usize as *const AtomicU32) })
    }

    fn fence(&self) {
        fence(Ordering::SeqCst);
    }

    fn mailbox_write(&self, core: CoreId, bank: Bank, value: u32) {
        let group = &self.registers.mailbox[core.index()];
        match bank {
            Bank::A => group.mbinta.set(value),
            Bank::B => group.mbintb.set(value),
        }
    }

    fn mailbox_status(&self, core: CoreId) -> u32 {
        self.registers.mailbox[core.index()].mbintstat.get()
    }

    fn mutex_write(&self, slot: usize, op: MutexOp) {
        let mutex = &self.registers.mutex[slot];
        match op {
            MutexOp::Set => mutex.write(MUTEX::REQ::Set),
            MutexOp::Clear => mutex.write(MUTEX::REQ::Clear),
        }
    }

    fn mutex_read(&self, slot: usize) -> u32 {
        self.registers.mutex[slot].get()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::mem::size_of;

    #[test]
    fn register_layout() {
        assert_eq!(size_of::<MailboxRegisters>(), 0x10);
        assert_eq!(size_of::<DspRegisters>(), 0x110);
        assert_eq!(MUTEX::REQ::Set.value, 1);
        assert_eq!(MUTEX::REQ::Clear.value, 2);
    }
}
