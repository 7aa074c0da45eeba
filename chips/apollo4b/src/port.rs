// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Interface between the IPC layer and the platform it runs on.
//!
//! The IPC layer only touches hardware through this trait: memory reached by
//! address, the mailbox registers and the mutex registers. The DSP register
//! block implements it on silicon (see `dsp`), and `sim` implements it in
//! memory so that several cores can be exercised from host tests.

use core::sync::atomic::AtomicU32;

use crate::core_id::CoreId;
use crate::mailbox::Bank;
use crate::mmap::Address;
use crate::queue::IpcMemory;
use crate::shmem::SharedMemory;

/// Request written to a mutex register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutexOp {
    /// Take the mutex if it is free.
    Set,
    /// Release the mutex if the writer owns it.
    Clear,
}

pub trait Port {
    /// The core this code is executing on.
    fn core_id(&self) -> CoreId;

    /// The region every core sees at the same address.
    fn shared(&self) -> &SharedMemory;

    /// This core's IPC memory.
    fn memory(&self) -> &IpcMemory;

    /// Address of `memory()` in this core's view.
    fn memory_base(&self) -> Address;

    /// The word at `addr`, as seen by this core, or `None` if the address
    /// is null, misaligned or does not belong to IPC memory.
    fn word(&self, addr: Address) -> Option<&AtomicU32>;

    /// Make every preceding store to memory visible to the other cores before
    /// any following store or mailbox write.
    fn fence(&self);

    /// Write `value` to mailbox bank `bank` of `core`.
    fn mailbox_write(&self, core: CoreId, bank: Bank, value: u32);

    /// Pending mailbox events of `core`.
    fn mailbox_status(&self, core: CoreId) -> u32;

    /// Write to mutex register `slot`.
    fn mutex_write(&self, slot: usize, op: MutexOp);

    /// Read mutex register `slot`: the one-hot bit of the owner, or `0`.
    fn mutex_read(&self, slot: usize) -> u32;
}
