// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Inter-processor communication for the Apollo4b ARM core and its two DSPs.
//!
//! The three cores share a small memory region and a set of DSP subsystem
//! registers. On top of them this crate provides:
//!
//!  * Four hardware mutexes (`mutex`).
//!  * A word queue for every ordered pair of cores, set up and torn down by
//!    a lifecycle protocol between the cores (`ipc`).
//!  * Mailbox events with a per-core handler table (`ipc`, `mailbox`).
//!
//! Everything that touches hardware goes through the `Port` trait. `DspPort`
//! drives the real registers; `SimSystem` models the fabric in memory so the
//! protocol can be run across host threads.

#![no_std]

mod config;

pub mod core_id;
pub mod dsp;
pub mod errorcode;
pub mod ipc;
pub mod mailbox;
pub mod mmap;
pub mod mutex;
pub mod port;
pub mod queue;
pub mod shmem;
pub mod sim;

pub use crate::core_id::CoreId;
pub use crate::errorcode::ErrorCode;
pub use crate::ipc::Ipc;
pub use crate::port::Port;

// This is used to run the tests on a host
#[cfg(test)]
#[macro_use]
extern crate std;
