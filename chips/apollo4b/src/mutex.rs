// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Hardware mutexes shared by the three cores.
//!
//! Each mutex is a register that reads back the one-hot bit of its owner.
//! A core requests a mutex by writing `SET` and then reads the register to
//! learn whether it won. Only the owner's `CLR` write releases it.

use crate::config;
use crate::core_id::CoreId;
use crate::errorcode::ErrorCode;
use crate::port::{MutexOp, Port};

/// Number of hardware mutexes.
pub const MUTEX_NUM: usize = 4;

/// Retry budget that never expires.
pub const MUTEX_WAIT_FOREVER: u32 = u32::MAX;
/// Retry budget of a single attempt.
pub const MUTEX_WAIT_NONE: u32 = 0;

/// Owner of a mutex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutexState {
    Free,
    Owned(CoreId),
}

impl TryFrom<u32> for MutexState {
    type Error = ErrorCode;

    fn try_from(raw: u32) -> Result<MutexState, ErrorCode> {
        match raw {
            0 => Ok(MutexState::Free),
            _ => CoreId::ALL
                .into_iter()
                .find(|core| core.bit() == raw)
                .map(MutexState::Owned)
                .ok_or(ErrorCode::FAIL),
        }
    }
}

pub struct MutexArbiter<'a, P: Port> {
    port: &'a P,
}

impl<'a, P: Port> MutexArbiter<'a, P> {
    pub fn new(port: &'a P) -> MutexArbiter<'a, P> {
        MutexArbiter { port }
    }

    fn check_slot(slot: usize) -> Result<(), ErrorCode> {
        if slot >= MUTEX_NUM {
            Err(ErrorCode::OUTOFRANGE)
        } else {
            Ok(())
        }
    }

    fn attempt(&self, slot: usize) -> bool {
        self.port.mutex_write(slot, MutexOp::Set);
        self.port.mutex_read(slot) == self.port.core_id().bit()
    }

    /// Take mutex `slot` if it is free, in a single attempt.
    pub fn try_lock(&self, slot: usize) -> Result<(), ErrorCode> {
        Self::check_slot(slot)?;
        if self.attempt(slot) {
            if config::CONFIG.trace_ipc {
                log::trace!("[{:?}] mutex {} locked", self.port.core_id(), slot);
            }
            Ok(())
        } else {
            Err(ErrorCode::FAIL)
        }
    }

    /// Take mutex `slot`, attempting once and then retrying up to `retries`
    /// more times. `MUTEX_WAIT_FOREVER` retries without bound.
    pub fn lock(&self, slot: usize, retries: u32) -> Result<(), ErrorCode> {
        Self::check_slot(slot)?;
        let mut remaining = retries;
        loop {
            if self.attempt(slot) {
                if config::CONFIG.trace_ipc {
                    log::trace!("[{:?}] mutex {} locked", self.port.core_id(), slot);
                }
                return Ok(());
            }
            if retries != MUTEX_WAIT_FOREVER {
                if remaining == 0 {
                    return Err(ErrorCode::TIMEOUT);
                }
                remaining -= 1;
            }
            core::hint::spin_loop();
        }
    }

    /// Release mutex `slot`. Fails unless the calling core owns it.
    pub fn unlock(&self, slot: usize) -> Result<(), ErrorCode> {
        Self::check_slot(slot)?;
        if self.port.mutex_read(slot) != self.port.core_id().bit() {
            return Err(ErrorCode::INVAL);
        }
        self.port.mutex_write(slot, MutexOp::Clear);
        if config::CONFIG.trace_ipc {
            log::trace!("[{:?}] mutex {} unlocked", self.port.core_id(), slot);
        }
        Ok(())
    }

    pub fn state(&self, slot: usize) -> Result<MutexState, ErrorCode> {
        Self::check_slot(slot)?;
        MutexState::try_from(self.port.mutex_read(slot))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimSystem;

    #[test]
    fn lock_and_unlock() {
        let system = SimSystem::new();
        let arm = system.port(CoreId::Arm);
        let dsp1 = system.port(CoreId::Dsp1);
        let arm = MutexArbiter::new(&arm);
        let dsp1 = MutexArbiter::new(&dsp1);

        assert_eq!(arm.state(0), Ok(MutexState::Free));
        assert_eq!(arm.try_lock(0), Ok(()));
        assert_eq!(dsp1.state(0), Ok(MutexState::Owned(CoreId::Arm)));
        assert_eq!(dsp1.try_lock(0), Err(ErrorCode::FAIL));
        assert_eq!(dsp1.unlock(0), Err(ErrorCode::INVAL));
        assert_eq!(dsp1.state(0), Ok(MutexState::Owned(CoreId::Arm)));

        assert_eq!(arm.unlock(0), Ok(()));
        assert_eq!(arm.state(0), Ok(MutexState::Free));
        assert_eq!(dsp1.try_lock(0), Ok(()));
        assert_eq!(arm.state(0), Ok(MutexState::Owned(CoreId::Dsp1)));
    }

    #[test]
    fn slots_are_independent() {
        let system = SimSystem::new();
        let arm = system.port(CoreId::Arm);
        let dsp2 = system.port(CoreId::Dsp2);
        let arm = MutexArbiter::new(&arm);
        let dsp2 = MutexArbiter::new(&dsp2);

        assert_eq!(arm.try_lock(1), Ok(()));
        assert_eq!(dsp2.try_lock(2), Ok(()));
        assert_eq!(arm.state(1), Ok(MutexState::Owned(CoreId::Arm)));
        assert_eq!(arm.state(2), Ok(MutexState::Owned(CoreId::Dsp2)));
        assert_eq!(arm.state(3), Ok(MutexState::Free));
    }

    #[test]
    fn lock_times_out() {
        let system = SimSystem::new();
        let arm = system.port(CoreId::Arm);
        let dsp1 = system.port(CoreId::Dsp1);
        let arm = MutexArbiter::new(&arm);
        let dsp1 = MutexArbiter::new(&dsp1);

        assert_eq!(arm.lock(3, MUTEX_WAIT_FOREVER), Ok(()));
        assert_eq!(dsp1.lock(3, MUTEX_WAIT_NONE), Err(ErrorCode::TIMEOUT));
        assert_eq!(dsp1.lock(3, 100), Err(ErrorCode::TIMEOUT));
        assert_eq!(system.mutex_writes(3), 1 + 1 + 101);
        assert_eq!(arm.unlock(3), Ok(()));
        assert_eq!(dsp1.lock(3, MUTEX_WAIT_NONE), Ok(()));
    }

    #[test]
    fn slot_out_of_range() {
        let system = SimSystem::new();
        let arm = system.port(CoreId::Arm);
        let arm = MutexArbiter::new(&arm);
        assert_eq!(arm.try_lock(MUTEX_NUM), Err(ErrorCode::OUTOFRANGE));
        assert_eq!(arm.lock(MUTEX_NUM, 1), Err(ErrorCode::OUTOFRANGE));
        assert_eq!(arm.unlock(MUTEX_NUM), Err(ErrorCode::OUTOFRANGE));
        assert_eq!(arm.state(MUTEX_NUM), Err(ErrorCode::OUTOFRANGE));
    }

    #[test]
    fn raw_states() {
        assert_eq!(MutexState::try_from(0), Ok(MutexState::Free));
        assert_eq!(MutexState::try_from(4), Ok(MutexState::Owned(CoreId::Dsp2)));
        assert_eq!(MutexState::try_from(3), Err(ErrorCode::FAIL));
    }

    #[test]
    fn contended_lock_is_exclusive() {
        use core::sync::atomic::{AtomicU32, Ordering};

        const ROUNDS: u32 = 2000;
        let system = SimSystem::new();
        let counter = AtomicU32::new(0);

        std::thread::scope(|s| {
            for core in CoreId::ALL {
                let system = &system;
                let counter = &counter;
                s.spawn(move || {
                    let port = system.port(core);
                    let mutex = MutexArbiter::new(&port);
                    for _ in 0..ROUNDS {
                        mutex.lock(0, MUTEX_WAIT_FOREVER).unwrap();
                        // Non-atomic read-modify-write, protected by the mutex.
                        let value = counter.load(Ordering::Relaxed);
                        std::thread::yield_now();
                        counter.store(value + 1, Ordering::Relaxed);
                        mutex.unlock(0).unwrap();
                    }
                });
            }
        });

        assert_eq!(counter.load(Ordering::Relaxed), 3 * ROUNDS);
    }
}
