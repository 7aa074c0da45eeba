// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Identities of the processors sharing the IPC fabric.

use crate::errorcode::ErrorCode;

/// Number of cores taking part in IPC.
pub const NUM_CORES: usize = 3;

/// One of the three processors.
///
/// The numeric value is the core's index in every per-core table and its
/// bit position in the mutex ownership register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum CoreId {
    Arm = 0,
    Dsp1 = 1,
    Dsp2 = 2,
}

impl CoreId {
    /// All cores, in index order.
    pub const ALL: [CoreId; NUM_CORES] = [CoreId::Arm, CoreId::Dsp1, CoreId::Dsp2];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// One-hot encoding, as read back from a mutex register.
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Every core other than `self`.
    pub fn others(self) -> impl Iterator<Item = CoreId> {
        CoreId::ALL.into_iter().filter(move |core| *core != self)
    }
}

impl TryFrom<u32> for CoreId {
    type Error = ErrorCode;

    fn try_from(id: u32) -> Result<CoreId, ErrorCode> {
        match id {
            0 => Ok(CoreId::Arm),
            1 => Ok(CoreId::Dsp1),
            2 => Ok(CoreId::Dsp2),
            _ => Err(ErrorCode::OUTOFRANGE),
        }
    }
}
