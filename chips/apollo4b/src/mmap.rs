// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Translation of addresses between core views.
//!
//! The same physical memory can appear at different addresses depending on
//! which core looks at it. A pointer written into shared memory by one core
//! must be translated before another core dereferences it. The translation
//! only depends on the owner of the memory and the core that is looking, so
//! it is expressed as a pure function over the ordered core pair.
//!
//! Addresses are plain 32-bit values, matching the pointer width of all three
//! cores. Address `0` is the null address and is never translated.

use crate::core_id::CoreId;

/// Distance between a TCM region's primary address and its secondary alias.
///
/// This is a placeholder until the final memory map of the DSP TCM aliases is
/// confirmed; the simulation port uses the same value so the translation is
/// always exercised.
pub const SECONDARY_ALIAS_OFFSET: u32 = 0x0080_0000;

/// Ordered `(owner, viewer)` pairs for which the viewer sees the owner's
/// memory through the secondary alias.
const ALIASED_VIEWS: [(CoreId, CoreId); 3] = [
    (CoreId::Dsp2, CoreId::Dsp1),
    (CoreId::Dsp1, CoreId::Dsp2),
    (CoreId::Arm, CoreId::Dsp2),
];

/// A 32-bit address in some core's view of memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address(pub u32);

impl Address {
    pub const NULL: Address = Address(0);

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The address `bytes` further on, in the same view.
    pub const fn offset(self, bytes: u32) -> Address {
        Address(self.0.wrapping_add(bytes))
    }
}

/// Distance subtracted from an address owned by `owner` when `viewer`
/// dereferences it.
pub fn alias_offset(owner: CoreId, viewer: CoreId) -> u32 {
    if ALIASED_VIEWS.contains(&(owner, viewer)) {
        SECONDARY_ALIAS_OFFSET
    } else {
        0
    }
}

/// Translate `addr`, valid in the view of `owner`, into the view of `viewer`.
pub fn mmap(addr: Address, owner: CoreId, viewer: CoreId) -> Address {
    if addr.is_null() {
        return addr;
    }
    Address(addr.0.wrapping_sub(alias_offset(owner, viewer)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn self_view_is_identity() {
        for core in CoreId::ALL {
            assert_eq!(mmap(Address(0x1000_0040), core, core), Address(0x1000_0040));
        }
    }

    #[test]
    fn aliased_pairs() {
        let addr = Address(0x3000_0100);
        let shifted = Address(0x3000_0100 - SECONDARY_ALIAS_OFFSET);
        assert_eq!(mmap(addr, CoreId::Dsp2, CoreId::Dsp1), shifted);
        assert_eq!(mmap(addr, CoreId::Dsp1, CoreId::Dsp2), shifted);
        assert_eq!(mmap(addr, CoreId::Arm, CoreId::Dsp2), shifted);
    }

    #[test]
    fn direct_pairs() {
        let addr = Address(0x2000_0100);
        assert_eq!(mmap(addr, CoreId::Arm, CoreId::Dsp1), addr);
        assert_eq!(mmap(addr, CoreId::Dsp1, CoreId::Arm), addr);
        assert_eq!(mmap(addr, CoreId::Dsp2, CoreId::Arm), addr);
    }

    #[test]
    fn null_is_preserved() {
        for owner in CoreId::ALL {
            for viewer in CoreId::ALL {
                assert!(mmap(Address::NULL, owner, viewer).is_null());
            }
        }
    }
}
