// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Encoding of mailbox interrupt requests.
//!
//! Each core has 32 mailbox events. Events are raised and cleared through
//! two write-only banks: bank A covers events 0 to 15 and bank B covers
//! events 16 to 31. Every event owns a two-bit field in its bank, so a
//! single write can set or clear any set of events without disturbing the
//! others. A status register reports the pending events as a plain bitmask.

use crate::core_id::CoreId;

/// Number of mailbox events per core.
pub const MAX_EVENTS: u32 = 32;

const EVENTS_PER_BANK: u32 = 16;

/// Field value raising an event.
pub const MBINT_SET: u32 = 0b01;
/// Field value clearing an event.
pub const MBINT_CLR: u32 = 0b10;

/// First lifecycle management event. Event `MANAGE_BASE + n` is sent by core
/// `n` when it initializes, terminates or changes its event mask.
pub const MANAGE_BASE: u32 = 26;
/// First data event. Event `DATA_BASE + n` is sent by core `n` after it
/// enqueues a message.
pub const DATA_BASE: u32 = 29;

/// Events reserved by the IPC layer itself.
pub const RESERVED_EVENTS: u32 = 0x3F << MANAGE_BASE;

pub const fn manage_event(sender: CoreId) -> u32 {
    MANAGE_BASE + sender as u32
}

pub const fn data_event(sender: CoreId) -> u32 {
    DATA_BASE + sender as u32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bank {
    /// Events 0 to 15.
    A,
    /// Events 16 to 31.
    B,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailboxOp {
    Set,
    Clear,
}

impl MailboxOp {
    const fn field(self) -> u32 {
        match self {
            MailboxOp::Set => MBINT_SET,
            MailboxOp::Clear => MBINT_CLR,
        }
    }
}

/// Bank and register value applying `op` to a single event.
pub fn encode(event: u32, op: MailboxOp) -> Option<(Bank, u32)> {
    if event >= MAX_EVENTS {
        return None;
    }
    let bank = if event < EVENTS_PER_BANK { Bank::A } else { Bank::B };
    Some((bank, op.field() << ((event % EVENTS_PER_BANK) * 2)))
}

/// Register values for banks A and B applying `op` to every event in `mask`.
pub fn encode_mask(mask: u32, op: MailboxOp) -> [u32; 2] {
    let mut banks = [0; 2];
    for event in 0..MAX_EVENTS {
        if mask & (1 << event) != 0 {
            let field = op.field() << ((event % EVENTS_PER_BANK) * 2);
            banks[(event / EVENTS_PER_BANK) as usize] |= field;
        }
    }
    banks
}

/// Status after the hardware applies a bank write to `status`.
///
/// Fields holding neither `MBINT_SET` nor `MBINT_CLR` leave their event
/// untouched.
pub fn apply(status: u32, bank: Bank, value: u32) -> u32 {
    let first = match bank {
        Bank::A => 0,
        Bank::B => EVENTS_PER_BANK,
    };
    let mut status = status;
    for field in 0..EVENTS_PER_BANK {
        let bit = 1 << (first + field);
        match (value >> (field * 2)) & 0b11 {
            MBINT_SET => status |= bit,
            MBINT_CLR => status &= !bit,
            _ => {}
        }
    }
    status
}
