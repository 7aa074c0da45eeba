// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Compile-time configuration options for the IPC layer.
//!
//! Options live in a typed `const` object rather than behind `#[cfg]` so that
//! every code path is type-checked, including the disabled ones. The compiler
//! folds the constants, so a disabled option costs nothing in the binary.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, enable the matching cargo feature from the
/// board crate.
pub(crate) struct Config {
    /// Whether the IPC layer should trace its operations through `log`.
    ///
    /// If enabled, every link state change, queue operation and mailbox
    /// event is reported at `trace` level. Anomalies (unhandled events,
    /// peers restarting without terminating) are always reported at `warn`
    /// level regardless of this option.
    pub(crate) trace_ipc: bool,

    /// Whether writes to the shared link table check the writer.
    ///
    /// Each core may only write the row of the link table it owns. If
    /// enabled, a write to another core's row panics. Always enabled for
    /// host tests.
    pub(crate) check_row_ownership: bool,
}

/// A unique instance of `Config` where compile-time configuration options are
/// defined.
pub(crate) const CONFIG: Config = Config {
    trace_ipc: cfg!(feature = "trace_ipc"),
    check_row_ownership: cfg!(any(test, feature = "check_row_ownership")),
};
