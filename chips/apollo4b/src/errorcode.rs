// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Standard error enum for IPC operations

/// Errors returned by the IPC layer.
///
/// Success cases are not encoded here: operations return
/// `Result<T, ErrorCode>` and carry their payload in `Ok`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ErrorCode {
    /// A single non-blocking attempt did not succeed
    FAIL = 0,
    /// Identifier outside its valid domain, or the queue does not exist
    OUTOFRANGE = 1,
    /// Operation not permitted in the current state (queue full or empty,
    /// caller is not the owner, event number too large)
    INVAL = 2,
    /// Retry budget exhausted
    TIMEOUT = 3,
    /// The peer has not published its queue descriptors
    NOTINIT = 4,
}

impl From<ErrorCode> for usize {
    fn from(err: ErrorCode) -> usize {
        err as usize
    }
}

#[cfg(test)]
mod test {
    use super::ErrorCode;

    #[test]
    fn usize_values_are_stable() {
        assert_eq!(usize::from(ErrorCode::FAIL), 0);
        assert_eq!(usize::from(ErrorCode::OUTOFRANGE), 1);
        assert_eq!(usize::from(ErrorCode::INVAL), 2);
        assert_eq!(usize::from(ErrorCode::TIMEOUT), 3);
        assert_eq!(usize::from(ErrorCode::NOTINIT), 4);
    }
}
