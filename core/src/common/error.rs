// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.
use std::array::TryFromSliceError;
use std::num::TryFromIntError;

/// Result alias used throughout this crate.
pub type AnnResult<T> = Result<T, AnnError>;

/// Error taxonomy for the engine.
///
/// Five variants map 1:1 onto the error codes a facade wrapping this crate
/// would surface to callers (`Success` is simply `Ok`, and is not a variant
/// here): `InvalidArgument`, `NotInitialized`, `NotImplemented`,
/// `RuntimeError`, `Unknown`. `AnnError` is `Send + Sync`, safe to collect
/// across worker threads and return from a parallel operation.
#[derive(thiserror::Error, Debug)]
pub enum AnnError {
    /// Dimension mismatch, unknown storage kind, duplicate id on insert,
    /// absent id on delete, `k == 0`, negative radius, malformed build
    /// parameters. The index is left unchanged.
    #[error("InvalidArgument: {message}")]
    InvalidArgument { message: String },

    /// Operation requires a populated index (search, delete, save) but the
    /// index has no data yet.
    #[error("NotInitialized: {message}")]
    NotInitialized { message: String },

    /// Feature combination unsupported in this build.
    #[error("NotImplemented: {message}")]
    NotImplemented { message: String },

    /// I/O failure, stream corruption, archive schema mismatch, k-means
    /// non-convergence, exhausted back-edge repair budget.
    #[error("RuntimeError: {message}")]
    RuntimeError { message: String },

    /// Bug escape, reported as-is.
    #[error("Unknown: {message}")]
    Unknown { message: String },

    #[error("TryFromIntError: {err}")]
    TryFromInt {
        #[from]
        err: TryFromIntError,
    },

    #[error("TryFromSliceError: {err}")]
    TryFromSlice {
        #[from]
        err: TryFromSliceError,
    },

    #[error("IOError: {err}")]
    Io {
        #[from]
        err: std::io::Error,
    },
}

impl AnnError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        AnnError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_initialized(message: impl Into<String>) -> Self {
        AnnError::NotInitialized {
            message: message.into(),
        }
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        AnnError::NotImplemented {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        AnnError::RuntimeError {
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        AnnError::Unknown {
            message: message.into(),
        }
    }

    /// Lock poisoning is always a programming-error-adjacent runtime
    /// condition: a prior panic held the lock. Map it to `RuntimeError`
    /// rather than adding a dedicated variant, matching the five-code
    /// taxonomy this crate exposes.
    pub fn lock_poisoned(what: &str) -> Self {
        AnnError::runtime(format!("failed to acquire lock for {what}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_name() {
        let err = AnnError::invalid_argument("k must be nonzero");
        assert!(err.to_string().contains("InvalidArgument"));
        assert!(err.to_string().contains("k must be nonzero"));
    }
}
