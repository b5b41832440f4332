// Copyright 2026, The pwrctl Developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use std::path::PathBuf;

/// Transport error carried as the source of a failed bus operation
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error that occurred while talking to the power controller
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device node is missing or could not be opened read/write
    #[error("unable to open I2C device {}: {source}", .path.display())]
    DeviceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The slave address ioctl was refused
    #[error("unable to select slave address 0x{address:02x}: {source}")]
    SlaveConfigFailed {
        address: u16,
        #[source]
        source: nix::Error,
    },

    /// An SMBus or raw I2C transfer failed
    #[error("bus transaction failed: {0}")]
    TransactionFailed(#[source] BoxError),

    /// First half of a register read: the address-select write failed
    #[error("selecting register 0x{address:04x} failed: {source}")]
    RegisterSelectFailed {
        address: u16,
        #[source]
        source: BoxError,
    },

    /// Second half of a register read: the block read failed
    #[error("reading register 0x{address:04x} failed: {source}")]
    RegisterReadFailed {
        address: u16,
        #[source]
        source: BoxError,
    },

    /// The block read succeeded but carried no complete value
    #[error("register 0x{address:04x} response held {len} bytes, expected at least 6")]
    ShortRegisterResponse { address: u16, len: usize },
}

impl Error {
    pub(crate) fn transaction<E>(source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::TransactionFailed(Box::new(source))
    }
}

/// Result of a controller operation
pub type Result<T> = std::result::Result<T, Error>;
