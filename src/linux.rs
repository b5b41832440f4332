// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use crate::core::{I2CDevice, I2CMessage};
use crate::error::{Error, Result};
use crate::ffi;
use log::debug;
use std::fs::{File, OpenOptions};
use std::os::unix::prelude::*;
use std::path::{Path, PathBuf};

/// An open, address-configured i2c-dev node
///
/// The underlying file is closed when the device is dropped.
pub struct LinuxI2CDevice {
    devfile: File,
    path: PathBuf,
    slave_address: u16,
}

impl AsRawFd for LinuxI2CDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.devfile.as_raw_fd()
    }
}

impl LinuxI2CDevice {
    /// Create a new I2CDevice for the specified path
    pub fn new<P: AsRef<Path>>(path: P, slave_address: u16) -> Result<LinuxI2CDevice> {
        let path = path.as_ref();
        debug!(
            "opening {} for slave address 0x{:02x}",
            path.display(),
            slave_address
        );
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| Error::DeviceOpenFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let mut device = LinuxI2CDevice {
            devfile: file,
            path: path.to_path_buf(),
            slave_address: 0, // will be set later
        };
        device.set_slave_address(slave_address)?;
        Ok(device)
    }

    /// Set the slave address for this device
    ///
    /// Typically the address is expected to be 7-bits but 10-bit addresses
    /// may be supported by the kernel driver in some cases.  Little validation
    /// is done in Rust as the kernel is good at making sure things are valid.
    pub fn set_slave_address(&mut self, slave_address: u16) -> Result<()> {
        ffi::i2c_set_slave_address(self.as_raw_fd(), slave_address).map_err(|source| {
            Error::SlaveConfigFailed {
                address: slave_address,
                source,
            }
        })?;
        self.slave_address = slave_address;
        Ok(())
    }
}

impl Drop for LinuxI2CDevice {
    fn drop(&mut self) {
        debug!(
            "closing {} (slave address 0x{:02x})",
            self.path.display(),
            self.slave_address
        );
    }
}

impl I2CDevice for LinuxI2CDevice {
    type Error = ffi::I2CError;

    fn smbus_write_quick(&mut self, bit: bool) -> std::result::Result<(), Self::Error> {
        ffi::i2c_smbus_write_quick(self.as_raw_fd(), bit)
    }

    fn smbus_read_byte(&mut self) -> std::result::Result<u8, Self::Error> {
        ffi::i2c_smbus_read_byte(self.as_raw_fd())
    }

    fn smbus_write_byte(&mut self, value: u8) -> std::result::Result<(), Self::Error> {
        ffi::i2c_smbus_write_byte(self.as_raw_fd(), value)
    }

    fn smbus_read_byte_data(&mut self, command: u8) -> std::result::Result<u8, Self::Error> {
        ffi::i2c_smbus_read_byte_data(self.as_raw_fd(), command)
    }

    fn smbus_write_byte_data(
        &mut self,
        command: u8,
        value: u8,
    ) -> std::result::Result<(), Self::Error> {
        ffi::i2c_smbus_write_byte_data(self.as_raw_fd(), command, value)
    }

    fn smbus_read_word_data(&mut self, command: u8) -> std::result::Result<u16, Self::Error> {
        ffi::i2c_smbus_read_word_data(self.as_raw_fd(), command)
    }

    fn smbus_write_word_data(
        &mut self,
        command: u8,
        value: u16,
    ) -> std::result::Result<(), Self::Error> {
        ffi::i2c_smbus_write_word_data(self.as_raw_fd(), command, value)
    }

    fn smbus_read_block_data(&mut self, command: u8) -> std::result::Result<Vec<u8>, Self::Error> {
        ffi::i2c_smbus_read_block_data(self.as_raw_fd(), command)
    }

    fn smbus_write_block_data(
        &mut self,
        command: u8,
        values: &[u8],
    ) -> std::result::Result<(), Self::Error> {
        ffi::i2c_smbus_write_block_data(self.as_raw_fd(), command, values)
    }

    fn transfer(&mut self, messages: &mut [I2CMessage<'_>]) -> std::result::Result<u32, Self::Error> {
        ffi::i2c_rdwr(self.as_raw_fd(), messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_node_reports_open_failure() {
        let path = "/dev/pwrctl-does-not-exist";
        match LinuxI2CDevice::new(path, 0x10) {
            Err(Error::DeviceOpenFailed { path: p, .. }) => assert_eq!(p, Path::new(path)),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opened a node that does not exist"),
        }
    }

    #[test]
    fn regular_file_rejects_slave_address() {
        let path = std::env::temp_dir().join(format!("pwrctl-linux-{}", std::process::id()));
        File::create(&path).unwrap();
        let result = LinuxI2CDevice::new(&path, 0x10);
        std::fs::remove_file(&path).unwrap();
        match result {
            Err(Error::SlaveConfigFailed { address, .. }) => assert_eq!(address, 0x10),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("a regular file accepted I2C_SLAVE"),
        }
    }
}
