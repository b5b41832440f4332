// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

#![allow(non_camel_case_types)]

use crate::core::I2CMessage;
use bitflags::bitflags;
use byteorder::{ByteOrder, NativeEndian};
use log::trace;
use std::os::unix::prelude::*;
use std::ptr;

pub type I2CError = nix::Error;

bitflags! {
    /// Flags carried by each `i2c_msg`, from include/uapi/linux/i2c.h
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct I2CMsgFlags: u16 {
        /// read data, from slave to master
        const I2C_M_RD = 0x0001;
    }
}

#[repr(C)]
pub struct i2c_msg {
    /// slave address
    addr: u16,
    /// serialized I2CMsgFlags
    flags: u16,
    /// msg length
    len: u16,
    /// pointer to msg data
    buf: *mut u8,
}

/// As specified in SMBus standard
pub const I2C_SMBUS_BLOCK_MAX: usize = 32;

// union i2c_smbus_data {
//     __u8 byte;
//     __u16 word;
//     __u8 block[I2C_SMBUS_BLOCK_MAX + 2]; /* block[0] is used for length */
//                            /* and one more for user-space compatibility */
// };
//
// The block member is the largest, so it stands in for the whole union.
#[repr(C)]
struct i2c_smbus_data {
    block: [u8; I2C_SMBUS_BLOCK_MAX + 2],
}

impl i2c_smbus_data {
    fn empty() -> i2c_smbus_data {
        i2c_smbus_data {
            block: [0; I2C_SMBUS_BLOCK_MAX + 2],
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum I2CSMBusReadWrite {
    I2C_SMBUS_READ = 1,
    I2C_SMBUS_WRITE = 0,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy)]
enum I2CSMBusSize {
    I2C_SMBUS_QUICK = 0,
    I2C_SMBUS_BYTE = 1,
    I2C_SMBUS_BYTE_DATA = 2,
    I2C_SMBUS_WORD_DATA = 3,
    I2C_SMBUS_BLOCK_DATA = 5,
}

// from include/uapi/linux/i2c-dev.h
const I2C_SLAVE: u16 = 0x0703;
const I2C_RDWR: u16 = 0x0707;
const I2C_SMBUS: u16 = 0x0720;

/// This is the structure as used in the I2C_SMBUS ioctl call
#[repr(C)]
pub struct i2c_smbus_ioctl_data {
    // __u8 read_write;
    read_write: u8,
    // __u8 command;
    command: u8,
    // __u32 size;
    size: u32,
    // union i2c_smbus_data __user *data;
    data: *mut i2c_smbus_data,
}

/// This is the structure as used in the I2C_RDWR ioctl call
// see linux/i2c-dev.h
#[repr(C)]
pub struct i2c_rdwr_ioctl_data {
    // struct i2c_msg __user *msgs;
    msgs: *mut i2c_msg,
    // __u32 nmsgs;
    nmsgs: u32,
}

mod ioctl {
    pub use super::i2c_rdwr_ioctl_data;
    pub use super::i2c_smbus_ioctl_data;
    use super::{I2C_RDWR, I2C_SLAVE, I2C_SMBUS};
    use nix::{ioctl_write_int_bad, ioctl_write_ptr_bad};

    ioctl_write_int_bad!(set_i2c_slave_address, I2C_SLAVE);
    ioctl_write_ptr_bad!(i2c_smbus, I2C_SMBUS, i2c_smbus_ioctl_data);
    ioctl_write_ptr_bad!(i2c_rdwr, I2C_RDWR, i2c_rdwr_ioctl_data);
}

pub fn i2c_set_slave_address(fd: RawFd, slave_address: u16) -> Result<(), I2CError> {
    unsafe {
        ioctl::set_i2c_slave_address(fd, i32::from(slave_address))?;
    }
    Ok(())
}

unsafe fn i2c_smbus_access(
    fd: RawFd,
    read_write: I2CSMBusReadWrite,
    command: u8, // can be address or something else
    size: I2CSMBusSize,
    data: *mut i2c_smbus_data,
) -> Result<(), I2CError> {
    trace!(
        "smbus {:?} command=0x{:02x} size={:?}",
        read_write,
        command,
        size
    );
    let args = i2c_smbus_ioctl_data {
        read_write: read_write as u8,
        command,
        size: size as u32,
        data,
    };

    ioctl::i2c_smbus(fd, &args).map(drop)
}

#[inline]
pub fn i2c_smbus_write_quick(fd: RawFd, bit: bool) -> Result<(), I2CError> {
    let read_write = if bit {
        I2CSMBusReadWrite::I2C_SMBUS_READ
    } else {
        I2CSMBusReadWrite::I2C_SMBUS_WRITE
    };
    unsafe {
        i2c_smbus_access(
            fd,
            read_write,
            0,
            I2CSMBusSize::I2C_SMBUS_QUICK,
            ptr::null_mut(),
        )
    }
}

#[inline]
pub fn i2c_smbus_read_byte(fd: RawFd) -> Result<u8, I2CError> {
    let mut data = i2c_smbus_data::empty();
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_READ,
            0,
            I2CSMBusSize::I2C_SMBUS_BYTE,
            &mut data,
        )?;
    }
    Ok(data.block[0])
}

#[inline]
pub fn i2c_smbus_write_byte(fd: RawFd, value: u8) -> Result<(), I2CError> {
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            value,
            I2CSMBusSize::I2C_SMBUS_BYTE,
            ptr::null_mut(),
        )
    }
}

#[inline]
pub fn i2c_smbus_read_byte_data(fd: RawFd, command: u8) -> Result<u8, I2CError> {
    let mut data = i2c_smbus_data::empty();
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_READ,
            command,
            I2CSMBusSize::I2C_SMBUS_BYTE_DATA,
            &mut data,
        )?;
    }
    Ok(data.block[0])
}

#[inline]
pub fn i2c_smbus_write_byte_data(fd: RawFd, command: u8, value: u8) -> Result<(), I2CError> {
    let mut data = i2c_smbus_data::empty();
    data.block[0] = value;
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            command,
            I2CSMBusSize::I2C_SMBUS_BYTE_DATA,
            &mut data,
        )
    }
}

#[inline]
pub fn i2c_smbus_read_word_data(fd: RawFd, command: u8) -> Result<u16, I2CError> {
    let mut data = i2c_smbus_data::empty();
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_READ,
            command,
            I2CSMBusSize::I2C_SMBUS_WORD_DATA,
            &mut data,
        )?;
    }
    Ok(NativeEndian::read_u16(&data.block[..2]))
}

#[inline]
pub fn i2c_smbus_write_word_data(fd: RawFd, command: u8, value: u16) -> Result<(), I2CError> {
    let mut data = i2c_smbus_data::empty();
    NativeEndian::write_u16(&mut data.block[..2], value);
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            command,
            I2CSMBusSize::I2C_SMBUS_WORD_DATA,
            &mut data,
        )
    }
}

#[inline]
pub fn i2c_smbus_read_block_data(fd: RawFd, command: u8) -> Result<Vec<u8>, I2CError> {
    let mut data = i2c_smbus_data::empty();
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_READ,
            command,
            I2CSMBusSize::I2C_SMBUS_BLOCK_DATA,
            &mut data,
        )?;
    }

    // create a vector from the data in the block starting at byte
    // 1 and ending after count bytes after that
    let count = usize::from(data.block[0]).min(I2C_SMBUS_BLOCK_MAX);
    Ok(data.block[1..=count].to_vec())
}

#[inline]
fn copy_to_i2c_block_data(values: &[u8], max_size: usize) -> i2c_smbus_data {
    let mut data = i2c_smbus_data::empty();
    let len = values.len().min(max_size);
    data.block[0] = len as u8;
    data.block[1..=len].copy_from_slice(&values[..len]);
    data
}

#[inline]
pub fn i2c_smbus_write_block_data(fd: RawFd, command: u8, values: &[u8]) -> Result<(), I2CError> {
    let mut data = copy_to_i2c_block_data(values, I2C_SMBUS_BLOCK_MAX);
    unsafe {
        i2c_smbus_access(
            fd,
            I2CSMBusReadWrite::I2C_SMBUS_WRITE,
            command,
            I2CSMBusSize::I2C_SMBUS_BLOCK_DATA,
            &mut data,
        )
    }
}

fn to_i2c_msg(message: &mut I2CMessage<'_>) -> i2c_msg {
    match message {
        I2CMessage::Read { address, data } => i2c_msg {
            addr: *address,
            flags: I2CMsgFlags::I2C_M_RD.bits(),
            len: data.len() as u16,
            buf: data.as_mut_ptr(),
        },
        // the kernel only reads from buf when I2C_M_RD is clear
        I2CMessage::Write { address, data } => i2c_msg {
            addr: *address,
            flags: I2CMsgFlags::empty().bits(),
            len: data.len() as u16,
            buf: data.as_ptr() as *mut u8,
        },
    }
}

pub fn i2c_rdwr(fd: RawFd, messages: &mut [I2CMessage<'_>]) -> Result<u32, I2CError> {
    let mut msgs: Vec<i2c_msg> = messages.iter_mut().map(to_i2c_msg).collect();
    for msg in &msgs {
        trace!(
            "i2c_rdwr addr=0x{:02x} flags={:?} len={}",
            msg.addr,
            I2CMsgFlags::from_bits_truncate(msg.flags),
            msg.len
        );
    }

    let i2c_data = i2c_rdwr_ioctl_data {
        msgs: msgs.as_mut_ptr(),
        nmsgs: msgs.len() as u32,
    };

    let n: libc::c_int = unsafe { ioctl::i2c_rdwr(fd, &i2c_data)? };
    Ok(n as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_data_is_clamped_to_block_max() {
        let values: Vec<u8> = (0..40).collect();
        let data = copy_to_i2c_block_data(&values, I2C_SMBUS_BLOCK_MAX);
        assert_eq!(data.block[0], 32);
        assert_eq!(&data.block[1..33], &values[..32]);
        assert_eq!(data.block[33], 0);
    }

    #[test]
    fn empty_block_has_zero_count() {
        let data = copy_to_i2c_block_data(&[], I2C_SMBUS_BLOCK_MAX);
        assert_eq!(data.block[0], 0);
        assert!(data.block[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn short_block_keeps_its_length() {
        let data = copy_to_i2c_block_data(&[0x23, 0x01], I2C_SMBUS_BLOCK_MAX);
        assert_eq!(&data.block[..3], &[2, 0x23, 0x01]);
    }

    #[test]
    fn power_word_becomes_a_plain_write_msg() {
        let payload = [0x0B, 0x00];
        let mut message = I2CMessage::write(0x20, &payload);
        let msg = to_i2c_msg(&mut message);
        assert_eq!(msg.addr, 0x20);
        assert_eq!(msg.flags, 0);
        assert_eq!(msg.len, 2);
        assert_eq!(msg.buf as *const u8, payload.as_ptr());
    }

    #[test]
    fn read_message_sets_rd_flag() {
        let mut buf = [0u8; 6];
        let ptr = buf.as_mut_ptr();
        let mut message = I2CMessage::read(0x10, &mut buf);
        let msg = to_i2c_msg(&mut message);
        assert_eq!(msg.addr, 0x10);
        assert_eq!(msg.flags, I2CMsgFlags::I2C_M_RD.bits());
        assert_eq!(msg.len, 6);
        assert_eq!(msg.buf, ptr);
    }
}
