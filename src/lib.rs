// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! # pwrctl
//!
//! Drives the power/management controller found behind an I2C bus on
//! some single-board computers.  The controller answers on two
//! addresses: `0x10` speaks a register protocol carried in SMBus block
//! transfers, `0x20` accepts a raw two-byte power-toggle word.
//!
//! Bus access goes through the Linux i2c-dev interface:
//! https://www.kernel.org/doc/Documentation/i2c/dev-interface

pub mod action;
pub mod core;
mod error;
#[cfg(any(target_os = "linux", target_os = "android"))]
mod ffi;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod linux;
pub mod mock;
pub mod register;

pub use crate::action::{dispatch, perform_action_with, with_device, Action};
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use crate::action::perform_action;
pub use crate::error::{BoxError, Error, Result};
pub use crate::register::{read_register, write_register};
