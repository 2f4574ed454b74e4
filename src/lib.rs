// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! This crate provides communication tools for Allen-Bradley PLC devices
//! over EtherNet/IP: PCCC for the file based family (MicroLogix, SLC-500)
//! and native CIP tag services for the tag based family (CompactLogix,
//! ControlLogix, Micro800).
//! # Examples
//! ```no_run
//! # extern crate eip;
//! # use eip::{client::SlcDriver, tcp};
//! # use std::net::{IpAddr, Ipv4Addr};
//! # use std::time::Duration;
//!
//! # fn main() {
//!     let addr = Ipv4Addr::new(192, 168, 1, 10);
//!     let mut opts = tcp::Options::new(IpAddr::from(addr));
//!     opts.read_timeout = Duration::from_secs(2);
//!     opts.write_timeout = Duration::from_secs(2);
//!     let mut plc = match SlcDriver::new_tcp(opts) {
//!         Ok(plc) => plc,
//!         Err(e) => {
//!             println!("{:?}", e.to_string());
//!             return;
//!         }
//!     };
//!
//!     if plc.connect().is_ok() {
//!         match plc.read_address("N7:0") {
//!             Ok(value) => println!("N7:0 = {:?}", value),
//!             Err(e) => println!("error: {:?}", e),
//!         }
//!     }
//!     plc.disconnect();
//! # }
//! ```
mod cip;
pub mod client;
mod constant;
mod encap;
pub mod error;
pub mod pccc;
pub mod session;
pub mod tag;
pub mod tcp;
pub mod transport;
