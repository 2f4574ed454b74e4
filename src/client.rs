// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Client drivers for the two Allen-Bradley PLC families
//!
//! [`SlcDriver`] speaks PCCC to file based controllers (MicroLogix,
//! SLC-500); [`LogixDriver`] speaks native CIP tag services to tag based
//! controllers (CompactLogix, ControlLogix, Micro800). Both share the
//! encapsulation, CPF and session stack and differ only in the service
//! codecs.
//!
//! A driver instance owns its socket and counters exclusively. To share
//! one PLC between stations, share one driver under caller provided
//! mutual exclusion instead of opening a second socket.

use log::debug;

use super::cip;
use super::error::Error;
use super::pccc::{self, FileType, SlcAddress, SlcValue};
use super::session::Session;
use super::tag::{self, DataType, TagValue};
use super::tcp;
use super::transport::Transport;

/// Driver for file based PLCs, addressed as `N7:0` or `B3:5/3`.
pub struct SlcDriver<T: Transport> {
    session: Session<T>,
}

impl SlcDriver<tcp::Transport> {
    /// # Examples
    ///
    /// ```no_run
    /// use std::net::{IpAddr, Ipv4Addr};
    /// use std::time::Duration;
    /// use eip::{client::SlcDriver, tcp};
    ///
    /// let addr = Ipv4Addr::new(192, 168, 1, 10);
    /// let mut opts = tcp::Options::new(IpAddr::from(addr));
    /// opts.read_timeout = Duration::from_secs(2);
    /// opts.write_timeout = Duration::from_secs(2);
    ///
    /// let mut plc = SlcDriver::new_tcp(opts).unwrap();
    /// plc.connect().unwrap();
    ///
    /// match plc.read_address("N7:0") {
    ///     Ok(value) => println!("N7:0 = {:?}", value),
    ///     Err(e) => println!("error: {:?}", e),
    /// }
    /// plc.disconnect();
    /// ```
    pub fn new_tcp(options: tcp::Options) -> Result<SlcDriver<tcp::Transport>, Error> {
        Ok(SlcDriver::new(tcp::Transport::connect(options)?))
    }
}

impl<T: Transport> SlcDriver<T> {
    pub fn new(transport: T) -> SlcDriver<T> {
        SlcDriver {
            session: Session::new(transport),
        }
    }

    /// Register Session, probe the identity, Forward Open.
    pub fn connect(&mut self) -> Result<(), Error> {
        self.session.register()?;
        self.session.list_identity();
        self.session.forward_open()?;
        Ok(())
    }

    pub fn connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Forward Close then Unregister Session, both best effort.
    pub fn disconnect(&mut self) {
        self.session.forward_close();
        self.session.unregister();
        debug!("disconnected");
    }

    /// Reads one element. A bit address yields 0 or 1.
    pub fn read(&mut self, address: &SlcAddress) -> Result<SlcValue, Error> {
        if !self.session.is_connected() {
            return Err(Error::NotConnected);
        }
        let request = pccc::read_request(
            self.session.originator_serial(),
            self.session.next_tns(),
            address,
            1,
        )?;
        let reply = self.session.send_rr_data(&request)?;
        let data = pccc::parse_reply(&reply)?;
        match address.bit {
            Some(bit) => {
                let word = pccc::decode_word(data)?;
                Ok(SlcValue::Int(((word >> bit) & 1) as i32))
            }
            None => pccc::decode_element(address.file_type, data),
        }
    }

    /// Reads `count` consecutive elements starting at `address`.
    pub fn read_elements(
        &mut self,
        address: &SlcAddress,
        count: u16,
    ) -> Result<Vec<SlcValue>, Error> {
        if !self.session.is_connected() {
            return Err(Error::NotConnected);
        }
        let request = pccc::read_request(
            self.session.originator_serial(),
            self.session.next_tns(),
            address,
            count,
        )?;
        let reply = self.session.send_rr_data(&request)?;
        let data = pccc::parse_reply(&reply)?;
        let size = address.file_type.element_size();
        if data.len() < size * count as usize {
            return Err(Error::InvalidResponse {
                reason: format!(
                    "expected {} elements, got {} data bytes",
                    count,
                    data.len()
                ),
            });
        }
        data.chunks(size)
            .take(count as usize)
            .map(|chunk| pccc::decode_element(address.file_type, chunk))
            .collect()
    }

    /// Writes a word, or one bit when the address carries a bit position
    /// (any non zero `value` sets the bit).
    pub fn write(&mut self, address: &SlcAddress, value: i16) -> Result<(), Error> {
        match address.bit {
            Some(_) => self.write_bit(address, value != 0),
            None => self.write_word(address, value),
        }
    }

    /// Read-modify-write on one bit. The PLC scan is the atomicity
    /// boundary here; a scan between the read and the write can change
    /// the other 15 bits under us.
    pub fn write_bit(&mut self, address: &SlcAddress, value: bool) -> Result<(), Error> {
        let bit = address.bit
            .ok_or_else(|| Error::Address(format!("no bit position in {}", address)))?;
        match address.file_type {
            FileType::Integer | FileType::Binary => {}
            _ => {
                return Err(Error::Address(format!(
                    "bit writes are limited to N and B files, got {}",
                    address
                )))
            }
        }
        let word_address = SlcAddress { bit: None, ..*address };
        let current = match self.read(&word_address)? {
            SlcValue::Int(v) => v as u16,
            SlcValue::Real(_) => {
                return Err(Error::InvalidResponse {
                    reason: format!("word read of {} yielded a float", word_address),
                })
            }
        };
        let word = if value {
            current | (1 << bit)
        } else {
            current & !(1 << bit)
        };
        self.write_word(&word_address, word as i16)
    }

    fn write_word(&mut self, address: &SlcAddress, value: i16) -> Result<(), Error> {
        match address.file_type {
            FileType::Integer | FileType::Binary => {}
            _ => {
                return Err(Error::Address(format!(
                    "word writes are limited to N and B files, got {}",
                    address
                )))
            }
        }
        if !self.session.is_connected() {
            return Err(Error::NotConnected);
        }
        let request = pccc::write_request(
            self.session.originator_serial(),
            self.session.next_tns(),
            address,
            value,
        );
        let reply = self.session.send_rr_data(&request)?;
        // write replies carry no data past the status frame
        pccc::parse_reply(&reply)?;
        Ok(())
    }

    /// Reads a string addressed location like `"N7:0/5"`.
    pub fn read_address(&mut self, address: &str) -> Result<SlcValue, Error> {
        let address: SlcAddress = address.parse()?;
        self.read(&address)
    }

    /// Writes a string addressed location like `"B3:0/3"`.
    pub fn write_address(&mut self, address: &str, value: i16) -> Result<(), Error> {
        let address: SlcAddress = address.parse()?;
        self.write(&address, value)
    }
}

/// Driver for tag based PLCs, addressed by symbolic tag names.
pub struct LogixDriver<T: Transport> {
    session: Session<T>,
    slot: u8,
    use_routing: bool,
    auto_detect: bool,
}

impl LogixDriver<tcp::Transport> {
    pub fn new_tcp(options: tcp::Options) -> Result<LogixDriver<tcp::Transport>, Error> {
        Ok(LogixDriver::new(tcp::Transport::connect(options)?))
    }
}

impl<T: Transport> LogixDriver<T> {
    pub fn new(transport: T) -> LogixDriver<T> {
        LogixDriver {
            session: Session::new(transport),
            slot: 0,
            use_routing: false,
            auto_detect: true,
        }
    }

    /// Route every request through the backplane to the CPU in `slot`
    /// via Unconnected Send.
    pub fn with_routing(mut self, slot: u8) -> LogixDriver<T> {
        self.use_routing = true;
        self.slot = slot;
        self
    }

    /// Untyped writes read the tag first to learn its type. Turning this
    /// off makes them use the value's own default type instead.
    pub fn with_auto_detect(mut self, auto_detect: bool) -> LogixDriver<T> {
        self.auto_detect = auto_detect;
        self
    }

    /// Register Session, probe the identity, Forward Open.
    pub fn connect(&mut self) -> Result<(), Error> {
        self.session.register()?;
        self.session.list_identity();
        self.session.forward_open()?;
        Ok(())
    }

    pub fn connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Forward Close then Unregister Session, both best effort.
    pub fn disconnect(&mut self) {
        self.session.forward_close();
        self.session.unregister();
        debug!("disconnected");
    }

    fn execute(&mut self, cip_data: &[u8]) -> Result<Vec<u8>, Error> {
        if !self.session.is_connected() {
            return Err(Error::NotConnected);
        }
        if self.use_routing {
            let wrapped = cip::wrap_unconnected_send(cip_data, self.slot);
            let reply = self.session.send_rr_data(&wrapped)?;
            cip::unwrap_routed_reply(&reply).map(|d| d.to_vec())
        } else {
            self.session.send_rr_data(cip_data)
        }
    }

    /// Reads one atomic tag.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::net::{IpAddr, Ipv4Addr};
    /// use eip::{client::LogixDriver, tcp};
    ///
    /// let opts = tcp::Options::new(IpAddr::from(Ipv4Addr::new(192, 168, 1, 20)));
    /// let mut plc = LogixDriver::new_tcp(opts).unwrap().with_routing(0);
    /// plc.connect().unwrap();
    /// match plc.read("Counter") {
    ///     Ok(value) => println!("Counter = {:?}", value),
    ///     Err(e) => println!("error: {:?}", e),
    /// }
    /// ```
    pub fn read(&mut self, tag: &str) -> Result<TagValue, Error> {
        let request = tag::read_request(tag, 1)?;
        let reply = self.execute(&request)?;
        let (data_type, data) = tag::parse_read_reply(&reply)?;
        TagValue::decode(data_type, data)
    }

    /// Reads `count` elements of an atomic array tag.
    pub fn read_elements(&mut self, tag: &str, count: u16) -> Result<Vec<TagValue>, Error> {
        let request = tag::read_request(tag, count)?;
        let reply = self.execute(&request)?;
        let (data_type, data) = tag::parse_read_reply(&reply)?;
        let size = data_type.size();
        if data.len() < size * count as usize {
            return Err(Error::InvalidResponse {
                reason: format!(
                    "expected {} elements, got {} data bytes",
                    count,
                    data.len()
                ),
            });
        }
        data.chunks(size)
            .take(count as usize)
            .map(|chunk| TagValue::decode(data_type, chunk))
            .collect()
    }

    /// Untyped write. With auto detect the tag's type comes from a one
    /// element read; otherwise the value's own default type is used
    /// (plain integers write as DINT, floats as REAL, booleans as BOOL).
    pub fn write(&mut self, tag: &str, value: TagValue) -> Result<(), Error> {
        let data_type = if self.auto_detect {
            self.detect_type(tag)?
        } else {
            value.data_type()
        };
        self.write_typed(tag, value, data_type)
    }

    /// Typed write. The value is coerced and range checked before
    /// anything is transmitted.
    pub fn write_typed(
        &mut self,
        tag: &str,
        value: TagValue,
        data_type: DataType,
    ) -> Result<(), Error> {
        let data = value.encode_as(data_type)?;
        let request = tag::write_request(tag, data_type, 1, &data)?;
        let reply = self.execute(&request)?;
        tag::parse_write_reply(&reply)
    }

    fn detect_type(&mut self, tag: &str) -> Result<DataType, Error> {
        let request = tag::read_request(tag, 1)?;
        let reply = self.execute(&request)?;
        let (data_type, _) = tag::parse_read_reply(&reply)?;
        debug!("detected {} as {}", tag, data_type);
        Ok(data_type)
    }
}
