// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! TCP transport implementation

extern crate byteorder;

use super::constant;
use super::error::Error;
use super::transport::Transport as PackTrait;
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use std::io::{Read, Write};
use std::net::{IpAddr, TcpStream};
use std::time::Duration;

/// Default request/reply timeout
pub const TIMEOUT: Duration = Duration::from_secs(5);
/// Largest encapsulation payload accepted from a peer
pub const MAX_LENGTH: usize = 4096;

pub struct Transport {
    options: Options,
    stream: TcpStream,
}

/// a set of options for the TCP connection
#[derive(Debug, Clone)]
pub struct Options {
    pub connection_timeout: Option<Duration>,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    address: String,
}

impl Options {
    pub fn new(address: IpAddr) -> Options {
        Options::with_port(address, constant::DEFAULT_PORT)
    }

    pub fn with_port(address: IpAddr, port: u16) -> Options {
        Options {
            connection_timeout: None,
            read_timeout: TIMEOUT,
            write_timeout: TIMEOUT,
            address: format!("{}:{}", address, port),
        }
    }
}

impl Transport {
    pub fn connect(options: Options) -> Result<Transport, Error> {
        let stream = match options.connection_timeout {
            Some(timeout) => {
                // Trying connecting with timeout
                match options.address.parse::<std::net::SocketAddr>() {
                    Ok(socket_address) => TcpStream::connect_timeout(&socket_address, timeout)?,
                    Err(e) => return Err(Error::Connect(e.to_string())),
                }
            }
            None => TcpStream::connect(&options.address)?,
        };

        stream.set_read_timeout(Some(options.read_timeout))?;
        stream.set_write_timeout(Some(options.write_timeout))?;
        // best effort, some stacks lack it
        if let Err(e) = stream.set_nodelay(true) {
            debug!("TCP_NODELAY not available: {}", e);
        }
        Ok(Transport { options, stream })
    }

    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, Error> {
        self.stream.write_all(request)?;

        let mut packet = vec![0u8; constant::ENCAP_HEADER_SIZE];
        self.stream.read_exact(&mut packet)?;

        let length = LittleEndian::read_u16(&packet[2..4]) as usize;
        if length > MAX_LENGTH {
            return Err(Error::InvalidResponse {
                reason: format!("encapsulation payload of {} bytes exceeds limit", length),
            });
        }
        packet.resize(constant::ENCAP_HEADER_SIZE + length, 0);
        self.stream
            .read_exact(&mut packet[constant::ENCAP_HEADER_SIZE..])?;
        Ok(packet)
    }
}

impl PackTrait for Transport {
    fn send(&mut self, request: &[u8]) -> Result<Vec<u8>, Error> {
        self.stream
            .set_read_timeout(Some(self.options.read_timeout))?;
        self.exchange(request)
    }

    fn send_with_timeout(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, Error> {
        self.stream.set_read_timeout(Some(timeout))?;
        let result = self.exchange(request);
        // restore the default even when the exchange failed
        let _ = self
            .stream
            .set_read_timeout(Some(self.options.read_timeout));
        result
    }

    fn send_noreply(&mut self, request: &[u8]) -> Result<(), Error> {
        self.stream.write_all(request)?;
        Ok(())
    }
}
