// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! EtherNet/IP session and CIP connection state machine
//!
//! Closed -> SessionOpen (Register Session) -> Connected (Forward Open)
//! and back down through Forward Close and Unregister Session. Any
//! transport failure drops the session back to Closed.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};
use std::time::Duration;

use super::cip;
use super::constant;
use super::encap::{self, put_u16, put_u32, Header};
use super::error::Error;
use super::transport::Transport;

/// Reply deadline for connection manager services and connected sends
const SLOW_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Per connection protocol state shared by both drivers.
pub struct Session<T: Transport> {
    transport: T,
    session_handle: u32,
    sender_context: [u8; 8],
    originator_serial: u32,
    o_to_t_connection_id: u32,
    t_to_o_connection_id: u32,
    pccc_tns: u16,
    conn_sequence: u16,
    connected: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Session<T> {
        Session::with_serial(transport, rand::random::<u32>())
    }

    /// The serial identifies this client to the PLC; fix one for
    /// reproducible captures.
    pub fn with_serial(transport: T, originator_serial: u32) -> Session<T> {
        let mut sender_context = [0u8; 8];
        LittleEndian::write_u32(&mut sender_context[0..4], originator_serial);
        LittleEndian::write_u32(&mut sender_context[4..8], !originator_serial);
        Session {
            transport,
            session_handle: 0,
            sender_context,
            originator_serial,
            o_to_t_connection_id: 0,
            t_to_o_connection_id: 0,
            pccc_tns: 1,
            conn_sequence: 2,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn session_handle(&self) -> u32 {
        self.session_handle
    }

    pub fn originator_serial(&self) -> u32 {
        self.originator_serial
    }

    pub fn t_to_o_connection_id(&self) -> u32 {
        self.t_to_o_connection_id
    }

    /// next PCCC transaction number; advances on every request, failed
    /// ones included, so a value is never reused before the wrap.
    pub fn next_tns(&mut self) -> u16 {
        let tns = self.pccc_tns;
        self.pccc_tns = self.pccc_tns.wrapping_add(1);
        tns
    }

    fn invalidate(&mut self) {
        self.session_handle = 0;
        self.connected = false;
    }

    fn packet(&self, command: u16, handle: u32, payload: &[u8]) -> Vec<u8> {
        let header = Header::new(command, handle, self.sender_context, payload.len() as u16);
        let mut packet = header.encode().to_vec();
        packet.extend_from_slice(payload);
        packet
    }

    fn exchange(
        &mut self,
        command: u16,
        handle: u32,
        payload: &[u8],
        timeout: Option<Duration>,
    ) -> Result<(Header, Vec<u8>), Error> {
        let packet = self.packet(command, handle, payload);
        let response = match timeout {
            Some(t) => self.transport.send_with_timeout(&packet, t)?,
            None => self.transport.send(&packet)?,
        };
        let header = Header::parse(&response)?;
        let end = constant::ENCAP_HEADER_SIZE + header.length as usize;
        if response.len() < end {
            return Err(Error::InvalidResponse {
                reason: "encapsulation payload shorter than announced".to_string(),
            });
        }
        Ok((header, response[constant::ENCAP_HEADER_SIZE..end].to_vec()))
    }

    /// Register Session handshake; latches the handle the PLC assigned.
    pub fn register(&mut self) -> Result<(), Error> {
        let mut payload = Vec::with_capacity(4);
        put_u16(&mut payload, constant::PROTOCOL_VERSION);
        put_u16(&mut payload, 0); // options
        let (header, _) = self.exchange(constant::ENCAP_REGISTER_SESSION, 0, &payload, None)?;
        if header.command != constant::ENCAP_REGISTER_SESSION || header.status != 0 {
            return Err(Error::Encap {
                command: header.command,
                status: header.status,
            });
        }
        self.session_handle = header.session_handle;
        debug!("session registered: 0x{:08X}", self.session_handle);
        Ok(())
    }

    /// Best effort teardown; the PLC closes without replying.
    pub fn unregister(&mut self) {
        if self.session_handle != 0 {
            let packet = self.packet(
                constant::ENCAP_UNREGISTER_SESSION,
                self.session_handle,
                &[],
            );
            if let Err(e) = self.transport.send_noreply(&packet) {
                warn!("unregister session failed: {}", e);
            }
        }
        self.invalidate();
    }

    /// Identity probe after registration; failures are ignored.
    pub fn list_identity(&mut self) {
        match self.exchange(constant::ENCAP_LIST_IDENTITY, 0, &[], None) {
            Ok((_, payload)) if !payload.is_empty() => {
                debug!("identity received, {} bytes", payload.len())
            }
            Ok(_) => {}
            Err(e) => debug!("list identity ignored: {}", e),
        }
    }

    /// Forward Open against the connection manager. The originator
    /// connection id is randomized per session so concurrent clients
    /// against one PLC cannot collide.
    pub fn forward_open(&mut self) -> Result<(), Error> {
        self.o_to_t_connection_id = rand::random::<u32>() | 0x0001_0000;
        let mut cip_data = Vec::with_capacity(48);
        cip_data.push(constant::SERVICE_FORWARD_OPEN);
        cip_data.push(0x02);
        cip_data.extend_from_slice(&cip::logical_path(constant::CLASS_CONNECTION_MANAGER, 0x01));
        cip_data.push(constant::PRIORITY_TICK_TIME);
        cip_data.push(constant::CONNECTION_TIMEOUT_TICKS);
        put_u32(&mut cip_data, self.o_to_t_connection_id);
        put_u32(&mut cip_data, 0); // T->O id, assigned by the target
        put_u16(&mut cip_data, constant::CONNECTION_SERIAL);
        put_u16(&mut cip_data, constant::VENDOR_ID);
        put_u32(&mut cip_data, constant::ORIGINATOR_VENDOR_SERIAL);
        cip_data.push(0x00); // connection timeout multiplier
        cip_data.extend_from_slice(&[0x00, 0x00, 0x00]); // reserved
        put_u32(&mut cip_data, constant::RPI_MICROSECONDS);
        put_u16(&mut cip_data, constant::CONNECTION_PARAMETERS);
        put_u32(&mut cip_data, constant::RPI_MICROSECONDS);
        put_u16(&mut cip_data, constant::CONNECTION_PARAMETERS);
        cip_data.push(constant::TRANSPORT_CLASS_TRIGGER);
        cip_data.push(0x03); // connection path size in words
        cip_data.extend_from_slice(&cip::logical_path(constant::CLASS_MESSAGE_ROUTER, 0x01));
        cip_data.push(constant::SEGMENT_CONNECTION_POINT);
        cip_data.push(0x01);

        let reply = self.send_rr_data_with_timeout(&cip_data, Some(SLOW_REPLY_TIMEOUT))?;
        let offset = cip::parse_reply_header(&reply, constant::SERVICE_FORWARD_OPEN)?;
        if reply.len() < offset + 4 {
            return Err(Error::InvalidResponse {
                reason: "forward open reply missing connection id".to_string(),
            });
        }
        self.t_to_o_connection_id = LittleEndian::read_u32(&reply[offset..offset + 4]);
        self.connected = true;
        debug!(
            "forward open: O->T 0x{:08X}, T->O 0x{:08X}",
            self.o_to_t_connection_id, self.t_to_o_connection_id
        );
        Ok(())
    }

    /// Forward Close with the same connection triplet; errors ignored.
    pub fn forward_close(&mut self) {
        if self.o_to_t_connection_id == 0 {
            return;
        }
        let mut cip_data = Vec::with_capacity(24);
        cip_data.push(constant::SERVICE_FORWARD_CLOSE);
        cip_data.push(0x02);
        cip_data.extend_from_slice(&cip::logical_path(constant::CLASS_CONNECTION_MANAGER, 0x01));
        cip_data.push(constant::PRIORITY_TICK_TIME);
        cip_data.push(constant::CONNECTION_TIMEOUT_TICKS);
        put_u16(&mut cip_data, constant::CONNECTION_SERIAL);
        put_u16(&mut cip_data, constant::VENDOR_ID);
        put_u32(&mut cip_data, constant::ORIGINATOR_VENDOR_SERIAL);
        cip_data.push(0x03); // connection path size in words
        cip_data.extend_from_slice(&cip::logical_path(constant::CLASS_MESSAGE_ROUTER, 0x01));
        cip_data.push(constant::SEGMENT_CONNECTION_POINT);
        cip_data.push(0x01);

        if let Err(e) = self.send_rr_data(&cip_data) {
            warn!("forward close ignored: {}", e);
        }
        self.connected = false;
        self.o_to_t_connection_id = 0;
    }

    /// Send RR Data (unconnected messaging); returns the unconnected
    /// data item payload.
    pub fn send_rr_data(&mut self, cip_data: &[u8]) -> Result<Vec<u8>, Error> {
        self.send_rr_data_with_timeout(cip_data, None)
    }

    fn send_rr_data_with_timeout(
        &mut self,
        cip_data: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, Error> {
        if self.session_handle == 0 {
            return Err(Error::NotConnected);
        }
        let payload = encap::rr_payload(cip_data);
        let handle = self.session_handle;
        let (header, reply) =
            match self.exchange(constant::ENCAP_SEND_RR_DATA, handle, &payload, timeout) {
                Ok(ok) => ok,
                Err(e) => {
                    self.invalidate();
                    return Err(e);
                }
            };
        if header.command != constant::ENCAP_SEND_RR_DATA || header.status != 0 {
            self.invalidate();
            return Err(Error::Encap {
                command: header.command,
                status: header.status,
            });
        }
        encap::find_item(&reply, constant::ITEM_UNCONNECTED_DATA).map(|d| d.to_vec())
    }

    /// Send Unit Data (connected messaging). The sequence number advances
    /// on every transmit, failed ones included.
    pub fn send_unit_data(&mut self, cip_data: &[u8]) -> Result<Vec<u8>, Error> {
        if self.session_handle == 0 || !self.connected {
            return Err(Error::NotConnected);
        }
        let sequence = self.conn_sequence;
        self.conn_sequence = self.conn_sequence.wrapping_add(1);
        let payload = encap::unit_payload(self.o_to_t_connection_id, sequence, cip_data);
        let handle = self.session_handle;
        let (header, reply) = match self.exchange(
            constant::ENCAP_SEND_UNIT_DATA,
            handle,
            &payload,
            Some(SLOW_REPLY_TIMEOUT),
        ) {
            Ok(ok) => ok,
            Err(e) => {
                self.invalidate();
                return Err(e);
            }
        };
        if header.command != constant::ENCAP_SEND_UNIT_DATA || header.status != 0 {
            self.invalidate();
            return Err(Error::Encap {
                command: header.command,
                status: header.status,
            });
        }
        let data = encap::find_item(&reply, constant::ITEM_CONNECTED_DATA)?;
        if data.len() < 2 {
            return Err(Error::InvalidResponse {
                reason: "connected data item missing sequence".to_string(),
            });
        }
        Ok(data[2..].to_vec())
    }
}
