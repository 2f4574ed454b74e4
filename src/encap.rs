// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! EtherNet/IP encapsulation header and Common Packet Format codecs

use super::constant;
use super::error::Error;
use byteorder::{ByteOrder, LittleEndian};

pub(crate) fn put_u16(buf: &mut Vec<u8>, value: u16) {
    let mut bytes = [0u8; 2];
    LittleEndian::write_u16(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

pub(crate) fn put_u32(buf: &mut Vec<u8>, value: u32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

/// The 24 byte header leading every encapsulation packet.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub command: u16,
    pub length: u16,
    pub session_handle: u32,
    pub status: u32,
    pub sender_context: [u8; 8],
    pub options: u32,
}

impl Header {
    pub fn new(command: u16, session_handle: u32, sender_context: [u8; 8], length: u16) -> Header {
        Header {
            command,
            length,
            session_handle,
            status: 0,
            sender_context,
            options: 0,
        }
    }

    pub fn encode(&self) -> [u8; constant::ENCAP_HEADER_SIZE] {
        let mut buf = [0u8; constant::ENCAP_HEADER_SIZE];
        LittleEndian::write_u16(&mut buf[0..2], self.command);
        LittleEndian::write_u16(&mut buf[2..4], self.length);
        LittleEndian::write_u32(&mut buf[4..8], self.session_handle);
        LittleEndian::write_u32(&mut buf[8..12], self.status);
        buf[12..20].copy_from_slice(&self.sender_context);
        LittleEndian::write_u32(&mut buf[20..24], self.options);
        buf
    }

    pub fn parse(buf: &[u8]) -> Result<Header, Error> {
        if buf.len() < constant::ENCAP_HEADER_SIZE {
            return Err(Error::InvalidResponse {
                reason: format!("encapsulation header truncated at {} bytes", buf.len()),
            });
        }
        let mut sender_context = [0u8; 8];
        sender_context.copy_from_slice(&buf[12..20]);
        Ok(Header {
            command: LittleEndian::read_u16(&buf[0..2]),
            length: LittleEndian::read_u16(&buf[2..4]),
            session_handle: LittleEndian::read_u32(&buf[4..8]),
            status: LittleEndian::read_u32(&buf[8..12]),
            sender_context,
            options: LittleEndian::read_u32(&buf[20..24]),
        })
    }
}

/// One item of a Common Packet Format list.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Item {
    pub item_type: u16,
    pub offset: usize,
    pub length: usize,
}

/// CPF payload for Send RR Data: a Null Address item followed by an
/// Unconnected Data item carrying the CIP request.
pub(crate) fn rr_payload(cip_data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + cip_data.len());
    put_u32(&mut buf, 0); // interface handle
    put_u16(&mut buf, 0); // timeout
    put_u16(&mut buf, 2); // item count
    put_u16(&mut buf, constant::ITEM_NULL_ADDRESS);
    put_u16(&mut buf, 0);
    put_u16(&mut buf, constant::ITEM_UNCONNECTED_DATA);
    put_u16(&mut buf, cip_data.len() as u16);
    buf.extend_from_slice(cip_data);
    buf
}

/// CPF payload for Send Unit Data: a Connected Address item carrying the
/// O->T connection id and a Connected Data item led by the sequence number.
pub(crate) fn unit_payload(connection_id: u32, sequence: u16, cip_data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(22 + cip_data.len());
    put_u32(&mut buf, 0); // interface handle
    put_u16(&mut buf, 0); // timeout
    put_u16(&mut buf, 2); // item count
    put_u16(&mut buf, constant::ITEM_CONNECTED_ADDRESS);
    put_u16(&mut buf, 4);
    put_u32(&mut buf, connection_id);
    put_u16(&mut buf, constant::ITEM_CONNECTED_DATA);
    put_u16(&mut buf, (cip_data.len() + 2) as u16);
    put_u16(&mut buf, sequence);
    buf.extend_from_slice(cip_data);
    buf
}

pub(crate) fn parse_items(payload: &[u8]) -> Result<Vec<Item>, Error> {
    if payload.len() < 8 {
        return Err(Error::InvalidResponse {
            reason: format!("CPF payload truncated at {} bytes", payload.len()),
        });
    }
    let item_count = LittleEndian::read_u16(&payload[6..8]) as usize;
    let mut items = Vec::with_capacity(item_count);
    let mut offset = 8;
    for _ in 0..item_count {
        if offset + 4 > payload.len() {
            return Err(Error::InvalidResponse {
                reason: "CPF item header past end of payload".to_string(),
            });
        }
        let item_type = LittleEndian::read_u16(&payload[offset..offset + 2]);
        let length = LittleEndian::read_u16(&payload[offset + 2..offset + 4]) as usize;
        offset += 4;
        if offset + length > payload.len() {
            return Err(Error::InvalidResponse {
                reason: "CPF item data past end of payload".to_string(),
            });
        }
        items.push(Item {
            item_type,
            offset,
            length,
        });
        offset += length;
    }
    Ok(items)
}

pub(crate) fn find_item(payload: &[u8], item_type: u16) -> Result<&[u8], Error> {
    for item in parse_items(payload)? {
        if item.item_type == item_type {
            return Ok(&payload[item.offset..item.offset + item.length]);
        }
    }
    Err(Error::InvalidResponse {
        reason: format!("missing CPF item 0x{:04X}", item_type),
    })
}
