// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

// Encapsulation commands
pub const ENCAP_REGISTER_SESSION: u16 = 0x0065;
pub const ENCAP_UNREGISTER_SESSION: u16 = 0x0066;
pub const ENCAP_LIST_IDENTITY: u16 = 0x0063;
pub const ENCAP_SEND_RR_DATA: u16 = 0x006F;
pub const ENCAP_SEND_UNIT_DATA: u16 = 0x0070;

pub const ENCAP_HEADER_SIZE: usize = 24;
pub const PROTOCOL_VERSION: u16 = 1;
pub const DEFAULT_PORT: u16 = 44818;

// Common Packet Format item types
pub const ITEM_NULL_ADDRESS: u16 = 0x0000;
pub const ITEM_CONNECTED_ADDRESS: u16 = 0x00A1;
pub const ITEM_CONNECTED_DATA: u16 = 0x00B1;
pub const ITEM_UNCONNECTED_DATA: u16 = 0x00B2;

// CIP services
pub const SERVICE_FORWARD_OPEN: u8 = 0x54;
pub const SERVICE_FORWARD_CLOSE: u8 = 0x4E;
pub const SERVICE_UNCONNECTED_SEND: u8 = 0x52;
pub const SERVICE_EXECUTE_PCCC: u8 = 0x4B;
pub const SERVICE_READ_TAG: u8 = 0x4C;
pub const SERVICE_WRITE_TAG: u8 = 0x4D;
pub const SERVICE_REPLY_FLAG: u8 = 0x80;

// EPATH segment types
pub const SEGMENT_CLASS: u8 = 0x20;
pub const SEGMENT_INSTANCE: u8 = 0x24;
pub const SEGMENT_SYMBOL: u8 = 0x91;
pub const SEGMENT_CONNECTION_POINT: u8 = 0x2C;

// CIP classes
pub const CLASS_MESSAGE_ROUTER: u8 = 0x02;
pub const CLASS_CONNECTION_MANAGER: u8 = 0x06;
pub const CLASS_PCCC: u8 = 0x67;

// Connection manager parameters (Forward Open / Forward Close)
pub const PRIORITY_TICK_TIME: u8 = 0x0A;
pub const CONNECTION_TIMEOUT_TICKS: u8 = 0xF9;
pub const ROUTING_PRIORITY_TICK_TIME: u8 = 0x0A;
pub const ROUTING_TIMEOUT_TICKS: u8 = 0x05;
pub const CONNECTION_SERIAL: u16 = 0x1971;
pub const VENDOR_ID: u16 = 0x1009;
pub const ORIGINATOR_VENDOR_SERIAL: u32 = 0x1971_1009;
pub const RPI_MICROSECONDS: u32 = 200_000;
pub const CONNECTION_PARAMETERS: u16 = 0x43F4;
pub const TRANSPORT_CLASS_TRIGGER: u8 = 0xA3;

// PCCC framing
pub const PCCC_CMD: u8 = 0x0F;
pub const PCCC_REPLY_CMD: u8 = 0x4F;
pub const PCCC_FNC_READ: u8 = 0xA2; // Protected Typed Logical Read
pub const PCCC_FNC_WRITE: u8 = 0xAB; // Protected Typed Logical Write
pub const PCCC_REQUESTOR_PORT: u8 = 0x09;
pub const PCCC_REQUESTOR_LINK: u8 = 0x10;
pub const PCCC_WRITE_MASK: u16 = 0xFFFF; // write all bits
