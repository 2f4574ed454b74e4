// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

use std::io::{Error as IOError, ErrorKind};
use thiserror::Error;

/// Error types returned by this crate.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// TCP connect phase failure.
    #[error("connection error: {0}")]
    Connect(String),

    /// Socket send/receive failure or timeout. The session is invalidated
    /// and the caller has to reconnect.
    #[error("i/o error: {0:?}")]
    Io(ErrorKind),

    /// Unexpected command or status in an encapsulation reply.
    #[error("encapsulation error: command 0x{command:04X} status 0x{status:08X}")]
    Encap { command: u16, status: u32 },

    /// CIP general status other than success. The session stays usable.
    #[error("CIP error: status 0x{status:02X}")]
    Cip { status: u8 },

    /// PCCC status byte other than success. The session stays usable.
    #[error("PCCC error: STS 0x{sts:02X}")]
    Pccc { sts: u8 },

    /// Value does not fit the forced or detected CIP type. Nothing was sent.
    #[error("value {value} out of range for {data_type}")]
    TypeRange {
        value: String,
        data_type: &'static str,
    },

    /// Unknown file type or malformed address or tag. Nothing was sent.
    #[error("invalid address: {0}")]
    Address(String),

    /// Operation attempted without an established connection.
    #[error("not connected")]
    NotConnected,

    /// Reply bytes that do not parse as the protocol requires.
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl From<IOError> for Error {
    fn from(e: IOError) -> Self {
        Error::Io(e.kind())
    }
}

/// CIP general status code text (CIP Vol 1, appendix B)
pub fn cip_status_text(status: u8) -> &'static str {
    match status {
        0x00 => "success",
        0x01 => "connection failure",
        0x02 => "resource unavailable",
        0x03 => "invalid parameter value",
        0x04 => "path segment error",
        0x05 => "path destination unknown",
        0x06 => "partial transfer",
        0x07 => "connection lost",
        0x08 => "service not supported",
        0x09 => "invalid attribute value",
        0x0A => "attribute list error",
        0x0B => "already in requested mode or state",
        0x0C => "object state conflict",
        0x0D => "object already exists",
        0x0E => "attribute not settable",
        0x0F => "privilege violation",
        0x10 => "device state conflict",
        0x11 => "reply data too large",
        0x13 => "not enough data",
        0x14 => "attribute not supported",
        0x15 => "too much data",
        0x1A => "bridge request too large",
        0x1C => "attribute list shortage",
        0x26 => "invalid path size",
        _ => "unknown status",
    }
}

/// PCCC STS code text (DF1 protocol manual)
pub fn pccc_status_text(sts: u8) -> &'static str {
    match sts {
        0x00 => "success",
        0x10 => "illegal command or format",
        0x20 => "host has a problem and will not communicate",
        0x30 => "remote node host is missing, disconnected or shut down",
        0x40 => "host could not complete function due to hardware fault",
        0x50 => "addressing problem or memory protect rungs",
        0x60 => "function not allowed due to command protection selection",
        0x70 => "processor is in program mode",
        0x80 => "compatibility mode file missing or communication zone problem",
        0x90 => "remote node cannot buffer command",
        0xB0 => "remote node problem due to download",
        0xC0 => "cannot execute command due to active IPBs",
        0xF0 => "error code in the EXT STS byte",
        _ => "unknown STS",
    }
}
