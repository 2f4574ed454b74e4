// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! PCCC codec and SLC data-file addressing
//!
//! Commands are carried as Execute PCCC (0x4B) against the PCCC object,
//! the way MicroLogix and SLC-500 controllers expect them over
//! EtherNet/IP.

use std::fmt;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use log::warn;

use super::cip;
use super::constant;
use super::encap::{put_u16, put_u32};
use super::error::{self, Error};

/// SLC data-file types addressable over PCCC.
///
/// The discriminant is the PCCC file type code sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// N files, 16 bit signed integers
    Integer = 0x89,
    /// B files, 16 bit words
    Binary = 0x85,
    /// F files, 32 bit floats
    Float = 0x8A,
    /// T files, timer structures
    Timer = 0x86,
    /// C files, counter structures
    Counter = 0x87,
}

impl FileType {
    pub fn type_code(self) -> u8 {
        self as u8
    }

    /// element width in bytes
    pub fn element_size(self) -> usize {
        match self {
            FileType::Integer | FileType::Binary => 2,
            FileType::Float => 4,
            FileType::Timer | FileType::Counter => 6,
        }
    }

    /// the file number implied by the canonical tag (N7, B3, F8, T4, C5)
    pub fn default_file_number(self) -> u8 {
        match self {
            FileType::Integer => 7,
            FileType::Binary => 3,
            FileType::Float => 8,
            FileType::Timer => 4,
            FileType::Counter => 5,
        }
    }

    pub fn from_letter(letter: char) -> Option<FileType> {
        match letter.to_ascii_uppercase() {
            'N' => Some(FileType::Integer),
            'B' => Some(FileType::Binary),
            'F' => Some(FileType::Float),
            'T' => Some(FileType::Timer),
            'C' => Some(FileType::Counter),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            FileType::Integer => 'N',
            FileType::Binary => 'B',
            FileType::Float => 'F',
            FileType::Timer => 'T',
            FileType::Counter => 'C',
        }
    }
}

/// One SLC data-file location, `N7:0` or `B3:5/3` in display form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlcAddress {
    pub file_type: FileType,
    pub file_number: u8,
    pub element: u16,
    /// bit position inside the element word, 0..=15
    pub bit: Option<u8>,
}

impl SlcAddress {
    pub fn new(file_type: FileType, element: u16) -> SlcAddress {
        SlcAddress {
            file_type,
            file_number: file_type.default_file_number(),
            element,
            bit: None,
        }
    }

    pub fn with_file_number(mut self, file_number: u8) -> SlcAddress {
        self.file_number = file_number;
        self
    }

    pub fn with_bit(mut self, bit: u8) -> Result<SlcAddress, Error> {
        if bit > 15 {
            return Err(Error::Address(format!("bit {} out of range", bit)));
        }
        self.bit = Some(bit);
        Ok(self)
    }
}

impl fmt::Display for SlcAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}:{}",
            self.file_type.letter(),
            self.file_number,
            self.element
        )?;
        if let Some(bit) = self.bit {
            write!(f, "/{}", bit)?;
        }
        Ok(())
    }
}

impl FromStr for SlcAddress {
    type Err = Error;

    /// Parses `<FileType>:<Element>[/<Bit>]`; the file number may be
    /// omitted (`N:0`) and then defaults from the type letter.
    fn from_str(s: &str) -> Result<SlcAddress, Error> {
        let malformed = || Error::Address(format!("malformed address {:?}", s));
        let mut parts = s.splitn(2, ':');
        let file = parts.next().ok_or_else(malformed)?;
        let rest = parts.next().ok_or_else(malformed)?;

        let mut chars = file.chars();
        let letter = chars.next().ok_or_else(malformed)?;
        let file_type = FileType::from_letter(letter)
            .ok_or_else(|| Error::Address(format!("unknown file type in {:?}", s)))?;
        let digits = chars.as_str();
        let file_number = if digits.is_empty() {
            file_type.default_file_number()
        } else {
            digits.parse::<u8>().map_err(|_| malformed())?
        };

        let mut parts = rest.splitn(2, '/');
        let element = parts
            .next()
            .ok_or_else(malformed)?
            .parse::<u16>()
            .map_err(|_| malformed())?;
        let bit = match parts.next() {
            Some(b) => Some(b.parse::<u8>().map_err(|_| malformed())?),
            None => None,
        };

        let address = SlcAddress {
            file_type,
            file_number,
            element,
            bit: None,
        };
        match bit {
            Some(bit) => address.with_bit(bit),
            None => Ok(address),
        }
    }
}

/// A value read from an SLC data file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlcValue {
    Int(i32),
    Real(f32),
}

impl SlcValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            SlcValue::Int(v) => Some(*v),
            SlcValue::Real(_) => None,
        }
    }

    pub fn as_real(&self) -> Option<f32> {
        match self {
            SlcValue::Int(_) => None,
            SlcValue::Real(v) => Some(*v),
        }
    }
}

fn request_prefix(
    serial: u32,
    tns: u16,
    fnc: u8,
    byte_size: u8,
    address: &SlcAddress,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(18);
    // requestor id: length, port, link, originator serial, command
    payload.push(0x07);
    payload.push(constant::PCCC_REQUESTOR_PORT);
    payload.push(constant::PCCC_REQUESTOR_LINK);
    put_u32(&mut payload, serial);
    payload.push(constant::PCCC_CMD);
    put_u16(&mut payload, tns);
    payload.push(0x00); // separator
    payload.push(fnc);
    payload.push(byte_size);
    payload.push(address.file_number);
    payload.push(address.file_type.type_code());
    put_u16(&mut payload, address.element);
    cip::request(
        constant::SERVICE_EXECUTE_PCCC,
        &cip::logical_path(constant::CLASS_PCCC, 0x01),
        &payload,
    )
}

/// Protected Typed Logical Read for `count` elements.
pub(crate) fn read_request(
    serial: u32,
    tns: u16,
    address: &SlcAddress,
    count: u16,
) -> Result<Vec<u8>, Error> {
    let byte_size = address.file_type.element_size() * count as usize;
    if count == 0 || byte_size > u8::MAX as usize {
        return Err(Error::Address(format!(
            "element count {} out of range for {}",
            count, address
        )));
    }
    Ok(request_prefix(
        serial,
        tns,
        constant::PCCC_FNC_READ,
        byte_size as u8,
        address,
    ))
}

/// Protected Typed Logical Write of one word. The mask word precedes the
/// data word; negative values wrap to the unsigned 16 bit representation.
pub(crate) fn write_request(serial: u32, tns: u16, address: &SlcAddress, value: i16) -> Vec<u8> {
    let mut request = request_prefix(
        serial,
        tns,
        constant::PCCC_FNC_WRITE,
        address.file_type.element_size() as u8,
        address,
    );
    put_u16(&mut request, constant::PCCC_WRITE_MASK);
    put_u16(&mut request, value as u16);
    request
}

/// Extracts the PCCC reply data from a CIP reply.
///
/// The requestor id echoed ahead of the reply frame is not guaranteed to
/// match the one we sent, so the reply command byte is located by a scan
/// bounded to the received buffer.
pub(crate) fn parse_reply(reply: &[u8]) -> Result<&[u8], Error> {
    let mut offset = cip::parse_reply_header(reply, constant::SERVICE_EXECUTE_PCCC)?;
    while offset < reply.len() {
        if reply[offset] == constant::PCCC_REPLY_CMD {
            if offset + 4 > reply.len() {
                return Err(Error::InvalidResponse {
                    reason: "PCCC reply truncated after command byte".to_string(),
                });
            }
            // CMD, DST, SRC, STS, then data
            let sts = reply[offset + 3];
            if sts != 0 {
                warn!("PCCC STS 0x{:02X}: {}", sts, error::pccc_status_text(sts));
                return Err(Error::Pccc { sts });
            }
            return Ok(&reply[offset + 4..]);
        }
        offset += 1;
    }
    Err(Error::InvalidResponse {
        reason: "PCCC reply command byte not found".to_string(),
    })
}

/// First word of a reply, for bit extraction and read-modify-write.
pub(crate) fn decode_word(data: &[u8]) -> Result<u16, Error> {
    if data.len() < 2 {
        return Err(Error::InvalidResponse {
            reason: format!("PCCC data truncated at {} bytes", data.len()),
        });
    }
    Ok(LittleEndian::read_u16(&data[..2]))
}

/// Decodes one element. N file words past 32767 reinterpret as negative,
/// F files carry IEEE-754 floats, T and C reads yield the leading word.
pub(crate) fn decode_element(file_type: FileType, data: &[u8]) -> Result<SlcValue, Error> {
    match file_type {
        FileType::Float => {
            if data.len() < 4 {
                return Err(Error::InvalidResponse {
                    reason: format!("float element truncated at {} bytes", data.len()),
                });
            }
            Ok(SlcValue::Real(LittleEndian::read_f32(&data[..4])))
        }
        FileType::Integer => Ok(SlcValue::Int(decode_word(data)? as i16 as i32)),
        FileType::Binary | FileType::Timer | FileType::Counter => {
            Ok(SlcValue::Int(decode_word(data)? as i32))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn parse_address_forms() {
        let address: SlcAddress = "N7:0".parse().unwrap();
        assert_eq!(address, SlcAddress::new(FileType::Integer, 0));

        let address: SlcAddress = "B3:5/3".parse().unwrap();
        assert_eq!(
            address,
            SlcAddress::new(FileType::Binary, 5).with_bit(3).unwrap()
        );

        let address: SlcAddress = "f8:2".parse().unwrap();
        assert_eq!(address, SlcAddress::new(FileType::Float, 2));

        let address: SlcAddress = "N:4".parse().unwrap();
        assert_eq!(address.file_number, 7);

        let address: SlcAddress = "N12:1".parse().unwrap();
        assert_eq!(address.file_number, 12);
    }

    #[test]
    fn parse_address_rejects_malformed() {
        assert!("X9:0".parse::<SlcAddress>().is_err());
        assert!("N7".parse::<SlcAddress>().is_err());
        assert!("N7:".parse::<SlcAddress>().is_err());
        assert!("N7:0/16".parse::<SlcAddress>().is_err());
        assert!("N7:x".parse::<SlcAddress>().is_err());
        assert!("N7:0/".parse::<SlcAddress>().is_err());
        assert!(":0".parse::<SlcAddress>().is_err());
    }

    #[test]
    fn display_round_trip() {
        for text in ["N7:0", "B3:5/3", "F8:2", "C5:1"].iter() {
            let address: SlcAddress = text.parse().unwrap();
            assert_eq!(&address.to_string(), text);
        }
    }

    #[test]
    fn read_request_layout() {
        let address: SlcAddress = "N7:0".parse().unwrap();
        let request = read_request(0x1122_3344, 0x0102, &address, 1).unwrap();
        assert_eq!(
            &request[..],
            &hex!("4b 02 20 67 24 01 07 09 10 44 33 22 11 0f 02 01 00 a2 02 07 89 00 00")[..]
        );
    }

    #[test]
    fn read_request_bounds_element_count() {
        let address: SlcAddress = "N7:0".parse().unwrap();
        assert!(read_request(0, 1, &address, 0).is_err());
        assert!(read_request(0, 1, &address, 200).is_err());
        assert!(read_request(0, 1, &address, 100).is_ok());
    }

    #[test]
    fn write_request_mask_precedes_data() {
        let address: SlcAddress = "B3:0".parse().unwrap();
        let request = write_request(0x1122_3344, 1, &address, 0x0009);
        assert_eq!(request[17], constant::PCCC_FNC_WRITE);
        assert_eq!(&request[request.len() - 4..], &hex!("ff ff 09 00")[..]);
    }

    #[test]
    fn negative_write_wraps_to_unsigned_word() {
        let address: SlcAddress = "N7:0".parse().unwrap();
        let request = write_request(0, 5, &address, -2);
        assert_eq!(&request[request.len() - 4..], &hex!("ff ff fe ff")[..]);
    }

    #[test]
    fn reply_scan_finds_command_byte() {
        // echoed requestor id noise ahead of the CMD/DST/SRC/STS frame
        let reply = hex!("cb 00 00 00 07 09 10 aa bb cc dd 4f 01 02 00 2a 00");
        assert_eq!(parse_reply(&reply).unwrap(), &hex!("2a 00")[..]);
    }

    #[test]
    fn reply_sts_failure() {
        let reply = hex!("cb 00 00 00 4f 01 02 10");
        assert_eq!(parse_reply(&reply), Err(Error::Pccc { sts: 0x10 }));
    }

    #[test]
    fn reply_cip_failure() {
        let reply = hex!("cb 00 05 00");
        assert_eq!(parse_reply(&reply), Err(Error::Cip { status: 0x05 }));
    }

    #[test]
    fn reply_without_command_byte() {
        assert!(parse_reply(&hex!("cb 00 00 00 01 02 03")).is_err());
    }

    #[test]
    fn signed_integer_decoding() {
        assert_eq!(
            decode_element(FileType::Integer, &hex!("ff ff")).unwrap(),
            SlcValue::Int(-1)
        );
        assert_eq!(
            decode_element(FileType::Integer, &hex!("ff 7f")).unwrap(),
            SlcValue::Int(32767)
        );
        assert_eq!(
            decode_element(FileType::Binary, &hex!("ff ff")).unwrap(),
            SlcValue::Int(65535)
        );
        assert_eq!(
            decode_element(FileType::Float, &hex!("00 00 80 3f")).unwrap(),
            SlcValue::Real(1.0)
        );
        assert!(decode_element(FileType::Float, &hex!("00 00")).is_err());
    }
}
