// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Logix tag services and atomic CIP values

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use super::cip;
use super::constant;
use super::encap::put_u16;
use super::error::Error;

/// Atomic CIP data types. The discriminant is the wire type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bool = 0xC1,
    Sint = 0xC2,
    Int = 0xC3,
    Dint = 0xC4,
    Lint = 0xC5,
    Usint = 0xC6,
    Uint = 0xC7,
    Udint = 0xC8,
    Ulint = 0xC9,
    Real = 0xCA,
    Lreal = 0xCB,
}

impl DataType {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<DataType> {
        match code {
            0xC1 => Some(DataType::Bool),
            0xC2 => Some(DataType::Sint),
            0xC3 => Some(DataType::Int),
            0xC4 => Some(DataType::Dint),
            0xC5 => Some(DataType::Lint),
            0xC6 => Some(DataType::Usint),
            0xC7 => Some(DataType::Uint),
            0xC8 => Some(DataType::Udint),
            0xC9 => Some(DataType::Ulint),
            0xCA => Some(DataType::Real),
            0xCB => Some(DataType::Lreal),
            _ => None,
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<DataType> {
        match name.to_ascii_uppercase().as_str() {
            "BOOL" => Some(DataType::Bool),
            "SINT" => Some(DataType::Sint),
            "INT" => Some(DataType::Int),
            "DINT" => Some(DataType::Dint),
            "LINT" => Some(DataType::Lint),
            "USINT" => Some(DataType::Usint),
            "UINT" => Some(DataType::Uint),
            "UDINT" => Some(DataType::Udint),
            "ULINT" => Some(DataType::Ulint),
            "REAL" => Some(DataType::Real),
            "LREAL" => Some(DataType::Lreal),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            DataType::Bool => "BOOL",
            DataType::Sint => "SINT",
            DataType::Int => "INT",
            DataType::Dint => "DINT",
            DataType::Lint => "LINT",
            DataType::Usint => "USINT",
            DataType::Uint => "UINT",
            DataType::Udint => "UDINT",
            DataType::Ulint => "ULINT",
            DataType::Real => "REAL",
            DataType::Lreal => "LREAL",
        }
    }

    /// encoded size in bytes
    pub fn size(self) -> usize {
        match self {
            DataType::Bool | DataType::Sint | DataType::Usint => 1,
            DataType::Int | DataType::Uint => 2,
            DataType::Dint | DataType::Udint | DataType::Real => 4,
            DataType::Lint | DataType::Ulint | DataType::Lreal => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One atomic tag value.
///
/// `From` conversions pick the defaults for untyped writes: plain
/// integers become DINT, floats REAL, booleans BOOL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagValue {
    Bool(bool),
    Sint(i8),
    Int(i16),
    Dint(i32),
    Lint(i64),
    Usint(u8),
    Uint(u16),
    Udint(u32),
    Ulint(u64),
    Real(f32),
    Lreal(f64),
}

impl From<bool> for TagValue {
    fn from(v: bool) -> TagValue {
        TagValue::Bool(v)
    }
}

impl From<i32> for TagValue {
    fn from(v: i32) -> TagValue {
        TagValue::Dint(v)
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> TagValue {
        TagValue::Lint(v)
    }
}

impl From<f32> for TagValue {
    fn from(v: f32) -> TagValue {
        TagValue::Real(v)
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> TagValue {
        TagValue::Lreal(v)
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TagValue::Bool(v) => write!(f, "{}", v),
            TagValue::Sint(v) => write!(f, "{}", v),
            TagValue::Int(v) => write!(f, "{}", v),
            TagValue::Dint(v) => write!(f, "{}", v),
            TagValue::Lint(v) => write!(f, "{}", v),
            TagValue::Usint(v) => write!(f, "{}", v),
            TagValue::Uint(v) => write!(f, "{}", v),
            TagValue::Udint(v) => write!(f, "{}", v),
            TagValue::Ulint(v) => write!(f, "{}", v),
            TagValue::Real(v) => write!(f, "{}", v),
            TagValue::Lreal(v) => write!(f, "{}", v),
        }
    }
}

impl TagValue {
    /// the type this value encodes as when none is forced or detected
    pub fn data_type(&self) -> DataType {
        match self {
            TagValue::Bool(_) => DataType::Bool,
            TagValue::Sint(_) => DataType::Sint,
            TagValue::Int(_) => DataType::Int,
            TagValue::Dint(_) => DataType::Dint,
            TagValue::Lint(_) => DataType::Lint,
            TagValue::Usint(_) => DataType::Usint,
            TagValue::Uint(_) => DataType::Uint,
            TagValue::Udint(_) => DataType::Udint,
            TagValue::Ulint(_) => DataType::Ulint,
            TagValue::Real(_) => DataType::Real,
            TagValue::Lreal(_) => DataType::Lreal,
        }
    }

    fn as_int(&self) -> Option<i128> {
        match self {
            TagValue::Sint(v) => Some(*v as i128),
            TagValue::Int(v) => Some(*v as i128),
            TagValue::Dint(v) => Some(*v as i128),
            TagValue::Lint(v) => Some(*v as i128),
            TagValue::Usint(v) => Some(*v as i128),
            TagValue::Uint(v) => Some(*v as i128),
            TagValue::Udint(v) => Some(*v as i128),
            TagValue::Ulint(v) => Some(*v as i128),
            TagValue::Bool(_) | TagValue::Real(_) | TagValue::Lreal(_) => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            TagValue::Real(v) => Some(*v as f64),
            TagValue::Lreal(v) => Some(*v),
            _ => self.as_int().map(|v| v as f64),
        }
    }

    /// Encodes the value as `data_type`, range checking integer
    /// coercions before anything is transmitted.
    pub fn encode_as(&self, data_type: DataType) -> Result<Vec<u8>, Error> {
        let range_err = || Error::TypeRange {
            value: self.to_string(),
            data_type: data_type.mnemonic(),
        };
        match data_type {
            DataType::Bool => match self {
                TagValue::Bool(v) => Ok(vec![*v as u8]),
                _ => Err(range_err()),
            },
            DataType::Real => {
                let v = self.as_float().ok_or_else(range_err)?;
                let mut buf = vec![0u8; 4];
                LittleEndian::write_f32(&mut buf, v as f32);
                Ok(buf)
            }
            DataType::Lreal => {
                let v = self.as_float().ok_or_else(range_err)?;
                let mut buf = vec![0u8; 8];
                LittleEndian::write_f64(&mut buf, v);
                Ok(buf)
            }
            _ => {
                let v = self.as_int().ok_or_else(range_err)?;
                let (min, max) = int_range(data_type);
                if v < min || v > max {
                    return Err(range_err());
                }
                let mut buf = vec![0u8; data_type.size()];
                match data_type.size() {
                    1 => buf[0] = v as u8,
                    2 => LittleEndian::write_u16(&mut buf, v as u16),
                    4 => LittleEndian::write_u32(&mut buf, v as u32),
                    _ => LittleEndian::write_u64(&mut buf, v as u64),
                }
                Ok(buf)
            }
        }
    }

    /// Decodes `data_type` bytes into the matching variant.
    pub fn decode(data_type: DataType, data: &[u8]) -> Result<TagValue, Error> {
        if data.len() < data_type.size() {
            return Err(Error::InvalidResponse {
                reason: format!(
                    "{} value truncated at {} bytes",
                    data_type,
                    data.len()
                ),
            });
        }
        Ok(match data_type {
            DataType::Bool => TagValue::Bool(data[0] != 0),
            DataType::Sint => TagValue::Sint(data[0] as i8),
            DataType::Int => TagValue::Int(LittleEndian::read_i16(data)),
            DataType::Dint => TagValue::Dint(LittleEndian::read_i32(data)),
            DataType::Lint => TagValue::Lint(LittleEndian::read_i64(data)),
            DataType::Usint => TagValue::Usint(data[0]),
            DataType::Uint => TagValue::Uint(LittleEndian::read_u16(data)),
            DataType::Udint => TagValue::Udint(LittleEndian::read_u32(data)),
            DataType::Ulint => TagValue::Ulint(LittleEndian::read_u64(data)),
            DataType::Real => TagValue::Real(LittleEndian::read_f32(data)),
            DataType::Lreal => TagValue::Lreal(LittleEndian::read_f64(data)),
        })
    }
}

fn int_range(data_type: DataType) -> (i128, i128) {
    match data_type {
        DataType::Sint => (i8::MIN as i128, i8::MAX as i128),
        DataType::Int => (i16::MIN as i128, i16::MAX as i128),
        DataType::Dint => (i32::MIN as i128, i32::MAX as i128),
        DataType::Lint => (i64::MIN as i128, i64::MAX as i128),
        DataType::Usint => (0, u8::MAX as i128),
        DataType::Uint => (0, u16::MAX as i128),
        DataType::Udint => (0, u32::MAX as i128),
        DataType::Ulint => (0, u64::MAX as i128),
        _ => (0, 0),
    }
}

/// Read Tag (0x4C) for `count` elements of `tag`.
pub(crate) fn read_request(tag: &str, count: u16) -> Result<Vec<u8>, Error> {
    let path = cip::symbol_path(tag)?;
    let mut payload = Vec::with_capacity(2);
    put_u16(&mut payload, count);
    Ok(cip::request(constant::SERVICE_READ_TAG, &path, &payload))
}

/// Write Tag (0x4D): type code, element count, then the encoded value.
pub(crate) fn write_request(
    tag: &str,
    data_type: DataType,
    count: u16,
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    let path = cip::symbol_path(tag)?;
    let mut payload = Vec::with_capacity(4 + data.len());
    put_u16(&mut payload, data_type.code());
    put_u16(&mut payload, count);
    payload.extend_from_slice(data);
    Ok(cip::request(constant::SERVICE_WRITE_TAG, &path, &payload))
}

/// Read Tag reply: type code then the value bytes.
pub(crate) fn parse_read_reply(reply: &[u8]) -> Result<(DataType, &[u8]), Error> {
    let offset = cip::parse_reply_header(reply, constant::SERVICE_READ_TAG)?;
    if reply.len() < offset + 2 {
        return Err(Error::InvalidResponse {
            reason: "read tag reply missing type code".to_string(),
        });
    }
    let code = LittleEndian::read_u16(&reply[offset..offset + 2]);
    let data_type = DataType::from_code(code).ok_or_else(|| Error::InvalidResponse {
        reason: format!("unsupported CIP type code 0x{:04X}", code),
    })?;
    Ok((data_type, &reply[offset + 2..]))
}

pub(crate) fn parse_write_reply(reply: &[u8]) -> Result<(), Error> {
    cip::parse_reply_header(reply, constant::SERVICE_WRITE_TAG).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn type_codes_round_trip() {
        for code in 0xC1..=0xCBu16 {
            let data_type = DataType::from_code(code).unwrap();
            assert_eq!(data_type.code(), code);
            assert_eq!(DataType::from_mnemonic(data_type.mnemonic()), Some(data_type));
        }
        assert_eq!(DataType::from_code(0xC0), None);
        assert_eq!(DataType::from_mnemonic("dint"), Some(DataType::Dint));
        assert_eq!(DataType::from_mnemonic("WORD"), None);
    }

    #[test]
    fn untyped_defaults() {
        assert_eq!(TagValue::from(42i32).data_type(), DataType::Dint);
        assert_eq!(TagValue::from(1.5f32).data_type(), DataType::Real);
        assert_eq!(TagValue::from(true).data_type(), DataType::Bool);
    }

    #[test]
    fn read_request_layout() {
        let request = read_request("abc", 1).unwrap();
        assert_eq!(&request[..], &hex!("4c 03 91 03 61 62 63 00 01 00")[..]);
    }

    #[test]
    fn write_request_layout() {
        let data = TagValue::Dint(42).encode_as(DataType::Int).unwrap();
        assert_eq!(data, hex!("2a 00"));
        let request = write_request("MyTag", DataType::Int, 1, &data).unwrap();
        assert_eq!(
            &request[..],
            &hex!("4d 04 91 05 4d 79 54 61 67 00 c3 00 01 00 2a 00")[..]
        );
    }

    #[test]
    fn integer_range_checks() {
        assert!(TagValue::Dint(70_000).encode_as(DataType::Int).is_err());
        assert!(TagValue::Int(-1).encode_as(DataType::Usint).is_err());
        assert!(TagValue::Real(1.5).encode_as(DataType::Dint).is_err());
        assert!(TagValue::Bool(true).encode_as(DataType::Int).is_err());
        assert!(TagValue::Int(1).encode_as(DataType::Bool).is_err());
        assert_eq!(
            TagValue::Int(-2).encode_as(DataType::Dint).unwrap(),
            hex!("fe ff ff ff")
        );
        assert_eq!(
            TagValue::Dint(1).encode_as(DataType::Real).unwrap(),
            hex!("00 00 80 3f")
        );
        assert_eq!(
            TagValue::Bool(true).encode_as(DataType::Bool).unwrap(),
            vec![1]
        );
    }

    #[test]
    fn decode_round_trip() {
        assert_eq!(
            TagValue::decode(DataType::Int, &hex!("2a 00")).unwrap(),
            TagValue::Int(42)
        );
        assert_eq!(
            TagValue::decode(DataType::Dint, &hex!("ff ff ff ff")).unwrap(),
            TagValue::Dint(-1)
        );
        assert_eq!(
            TagValue::decode(DataType::Real, &hex!("00 00 80 3f")).unwrap(),
            TagValue::Real(1.0)
        );
        assert_eq!(
            TagValue::decode(DataType::Bool, &[0x01]).unwrap(),
            TagValue::Bool(true)
        );
        assert!(TagValue::decode(DataType::Dint, &hex!("01 00")).is_err());
    }

    #[test]
    fn read_reply_parsing() {
        let reply = hex!("cc 00 00 00 c3 00 2a 00");
        let (data_type, data) = parse_read_reply(&reply).unwrap();
        assert_eq!(data_type, DataType::Int);
        assert_eq!(data, &hex!("2a 00")[..]);

        assert_eq!(
            parse_read_reply(&hex!("cc 00 04 00")),
            Err(Error::Cip { status: 0x04 })
        );
        assert!(parse_read_reply(&hex!("cc 00 00 00 99 00")).is_err());
    }

    #[test]
    fn write_reply_parsing() {
        assert!(parse_write_reply(&hex!("cd 00 00 00")).is_ok());
        assert_eq!(
            parse_write_reply(&hex!("cd 00 10 00")),
            Err(Error::Cip { status: 0x10 })
        );
    }
}
