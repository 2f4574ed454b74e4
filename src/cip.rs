// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! CIP request paths, reply validation and unconnected-send routing

use super::constant;
use super::encap::put_u16;
use super::error::{self, Error};
use log::warn;

/// Longest accepted tag name in bytes.
pub(crate) const MAX_TAG_LENGTH: usize = 40;

pub(crate) fn logical_path(class: u8, instance: u8) -> [u8; 4] {
    [
        constant::SEGMENT_CLASS,
        class,
        constant::SEGMENT_INSTANCE,
        instance,
    ]
}

/// ANSI extended symbol segment for a tag name, padded to an even length.
pub(crate) fn symbol_path(tag: &str) -> Result<Vec<u8>, Error> {
    if tag.is_empty() || tag.len() > MAX_TAG_LENGTH {
        return Err(Error::Address(format!(
            "tag name length {} out of range",
            tag.len()
        )));
    }
    let bytes = tag.as_bytes();
    let head_ok = bytes[0].is_ascii_alphabetic() || bytes[0] == b'_';
    if !head_ok || !bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_') {
        return Err(Error::Address(format!("malformed tag name {:?}", tag)));
    }
    let mut path = Vec::with_capacity(2 + bytes.len() + 1);
    path.push(constant::SEGMENT_SYMBOL);
    path.push(bytes.len() as u8);
    path.extend_from_slice(bytes);
    if path.len() % 2 != 0 {
        path.push(0);
    }
    Ok(path)
}

/// service code, path size in 16 bit words, path, then the service payload.
pub(crate) fn request(service: u8, path: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + path.len() + payload.len());
    buf.push(service);
    buf.push((path.len() / 2) as u8);
    buf.extend_from_slice(path);
    buf.extend_from_slice(payload);
    buf
}

/// Wraps a CIP request in Unconnected Send so the connection manager
/// routes it to the CPU in `slot` behind the backplane.
pub(crate) fn wrap_unconnected_send(inner: &[u8], slot: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + inner.len());
    buf.push(constant::SERVICE_UNCONNECTED_SEND);
    buf.push(0x02);
    buf.extend_from_slice(&logical_path(constant::CLASS_CONNECTION_MANAGER, 0x01));
    buf.push(constant::ROUTING_PRIORITY_TICK_TIME);
    buf.push(constant::ROUTING_TIMEOUT_TICKS);
    put_u16(&mut buf, inner.len() as u16);
    buf.extend_from_slice(inner);
    if inner.len() % 2 != 0 {
        buf.push(0);
    }
    buf.push(0x01); // route path size in words
    buf.push(0x00); // reserved
    buf.push(constant::SEGMENT_CLASS);
    buf.push(constant::CLASS_MESSAGE_ROUTER);
    buf.push(constant::SEGMENT_INSTANCE);
    buf.push(slot);
    buf
}

/// Validates a CIP reply header against the requested service and returns
/// the offset where the reply data begins.
pub(crate) fn parse_reply_header(reply: &[u8], service: u8) -> Result<usize, Error> {
    if reply.len() < 4 {
        return Err(Error::InvalidResponse {
            reason: format!("CIP reply truncated at {} bytes", reply.len()),
        });
    }
    if reply[0] != (service | constant::SERVICE_REPLY_FLAG) {
        return Err(Error::InvalidResponse {
            reason: format!(
                "unexpected reply service 0x{:02X} for request 0x{:02X}",
                reply[0], service
            ),
        });
    }
    let status = reply[2];
    if status != 0 {
        warn!(
            "CIP status 0x{:02X}: {}",
            status,
            error::cip_status_text(status)
        );
        return Err(Error::Cip { status });
    }
    // extended status size is a word count
    let offset = 4 + reply[3] as usize * 2;
    if offset > reply.len() {
        return Err(Error::InvalidResponse {
            reason: "extended status past end of CIP reply".to_string(),
        });
    }
    Ok(offset)
}

/// Strips the routed-reply wrapper the connection manager puts around a
/// reply that crossed the backplane.
pub(crate) fn unwrap_routed_reply(reply: &[u8]) -> Result<&[u8], Error> {
    let offset = parse_reply_header(reply, constant::SERVICE_UNCONNECTED_SEND)?;
    Ok(&reply[offset..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn symbol_path_pads_to_even() {
        assert_eq!(
            symbol_path("abc").unwrap(),
            vec![0x91, 3, b'a', b'b', b'c', 0]
        );
        assert_eq!(symbol_path("ab").unwrap(), vec![0x91, 2, b'a', b'b']);
        assert_eq!(
            symbol_path("MyTag").unwrap(),
            vec![0x91, 5, b'M', b'y', b'T', b'a', b'g', 0]
        );
    }

    #[test]
    fn symbol_path_rejects_malformed_names() {
        assert!(symbol_path("").is_err());
        assert!(symbol_path(&"x".repeat(41)).is_err());
        assert!(symbol_path("bad tag").is_err());
        assert!(symbol_path("1tag").is_err());
        assert_eq!(
            symbol_path("_ok2").unwrap(),
            vec![0x91, 4, b'_', b'o', b'k', b'2']
        );
    }

    #[test]
    fn request_counts_path_words() {
        let req = request(0x4C, &hex!("91 02 61 62"), &hex!("01 00"));
        assert_eq!(&req[..], &hex!("4c 02 91 02 61 62 01 00")[..]);
    }

    #[test]
    fn unconnected_send_wrapper_layout() {
        let inner = hex!("4c 03 91 04 61 62 63 64 01 00");
        let wrapped = wrap_unconnected_send(&inner, 3);
        assert_eq!(&wrapped[..8], &hex!("52 02 20 06 24 01 0a 05")[..]);
        assert_eq!(wrapped[8] as usize, inner.len());
        assert_eq!(wrapped[9], 0);
        assert_eq!(&wrapped[10..10 + inner.len()], &inner[..]);
        assert_eq!(
            &wrapped[10 + inner.len()..],
            &hex!("01 00 20 02 24 03")[..]
        );
    }

    #[test]
    fn unconnected_send_pads_odd_inner() {
        let inner = hex!("4c 00 01");
        let wrapped = wrap_unconnected_send(&inner, 0);
        assert_eq!(wrapped[10 + inner.len()], 0x00);
        assert_eq!(
            &wrapped[10 + inner.len() + 1..],
            &hex!("01 00 20 02 24 00")[..]
        );
    }

    #[test]
    fn routed_reply_unwrap_skips_extended_status_words() {
        let reply = hex!("d2 00 00 01 34 12 aa bb");
        assert_eq!(unwrap_routed_reply(&reply).unwrap(), &hex!("aa bb")[..]);
    }

    #[test]
    fn routed_reply_surfaces_cip_status() {
        let reply = hex!("d2 00 05 00");
        assert_eq!(
            unwrap_routed_reply(&reply),
            Err(Error::Cip { status: 0x05 })
        );
    }

    #[test]
    fn reply_header_checks_service() {
        assert_eq!(parse_reply_header(&hex!("cc 00 00 00"), 0x4C).unwrap(), 4);
        assert!(parse_reply_header(&hex!("cd 00 00 00"), 0x4C).is_err());
        assert!(parse_reply_header(&hex!("cc 00"), 0x4C).is_err());
        assert!(parse_reply_header(&hex!("cc 00 00 02 00 00"), 0x4C).is_err());
    }
}
