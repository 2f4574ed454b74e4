// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Transport definition for PLC drivers

use super::error::Error;
use std::time::Duration;

/// an abstract request/reply exchange used by the session layer
/// ## How can I implement `Transport`?
///
/// Types that are [`Transport`] must return one complete encapsulation
/// packet per request: the 24 byte header followed by exactly the number
/// of payload bytes its length field announces.
pub trait Transport {
    /// send a request to the plc and receive the reply within the
    /// configured default timeout.
    fn send(&mut self, request: &[u8]) -> Result<Vec<u8>, Error>;

    /// like [`Transport::send`] but with an explicit reply deadline, used
    /// for the slow connection manager services.
    fn send_with_timeout(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, Error>;

    /// fire and forget write for teardown commands that get no reply.
    fn send_noreply(&mut self, request: &[u8]) -> Result<(), Error>;
}
