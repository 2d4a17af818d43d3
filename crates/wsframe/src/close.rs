// This code is sourced primarily from the tungstenite-rs library, which can be found at:
// https://github.com/snapview/tungstenite-rs/blob/42b8797e8b7f39efb7d9322dc8af3e9089db4f7d/src/protocol/frame/coding.rs#L117
//
// Original contributions by:
// Copyright (c) 2017 Alexey Galakhov
// Copyright (c) 2016 Jason Housley
// Licensed under both MIT and Apache 2.0 licenses
//
// Modifications made by:
// Copyright 2023 Divy Srivastava <dj.srivastava23@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// You may obtain a copy of the License at:
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is provided "AS IS", WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. See the License for specific language governing permissions and limitations.
//

use bytes::{BufMut, Bytes, BytesMut};

use self::CloseCode::*;

/// Longest close reason that fits a control frame: 125 payload bytes minus
/// the 2-byte status code.
pub const MAX_REASON_LEN: usize = 123;

/// Status codes carried in the payload of a close frame.
///
/// Every `u16` converts to a `CloseCode` and back without loss; codes without
/// a registered meaning land in one of the range variants.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub enum CloseCode {
    /// 1000: the purpose for which the connection was established has been fulfilled.
    Normal,
    /// 1001: the endpoint is going away, e.g. server shutdown or page navigation.
    Away,
    /// 1002: the peer violated the protocol.
    Protocol,
    /// 1003: the endpoint received a type of data it cannot accept.
    Unsupported,
    /// 1005: no status code was present. Never sent on the wire.
    Status,
    /// 1006: the connection dropped without a close frame. Never sent on the wire.
    Abnormal,
    /// 1007: message data was inconsistent with its type, e.g. non UTF-8 text.
    Invalid,
    /// 1008: generic policy violation.
    Policy,
    /// 1009: a message was too big to process.
    Size,
    /// 1010: the client expected an extension the server did not negotiate.
    Extension,
    /// 1011: the server hit an unexpected condition.
    Error,
    /// 1012: the server is restarting.
    Restart,
    /// 1013: the server is overloaded, try again later.
    Again,
    /// 1014: a gateway or proxy received an invalid upstream response.
    BadGateway,
    /// 1015: TLS handshake failure. Never sent on the wire.
    Tls,
    /// 3000: the request lacked valid authentication.
    Unauthorized,
    /// 3003: the request was authenticated but not permitted.
    Forbidden,
    /// 3008: the request timed out.
    Timeout,
    /// 1004 and 1016-2999, reserved for future protocol use.
    Reserved(u16),
    /// 3000-3999 without a dedicated variant, registered with IANA.
    Iana(u16),
    /// 4000-4999, free for private use by applications.
    Library(u16),
    /// 0-999 and 5000 and above.
    Bad(u16),
}

impl CloseCode {
    /// Check if an endpoint may send this code in a close frame.
    pub fn is_allowed(self) -> bool {
        !matches!(self, Bad(_) | Reserved(_) | Status | Abnormal | Tls)
    }

    /// Builds a close payload: the 2-byte big-endian code followed by at most
    /// [`MAX_REASON_LEN`] bytes of `reason`.
    ///
    /// Longer reasons are cut at the byte limit, which can split a multi-byte
    /// UTF-8 sequence.
    ///
    /// ```rust
    /// use wsframe::CloseCode;
    ///
    /// let payload = CloseCode::Normal.to_payload(b"Goodbye!");
    /// assert_eq!(&payload[..2], &[0x03, 0xE8]);
    /// assert_eq!(&payload[2..], b"Goodbye!");
    /// ```
    pub fn to_payload(self, reason: impl AsRef<[u8]>) -> Bytes {
        let reason = reason.as_ref();
        let reason = &reason[..reason.len().min(MAX_REASON_LEN)];

        let mut payload = BytesMut::with_capacity(2 + reason.len());
        payload.put_u16(self.into());
        payload.put_slice(reason);
        payload.freeze()
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> CloseCode {
        match code {
            1000 => Normal,
            1001 => Away,
            1002 => Protocol,
            1003 => Unsupported,
            1005 => Status,
            1006 => Abnormal,
            1007 => Invalid,
            1008 => Policy,
            1009 => Size,
            1010 => Extension,
            1011 => Error,
            1012 => Restart,
            1013 => Again,
            1014 => BadGateway,
            1015 => Tls,
            3000 => Unauthorized,
            3003 => Forbidden,
            3008 => Timeout,
            1004 | 1016..=2999 => Reserved(code),
            3001..=3999 => Iana(code),
            4000..=4999 => Library(code),
            _ => Bad(code),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> u16 {
        match code {
            Normal => 1000,
            Away => 1001,
            Protocol => 1002,
            Unsupported => 1003,
            Status => 1005,
            Abnormal => 1006,
            Invalid => 1007,
            Policy => 1008,
            Size => 1009,
            Extension => 1010,
            Error => 1011,
            Restart => 1012,
            Again => 1013,
            BadGateway => 1014,
            Tls => 1015,
            Unauthorized => 3000,
            Forbidden => 3003,
            Timeout => 3008,
            Reserved(code) => code,
            Iana(code) => code,
            Library(code) => code,
            Bad(code) => code,
        }
    }
}

/// Splits a close payload into its status code and reason bytes.
///
/// Returns `None` when the payload is too short to hold a status code.
pub fn split_close_payload(payload: &[u8]) -> Option<(CloseCode, &[u8])> {
    let (code, reason) = payload.split_first_chunk::<2>()?;
    Some((CloseCode::from(u16::from_be_bytes(*code)), reason))
}
