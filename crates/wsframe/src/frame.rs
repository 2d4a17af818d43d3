//! # Frame
//!
//! The `frame` module models a single WebSocket frame as defined in
//! [RFC 6455 Section 5.2](https://datatracker.ietf.org/doc/html/rfc6455#section-5.2).
//!
//! ### Frame Binary Format
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |         (16 or 64 bits)       |
//! |N|V|V|V|       |S|             |                               |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |        Extended payload length continued, if payload len == 127|
//! +---------------------------------------------------------------+
//! |                               |   Masking-key, if MASK set to 1|
//! +-------------------------------+-------------------------------+
//! |     Masking-key (continued)       |          Payload Data      |
//! +-----------------------------------+ - - - - - - - - - - - - - -+
//! :                     Payload Data continued ...                :
//! +---------------------------------------------------------------+
//! ```
//!
//! A [`Frame`] is an immutable value. Its header flags and mask are chosen
//! through consuming builders, while the length fields (`amount_spec` and
//! `amount`) are derived: the codec computes them when a frame is built or
//! decoded and callers can only read them.
//!
//! No frame-sequence rules are checked here. Fragmented control frames,
//! oversized control payloads, reserved opcodes and set RSV bits are all
//! representable, and they round-trip through the codec unchanged.
//!
//! ```rust
//! use wsframe::{Frame, Mask, OpCode};
//!
//! let frame = Frame::new("Hello", OpCode::Text).with_mask([1, 2, 3, 4]);
//! assert_eq!(frame.mask(), &Mask::Key([1, 2, 3, 4]));
//! assert_eq!(frame.amount(), 5);
//! ```

use bytes::Bytes;

use crate::{FrameError, Result, close::CloseCode, mask::apply_mask};

/// Largest payload length that fits the inline 7-bit length field.
pub const MAX_INLINE_LEN: u64 = 125;

/// Largest payload length that fits the 16-bit extended length field.
pub const MAX_EXTENDED16_LEN: u64 = 65_535;

/// Upper bound of a frame header: 2 fixed bytes, 8 extended length bytes and
/// a 4-byte masking key.
pub const MAX_HEAD_SIZE: usize = 14;

/// WebSocket operation code, the low nibble of the first header byte.
///
/// The six opcodes assigned by [RFC 6455, Section 11.8](https://datatracker.ietf.org/doc/html/rfc6455#section-11.8)
/// have their own variants. Values 0x3-0x7 and 0xB-0xF are kept as
/// [`OpCode::Reserved`] so that they survive a decode/encode cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    /// An unassigned opcode. Only the low 4 bits are meaningful.
    Reserved(u8),
}

impl OpCode {
    /// Returns `true` for opcodes in the control range (0x8-0xF).
    pub fn is_control(&self) -> bool {
        u8::from(*self) & 0x08 != 0
    }

    /// Returns `true` for opcodes that RFC 6455 leaves unassigned.
    pub fn is_reserved(&self) -> bool {
        matches!(self, OpCode::Reserved(_))
    }
}

impl From<u8> for OpCode {
    /// Interprets the low 4 bits of `value`.
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            other => Self::Reserved(other),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(val: OpCode) -> Self {
        match val {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
            OpCode::Reserved(value) => value & 0x0F,
        }
    }
}

/// The masking key attached to a frame.
///
/// A key of the wrong length is representable so that the error surfaces at
/// encode or mask time, as [`FrameError::LengthViolation`], instead of at
/// construction. An empty key is `Malformed`, never a synonym for `Absent`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mask {
    /// The payload is not masked.
    #[default]
    Absent,
    /// A valid 4-byte masking key.
    Key([u8; 4]),
    /// A key of any length other than 4.
    Malformed(Bytes),
}

impl Mask {
    /// Classifies raw key bytes.
    pub fn from_bytes(key: &[u8]) -> Self {
        match *key {
            [a, b, c, d] => Mask::Key([a, b, c, d]),
            _ => Mask::Malformed(Bytes::copy_from_slice(key)),
        }
    }

    /// Returns the key to mask with, or `None` when the payload is unmasked.
    ///
    /// # Errors
    /// [`FrameError::LengthViolation`] if the key is not exactly 4 bytes.
    pub fn key(&self) -> Result<Option<[u8; 4]>> {
        match self {
            Mask::Absent => Ok(None),
            Mask::Key(key) => Ok(Some(*key)),
            Mask::Malformed(bytes) => Err(FrameError::LengthViolation(bytes.len())),
        }
    }

    /// Returns `true` unless the mask is [`Mask::Absent`].
    pub fn is_present(&self) -> bool {
        !matches!(self, Mask::Absent)
    }
}

impl From<[u8; 4]> for Mask {
    fn from(key: [u8; 4]) -> Self {
        Mask::Key(key)
    }
}

impl From<&[u8]> for Mask {
    fn from(key: &[u8]) -> Self {
        Mask::from_bytes(key)
    }
}

impl From<Option<[u8; 4]>> for Mask {
    fn from(key: Option<[u8; 4]>) -> Self {
        key.map_or(Mask::Absent, Mask::Key)
    }
}

/// The 7-bit length selector and the payload length it stands for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct PayloadLength {
    pub(crate) spec: u8,
    pub(crate) amount: u64,
}

impl PayloadLength {
    /// Minimal encoding for a payload of `len` bytes.
    #[inline]
    pub(crate) fn minimal(len: usize) -> Self {
        let amount = len as u64;
        let spec = if amount <= MAX_INLINE_LEN {
            amount as u8
        } else if amount <= MAX_EXTENDED16_LEN {
            126
        } else {
            127
        };
        Self { spec, amount }
    }

    /// Number of extended length bytes that follow the fixed header.
    #[inline]
    pub(crate) fn extension_width(spec: u8) -> usize {
        match spec {
            126 => 2,
            127 => 8,
            _ => 0,
        }
    }
}

/// A single WebSocket frame.
///
/// # Fields
/// - `payload`: frame data. For a frame decoded without unmasking this is the
///   masked wire form.
/// - `opcode`: frame type.
/// - `mask`: masking key, see [`Mask`].
/// - `fin`, `rsv1`, `rsv2`, `rsv3`: header flag bits.
/// - `amount_spec`, `amount`: derived length fields, read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Frame {
    pub(crate) payload: Bytes,
    pub(crate) opcode: OpCode,
    pub(crate) mask: Mask,
    pub(crate) fin: bool,
    pub(crate) rsv1: bool,
    pub(crate) rsv2: bool,
    pub(crate) rsv3: bool,
    pub(crate) length: PayloadLength,
}

impl Frame {
    /// Creates a final, unmasked frame with all RSV bits clear.
    ///
    /// Use the `with_*` builders to change flags or attach a masking key, or
    /// the helpers in [`crate::factory`] for the standard message kinds.
    pub fn new(payload: impl Into<Bytes>, opcode: OpCode) -> Self {
        let payload = payload.into();
        let length = PayloadLength::minimal(payload.len());
        Self {
            payload,
            opcode,
            mask: Mask::Absent,
            fin: true,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            length,
        }
    }

    /// Reassembles a frame read from the wire, keeping the observed selector.
    pub(crate) fn from_wire(
        fin: bool,
        rsv: [bool; 3],
        opcode: OpCode,
        mask: Option<[u8; 4]>,
        length: PayloadLength,
        payload: Bytes,
    ) -> Self {
        debug_assert_eq!(length.amount, payload.len() as u64);
        Self {
            payload,
            opcode,
            mask: mask.into(),
            fin,
            rsv1: rsv[0],
            rsv2: rsv[1],
            rsv3: rsv[2],
            length,
        }
    }

    /// Sets the FIN bit.
    pub fn with_fin(mut self, fin: bool) -> Self {
        self.fin = fin;
        self
    }

    /// Sets the RSV1 bit.
    pub fn with_rsv1(mut self, rsv1: bool) -> Self {
        self.rsv1 = rsv1;
        self
    }

    /// Sets the RSV2 bit.
    pub fn with_rsv2(mut self, rsv2: bool) -> Self {
        self.rsv2 = rsv2;
        self
    }

    /// Sets the RSV3 bit.
    pub fn with_rsv3(mut self, rsv3: bool) -> Self {
        self.rsv3 = rsv3;
        self
    }

    /// Attaches a masking key.
    ///
    /// Any key is accepted here. A key that is not 4 bytes long makes
    /// [`encode`](crate::codec::encode) and [`Frame::masked_payload`] fail.
    ///
    /// ```rust
    /// use wsframe::{Frame, FrameError, Mask, OpCode, codec};
    ///
    /// let frame = Frame::new("12", OpCode::Text).with_mask(Mask::from_bytes(b"123"));
    /// assert!(matches!(codec::encode(&frame), Err(FrameError::LengthViolation(3))));
    /// ```
    pub fn with_mask(mut self, mask: impl Into<Mask>) -> Self {
        self.mask = mask.into();
        self
    }

    /// Attaches a randomly generated masking key.
    pub fn with_random_mask(mut self) -> Self {
        self.mask = Mask::Key(rand::random());
        self
    }

    /// Removes the masking key without touching the payload.
    pub fn without_mask(mut self) -> Self {
        self.mask = Mask::Absent;
        self
    }

    #[inline(always)]
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    #[inline(always)]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[inline(always)]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Consumes the frame and returns its opcode, FIN bit and payload.
    #[inline(always)]
    pub fn into_parts(self) -> (OpCode, bool, Bytes) {
        (self.opcode, self.fin, self.payload)
    }

    #[inline(always)]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    #[inline(always)]
    pub fn is_fin(&self) -> bool {
        self.fin
    }

    #[inline(always)]
    pub fn rsv1(&self) -> bool {
        self.rsv1
    }

    #[inline(always)]
    pub fn rsv2(&self) -> bool {
        self.rsv2
    }

    #[inline(always)]
    pub fn rsv3(&self) -> bool {
        self.rsv3
    }

    /// The 7-bit length selector: the payload length itself up to 125, or
    /// 126/127 when a 16/64-bit extended length field is used.
    ///
    /// For a decoded frame this is the selector found on the wire, which may
    /// be wider than necessary.
    #[inline(always)]
    pub fn amount_spec(&self) -> u8 {
        self.length.spec
    }

    /// Total payload length. Always equal to `payload().len()`.
    #[inline(always)]
    pub fn amount(&self) -> u64 {
        self.length.amount
    }

    /// Applies the frame's mask to its payload and returns the result.
    ///
    /// This masks a plaintext payload and unmasks a wire-masked one. A frame
    /// without a mask returns its payload unchanged.
    ///
    /// # Errors
    /// [`FrameError::LengthViolation`] if the mask is not exactly 4 bytes.
    pub fn masked_payload(&self) -> Result<Bytes> {
        let Some(key) = self.mask.key()? else {
            return Ok(self.payload.clone());
        };
        let mut out = bytes::BytesMut::from(&self.payload[..]);
        apply_mask(&mut out, key);
        Ok(out.freeze())
    }

    /// Checks if the frame payload is valid UTF-8.
    #[inline(always)]
    pub fn is_utf8(&self) -> bool {
        std::str::from_utf8(&self.payload).is_ok()
    }

    /// Returns the payload as a string slice.
    ///
    /// # Errors
    /// Returns `Utf8Error` if the payload is not valid UTF-8.
    #[inline]
    pub fn as_str(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }

    /// Extracts the status code from a close payload.
    ///
    /// Returns `None` if the payload is shorter than two bytes. The opcode is
    /// not checked.
    pub fn close_code(&self) -> Option<CloseCode> {
        crate::close::split_close_payload(&self.payload).map(|(code, _)| code)
    }

    /// Returns the reason bytes that follow the status code of a close
    /// payload, or `None` if there is no status code.
    pub fn close_reason(&self) -> Option<&[u8]> {
        crate::close::split_close_payload(&self.payload).map(|(_, reason)| reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod opcode_tests {
        use super::*;

        #[test]
        fn test_is_control() {
            assert!(OpCode::Close.is_control());
            assert!(OpCode::Ping.is_control());
            assert!(OpCode::Pong.is_control());
            assert!(OpCode::Reserved(0xB).is_control());

            assert!(!OpCode::Continuation.is_control());
            assert!(!OpCode::Text.is_control());
            assert!(!OpCode::Binary.is_control());
            assert!(!OpCode::Reserved(0x3).is_control());
        }

        #[test]
        fn test_from_u8_assigned() {
            assert_eq!(OpCode::from(0x0), OpCode::Continuation);
            assert_eq!(OpCode::from(0x1), OpCode::Text);
            assert_eq!(OpCode::from(0x2), OpCode::Binary);
            assert_eq!(OpCode::from(0x8), OpCode::Close);
            assert_eq!(OpCode::from(0x9), OpCode::Ping);
            assert_eq!(OpCode::from(0xA), OpCode::Pong);
        }

        #[test]
        fn test_reserved_round_trip() {
            for code in [0x3, 0x4, 0x5, 0x6, 0x7, 0xB, 0xC, 0xD, 0xE, 0xF] {
                let opcode = OpCode::from(code);
                assert!(opcode.is_reserved());
                assert_eq!(u8::from(opcode), code);
            }
        }

        #[test]
        fn test_from_u8_ignores_high_bits() {
            assert_eq!(OpCode::from(0x81), OpCode::Text);
            assert_eq!(OpCode::from(0xF9), OpCode::Ping);
        }
    }

    mod mask_tests {
        use super::*;

        #[test]
        fn test_from_bytes() {
            assert_eq!(Mask::from_bytes(b"\x01\x02\x03\x04"), Mask::Key([1, 2, 3, 4]));
            assert!(matches!(Mask::from_bytes(b""), Mask::Malformed(b) if b.is_empty()));
            assert!(matches!(Mask::from_bytes(b"12345"), Mask::Malformed(b) if b.len() == 5));
        }

        #[test]
        fn test_key() {
            assert_eq!(Mask::Absent.key().unwrap(), None);
            assert_eq!(Mask::Key([9; 4]).key().unwrap(), Some([9; 4]));
            assert!(matches!(
                Mask::from_bytes(b"123").key(),
                Err(FrameError::LengthViolation(3))
            ));
        }

        #[test]
        fn test_empty_key_is_not_absent() {
            let mask = Mask::from_bytes(&[]);
            assert!(mask.is_present());
            assert!(matches!(mask.key(), Err(FrameError::LengthViolation(0))));
        }
    }

    mod frame_tests {
        use super::*;

        #[test]
        fn test_frame_new_defaults() {
            let frame = Frame::new("Hello, WebSocket!", OpCode::Text);

            assert_eq!(frame.payload().as_ref(), b"Hello, WebSocket!");
            assert_eq!(frame.opcode(), OpCode::Text);
            assert!(frame.is_fin());
            assert!(!frame.rsv1());
            assert!(!frame.rsv2());
            assert!(!frame.rsv3());
            assert_eq!(frame.mask(), &Mask::Absent);
        }

        #[test]
        fn test_derived_length() {
            assert_eq!(Frame::new(vec![0u8; 0], OpCode::Binary).amount_spec(), 0);
            assert_eq!(Frame::new(vec![0u8; 125], OpCode::Binary).amount_spec(), 125);
            assert_eq!(Frame::new(vec![0u8; 126], OpCode::Binary).amount_spec(), 126);
            assert_eq!(Frame::new(vec![0u8; 65_535], OpCode::Binary).amount_spec(), 126);

            let large = Frame::new(vec![0u8; 65_536], OpCode::Binary);
            assert_eq!(large.amount_spec(), 127);
            assert_eq!(large.amount(), 65_536);
        }

        #[test]
        fn test_builders() {
            let frame = Frame::new("x", OpCode::Binary)
                .with_fin(false)
                .with_rsv1(true)
                .with_rsv2(true)
                .with_rsv3(true)
                .with_mask([1, 2, 3, 4]);

            assert!(!frame.is_fin());
            assert!(frame.rsv1() && frame.rsv2() && frame.rsv3());
            assert_eq!(frame.mask(), &Mask::Key([1, 2, 3, 4]));
            assert_eq!(frame.without_mask().mask(), &Mask::Absent);
        }

        #[test]
        fn test_random_mask_is_present() {
            let frame = Frame::new("x", OpCode::Text).with_random_mask();
            assert!(matches!(frame.mask(), Mask::Key(_)));
        }

        #[test]
        fn test_masked_payload() {
            let payload = b"Hello, WebSocket!";
            let frame = Frame::new(&payload[..], OpCode::Text).with_mask([1, 2, 3, 4]);

            let masked = frame.masked_payload().unwrap();
            assert_ne!(masked.as_ref(), payload);

            let restored = Frame::new(masked, OpCode::Text)
                .with_mask([1, 2, 3, 4])
                .masked_payload()
                .unwrap();
            assert_eq!(restored.as_ref(), payload);
        }

        #[test]
        fn test_masked_payload_without_mask_is_identity() {
            let frame = Frame::new("plain", OpCode::Text);
            assert_eq!(frame.masked_payload().unwrap().as_ref(), b"plain");
        }

        #[test]
        fn test_masked_payload_rejects_bad_key() {
            for key in [&b"123"[..], &b"12345"[..]] {
                let frame = Frame::new("12", OpCode::Text).with_mask(key);
                assert!(matches!(
                    frame.masked_payload(),
                    Err(FrameError::LengthViolation(len)) if len == key.len()
                ));
            }
        }

        #[test]
        fn test_as_str_and_utf8() {
            assert_eq!(Frame::new("Hello, 世界", OpCode::Text).as_str().unwrap(), "Hello, 世界");
            let invalid = Frame::new(vec![0xFF, 0xFE, 0xFD], OpCode::Binary);
            assert!(!invalid.is_utf8());
            assert!(invalid.as_str().is_err());
        }

        #[test]
        fn test_into_parts() {
            let (opcode, fin, payload) = Frame::new("part", OpCode::Binary)
                .with_fin(false)
                .into_parts();
            assert_eq!(opcode, OpCode::Binary);
            assert!(!fin);
            assert_eq!(payload, Bytes::from_static(b"part"));
        }
    }
}
