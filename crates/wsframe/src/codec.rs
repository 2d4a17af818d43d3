//! # codec
//!
//! Frame encoding and decoding over complete buffers.
//!
//! This is the lowest layer of the crate: it turns a [`Frame`] into its wire
//! bytes and a buffer holding a whole frame back into a [`Frame`]. It handles
//! the FIN/RSV/opcode byte, the mask bit, the 7-bit length selector with its
//! 16- and 64-bit extensions, the masking key and the payload cipher.
//!
//! Byte streams that deliver frames in pieces are the job of
//! [`StreamReader`](crate::StreamReader), which shares [`FrameHead`] with this
//! module so both paths agree on every header bit.
//!
//! ## What the codec does NOT check
//!
//! - Fragmentation rules (control frames with FIN=0, stray continuations)
//! - Control frame payload limits
//! - Reserved opcodes and RSV bits, which round-trip unchanged
//! - Minimal length encoding on input: a 10-byte payload announced through
//!   the 64-bit field decodes fine and keeps `amount_spec == 127`
//!
//! ```rust
//! use wsframe::{Frame, codec};
//!
//! let wire = codec::encode(&Frame::binary(vec![b'a'; 200]))?;
//! assert_eq!(&wire[..4], &[0x82, 0x7E, 0x00, 0xC8]);
//!
//! let frame = codec::decode(&wire, true)?;
//! assert_eq!(frame.amount_spec(), 126);
//! assert_eq!(frame.amount(), 200);
//! # Ok::<(), wsframe::FrameError>(())
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    FrameError, Result,
    frame::{Frame, MAX_HEAD_SIZE, Mask, OpCode, PayloadLength},
    mask::apply_mask,
};

/// The two fixed header bytes, unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHead {
    pub(crate) fin: bool,
    pub(crate) rsv: [bool; 3],
    pub(crate) opcode: OpCode,
    pub(crate) masked: bool,
    /// The 7-bit length selector.
    pub(crate) spec: u8,
}

impl FrameHead {
    #[inline(always)]
    pub(crate) fn parse(first: u8, second: u8) -> Self {
        Self {
            fin: first & 0b1000_0000 != 0,
            rsv: [
                first & 0b0100_0000 != 0,
                first & 0b0010_0000 != 0,
                first & 0b0001_0000 != 0,
            ],
            opcode: OpCode::from(first & 0b0000_1111),
            masked: second & 0b1000_0000 != 0,
            spec: second & 0b0111_1111,
        }
    }

    /// Width of the extended length field: 0, 2 or 8 bytes.
    #[inline(always)]
    pub(crate) fn extension_width(&self) -> usize {
        PayloadLength::extension_width(self.spec)
    }

    /// Width of the masking key field: 0 or 4 bytes.
    #[inline(always)]
    pub(crate) fn key_width(&self) -> usize {
        if self.masked { 4 } else { 0 }
    }

    /// Resolves the payload length from the extension bytes.
    ///
    /// `ext` must be exactly [`extension_width`](Self::extension_width) bytes.
    #[inline]
    pub(crate) fn payload_length(&self, mut ext: &[u8]) -> PayloadLength {
        let amount = match self.extension_width() {
            0 => u64::from(self.spec),
            2 => u64::from(ext.get_u16()),
            _ => ext.get_u64(),
        };
        PayloadLength {
            spec: self.spec,
            amount,
        }
    }
}

/// Converts a declared payload length to an in-memory size, enforcing an
/// optional limit.
#[inline]
pub(crate) fn payload_size(amount: u64, limit: Option<usize>) -> Result<usize> {
    let size = usize::try_from(amount).map_err(|_| FrameError::PayloadTooLarge {
        amount,
        limit: usize::MAX,
    })?;
    match limit {
        Some(limit) if size > limit => Err(FrameError::PayloadTooLarge { amount, limit }),
        _ => Ok(size),
    }
}

/// Builds the payload of a finished frame, unmasking it if asked to.
///
/// Takes ownership of `body` so the unmasking happens in place.
#[inline]
pub(crate) fn finish_payload(mut body: BytesMut, key: Option<[u8; 4]>, auto_unmask: bool) -> Bytes {
    if let Some(key) = key.filter(|_| auto_unmask) {
        apply_mask(&mut body, key);
    }
    body.freeze()
}

/// Decodes the frame at the start of `data`.
///
/// Bytes after the end of the frame are ignored; use [`decode_prefix`] to
/// learn where the frame ended.
///
/// If the frame is masked and `auto_unmask` is set, the returned payload is
/// plaintext. Otherwise it is returned as found on the wire, and the key is
/// available through [`Frame::mask`].
///
/// # Errors
/// - [`FrameError::TruncatedHeader`] for fewer than 2 header bytes or a
///   missing masking key
/// - [`FrameError::MalformedExtendedLength`] when the 16/64-bit length field
///   is cut short
/// - [`FrameError::TruncatedPayload`] when the payload is cut short
/// - [`FrameError::PayloadTooLarge`] when the declared length does not fit
///   in memory on this platform
pub fn decode(data: &[u8], auto_unmask: bool) -> Result<Frame> {
    decode_prefix(data, auto_unmask).map(|(frame, _)| frame)
}

/// Decodes the frame at the start of `data` and returns it together with the
/// number of bytes it occupied.
///
/// Errors are the same as for [`decode`].
pub fn decode_prefix(data: &[u8], auto_unmask: bool) -> Result<(Frame, usize)> {
    let [first, second, ..] = *data else {
        return Err(FrameError::TruncatedHeader {
            needed: 2,
            available: data.len(),
        });
    };
    let head = FrameHead::parse(first, second);
    let mut offset = 2;

    let width = head.extension_width();
    let ext = data
        .get(offset..offset + width)
        .ok_or(FrameError::MalformedExtendedLength {
            width,
            available: data.len() - offset,
        })?;
    let length = head.payload_length(ext);
    offset += width;

    let key = if head.masked {
        let key = data[offset..]
            .first_chunk::<4>()
            .ok_or(FrameError::TruncatedHeader {
                needed: offset + 4,
                available: data.len(),
            })?;
        offset += 4;
        Some(*key)
    } else {
        None
    };

    let size = payload_size(length.amount, None)?;
    let body = data
        .get(offset..)
        .and_then(|rest| rest.get(..size))
        .ok_or(FrameError::TruncatedPayload {
            expected: length.amount,
            available: data.len() - offset,
        })?;
    let end = offset + size;

    let payload = finish_payload(BytesMut::from(body), key, auto_unmask);

    tracing::trace!(
        opcode = ?head.opcode,
        fin = head.fin,
        amount = length.amount,
        masked = head.masked,
        "decoded frame"
    );

    Ok((
        Frame::from_wire(head.fin, head.rsv, head.opcode, key, length, payload),
        end,
    ))
}

/// Size of the header [`encode`] writes for `frame`, at most [`MAX_HEAD_SIZE`].
#[inline]
fn head_len(frame: &Frame) -> usize {
    let length = PayloadLength::minimal(frame.payload.len());
    let key_width = if matches!(frame.mask, Mask::Key(_)) { 4 } else { 0 };
    let len = 2 + PayloadLength::extension_width(length.spec) + key_width;
    debug_assert!(len <= MAX_HEAD_SIZE);
    len
}

/// Number of bytes [`encode`] produces for `frame`.
pub fn encoded_len(frame: &Frame) -> usize {
    head_len(frame) + frame.payload.len()
}

/// Encodes `frame` into a new buffer.
///
/// The length field always uses the minimal encoding. A frame with
/// [`Mask::Key`](crate::Mask::Key) gets the mask bit, the key and a masked
/// payload; a frame with [`Mask::Absent`](crate::Mask::Absent) is written
/// verbatim.
///
/// # Errors
/// [`FrameError::LengthViolation`] if the mask is not exactly 4 bytes.
pub fn encode(frame: &Frame) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(encoded_len(frame));
    encode_into(frame, &mut dst)?;
    Ok(dst.freeze())
}

/// Appends the wire form of `frame` to `dst`.
///
/// On error nothing has been written to `dst`.
///
/// # Errors
/// [`FrameError::LengthViolation`] if the mask is not exactly 4 bytes.
pub fn encode_into(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let key = frame.mask.key()?;

    let payload_len = frame.payload.len();
    let length = PayloadLength::minimal(payload_len);
    dst.reserve(MAX_HEAD_SIZE + payload_len);

    write_head(frame, key, length, dst);

    let index = dst.len();
    dst.extend_from_slice(&frame.payload);
    if let Some(key) = key {
        apply_mask(&mut dst[index..], key);
    }

    tracing::trace!(
        opcode = ?frame.opcode,
        fin = frame.fin,
        amount = length.amount,
        masked = key.is_some(),
        "encoded frame"
    );

    Ok(())
}

/// Writes the header bytes, extended length and masking key.
#[inline]
fn write_head(frame: &Frame, key: Option<[u8; 4]>, length: PayloadLength, dst: &mut BytesMut) {
    let first_byte = (frame.fin as u8) << 7
        | (frame.rsv1 as u8) << 6
        | (frame.rsv2 as u8) << 5
        | (frame.rsv3 as u8) << 4
        | u8::from(frame.opcode);
    let mask_bit = if key.is_some() { 0x80 } else { 0 };

    dst.put_u8(first_byte);
    dst.put_u8(mask_bit | length.spec);
    match length.spec {
        126 => dst.put_u16(length.amount as u16),
        127 => dst.put_u64(length.amount),
        _ => {}
    }

    if let Some(key) = key {
        dst.put_slice(&key);
    }
}
