//! Constructors for the standard frame kinds.
//!
//! Data frames come in two flavours: a whole message in a single frame, or one
//! piece of a message split across several frames. [`Fragment`] names the
//! position of a piece:
//!
//! | role       | opcode       | FIN |
//! |------------|--------------|-----|
//! | (none)     | Text/Binary  | 1   |
//! | `First`    | Text/Binary  | 0   |
//! | `Continue` | Continuation | 0   |
//! | `Final`    | Continuation | 1   |
//!
//! ```rust
//! use wsframe::{Fragment, Frame, OpCode};
//!
//! let parts = [
//!     Frame::text_fragment("Hel", Fragment::First),
//!     Frame::text_fragment("lo", Fragment::Continue),
//!     Frame::text_fragment("!", Fragment::Final),
//! ];
//! assert_eq!(parts[0].opcode(), OpCode::Text);
//! assert_eq!(parts[1].opcode(), OpCode::Continuation);
//! assert!(parts[2].is_fin());
//! ```
//!
//! All constructors produce unmasked frames; chain
//! [`with_mask`](Frame::with_mask) or [`with_random_mask`](Frame::with_random_mask)
//! on the client side.

use bytes::Bytes;

use crate::{CloseCode, Frame, OpCode};

/// Position of a frame within a fragmented message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Opens the message and carries its real opcode.
    First,
    /// A middle piece.
    Continue,
    /// Closes the message.
    Final,
}

impl Fragment {
    /// Opcode and FIN bit for a fragment of a message of type `opcode`.
    fn header(self, opcode: OpCode) -> (OpCode, bool) {
        match self {
            Fragment::First => (opcode, false),
            Fragment::Continue => (OpCode::Continuation, false),
            Fragment::Final => (OpCode::Continuation, true),
        }
    }
}

impl Frame {
    /// A complete text message in one frame.
    ///
    /// The payload is not checked for UTF-8.
    pub fn text(message: impl Into<Bytes>) -> Self {
        Self::new(message, OpCode::Text)
    }

    /// One fragment of a text message.
    pub fn text_fragment(message: impl Into<Bytes>, fragment: Fragment) -> Self {
        Self::fragment(message, OpCode::Text, fragment)
    }

    /// A complete binary message in one frame.
    pub fn binary(message: impl Into<Bytes>) -> Self {
        Self::new(message, OpCode::Binary)
    }

    /// One fragment of a binary message.
    pub fn binary_fragment(message: impl Into<Bytes>, fragment: Fragment) -> Self {
        Self::fragment(message, OpCode::Binary, fragment)
    }

    /// A ping with an empty payload.
    pub fn ping() -> Self {
        Self::new(Bytes::new(), OpCode::Ping)
    }

    /// A pong with an empty payload.
    pub fn pong() -> Self {
        Self::new(Bytes::new(), OpCode::Pong)
    }

    /// A close frame carrying `code` and up to 123 bytes of `reason`.
    ///
    /// Longer reasons are truncated so the payload never exceeds the 125-byte
    /// control frame limit.
    ///
    /// ```rust
    /// use wsframe::{CloseCode, Frame};
    ///
    /// let frame = Frame::close(CloseCode::Normal, b"Goodbye!");
    /// assert_eq!(frame.close_code(), Some(CloseCode::Normal));
    /// assert_eq!(frame.close_reason(), Some(&b"Goodbye!"[..]));
    /// ```
    pub fn close(code: CloseCode, reason: impl AsRef<[u8]>) -> Self {
        Self::new(code.to_payload(reason), OpCode::Close)
    }

    fn fragment(message: impl Into<Bytes>, opcode: OpCode, fragment: Fragment) -> Self {
        let (opcode, fin) = fragment.header(opcode);
        Self::new(message, opcode).with_fin(fin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mask, codec};

    #[test]
    fn test_unfragmented() {
        let text = Frame::text("Hello, World!");
        assert_eq!(text.opcode(), OpCode::Text);
        assert!(text.is_fin());
        assert_eq!(text.mask(), &Mask::Absent);

        let binary = Frame::binary(vec![1, 2, 3]);
        assert_eq!(binary.opcode(), OpCode::Binary);
        assert!(binary.is_fin());
    }

    #[test]
    fn test_fragment_roles() {
        for opcode in [OpCode::Text, OpCode::Binary] {
            let make = |message: &'static str, fragment: Fragment| match opcode {
                OpCode::Text => Frame::text_fragment(message, fragment),
                _ => Frame::binary_fragment(message, fragment),
            };

            let first = make("a", Fragment::First);
            assert_eq!((first.opcode(), first.is_fin()), (opcode, false));

            let middle = make("b", Fragment::Continue);
            assert_eq!((middle.opcode(), middle.is_fin()), (OpCode::Continuation, false));

            let last = make("c", Fragment::Final);
            assert_eq!((last.opcode(), last.is_fin()), (OpCode::Continuation, true));
        }
    }

    #[test]
    fn test_ping_pong_are_empty() {
        let ping = codec::encode(&Frame::ping()).unwrap();
        assert_eq!(ping.as_ref(), &[0x89, 0x00]);

        let pong = codec::encode(&Frame::pong()).unwrap();
        assert_eq!(pong.as_ref(), &[0x8A, 0x00]);
    }

    #[test]
    fn test_close_payload_bound() {
        for len in [0, 1, 123, 124, 500] {
            let frame = Frame::close(CloseCode::Away, vec![b'x'; len]);
            assert!(frame.payload().len() <= 125);
            assert_eq!(frame.close_code(), Some(CloseCode::Away));
            assert_eq!(frame.close_reason().map(<[u8]>::len), Some(len.min(123)));
        }
    }

    #[test]
    fn test_close_wire_form() {
        let wire = codec::encode(&Frame::close(CloseCode::Normal, b"bye")).unwrap();
        assert_eq!(wire.as_ref(), &[0x88, 0x05, 0x03, 0xE8, b'b', b'y', b'e']);
    }

    #[test]
    fn test_masked_fragment() {
        let frame =
            Frame::binary_fragment(vec![0u8; 4], Fragment::Continue).with_mask([1, 2, 3, 4]);
        let wire = codec::encode(&frame).unwrap();
        assert_eq!(&wire[..2], &[0x00, 0x84]);
        assert_eq!(&wire[6..], &[1, 2, 3, 4]);
    }
}
