//! # wsframe
//!
//! The framing layer of the WebSocket protocol ([RFC 6455](https://datatracker.ietf.org/doc/html/rfc6455)):
//! converting frames to and from their exact wire layout, applying and
//! removing the masking cipher, and rebuilding frames from a byte stream that
//! arrives in arbitrarily sized chunks.
//!
//! The crate performs no I/O. Connection management, the HTTP upgrade itself
//! and extension negotiation belong to the caller; [`handshake`] only offers
//! the ordered header container and the accept-key derivation needed at that
//! boundary.
//!
//! ## Layers
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ Application                                    │
//! └────────────────┬───────────────────────────────┘
//!                  │ Frame::text / binary / close ...
//! ┌────────────────▼───────────────────────────────┐
//! │ factory, frame                                 │
//! │ • Frame values, fragment roles, close codes    │
//! └────────────────┬───────────────────────────────┘
//!                  │
//! ┌────────────────▼───────────────────────────────┐
//! │ codec (complete buffers) / reader (chunks)     │
//! │ • Header parsing and serialization             │
//! │ • Extended lengths, mask keys                  │
//! └────────────────┬───────────────────────────────┘
//!                  │
//! ┌────────────────▼───────────────────────────────┐
//! │ mask                                           │
//! └────────────────┬───────────────────────────────┘
//!                  │
//!           Transport (owned by the caller)
//! ```
//!
//! ## Encoding and decoding
//!
//! ```rust
//! use wsframe::{Frame, OpCode, codec};
//!
//! let frame = Frame::text("Hello, World!");
//! let wire = codec::encode(&frame)?;
//! assert_eq!(&wire[..2], &[0x81, 0x0D]);
//!
//! let decoded = codec::decode(&wire, true)?;
//! assert_eq!(decoded.opcode(), OpCode::Text);
//! assert_eq!(decoded.payload(), frame.payload());
//! # Ok::<(), wsframe::FrameError>(())
//! ```
//!
//! ## Reading from a socket
//!
//! ```rust
//! use wsframe::{Frame, ReadStatus, StreamReader, codec};
//!
//! let wire = codec::encode(&Frame::binary(vec![7u8; 300]).with_mask([1, 2, 3, 4]))?;
//! let mut reader = StreamReader::new(true);
//!
//! let mut frames = Vec::new();
//! for chunk in wire.chunks(7) {
//!     if let ReadStatus::Ready(frame) = reader.progressive_read(chunk)? {
//!         frames.push(frame);
//!     }
//! }
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].payload().as_ref(), &[7u8; 300][..]);
//! # Ok::<(), wsframe::FrameError>(())
//! ```

pub mod close;
pub mod codec;
pub mod factory;
pub mod frame;
pub mod handshake;
pub mod mask;
mod options;
pub mod reader;

pub use close::CloseCode;
pub use factory::Fragment;
pub use frame::{Frame, Mask, OpCode};
pub use handshake::{HandshakeOptions, HandshakeRequest, HeaderObj, accept_key};
pub use options::ReaderOptions;
pub use reader::{FrameCodec, ReadStatus, StreamReader};
use thiserror::Error;

/// Result type for framing operations.
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors that can occur while encoding, decoding or masking frames.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Fewer bytes than the fixed 2-byte header or the 4-byte mask key need.
    #[error("truncated frame header: need {needed} bytes, have {available}")]
    TruncatedHeader { needed: usize, available: usize },

    /// Fewer bytes than the declared 16- or 64-bit length field needs.
    #[error("malformed extended length: need {width} bytes, have {available}")]
    MalformedExtendedLength { width: usize, available: usize },

    /// The buffer ends before the declared payload does.
    #[error("truncated payload: expected {expected} bytes, have {available}")]
    TruncatedPayload { expected: u64, available: usize },

    /// A masking key that is not exactly 4 bytes long.
    #[error("invalid mask: length {0} != 4")]
    LengthViolation(usize),

    /// The declared payload exceeds the configured limit or the address space.
    #[error("payload of {amount} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { amount: u64, limit: usize },

    /// A handshake header line could not be parsed.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// The handshake request has no Sec-WebSocket-Key header.
    #[error("Sec-WebSocket-Key header is missing")]
    MissingSecWebSocketKey,

    /// I/O error surfaced through the tokio codec.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Returns `true` if the input simply ended too early.
    ///
    /// A caller holding an incomplete buffer can wait for more data and retry.
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            Self::TruncatedHeader { .. }
                | Self::MalformedExtendedLength { .. }
                | Self::TruncatedPayload { .. }
        )
    }

    /// Returns `true` if this is a handshake error.
    pub fn is_handshake_error(&self) -> bool {
        matches!(self, Self::MalformedHeader(_) | Self::MissingSecWebSocketKey)
    }

    /// Returns the underlying I/O error, if any.
    pub fn as_io_error(&self) -> Option<&std::io::Error> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
