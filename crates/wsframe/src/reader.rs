//! # reader
//!
//! Progressive frame reading from a byte stream that arrives in chunks of
//! arbitrary size.
//!
//! A frame is parsed in strictly forward stages, each waiting until the bytes
//! it needs are buffered:
//!
//! ```text
//! Header (2) → ExtendedLength (0|2|8) → MaskKey (0|4) → Payload (amount) → emit
//!    ▲                                                                      │
//!    └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The result is independent of how the stream is split: feeding a frame in one
//! chunk, one byte at a time, or interleaved with empty chunks yields the same
//! frame. Bytes past the end of a frame stay buffered for the next one.
//!
//! Two front ends share the state machine:
//! - [`StreamReader`]: owns its buffer, fed through
//!   [`progressive_read`](StreamReader::progressive_read)
//! - [`FrameCodec`]: a [`tokio_util::codec`] decoder/encoder for use with
//!   `FramedRead`, `FramedWrite` or `Framed`
//!
//! Fragments are surfaced one by one. Reassembly, UTF-8 checks and control
//! frame rules are left to the caller.

use bytes::{Buf, BytesMut};
use tokio_util::codec;

use crate::{
    FrameError, ReaderOptions, Result,
    codec::{FrameHead, encode_into, finish_payload, payload_size},
    frame::{Frame, PayloadLength},
};

/// Largest payload reservation made before the payload bytes arrive.
///
/// Bigger frames grow the buffer as data comes in, so a header announcing a
/// huge payload cannot force a huge allocation on its own.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Outcome of feeding bytes to a [`StreamReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    /// The current stage still lacks this many bytes.
    ///
    /// This is a lower bound for the rest of the frame: later stages may
    /// need more once their sizes are known.
    NeedMore(usize),
    /// A complete frame.
    Ready(Frame),
}

impl ReadStatus {
    /// Returns the frame, if one is ready.
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            ReadStatus::Ready(frame) => Some(frame),
            ReadStatus::NeedMore(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ReadStatus::Ready(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Header,
    ExtendedLength {
        head: FrameHead,
    },
    MaskKey {
        head: FrameHead,
        length: PayloadLength,
        size: usize,
    },
    Payload {
        head: FrameHead,
        length: PayloadLength,
        size: usize,
        key: Option<[u8; 4]>,
    },
}

/// The incremental frame parser shared by [`StreamReader`] and [`FrameCodec`].
///
/// Consumes bytes from the front of the buffer it is handed as each stage
/// completes.
#[derive(Debug, Clone)]
struct FrameParser {
    state: ReadState,
    auto_unmask: bool,
    max_payload_size: Option<usize>,
}

impl FrameParser {
    fn new(options: &ReaderOptions) -> Self {
        Self {
            state: ReadState::Header,
            auto_unmask: options.auto_unmask,
            max_payload_size: options.max_payload_size,
        }
    }

    #[inline]
    fn is_idle(&self) -> bool {
        self.state == ReadState::Header
    }

    fn reset(&mut self) {
        self.state = ReadState::Header;
    }

    /// Runs the state machine until a frame completes or `src` runs dry.
    fn advance(&mut self, src: &mut BytesMut) -> Result<ReadStatus> {
        loop {
            match self.state {
                ReadState::Header => {
                    if src.len() < 2 {
                        return Ok(ReadStatus::NeedMore(2 - src.len()));
                    }
                    let head = FrameHead::parse(src[0], src[1]);
                    src.advance(2);

                    tracing::trace!(
                        opcode = ?head.opcode,
                        fin = head.fin,
                        masked = head.masked,
                        spec = head.spec,
                        "frame header"
                    );
                    self.state = ReadState::ExtendedLength { head };
                }
                ReadState::ExtendedLength { head } => {
                    let width = head.extension_width();
                    if src.len() < width {
                        return Ok(ReadStatus::NeedMore(width - src.len()));
                    }
                    let length = head.payload_length(&src[..width]);
                    src.advance(width);

                    let size = match payload_size(length.amount, self.max_payload_size) {
                        Ok(size) => size,
                        Err(err) => {
                            self.state = ReadState::Header;
                            return Err(err);
                        }
                    };
                    self.state = ReadState::MaskKey { head, length, size };
                }
                ReadState::MaskKey { head, length, size } => {
                    let width = head.key_width();
                    if src.len() < width {
                        return Ok(ReadStatus::NeedMore(width - src.len()));
                    }
                    let key = head.masked.then(|| src.get_u32().to_be_bytes());

                    let missing = size.saturating_sub(src.len());
                    src.reserve(missing.min(MAX_PREALLOC));

                    tracing::trace!(amount = length.amount, "awaiting payload");
                    self.state = ReadState::Payload {
                        head,
                        length,
                        size,
                        key,
                    };
                }
                ReadState::Payload {
                    head,
                    length,
                    size,
                    key,
                } => {
                    if src.len() < size {
                        return Ok(ReadStatus::NeedMore(size - src.len()));
                    }
                    let body = src.split_to(size);
                    let payload = finish_payload(body, key, self.auto_unmask);
                    self.state = ReadState::Header;

                    tracing::trace!(
                        opcode = ?head.opcode,
                        fin = head.fin,
                        amount = length.amount,
                        "frame complete"
                    );
                    return Ok(ReadStatus::Ready(Frame::from_wire(
                        head.fin, head.rsv, head.opcode, key, length, payload,
                    )));
                }
            }
        }
    }
}

/// Rebuilds frames from a stream delivered in chunks.
///
/// The reader owns an accumulation buffer. Each call to
/// [`progressive_read`](Self::progressive_read) appends a chunk and advances
/// the parser as far as the buffered bytes allow. At most one frame is
/// returned per call; when a chunk carries several frames, call again with
/// an empty chunk to collect the rest.
///
/// ```rust
/// use wsframe::{ReadStatus, StreamReader};
///
/// let mut reader = StreamReader::new(true);
/// assert_eq!(reader.progressive_read(&[0x81])?, ReadStatus::NeedMore(1));
/// assert_eq!(reader.progressive_read(&[0x02, b'h'])?, ReadStatus::NeedMore(1));
///
/// let frame = reader.progressive_read(b"i")?.into_frame().unwrap();
/// assert_eq!(frame.payload().as_ref(), b"hi");
/// assert!(!reader.is_mid_frame());
/// # Ok::<(), wsframe::FrameError>(())
/// ```
///
/// # Errors
///
/// The only failure is [`FrameError::PayloadTooLarge`], raised when a length
/// field exceeds [`ReaderOptions::max_payload_size`] or the address space.
/// The stream is no longer aligned on a frame boundary after that; call
/// [`reset`](Self::reset) before reusing the reader.
#[derive(Debug)]
pub struct StreamReader {
    buffer: BytesMut,
    parser: FrameParser,
}

impl StreamReader {
    /// Creates a reader with default options and the given unmasking mode.
    pub fn new(auto_unmask: bool) -> Self {
        Self::with_options(ReaderOptions::default().with_auto_unmask(auto_unmask))
    }

    pub fn with_options(options: ReaderOptions) -> Self {
        Self {
            buffer: BytesMut::with_capacity(options.initial_capacity),
            parser: FrameParser::new(&options),
        }
    }

    /// Feeds `chunk` to the reader.
    ///
    /// Returns [`ReadStatus::Ready`] with the next complete frame, or
    /// [`ReadStatus::NeedMore`] with the number of bytes the current stage is
    /// still missing. An empty chunk is valid and makes progress on bytes
    /// retained from earlier calls.
    pub fn progressive_read(&mut self, chunk: &[u8]) -> Result<ReadStatus> {
        self.buffer.extend_from_slice(chunk);
        self.parser.advance(&mut self.buffer)
    }

    /// Returns `true` if bytes of an unfinished frame have been received.
    ///
    /// At end of stream this means the peer stopped mid-frame.
    pub fn is_mid_frame(&self) -> bool {
        !self.parser.is_idle() || !self.buffer.is_empty()
    }

    /// Number of received bytes not yet consumed by a completed stage.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discards any partial frame and buffered bytes.
    pub fn reset(&mut self) {
        if self.is_mid_frame() {
            tracing::trace!(buffered = self.buffer.len(), "discarding partial frame");
        }
        self.buffer.clear();
        self.parser.reset();
    }
}

impl Default for StreamReader {
    fn default() -> Self {
        Self::with_options(ReaderOptions::default())
    }
}

/// A [`tokio_util::codec`] adapter around the progressive parser.
///
/// Decoding works directly on the framed transport's read buffer. Encoding
/// goes through [`encode_into`](crate::codec::encode_into).
///
/// ```rust,no_run
/// use futures::{SinkExt, StreamExt};
/// use tokio_util::codec::Framed;
/// use wsframe::{Frame, FrameCodec};
///
/// # async fn run(stream: tokio::net::TcpStream) -> wsframe::Result<()> {
/// let mut framed = Framed::new(stream, FrameCodec::new(true));
/// while let Some(frame) = framed.next().await {
///     let frame = frame?;
///     framed.send(Frame::new(frame.payload().clone(), frame.opcode())).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FrameCodec {
    parser: FrameParser,
}

impl FrameCodec {
    pub fn new(auto_unmask: bool) -> Self {
        Self::with_options(ReaderOptions::default().with_auto_unmask(auto_unmask))
    }

    pub fn with_options(options: ReaderOptions) -> Self {
        Self {
            parser: FrameParser::new(&options),
        }
    }

    /// Returns `true` if part of a frame has been consumed from the transport.
    pub fn is_mid_frame(&self) -> bool {
        !self.parser.is_idle()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::with_options(ReaderOptions::default())
    }
}

impl codec::Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    #[inline]
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.parser.advance(src).map(ReadStatus::into_frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match codec::Decoder::decode(self, src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() && self.parser.is_idle() => Ok(None),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended in the middle of a frame",
            )
            .into()),
        }
    }
}

impl codec::Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    #[inline]
    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_into(&frame, dst)
    }
}

impl codec::Encoder<&Frame> for FrameCodec {
    type Error = FrameError;

    #[inline]
    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
        encode_into(frame, dst)
    }
}
