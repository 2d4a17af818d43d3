//! Stream reader configuration.

/// Default capacity of the reader's accumulation buffer: 8 KiB.
pub const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Configuration for a [`StreamReader`](crate::StreamReader) or
/// [`FrameCodec`](crate::FrameCodec).
///
/// # Common Patterns
///
/// ## Server side
/// ```rust
/// use wsframe::ReaderOptions;
///
/// let options = ReaderOptions::default()
///     .with_max_payload_size(1024 * 1024) // 1 MiB max incoming
///     .with_capacity(64 * 1024);
/// ```
///
/// ## Proxying masked frames untouched
/// ```rust
/// use wsframe::ReaderOptions;
///
/// let options = ReaderOptions::default().with_auto_unmask(false);
/// assert!(!options.auto_unmask);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Whether masked payloads are unmasked before a frame is returned.
    ///
    /// When disabled, payloads are returned as found on the wire and the key
    /// stays available through [`Frame::mask`](crate::Frame::mask).
    ///
    /// Default: `true`
    pub auto_unmask: bool,

    /// Largest payload, in bytes, the reader agrees to buffer.
    ///
    /// A frame announcing more fails with
    /// [`FrameError::PayloadTooLarge`](crate::FrameError::PayloadTooLarge) as
    /// soon as its length field is read, before any of the payload is
    /// buffered.
    ///
    /// Default: `None` (bounded only by the address space)
    pub max_payload_size: Option<usize>,

    /// Initial capacity of the accumulation buffer.
    ///
    /// Default: 8 KiB
    pub initial_capacity: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            auto_unmask: true,
            max_payload_size: None,
            initial_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ReaderOptions {
    /// Sets whether masked payloads are unmasked.
    pub fn with_auto_unmask(self, auto_unmask: bool) -> Self {
        Self {
            auto_unmask,
            ..self
        }
    }

    /// Caps the payload size of incoming frames.
    pub fn with_max_payload_size(self, size: usize) -> Self {
        Self {
            max_payload_size: Some(size),
            ..self
        }
    }

    /// Removes the payload size cap.
    pub fn without_max_payload_size(self) -> Self {
        Self {
            max_payload_size: None,
            ..self
        }
    }

    /// Sets the initial capacity of the accumulation buffer.
    pub fn with_capacity(self, capacity: usize) -> Self {
        Self {
            initial_capacity: capacity,
            ..self
        }
    }
}
