//! The HTTP upgrade boundary ([RFC 6455 Section 4](https://datatracker.ietf.org/doc/html/rfc6455#section-4)).
//!
//! Frames only flow once client and server have exchanged an HTTP/1.1
//! upgrade:
//!
//! ```http
//! GET /chat HTTP/1.1
//! Connection: Upgrade
//! Upgrade: websocket
//! Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==
//! Sec-WebSocket-Version: 13
//! ```
//!
//! ```http
//! HTTP/1.1 101 Switching Protocols
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=
//! Sec-WebSocket-Version: 13
//! ```
//!
//! This module builds and parses those header blocks and derives the accept
//! key. Sending them, checking the status line and negotiating extensions are
//! up to the caller.

use std::collections::HashMap;

use base64::prelude::*;
use bytes::{BufMut, Bytes, BytesMut};
use sha1::{Digest, Sha1};

use crate::{FrameError, Result};

/// Appended to the client key before hashing.
const WS_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const HEADER_END: &[u8] = b"\r\n\r\n";

pub const SEC_WEBSOCKET_KEY: &str = "Sec-WebSocket-Key";
pub const SEC_WEBSOCKET_ACCEPT: &str = "Sec-WebSocket-Accept";
pub const SEC_WEBSOCKET_VERSION: &str = "Sec-WebSocket-Version";
pub const SEC_WEBSOCKET_PROTOCOL: &str = "Sec-WebSocket-Protocol";

/// Derives the `Sec-WebSocket-Accept` value for a client key.
///
/// `base64(SHA-1(key ++ "258EAFA5-E914-47DA-95CA-C5AB0DC85B11"))`. The key is
/// used as given, without decoding or validation.
///
/// ```rust
/// assert_eq!(
///     wsframe::accept_key(b"dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
/// );
/// ```
pub fn accept_key(key: &[u8]) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key);
    sha1.update(WS_GUID);
    let result = sha1.finalize();
    BASE64_STANDARD.encode(&result[..])
}

fn generate_key() -> String {
    let input: [u8; 16] = rand::random();
    BASE64_STANDARD.encode(input)
}

/// An HTTP start line followed by an ordered list of headers.
///
/// Header names are matched ASCII case-insensitively but stored with the
/// spelling they were first inserted with. Insertion order is preserved and
/// is the order of [`to_bytes`](Self::to_bytes).
///
/// ```rust
/// use wsframe::HeaderObj;
///
/// let mut headers = HeaderObj::new("HTTP/1.1 101 Switching Protocols");
/// headers.insert("Upgrade", "websocket");
/// headers.insert("Connection", "Upgrade");
///
/// assert_eq!(headers.get("upgrade").map(|v| v.as_ref()), Some(&b"websocket"[..]));
/// assert_eq!(
///     headers.to_bytes().as_ref(),
///     b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderObj {
    first_line: Bytes,
    entries: Vec<(Bytes, Bytes)>,
    /// Lowercased name to its position in `entries`.
    index: HashMap<Vec<u8>, usize>,
}

impl HeaderObj {
    pub fn new(first_line: impl Into<Bytes>) -> Self {
        Self {
            first_line: first_line.into(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The request or status line, without its line terminator.
    pub fn first_line(&self) -> &Bytes {
        &self.first_line
    }

    pub fn set_first_line(&mut self, first_line: impl Into<Bytes>) {
        self.first_line = first_line.into();
    }

    fn position(&self, name: &[u8]) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    /// Sets a header, returning the previous value.
    ///
    /// An existing header keeps its position and name spelling; only the value
    /// changes. New headers are appended.
    pub fn insert(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Option<Bytes> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.index.insert(name.to_ascii_lowercase(), self.entries.len());
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&Bytes> {
        self.position(name.as_ref()).map(|index| &self.entries[index].1)
    }

    /// Removes a header. Later headers keep their relative order.
    pub fn remove(&mut self, name: impl AsRef<[u8]>) -> Option<Bytes> {
        let removed = self.index.remove(&name.as_ref().to_ascii_lowercase())?;
        for position in self.index.values_mut() {
            if *position > removed {
                *position -= 1;
            }
        }
        Some(self.entries.remove(removed).1)
    }

    pub fn contains(&self, name: impl AsRef<[u8]>) -> bool {
        self.position(name.as_ref()).is_some()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &Bytes)> {
        self.entries.iter().map(|(name, value)| (name, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the block: the first line, one `Name: value` line per
    /// header, and a terminating empty line. Every line ends in CRLF.
    pub fn to_bytes(&self) -> Bytes {
        let size = self
            .entries
            .iter()
            .map(|(name, value)| name.len() + value.len() + 4)
            .sum::<usize>()
            + self.first_line.len()
            + 4;

        let mut buf = BytesMut::with_capacity(size);
        buf.put_slice(&self.first_line);
        buf.put_slice(b"\r\n");
        for (name, value) in &self.entries {
            buf.put_slice(name);
            buf.put_slice(b": ");
            buf.put_slice(value);
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");
        buf.freeze()
    }

    /// Returns the offset just past the `\r\n\r\n` that ends the header
    /// block, or `None` if the block is incomplete.
    pub fn find_end(data: &[u8]) -> Option<usize> {
        memchr::memmem::find(data, HEADER_END).map(|index| index + HEADER_END.len())
    }

    /// Parses a header block.
    ///
    /// Parsing stops at the first empty line; the terminator itself is
    /// optional. Lines may end in CRLF or a bare LF.
    ///
    /// # Errors
    /// [`FrameError::MalformedHeader`] if the block is empty or a header line
    /// has no `:`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let block = match Self::find_end(data) {
            Some(end) => &data[..end - HEADER_END.len()],
            None => data.trim_ascii_end(),
        };
        parse_block(block)
    }

    /// Parses the header block at the start of `data` and returns it with the
    /// number of bytes it occupied, terminator included.
    ///
    /// Returns `Ok(None)` while the terminating empty line has not arrived.
    /// Whatever follows the block (typically the first frames) is left for
    /// the caller.
    ///
    /// ```rust
    /// use wsframe::HeaderObj;
    ///
    /// let data = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n\x81\x00";
    /// let (headers, consumed) = HeaderObj::parse_prefix(data)?.unwrap();
    /// assert_eq!(headers.len(), 1);
    /// assert_eq!(&data[consumed..], b"\x81\x00");
    ///
    /// assert!(HeaderObj::parse_prefix(b"GET / HTTP/1.1\r\nHo")?.is_none());
    /// # Ok::<(), wsframe::FrameError>(())
    /// ```
    pub fn parse_prefix(data: &[u8]) -> Result<Option<(Self, usize)>> {
        let Some(end) = Self::find_end(data) else {
            return Ok(None);
        };
        let headers = parse_block(&data[..end - HEADER_END.len()])?;
        Ok(Some((headers, end)))
    }
}

fn parse_block(block: &[u8]) -> Result<HeaderObj> {
    let mut lines = block
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line));

    let first_line = lines
        .next()
        .map(<[u8]>::trim_ascii)
        .filter(|line| !line.is_empty())
        .ok_or_else(|| FrameError::MalformedHeader("empty header block".to_owned()))?;
    let mut headers = HeaderObj::new(Bytes::copy_from_slice(first_line));

    for line in lines.take_while(|line| !line.is_empty()) {
        let Some(colon) = memchr::memchr(b':', line) else {
            return Err(FrameError::MalformedHeader(
                String::from_utf8_lossy(line).into_owned(),
            ));
        };
        let name = line[..colon].trim_ascii();
        let value = line[colon + 1..].trim_ascii();
        if name.is_empty() {
            return Err(FrameError::MalformedHeader(
                String::from_utf8_lossy(line).into_owned(),
            ));
        }
        headers.insert(Bytes::copy_from_slice(name), Bytes::copy_from_slice(value));
    }

    Ok(headers)
}

/// Settings shared by the request and response header blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOptions {
    /// `Sec-WebSocket-Version` value.
    ///
    /// Default: `13`
    pub version: Bytes,
    /// `Sec-WebSocket-Protocol` value; the header is omitted when `None`.
    ///
    /// Default: `None`
    pub protocols: Option<Bytes>,
    /// HTTP version in the start line.
    ///
    /// Default: `1.1`
    pub http_version: Bytes,
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            version: Bytes::from_static(b"13"),
            protocols: None,
            http_version: Bytes::from_static(b"1.1"),
        }
    }
}

impl HandshakeOptions {
    pub fn with_version(self, version: impl Into<Bytes>) -> Self {
        Self {
            version: version.into(),
            ..self
        }
    }

    pub fn with_protocols(self, protocols: impl Into<Bytes>) -> Self {
        Self {
            protocols: Some(protocols.into()),
            ..self
        }
    }

    pub fn with_http_version(self, http_version: impl Into<Bytes>) -> Self {
        Self {
            http_version: http_version.into(),
            ..self
        }
    }
}

/// A client upgrade request.
///
/// ```rust
/// use wsframe::{HandshakeOptions, HandshakeRequest};
///
/// let request = HandshakeRequest::new("/chat")
///     .with_key("dGhlIHNhbXBsZSBub25jZQ==")
///     .with_options(&HandshakeOptions::default().with_protocols("chat"));
/// assert_eq!(request.headers().first_line().as_ref(), b"GET /chat HTTP/1.1");
///
/// let response = request.make_response();
/// assert_eq!(
///     response.get("Sec-WebSocket-Accept").map(|v| v.as_ref()),
///     Some(&b"s3pPLMBiTxaQ9kYGzzhZRbK+xOo="[..])
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    resource: Bytes,
    key: Bytes,
    headers: HeaderObj,
}

impl HandshakeRequest {
    /// Builds a request for `resource` with a fresh random key and default
    /// options.
    pub fn new(resource: impl Into<Bytes>) -> Self {
        let resource = resource.into();
        let key = Bytes::from(generate_key());
        let options = HandshakeOptions::default();

        let mut headers = HeaderObj::new(request_line(&resource, &options.http_version));
        headers.insert("Connection", "Upgrade");
        headers.insert("Upgrade", "websocket");
        headers.insert(SEC_WEBSOCKET_KEY, key.clone());
        headers.insert(SEC_WEBSOCKET_VERSION, options.version);

        Self {
            resource,
            key,
            headers,
        }
    }

    /// Replaces the client key.
    pub fn with_key(mut self, key: impl Into<Bytes>) -> Self {
        self.key = key.into();
        self.headers.insert(SEC_WEBSOCKET_KEY, self.key.clone());
        self
    }

    /// Applies the version, protocol and HTTP version settings.
    pub fn with_options(mut self, options: &HandshakeOptions) -> Self {
        self.headers
            .set_first_line(request_line(&self.resource, &options.http_version));
        self.headers
            .insert(SEC_WEBSOCKET_VERSION, options.version.clone());
        match &options.protocols {
            Some(protocols) => {
                self.headers.insert(SEC_WEBSOCKET_PROTOCOL, protocols.clone());
            }
            None => {
                self.headers.remove(SEC_WEBSOCKET_PROTOCOL);
            }
        }
        self
    }

    /// Parses a request header block received by a server.
    ///
    /// Only the presence of `Sec-WebSocket-Key` is checked.
    ///
    /// # Errors
    /// - [`FrameError::MalformedHeader`] if the block cannot be parsed
    /// - [`FrameError::MissingSecWebSocketKey`] if the key header is absent
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::from_headers(HeaderObj::parse(data)?)
    }

    /// Wraps an already parsed header block.
    ///
    /// # Errors
    /// [`FrameError::MissingSecWebSocketKey`] if the key header is absent.
    pub fn from_headers(headers: HeaderObj) -> Result<Self> {
        let key = headers
            .get(SEC_WEBSOCKET_KEY)
            .cloned()
            .ok_or(FrameError::MissingSecWebSocketKey)?;
        let resource = headers
            .first_line()
            .split(|&b| b == b' ')
            .nth(1)
            .map_or_else(|| Bytes::from_static(b"/"), Bytes::copy_from_slice);

        Ok(Self {
            resource,
            key,
            headers,
        })
    }

    pub fn headers(&self) -> &HeaderObj {
        &self.headers
    }

    pub fn resource(&self) -> &Bytes {
        &self.resource
    }

    /// The `Sec-WebSocket-Key` value.
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn to_bytes(&self) -> Bytes {
        self.headers.to_bytes()
    }

    /// The `Sec-WebSocket-Accept` value a server must answer with.
    pub fn expected_accept(&self) -> String {
        accept_key(&self.key)
    }

    /// Builds the `101 Switching Protocols` response with default options.
    pub fn make_response(&self) -> HeaderObj {
        self.make_response_with(&HandshakeOptions::default())
    }

    /// Builds the `101 Switching Protocols` response.
    pub fn make_response_with(&self, options: &HandshakeOptions) -> HeaderObj {
        let mut status = BytesMut::with_capacity(32);
        status.put_slice(b"HTTP/");
        status.put_slice(&options.http_version);
        status.put_slice(b" 101 Switching Protocols");

        let accept = self.expected_accept();
        tracing::debug!(resource = ?self.resource, accept = %accept, "upgrade response");

        let mut response = HeaderObj::new(status.freeze());
        response.insert("Upgrade", "websocket");
        response.insert("Connection", "Upgrade");
        response.insert(SEC_WEBSOCKET_ACCEPT, accept);
        response.insert(SEC_WEBSOCKET_VERSION, options.version.clone());
        if let Some(protocols) = &options.protocols {
            response.insert(SEC_WEBSOCKET_PROTOCOL, protocols.clone());
        }
        response
    }
}

fn request_line(resource: &[u8], http_version: &[u8]) -> Bytes {
    let mut line = BytesMut::with_capacity(resource.len() + http_version.len() + 10);
    line.put_slice(b"GET ");
    line.put_slice(resource);
    line.put_slice(b" HTTP/");
    line.put_slice(http_version);
    line.freeze()
}
