//! A WebSocket echo server on top of wsframe and tokio.
//!
//! Performs the upgrade handshake by hand, then echoes every text and binary
//! frame back to the client. Bytes that arrive together with the handshake
//! are handed to the frame codec so no frame is lost.
//!
//! Run with `RUST_LOG=wsframe=trace,echo_server=debug` to watch the frames.

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tokio_util::codec::{Framed, FramedParts};
use tracing_subscriber::EnvFilter;
use wsframe::{
    CloseCode, Frame, FrameCodec, FrameError, HandshakeRequest, HeaderObj, OpCode, ReaderOptions,
};

const MAX_HANDSHAKE: usize = 16 * 1024;

/// Reads the upgrade request and answers it, returning the bytes that
/// followed the header block.
async fn upgrade(stream: &mut TcpStream) -> wsframe::Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(1024);
    let (headers, consumed) = loop {
        if let Some(parsed) = HeaderObj::parse_prefix(&buf)? {
            break parsed;
        }
        if buf.len() > MAX_HANDSHAKE || stream.read_buf(&mut buf).await? == 0 {
            return Err(FrameError::MalformedHeader("incomplete upgrade request".to_owned()));
        }
    };

    let request = HandshakeRequest::from_headers(headers)?;
    tracing::debug!(resource = ?request.resource(), "upgrading");
    stream.write_all(&request.make_response().to_bytes()).await?;

    let _ = buf.split_to(consumed);
    Ok(buf)
}

/// Handles an individual WebSocket client connection by echoing back any received messages.
async fn handle_client(mut stream: TcpStream) -> wsframe::Result<()> {
    let leftover = upgrade(&mut stream).await?;

    let codec = FrameCodec::with_options(
        ReaderOptions::default().with_max_payload_size(100 * 1024 * 1024),
    );
    let mut parts = FramedParts::new::<Frame>(stream, codec);
    parts.read_buf = leftover;
    let mut ws = Framed::from_parts(parts);

    while let Some(frame) = ws.next().await {
        let frame = frame?;
        match frame.opcode() {
            OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                let (opcode, fin, payload) = frame.into_parts();
                ws.send(Frame::new(payload, opcode).with_fin(fin)).await?;
            }
            OpCode::Ping => {
                ws.send(Frame::new(frame.into_payload(), OpCode::Pong)).await?;
            }
            OpCode::Close => {
                let code = frame.close_code().unwrap_or(CloseCode::Normal);
                ws.send(Frame::close(code, b"")).await?;
                break;
            }
            OpCode::Pong | OpCode::Reserved(_) => {}
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> wsframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let listener = TcpListener::bind("0.0.0.0:9002").await?;
    tracing::debug!("Listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        let _ = stream.set_nodelay(true);

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream).await {
                tracing::error!(%peer, "Error in websocket connection: {e}");
            }
        });
    }
}
