//! Stream connection with line-delimited I/O.
//!
//! A [`Connection`] owns both halves of a byte stream. Reads and writes are
//! independent so one task can wait for the next server line while another
//! sends commands. Closing is a one-shot: the first [`Connection::close`]
//! shuts the write side down and wakes any pending reader; later calls see
//! the flag already set and return immediately.
//!
//! Incoming bytes that are not valid UTF-8 are replaced rather than
//! rejected, and lines longer than [`MAX_LINE_LEN`] are dropped, so a
//! misbehaving peer costs at most one line and never the connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tracing::{debug, trace, warn};

use crate::error::{ChatError, ChatResult};

type Reader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Longest line accepted from the peer, terminator included.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// A live connection to a chat server.
pub struct Connection {
    /// Remote address, for logging.
    peer: String,

    /// Buffered read half; only the dispatch loop reads.
    reader: Mutex<Reader>,

    /// Write half. Taken out on close.
    writer: Mutex<Option<Writer>>,

    /// Set exactly once, by the caller that performs teardown.
    closed: AtomicBool,

    /// Flips to `true` on close to wake a pending `read_line`.
    shutdown: watch::Sender<bool>,

    /// Lines longer than this are discarded.
    max_line_len: usize,
}

impl Connection {
    /// Resolve `host` and open a TCP connection to it.
    ///
    /// Every resolved address is tried in turn. The error of the last
    /// attempt is returned, mapped so that "nothing listening" can be told
    /// apart from other transport failures.
    pub async fn open(host: &str, port: u16) -> ChatResult<Self> {
        debug!(host, port, "Resolving");
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| {
                debug!(host, error = %e, "Lookup failed");
                ChatError::HostUnresolved(host.to_string())
            })?
            .collect();
        if addrs.is_empty() {
            return Err(ChatError::HostUnresolved(host.to_string()));
        }

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    debug!(%addr, "TCP connected");
                    return Ok(Self::from_stream(stream, addr.to_string()));
                }
                Err(e) => {
                    debug!(%addr, error = %e, "TCP connect failed");
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                ChatError::Refused(format!("{host}:{port}"))
            }
            Some(e) => ChatError::Io(e),
            None => ChatError::HostUnresolved(host.to_string()),
        })
    }

    /// Wrap an already-established stream.
    pub fn from_stream<S>(stream: S, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(read_half);
        let writer: Writer = Box::new(write_half);
        let (shutdown, _) = watch::channel(false);

        Self {
            peer: peer.into(),
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
            shutdown,
            max_line_len: MAX_LINE_LEN,
        }
    }

    /// Override the line length limit, terminator included.
    pub fn with_max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max.max(1);
        self
    }

    /// Remote address this connection was opened to.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// True until [`close`](Self::close) has run.
    pub fn is_active(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Send one line. The terminator is appended and the stream flushed
    /// before this returns.
    pub async fn write_line(&self, text: &str) -> ChatResult<()> {
        if !self.is_active() {
            return Err(ChatError::Closed);
        }
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ChatError::Closed)?;

        trace!(tx = %text, ">>>");
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Wait for the next line from the peer, without its terminator.
    ///
    /// Returns `Ok(None)` when the peer closed the stream and
    /// `Err(ChatError::Closed)` once this side has been closed, including
    /// when the close happens while waiting. Invalid UTF-8 is replaced with
    /// U+FFFD; over-long lines are skipped.
    pub async fn read_line(&self) -> ChatResult<Option<String>> {
        let mut shutdown = self.shutdown.subscribe();
        if !self.is_active() {
            return Err(ChatError::Closed);
        }
        let mut reader = self.reader.lock().await;

        tokio::select! {
            result = read_raw_line(&mut *reader, self.max_line_len) => {
                let Some(bytes) = result? else {
                    return Ok(None);
                };
                let text = String::from_utf8_lossy(&bytes);
                let line = text.strip_suffix('\n').unwrap_or(&text);
                let line = line.strip_suffix('\r').unwrap_or(line);
                trace!(rx = %line, "<<<");
                Ok(Some(line.to_string()))
            }
            _ = shutdown.wait_for(|closed| *closed) => Err(ChatError::Closed),
        }
    }

    /// Mark the connection closed and wake the reader without touching the
    /// write side. Returns true for the caller that flipped the flag.
    fn mark_closed(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shutdown.send_replace(true);
        true
    }

    /// Close from a context that cannot await, such as `Drop`.
    ///
    /// The stream itself is released when the last reference to the
    /// connection goes away. Counts as the one teardown, so a later
    /// [`close`](Self::close) returns `Ok(false)`.
    pub(crate) fn close_now(&self) -> bool {
        let performed = self.mark_closed();
        if performed {
            debug!(peer = %self.peer, "Closing connection without flush");
        }
        performed
    }

    /// Close the connection.
    ///
    /// Exactly one caller performs the teardown and gets `Ok(true)`; every
    /// other caller, concurrent or later, gets `Ok(false)`. An error means
    /// the teardown ran but shutting the write side down failed.
    pub async fn close(&self) -> ChatResult<bool> {
        if !self.mark_closed() {
            return Ok(false);
        }
        debug!(peer = %self.peer, "Closing connection");

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            writer.shutdown().await?;
        }
        Ok(true)
    }
}

/// Read up to and including the next `\n`, or to end of stream.
///
/// A line that grows past `max` bytes is consumed up to its terminator and
/// dropped, and reading continues with the line after it. Returns `None`
/// at end of stream when no bytes of a kept line are pending.
async fn read_raw_line<R>(reader: &mut R, max: usize) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut oversized = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok((!line.is_empty()).then_some(line));
        }
        let (used, complete) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        if oversized || line.len() + used > max {
            oversized = true;
            line.clear();
        } else {
            line.extend_from_slice(&available[..used]);
        }
        reader.consume(used);

        if complete {
            if !oversized {
                return Ok(Some(line));
            }
            warn!(max, "Dropped over-long line");
            oversized = false;
        }
    }
}
