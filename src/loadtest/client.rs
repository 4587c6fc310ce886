//! Line-framed stream connection used by a single worker.
//!
//! [`LineClient`] writes newline-terminated frames and reads back one
//! complete line at a time. It does not look inside a response; a line is a
//! line. Generic over the stream so tests can drive it with an in-memory
//! duplex pipe.

use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};
use tokio::net::TcpStream;

use crate::loadtest::error::WorkerError;

/// One persistent, line-framed connection.
pub struct LineClient<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    line: Vec<u8>,
    max_line_bytes: usize,
}

impl LineClient<TcpStream> {
    /// Open a TCP connection to `host:port`, bounded by `connect_timeout`.
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        max_line_bytes: usize,
    ) -> Result<Self, WorkerError> {
        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(WorkerError::Connection {
                    message: e.to_string(),
                })
            },
            Err(_) => {
                return Err(WorkerError::Connection {
                    message: format!("connect timed out after {connect_timeout:?}"),
                })
            },
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
        }
        Ok(Self::new(stream, max_line_bytes))
    }
}

impl<S: AsyncRead + AsyncWrite> LineClient<S> {
    /// Wrap an already connected stream.
    pub fn new(stream: S, max_line_bytes: usize) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            line: Vec::new(),
            max_line_bytes,
        }
    }

    /// Write one frame and flush it.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), WorkerError> {
        self.writer.write_all(frame).await.map_err(send_error)?;
        self.writer.flush().await.map_err(send_error)
    }

    /// Read one complete response line.
    ///
    /// Returns the line length including the delimiter. End-of-stream, even
    /// after a partial line, is [`WorkerError::StreamClosed`].
    pub async fn read_line(&mut self) -> Result<usize, WorkerError> {
        self.line.clear();
        let limit = self.max_line_bytes as u64 + 1;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.line)
            .await
            .map_err(|e| WorkerError::Receive {
                message: e.to_string(),
            })?;

        if read == 0 {
            return Err(WorkerError::StreamClosed);
        }
        if self.line.last() == Some(&b'\n') {
            return Ok(read);
        }
        if self.line.len() as u64 >= limit {
            Err(WorkerError::ResponseTooLarge {
                limit: self.max_line_bytes,
            })
        } else {
            Err(WorkerError::StreamClosed)
        }
    }

    /// Shut down the write side.
    pub async fn close(mut self) -> std::io::Result<()> {
        self.writer.shutdown().await
    }
}

fn send_error(e: std::io::Error) -> WorkerError {
    WorkerError::Send {
        message: e.to_string(),
    }
}
