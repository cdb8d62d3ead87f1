//! Blocking writer that forwards chunks into an async channel.
//!
//! The archive producer runs on a blocking thread and writes through this
//! adapter; the HTTP response drains the receiving end. A full channel
//! blocks the producer, and a dropped receiver turns the next write into a
//! `BrokenPipe` error so the producer stops.

use std::io::{self, Write};
use tokio::sync::mpsc;

/// Chunk size forwarded per channel message
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks allowed in flight before the producer blocks
pub const CHANNEL_CAPACITY: usize = 8;

pub type Chunk = io::Result<Vec<u8>>;

/// Create a bounded chunk channel with the default capacity.
pub fn chunk_channel() -> (mpsc::Sender<Chunk>, mpsc::Receiver<Chunk>) {
    mpsc::channel(CHANNEL_CAPACITY)
}

pub struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
    buffer: Vec<u8>,
    chunk_size: usize,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::Sender<Chunk>) -> Self {
        Self::with_chunk_size(tx, CHUNK_SIZE)
    }

    pub fn with_chunk_size(tx: mpsc::Sender<Chunk>, chunk_size: usize) -> Self {
        Self {
            tx,
            buffer: Vec::with_capacity(chunk_size),
            chunk_size,
        }
    }

    /// True once the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let chunk = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.chunk_size));
            self.tx
                .blocking_send(Ok(chunk))
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer closed"))?;
        }
        Ok(())
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut remaining = buf;
        while !remaining.is_empty() {
            let available = self.chunk_size - self.buffer.len();
            let take = remaining.len().min(available);
            self.buffer.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];

            if self.buffer.len() >= self.chunk_size {
                self.flush_buffer()?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer()
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        let _ = self.flush_buffer();
    }
}
