//! Test doubles for the execution pipeline.
//!
//! [`MockTransport`] queues canned responses and records every request it
//! sees, including collected streaming bodies, so tests can assert on the
//! exact bytes that would have hit the wire.

mod transport;

pub use transport::{MockResponse, MockTransport, RecordedRequest};

use crate::stream::ChunkRead;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;

/// A chunk reader over a fixed buffer, yielding at most `max_per_read`
/// bytes per call.
pub struct BufferChunkRead {
    data: Bytes,
    offset: usize,
    max_per_read: usize,
}

impl BufferChunkRead {
    /// Create a reader over `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            max_per_read: data.len().max(1),
            data,
            offset: 0,
        }
    }

    /// Bound the bytes returned per call.
    pub fn with_max_per_read(mut self, max: usize) -> Self {
        self.max_per_read = max.max(1);
        self
    }
}

#[async_trait]
impl ChunkRead for BufferChunkRead {
    async fn read_chunk(&mut self, max_len: usize) -> io::Result<Bytes> {
        let len = max_len
            .min(self.max_per_read)
            .min(self.data.len() - self.offset);
        let out = self.data.slice(self.offset..self.offset + len);
        self.offset += len;
        Ok(out)
    }
}

/// A chunk reader that fails after an optional prefix.
pub struct FailingChunkRead {
    prefix: Option<Bytes>,
}

impl FailingChunkRead {
    /// Fail on the first read.
    pub fn new() -> Self {
        Self { prefix: None }
    }

    /// Yield `prefix` once, then fail.
    pub fn after(prefix: impl Into<Bytes>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl Default for FailingChunkRead {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkRead for FailingChunkRead {
    async fn read_chunk(&mut self, _: usize) -> io::Result<Bytes> {
        match self.prefix.take() {
            Some(prefix) => Ok(prefix),
            None => Err(io::Error::other("injected stream failure")),
        }
    }
}
