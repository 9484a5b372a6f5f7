//! Streaming request bodies.
//!
//! A caller supplies a [`ChunkRead`], a single-owner state machine yielding
//! successive byte chunks. For signed uploads, [`AwsChunkedBody`] batches
//! reads into fixed-size chunks, advances the chunk-signature chain, and
//! emits framed bytes ending in a signed zero-length terminator.

use crate::signing::ChunkSigningContext;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::pin::Pin;

/// Boxed byte stream handed to the transport.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// A producer of successive body chunks.
///
/// Each call returns up to `max_len` bytes. A short read (fewer bytes than
/// requested, including zero) signals end of stream. Readers are consumed
/// exactly once and cannot be restarted, so requests carrying one are never
/// retried.
#[async_trait]
pub trait ChunkRead: Send {
    /// Read up to `max_len` bytes. Errors propagate and fail the request
    /// without retry.
    async fn read_chunk(&mut self, max_len: usize) -> io::Result<Bytes>;
}

/// A streaming payload: a reader plus its declared total size.
///
/// The reader is taken out exactly once at dispatch time; the wrapper stays
/// cheaply cloneable so inputs can hand the same payload to the builder on
/// every attempt while the stream itself remains single-owner.
pub struct PayloadStream {
    size: Option<u64>,
    reader: Mutex<Option<Box<dyn ChunkRead>>>,
}

impl PayloadStream {
    /// Wrap a reader with a known total size.
    pub fn sized(reader: Box<dyn ChunkRead>, size: u64) -> Self {
        Self {
            size: Some(size),
            reader: Mutex::new(Some(reader)),
        }
    }

    /// Wrap a reader of unknown total size. Only operations permitting
    /// chunked streaming accept these.
    pub fn unsized_reader(reader: Box<dyn ChunkRead>) -> Self {
        Self {
            size: None,
            reader: Mutex::new(Some(reader)),
        }
    }

    /// Declared total size, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Take the reader. Returns `None` once consumed.
    pub fn take_reader(&self) -> Option<Box<dyn ChunkRead>> {
        self.reader.lock().take()
    }

    /// True once the reader has been taken.
    pub fn is_consumed(&self) -> bool {
        self.reader.lock().is_none()
    }
}

impl fmt::Debug for PayloadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadStream")
            .field("size", &self.size)
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

/// Fill `buf` up to `chunk_size` bytes. Returns true at end of stream.
async fn fill_chunk(
    reader: &mut Box<dyn ChunkRead>,
    buf: &mut BytesMut,
    chunk_size: usize,
) -> io::Result<bool> {
    while buf.len() < chunk_size {
        let want = chunk_size - buf.len();
        let read = reader.read_chunk(want).await?;
        let got = read.len();
        buf.extend_from_slice(&read);
        if got < want {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Signed chunked body: frames and signs each chunk, then terminates with a
/// signed zero-length chunk.
pub struct AwsChunkedBody;

impl AwsChunkedBody {
    /// Build the framed stream.
    pub fn stream(
        mut reader: Box<dyn ChunkRead>,
        mut context: ChunkSigningContext,
        chunk_size: usize,
    ) -> BodyStream {
        Box::pin(async_stream::try_stream! {
            loop {
                let mut buf = BytesMut::with_capacity(chunk_size);
                let eof = fill_chunk(&mut reader, &mut buf, chunk_size).await?;

                if !buf.is_empty() {
                    let framed = context
                        .sign_chunk(&buf)
                        .map_err(io::Error::other)?;
                    yield framed;
                }

                if eof {
                    let terminator = context
                        .sign_chunk(b"")
                        .map_err(io::Error::other)?;
                    yield terminator;
                    break;
                }
            }
        })
    }
}

/// Unsigned passthrough body: raw chunks straight to the transport.
pub fn unsigned_stream(mut reader: Box<dyn ChunkRead>, chunk_size: usize) -> BodyStream {
    Box::pin(async_stream::try_stream! {
        loop {
            let mut buf = BytesMut::with_capacity(chunk_size);
            let eof = fill_chunk(&mut reader, &mut buf, chunk_size).await?;
            if !buf.is_empty() {
                yield buf.freeze();
            }
            if eof {
                break;
            }
        }
    })
}
