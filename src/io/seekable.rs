//! Seekable stream traits
//!
//! The engine consumes its byte stream through these traits. Readers only
//! need positional reads; writers also read back their own header when a
//! file is opened for appending.

use std::io::{Read, Seek, SeekFrom, Write};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

// Blanket implementation for any type that implements the required traits
impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

/// Trait for streams that can read, write and seek
pub trait SeekableStream: Read + Write + Seek + Send + Sync {}

impl<T: Read + Write + Seek + Send + Sync> SeekableStream for T {}

/// Returns the stream length, restoring the current position
pub fn stream_length<S: Seek + ?Sized>(stream: &mut S) -> std::io::Result<u64> {
    let position = stream.stream_position()?;
    let length = stream.seek(SeekFrom::End(0))?;
    if position != length {
        stream.seek(SeekFrom::Start(position))?;
    }
    Ok(length)
}
