// src/gcode/mod.rs
//! Buffered G-code lines between the line reader and the command interpreter.
//! Lines are stored as raw bytes; parsing happens downstream.

pub mod reader;

pub use reader::{GCODE_LINES_PER_POLL, poll_lines};

use thiserror::Error;

use crate::ring_buffer::{RingBuffer, RingBufferError};

pub const GCODE_LINE_SIZE: usize = 48;
pub const GCODE_RING_BUFFER_SIZE: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GCodeError {
    #[error("G-code line of {len} bytes exceeds {max} bytes")]
    LineTooLong { len: usize, max: usize },
    #[error("G-code buffer error: {0}")]
    Buffer(#[from] RingBufferError),
}

/// One G-code line in fixed storage.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GCodeLine {
    bytes: [u8; GCODE_LINE_SIZE],
    len: usize,
}

impl GCodeLine {
    pub fn new(line: &[u8]) -> Result<Self, GCodeError> {
        if line.len() > GCODE_LINE_SIZE {
            return Err(GCodeError::LineTooLong {
                len: line.len(),
                max: GCODE_LINE_SIZE,
            });
        }
        let mut bytes = [0u8; GCODE_LINE_SIZE];
        bytes[..line.len()].copy_from_slice(line);
        Ok(Self { bytes, len: line.len() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for GCodeLine {
    fn default() -> Self {
        Self {
            bytes: [0u8; GCODE_LINE_SIZE],
            len: 0,
        }
    }
}

impl std::fmt::Debug for GCodeLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GCodeLine({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

pub type GCodeRingBuffer = RingBuffer<GCodeLine, GCODE_RING_BUFFER_SIZE>;
