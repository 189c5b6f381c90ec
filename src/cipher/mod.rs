//! Shift cipher applied independently to each chunk.
//!
//! The transform is stateless and character-local, which is what makes the
//! payload safe to split at any character boundary.

use crate::error::TransformError;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Shift letters forward (encrypt)
    #[value(name = "encrypt")]
    Forward,
    /// Shift letters backward (decrypt)
    #[value(name = "decrypt")]
    Inverse,
}

impl Direction {
    pub fn verb(&self) -> &'static str {
        match self {
            Direction::Forward => "encryption",
            Direction::Inverse => "decryption",
        }
    }
}

/// Parameters bound to every work item of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftParams {
    pub shift: i64,
    pub direction: Direction,
}

impl ShiftParams {
    pub fn new(shift: i64, direction: Direction) -> Self {
        Self { shift, direction }
    }

    /// Net rotation in `0..26` after applying direction.
    fn rotation(&self) -> u8 {
        let signed = match self.direction {
            Direction::Forward => self.shift,
            Direction::Inverse => -self.shift,
        };
        signed.rem_euclid(26) as u8
    }
}

/// Per-chunk transform executed by pool workers.
pub trait ChunkTransform: Send + Sync {
    fn apply(&self, text: &str) -> Result<String, TransformError>;
}

#[derive(Debug, Clone, Copy)]
pub struct CaesarShift {
    params: ShiftParams,
}

impl CaesarShift {
    pub fn new(params: ShiftParams) -> Self {
        Self { params }
    }
}

impl ChunkTransform for CaesarShift {
    fn apply(&self, text: &str) -> Result<String, TransformError> {
        Ok(shift_text(text, self.params))
    }
}

/// Rotate ASCII letters within their case; everything else passes through.
pub fn shift_text(text: &str, params: ShiftParams) -> String {
    let rotation = params.rotation();
    text.chars()
        .map(|c| {
            let base = match c {
                'a'..='z' => b'a',
                'A'..='Z' => b'A',
                _ => return c,
            };
            (((c as u8 - base + rotation) % 26) + base) as char
        })
        .collect()
}
