//! Bit-matrix fingerprints and their hexadecimal wire form.
//!
//! A fingerprint is stored as a flat row-major `Vec<bool>` with its
//! dimensions alongside, so every row has the same length by construction.
//! The hex form reads the flattened bits as one unsigned big-endian integer,
//! zero-padded on the left to `ceil(bits / 4)` digits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HashError;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint {
    rows: usize,
    cols: usize,
    bits: Vec<bool>,
}

impl Fingerprint {
    /// Build a `rows x cols` fingerprint from a row-major bit vector.
    pub fn from_bits(rows: usize, cols: usize, bits: Vec<bool>) -> Result<Self, HashError> {
        if rows == 0 || cols == 0 {
            return Err(HashError::format(format!(
                "fingerprint needs at least one row and column, got {}x{}",
                rows, cols
            )));
        }
        if bits.len() != rows * cols {
            return Err(HashError::format(format!(
                "{} bits cannot fill a {}x{} fingerprint",
                bits.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, bits })
    }

    pub(crate) fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        debug_assert!(rows > 0 && cols > 0);
        let mut bits = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                bits.push(f(r, c));
            }
        }
        Self { rows, cols, bits }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of bits.
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        if row < self.rows && col < self.cols {
            Some(self.bits[row * self.cols + col])
        } else {
            None
        }
    }

    /// Flattened row-major view of the bits.
    pub fn as_bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.bits)
    }

    /// Decode a square fingerprint: `len(hex) * 4` must be a perfect square.
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        let bits = decode_hex(hex)?;
        let size = bits.len().isqrt();
        if size * size != bits.len() {
            return Err(HashError::format(format!(
                "{} bits is not a perfect square",
                bits.len()
            )));
        }
        Self::from_bits(size, size, bits)
    }

    /// Decode a fingerprint with a known row width, as produced by the color hash.
    pub fn from_hex_flat(hex: &str, width: usize) -> Result<Self, HashError> {
        if width == 0 {
            return Err(HashError::format("row width must be positive"));
        }
        let bits = decode_hex(hex)?;
        if bits.len() % width != 0 {
            return Err(HashError::format(format!(
                "{} bits do not divide into rows of {}",
                bits.len(),
                width
            )));
        }
        Self::from_bits(bits.len() / width, width, bits)
    }

    /// Hamming distance. Only the flattened lengths have to agree.
    pub fn distance(&self, other: &Fingerprint) -> Result<u32, HashError> {
        if self.bits.len() != other.bits.len() {
            return Err(HashError::SizeMismatch {
                left: self.bits.len(),
                right: other.bits.len(),
            });
        }
        Ok(self
            .bits
            .iter()
            .zip(&other.bits)
            .filter(|(a, b)| a != b)
            .count() as u32)
    }
}

/// Render row-major bits as lowercase hex, MSB first. Empty input gives an empty string.
pub fn to_hex(bits: &[bool]) -> String {
    let mut out = String::with_capacity(bits.len().div_ceil(4));
    // Leading pad bits are zero, so the first nibble starts partially filled.
    let mut filled = (4 - bits.len() % 4) % 4;
    let mut nibble = 0usize;
    for &bit in bits {
        nibble = (nibble << 1) | usize::from(bit);
        filled += 1;
        if filled == 4 {
            out.push(HEX_DIGITS[nibble] as char);
            nibble = 0;
            filled = 0;
        }
    }
    out
}

fn decode_hex(hex: &str) -> Result<Vec<bool>, HashError> {
    if hex.is_empty() {
        return Err(HashError::format("hex string is empty"));
    }
    let mut bits = Vec::with_capacity(hex.len() * 4);
    for ch in hex.chars() {
        let digit = ch
            .to_digit(16)
            .ok_or_else(|| HashError::format(format!("invalid hex character {:?}", ch)))?;
        for shift in (0..4).rev() {
            bits.push((digit >> shift) & 1 == 1);
        }
    }
    Ok(bits)
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = HashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}
