use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HashError;
use crate::fingerprint::Fingerprint;

/// Ordered per-segment fingerprints of one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MultiFingerprint {
    segments: Vec<Fingerprint>,
}

impl MultiFingerprint {
    pub fn new(segments: Vec<Fingerprint>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Fingerprint] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// For every segment of `self`, the closest segment of `other` by Hamming
    /// distance. Segments within `hamming_cutoff` count as matched.
    ///
    /// Returns the number of matched segments and the sum of their distances.
    /// Pairs of unequal length never match.
    pub fn hash_diff(&self, other: &MultiFingerprint, hamming_cutoff: f64) -> (usize, u32) {
        let mut matched = 0;
        let mut total = 0;
        for segment in &self.segments {
            let closest = other
                .segments
                .iter()
                .filter_map(|candidate| segment.distance(candidate).ok())
                .min();
            if let Some(distance) = closest {
                if f64::from(distance) <= hamming_cutoff {
                    matched += 1;
                    total += distance;
                }
            }
        }
        (matched, total)
    }

    /// Bits a segment may differ by at `bit_error_rate`, scaled by the length
    /// of the first segment. `None` when there are no segments.
    pub fn hamming_cutoff(&self, bit_error_rate: f64) -> Option<f64> {
        self.segments
            .first()
            .map(|fp| fp.bit_len() as f64 * bit_error_rate)
    }

    /// True if at least `region_cutoff` segments of `self` find a counterpart
    /// in `other` within `bit_error_rate` of the fingerprint length.
    ///
    /// Not symmetric: `self` drives the comparison.
    pub fn matches(&self, other: &MultiFingerprint, region_cutoff: usize, bit_error_rate: f64) -> bool {
        let Some(hamming_cutoff) = self.hamming_cutoff(bit_error_rate) else {
            return false;
        };
        let (matched, _) = self.hash_diff(other, hamming_cutoff);
        matched >= region_cutoff
    }
}

impl fmt::Display for MultiFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for MultiFingerprint {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let segments = s
            .split(',')
            .map(|part| Fingerprint::from_hex(part.trim()))
            .collect::<Result<_, _>>()?;
        Ok(Self { segments })
    }
}

impl From<MultiFingerprint> for String {
    fn from(value: MultiFingerprint) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for MultiFingerprint {
    type Error = HashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
