// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Correlation vectors.
//!
//! A correlation vector traces a causal chain of operations across calls and
//! acknowledgments. Layout: a random base64 base followed by `.`-separated
//! decimal elements, e.g. `tul4NUsfs9Cl7mOf.1.2`.
//!
//! - **Root**: fresh random base with a single `0` element.
//! - **Extend**: append a new `0` element (`base.1` -> `base.1.0`).
//! - **Increment**: bump the last element (`base.1.0` -> `base.1.1`).
//!
//! Two base sizes are accepted: 16 characters (max vector length 63) and
//! 22 characters (max length 127). Generated roots always use 22. When an
//! extend or increment would exceed the maximum length the vector is
//! terminated with `!` and stays frozen from then on.

use crate::error::CvError;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use std::fmt;
use std::str::FromStr;

/// Base length of generated vectors.
pub const BASE_LENGTH: usize = 22;

/// Maximum length of a vector with a 22-character base.
pub const MAX_LENGTH: usize = 127;

const LEGACY_BASE_LENGTH: usize = 16;
const LEGACY_MAX_LENGTH: usize = 63;
const TERMINATOR: char = '!';

/// A chained correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationVector {
    base: String,
    elements: Vec<u32>,
    terminated: bool,
}

impl CorrelationVector {
    /// Create a fresh root vector (`<random base>.0`).
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        fastrand::fill(&mut bytes);

        Self {
            base: STANDARD_NO_PAD.encode(bytes),
            elements: vec![0],
            terminated: false,
        }
    }

    /// Parse a vector from its string form.
    pub fn parse(value: &str) -> Result<Self, CvError> {
        if value.is_empty() {
            return Err(CvError::Empty);
        }

        let (body, terminated) = match value.strip_suffix(TERMINATOR) {
            Some(body) => (body, true),
            None => (value, false),
        };

        let mut parts = body.split('.');
        let base = parts.next().unwrap_or_default();

        let base_ok = (base.len() == BASE_LENGTH || base.len() == LEGACY_BASE_LENGTH)
            && base
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/');
        if !base_ok {
            return Err(CvError::InvalidBase(base.to_string()));
        }

        let elements = parts
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| CvError::InvalidElement(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if elements.is_empty() {
            return Err(CvError::InvalidElement(String::new()));
        }

        let max = max_length_for(base.len());
        if body.len() > max {
            return Err(CvError::TooLong { max });
        }

        Ok(Self {
            base: base.to_string(),
            elements,
            terminated,
        })
    }

    /// Derive a child vector from an application-provided base vector.
    ///
    /// Falls back to a fresh root if `base` does not parse.
    pub fn extend_from(base: &str) -> Self {
        match Self::parse(base) {
            Ok(parent) => parent.extend(),
            Err(e) => {
                log::warn!(
                    "[cv] ignoring invalid base correlation vector {:?}: {}",
                    base,
                    e
                );
                Self::new()
            }
        }
    }

    /// Return a child vector with a new `0` element appended.
    pub fn extend(&self) -> Self {
        if self.terminated {
            return self.clone();
        }

        let mut next = self.clone();
        next.elements.push(0);
        if next.body_len() > self.max_length() {
            return self.terminate();
        }
        next
    }

    /// Return a sibling vector with the last element incremented.
    pub fn increment(&self) -> Self {
        if self.terminated {
            return self.clone();
        }

        let mut next = self.clone();
        if let Some(last) = next.elements.last_mut() {
            match last.checked_add(1) {
                Some(v) => *last = v,
                None => return self.terminate(),
            }
        }
        if next.body_len() > self.max_length() {
            return self.terminate();
        }
        next
    }

    /// Base part of the vector.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Numeric elements following the base.
    pub fn elements(&self) -> &[u32] {
        &self.elements
    }

    /// True once the vector hit its maximum length.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn terminate(&self) -> Self {
        Self {
            terminated: true,
            ..self.clone()
        }
    }

    fn max_length(&self) -> usize {
        max_length_for(self.base.len())
    }

    fn body_len(&self) -> usize {
        self.base.len()
            + self
                .elements
                .iter()
                .map(|e| 1 + decimal_len(*e))
                .sum::<usize>()
    }
}

impl Default for CorrelationVector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        for element in &self.elements {
            write!(f, ".{}", element)?;
        }
        if self.terminated {
            write!(f, "{}", TERMINATOR)?;
        }
        Ok(())
    }
}

impl FromStr for CorrelationVector {
    type Err = CvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn max_length_for(base_len: usize) -> usize {
    if base_len == LEGACY_BASE_LENGTH {
        LEGACY_MAX_LENGTH
    } else {
        MAX_LENGTH
    }
}

fn decimal_len(mut value: u32) -> usize {
    let mut len = 1;
    while value >= 10 {
        value /= 10;
        len += 1;
    }
    len
}
