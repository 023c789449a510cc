//! Fixed-radix path scheme
//!
//! Provides [`PathScheme`], the encoding that turns sibling ordinals into
//! fixed-width path steps whose lexical order matches numeric order.

use crate::path::{MaterializedPath, PathError};

/// Alphabet used by the default scheme (base 36, digits before letters)
pub const DEFAULT_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Characters per path step in the default scheme
pub const DEFAULT_STEPLEN: usize = 4;

/// Depth of a root node
pub const ROOT_DEPTH: usize = 1;

/// Encoding rules for a materialized-path tree
///
/// Every tree level occupies exactly `steplen` characters drawn from
/// `alphabet`. The alphabet must be in ascending lexical order so that
/// string comparison of two steps agrees with comparison of their ordinals.
///
/// # Examples
/// With the default scheme, ordinal 1 encodes to `0001` and ordinal 36
/// encodes to `0010`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathScheme {
    alphabet: Vec<char>,
    steplen: usize,
}

impl PathScheme {
    /// Create a scheme from an alphabet and step length
    ///
    /// # Errors
    /// Returns [`PathError::InvalidScheme`] if the alphabet has fewer than two
    /// characters, contains duplicates or non-ASCII characters, is not sorted,
    /// or if `steplen` is zero or too long for its ordinals to fit a `u64`.
    pub fn new(alphabet: &str, steplen: usize) -> Result<Self, PathError> {
        let chars: Vec<char> = alphabet.chars().collect();

        if chars.len() < 2 {
            return Err(PathError::InvalidScheme(
                "alphabet needs at least two characters".to_string(),
            ));
        }
        if steplen == 0 {
            return Err(PathError::InvalidScheme(
                "step length must be positive".to_string(),
            ));
        }
        if !chars.iter().all(char::is_ascii) {
            return Err(PathError::InvalidScheme(
                "alphabet must be ASCII".to_string(),
            ));
        }
        if chars.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PathError::InvalidScheme(
                "alphabet must be strictly ascending with no duplicates".to_string(),
            ));
        }
        if step_capacity(chars.len() as u64, steplen).is_none() {
            return Err(PathError::InvalidScheme(format!(
                "{steplen} base-{} digits do not fit a 64-bit ordinal",
                chars.len()
            )));
        }

        Ok(Self {
            alphabet: chars,
            steplen,
        })
    }

    /// Radix of the scheme
    #[inline]
    #[must_use]
    pub fn radix(&self) -> u64 {
        self.alphabet.len() as u64
    }

    /// Characters per tree level
    #[inline]
    #[must_use]
    pub fn steplen(&self) -> usize {
        self.steplen
    }

    /// Alphabet as a string
    #[must_use]
    pub fn alphabet(&self) -> String {
        self.alphabet.iter().collect()
    }

    /// Largest ordinal that fits in one step
    #[must_use]
    pub fn max_ordinal(&self) -> u64 {
        step_capacity(self.radix(), self.steplen)
            .and_then(|capacity| u64::try_from(capacity - 1).ok())
            .unwrap_or(u64::MAX)
    }

    /// Encode a sibling ordinal as one fixed-width step
    ///
    /// # Errors
    /// Returns [`PathError::Overflow`] if the ordinal needs more than
    /// `steplen` characters.
    pub fn encode_step(&self, ordinal: u64) -> Result<String, PathError> {
        if ordinal > self.max_ordinal() {
            return Err(PathError::Overflow {
                ordinal,
                max: self.max_ordinal(),
            });
        }

        let radix = self.radix();
        let mut digits = vec![self.alphabet[0]; self.steplen];
        let mut rest = ordinal;
        for slot in digits.iter_mut().rev() {
            // radix is the alphabet length, so the remainder always indexes it
            *slot = self.alphabet[(rest % radix) as usize];
            rest /= radix;
        }

        Ok(digits.into_iter().collect())
    }

    /// Decode one step back into its ordinal
    ///
    /// # Errors
    /// Returns an error if the step has the wrong width or contains a
    /// character outside the alphabet.
    pub fn decode_step(&self, step: &str) -> Result<u64, PathError> {
        if step.chars().count() != self.steplen {
            return Err(PathError::InvalidPath {
                path: step.to_string(),
                reason: format!("step must be {} characters", self.steplen),
            });
        }

        step.chars().try_fold(0u64, |acc, c| {
            let digit = self
                .alphabet
                .iter()
                .position(|&a| a == c)
                .ok_or(PathError::InvalidCharacter(c))?;
            // `new` bounds radix^steplen, so a full step cannot overflow
            Ok(acc * self.radix() + digit as u64)
        })
    }

    /// Check a raw path string against the scheme
    ///
    /// # Errors
    /// Returns an error for empty paths, lengths that are not a multiple of
    /// the step length, or characters outside the alphabet.
    pub fn validate(&self, path: &str) -> Result<(), PathError> {
        if path.is_empty() {
            return Err(PathError::InvalidPath {
                path: String::new(),
                reason: "path is empty".to_string(),
            });
        }
        if path.len() % self.steplen != 0 {
            return Err(PathError::InvalidPath {
                path: path.to_string(),
                reason: format!("length is not a multiple of {}", self.steplen),
            });
        }
        if let Some(c) = path.chars().find(|c| !self.alphabet.contains(c)) {
            return Err(PathError::InvalidCharacter(c));
        }
        Ok(())
    }

    /// Parse a raw string into a validated path
    ///
    /// # Errors
    /// See [`PathScheme::validate`].
    pub fn parse(&self, path: &str) -> Result<MaterializedPath, PathError> {
        self.validate(path)?;
        Ok(MaterializedPath::new_unchecked(path.to_string(), self.steplen))
    }

    /// Path of the root node with the given ordinal
    ///
    /// # Errors
    /// Returns [`PathError::Overflow`] if the ordinal does not fit a step.
    pub fn root_path(&self, ordinal: u64) -> Result<MaterializedPath, PathError> {
        let step = self.encode_step(ordinal)?;
        Ok(MaterializedPath::new_unchecked(step, self.steplen))
    }

    /// Path of the child with `ordinal` under a parent at `parent_depth`
    ///
    /// Only the first `parent_depth` steps of `parent_path` are kept, so a
    /// parent handle carrying a stale, longer path still yields a child one
    /// level below `parent_depth`.
    ///
    /// # Errors
    /// Returns an error if the parent path is shorter than its depth implies,
    /// is malformed, or if the ordinal overflows a step.
    pub fn child_path(
        &self,
        parent_path: &str,
        parent_depth: usize,
        ordinal: u64,
    ) -> Result<MaterializedPath, PathError> {
        self.validate(parent_path)?;

        let base_len = parent_depth * self.steplen;
        let base = parent_path.get(..base_len).ok_or_else(|| PathError::InvalidPath {
            path: parent_path.to_string(),
            reason: format!("too short for depth {parent_depth}"),
        })?;

        let step = self.encode_step(ordinal)?;
        Ok(MaterializedPath::new_unchecked(
            format!("{base}{step}"),
            self.steplen,
        ))
    }
}

impl Default for PathScheme {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.chars().collect(),
            steplen: DEFAULT_STEPLEN,
        }
    }
}

/// Number of distinct steps, if the largest ordinal fits a `u64`
fn step_capacity(radix: u64, steplen: usize) -> Option<u128> {
    let exponent = u32::try_from(steplen).ok()?;
    u128::from(radix)
        .checked_pow(exponent)
        .filter(|&capacity| capacity - 1 <= u128::from(u64::MAX))
}
