//! Error types for the scrambling core.

use thiserror::Error;

/// Errors raised by the grid, key, scrambling and validation operations.
///
/// None of these are transient: every variant is a deterministic function
/// of the inputs, so retrying with the same grid and key never helps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The solution holds fewer letters than the transform needs.
    #[error("too few letters to scramble: found {found}, minimum is {}", crate::scramble::MIN_LETTERS)]
    TooFewLetters { found: usize },

    /// The unscrambled solution does not match the stored fingerprint.
    #[error("incorrect key (fingerprint stored=0x{expected:04x} calc=0x{actual:04x})")]
    KeyMismatch { expected: u16, actual: u16 },

    /// A key that is not four digits in the accepted range.
    #[error("invalid key \"{0}\": expected four digits 1-9")]
    InvalidKey(String),

    /// Grid dimensions outside of 1..=39.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// A buffer whose length does not fit the grid it is applied to.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A letter buffer holding something other than `A`-`Z`.
    #[error("byte 0x{byte:02x} at index {index} is not a letter A-Z")]
    InvalidLetter { index: usize, byte: u8 },

    /// A version string not of the form `#.#[#]`.
    #[error("version \"{0}\" does not match the supported format #.#[#]")]
    InvalidVersion(String),

    /// A solution square outside `A-Z a-z 0-9 @ # $ % & + ? . :`.
    #[error("solution square {index} holds unsupported character 0x{byte:02x}")]
    InvalidSolution { index: usize, byte: u8 },

    /// A player state square outside the solution characters plus `-`.
    #[error("state square {index} holds unsupported character 0x{byte:02x}")]
    InvalidState { index: usize, byte: u8 },

    /// Solution and player state disagree about a black square.
    #[error("black squares in solution and state differ at square {index}")]
    BlackSquareMismatch { index: usize },

    /// Clue count that does not match the numbering of the solution.
    #[error("solution expects {expected} clues, but found {found}")]
    ClueCount { expected: usize, found: usize },

    /// A per-square extension section whose length is not `width * height`.
    #[error("section {tag} should be {expected} bytes long, found {actual}")]
    SectionLength {
        tag: String,
        expected: usize,
        actual: usize,
    },

    /// A malformed rebus table entry, or a rebus square whose key is missing
    /// from the table.
    #[error("invalid rebus data: {0}")]
    InvalidRebus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_too_few_letters() {
        let err = Error::TooFewLetters { found: 11 };
        assert_eq!(
            err.to_string(),
            "too few letters to scramble: found 11, minimum is 12"
        );
    }

    #[test]
    fn test_display_key_mismatch() {
        let err = Error::KeyMismatch {
            expected: 0xfd8b,
            actual: 0x0007,
        };
        assert_eq!(
            err.to_string(),
            "incorrect key (fingerprint stored=0xfd8b calc=0x0007)"
        );
    }

    #[test]
    fn test_display_invalid_key() {
        let err = Error::InvalidKey("12a4".into());
        assert_eq!(err.to_string(), "invalid key \"12a4\": expected four digits 1-9");
    }

    #[test]
    fn test_display_invalid_letter() {
        let err = Error::InvalidLetter {
            index: 3,
            byte: b'a',
        };
        assert_eq!(err.to_string(), "byte 0x61 at index 3 is not a letter A-Z");
    }

    #[test]
    fn test_display_clue_count() {
        let err = Error::ClueCount {
            expected: 2,
            found: 4,
        };
        assert_eq!(err.to_string(), "solution expects 2 clues, but found 4");
    }
}
