//! Keyed scrambling of a crossword solution.
//!
//! The letters of the solution are read column-wise into a buffer, mapped to
//! `0..26`, spread over a notional 16-column table and then run through four
//! keyed rounds. Round `k` views the buffer as a table `2^(4-k)` columns
//! wide, adds the key digits down its columns and shifts `key[k]` rows from
//! the top of the table to the bottom. When the letter count is even every
//! shifted row is also rotated right by one cell.
//!
//! Unscrambling runs the rounds backwards with every step inverted, then
//! checks the result against the fingerprint taken before scrambling.

use crate::checksum::checksum;
use crate::error::Error;
use crate::grid::{Grid, is_letter};
use crate::key::Key;

/// Fewest letters a solution needs before it can be scrambled.
pub const MIN_LETTERS: usize = 12;

/// Column count of the table used by the initial interleave.
const INTERLEAVE_STEP: usize = 16;

/// Number of keyed rounds.
const ROUNDS: usize = 4;

/// Visits every index of a `size`-long buffer exactly once.
///
/// Starting just before index 0, each step advances by `step` and wraps by
/// `size | 1`. Reading the produced indices in order walks a table `step`
/// columns wide down its columns, rightmost column first. The modulus is odd
/// and `step` is a power of two, so no index repeats.
#[derive(Debug, Clone)]
pub(crate) struct IndexWalk {
    size: usize,
    step: usize,
    modulus: usize,
    cursor: usize,
    remaining: usize,
}

impl IndexWalk {
    pub(crate) fn new(size: usize, step: usize) -> Self {
        assert!(step.is_power_of_two(), "walk step {} is not a power of two", step);
        let modulus = size | 1;
        Self {
            size,
            step: step % modulus,
            modulus,
            // virtual index -1
            cursor: modulus - 1,
            remaining: size,
        }
    }
}

impl Iterator for IndexWalk {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        self.cursor = (self.cursor + self.step) % self.modulus;
        debug_assert!(self.cursor < self.size);
        Some(self.cursor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for IndexWalk {}

/// Table width of round `k`, before it is folded into the buffer size.
#[inline]
fn round_step(round: usize) -> usize {
    1 << (4 - round)
}

/// Row length used by the shifts of one round. Tables wider than the
/// buffer wrap around by `size | 1`.
#[inline]
fn shift_len(round: usize, size: usize) -> usize {
    let n = round_step(round);
    if n > size { n - (size | 1) } else { n }
}

fn check_size(size: usize) -> Result<(), Error> {
    if size < MIN_LETTERS {
        return Err(Error::TooFewLetters { found: size });
    }
    Ok(())
}

fn to_values(letters: &[u8]) -> Result<Vec<u8>, Error> {
    letters
        .iter()
        .enumerate()
        .map(|(index, &byte)| {
            if is_letter(byte) {
                Ok(byte - b'A')
            } else {
                Err(Error::InvalidLetter { index, byte })
            }
        })
        .collect()
}

fn to_letters(values: &[u8]) -> Vec<u8> {
    values.iter().map(|&v| v + b'A').collect()
}

fn scramble_values(buf: &mut Vec<u8>, key: Key) {
    let size = buf.len();
    let even = size % 2 == 0;

    let mut spread = vec![0u8; size];
    for (src, dst) in IndexWalk::new(size, INTERLEAVE_STEP).enumerate() {
        spread[dst] = buf[src];
    }
    *buf = spread;

    for k in 0..ROUNDS {
        for (i, j) in IndexWalk::new(size, round_step(k)).enumerate() {
            buf[j] = (buf[j] + key.digit(i)) % 26;
        }

        let n = shift_len(k, size);
        for _ in 0..key.digit(k) {
            if even {
                buf[..n].rotate_right(1);
            }
            buf.rotate_left(n);
        }
    }
}

fn unscramble_values(buf: &mut Vec<u8>, key: Key) {
    let size = buf.len();
    let even = size % 2 == 0;

    for k in (0..ROUNDS).rev() {
        let n = shift_len(k, size);
        for _ in 0..key.digit(k) {
            buf.rotate_right(n);
            if even {
                buf[..n].rotate_left(1);
            }
        }

        for (i, j) in IndexWalk::new(size, round_step(k)).enumerate() {
            buf[j] = (buf[j] + 26 - key.digit(i)) % 26;
        }
    }

    let mut gathered = vec![0u8; size];
    for (dst, src) in IndexWalk::new(size, INTERLEAVE_STEP).enumerate() {
        gathered[dst] = buf[src];
    }
    *buf = gathered;
}

/// Scrambles a column-wise letter buffer. Only `A`-`Z` bytes are accepted.
pub fn scramble_letters(letters: &[u8], key: Key) -> Result<Vec<u8>, Error> {
    check_size(letters.len())?;

    let mut buf = to_values(letters)?;
    scramble_values(&mut buf, key);
    Ok(to_letters(&buf))
}

/// Inverse of [`scramble_letters`]. Performs no verification.
pub fn unscramble_letters(letters: &[u8], key: Key) -> Result<Vec<u8>, Error> {
    check_size(letters.len())?;

    let mut buf = to_values(letters)?;
    unscramble_values(&mut buf, key);
    Ok(to_letters(&buf))
}

/// Scrambles `grid` in place and returns the fingerprint of the original
/// letters, which is needed later to verify the key.
pub fn scramble(grid: &mut Grid, key: Key) -> Result<u16, Error> {
    let letters = grid.extract();
    check_size(letters.len())?;

    let fingerprint = checksum(0, &letters);
    let scrambled = scramble_letters(&letters, key)?;
    grid.insert(&scrambled)?;

    Ok(fingerprint)
}

/// Unscrambles `grid` in place. The grid is only written once the result
/// matches `fingerprint`; on [`Error::KeyMismatch`] it is left untouched.
pub fn unscramble(grid: &mut Grid, key: Key, fingerprint: u16) -> Result<(), Error> {
    let letters = grid.extract();
    let plain = unscramble_letters(&letters, key)?;

    let actual = checksum(0, &plain);
    if actual != fingerprint {
        return Err(Error::KeyMismatch {
            expected: fingerprint,
            actual,
        });
    }

    grid.insert(&plain)
}
