/// Four-digit scrambling keys
use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Key used by Across Lite when the clock gives too few nonzero digits.
pub const FALLBACK_KEY: Key = Key([4, 2, 3, 7]);

/// A scrambling key: four decimal digits.
///
/// Each digit is both an additive offset (applied cyclically across the
/// masking walk) and the rotation count of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key([u8; 4]);

impl Key {
    /// Builds a key from raw digits. Zero digits are accepted here; they
    /// only disable the rotation and offset they control.
    pub fn from_digits(digits: [u8; 4]) -> Result<Self, Error> {
        if digits.iter().any(|&d| d > 9) {
            return Err(Error::InvalidKey(format!("{:?}", digits)));
        }
        Ok(Self(digits))
    }

    /// Picks a key the way Across Lite does from a unix timestamp: drop the
    /// last digit, then collect successive nonzero decimal digits.
    pub fn from_timestamp(secs: i64) -> Self {
        let mut t = secs;
        let mut digits = [0u8; 4];
        let mut n = 0;

        while t > 0 && n < 4 {
            t /= 10;
            let d = (t % 10) as u8;
            if d != 0 {
                digits[n] = d;
                n += 1;
            }
        }

        if n < 4 { FALLBACK_KEY } else { Self(digits) }
    }

    /// Generates a key from the current wall-clock time.
    pub fn generate() -> Self {
        Self::from_timestamp(chrono::Utc::now().timestamp())
    }

    pub fn digits(&self) -> [u8; 4] {
        self.0
    }

    /// Digit `i`, taken cyclically.
    #[inline]
    pub(crate) fn digit(&self, i: usize) -> u8 {
        self.0[i % 4]
    }
}

impl FromStr for Key {
    type Err = Error;

    /// Parses user input: exactly four characters, each `1`-`9`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| (b'1'..=b'9').contains(b)) {
            return Err(Error::InvalidKey(s.to_string()));
        }

        let mut digits = [0u8; 4];
        for (d, b) in digits.iter_mut().zip(bytes) {
            *d = b - b'0';
        }
        Ok(Self(digits))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in self.0 {
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let key: Key = "7294".parse().unwrap();
        assert_eq!(key.digits(), [7, 2, 9, 4]);
        assert_eq!(key.to_string(), "7294");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", "123", "12345", "1204", "12a4", " 123", "-123"] {
            assert_eq!(
                bad.parse::<Key>(),
                Err(Error::InvalidKey(bad.to_string())),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_from_digits_allows_zero() {
        let key = Key::from_digits([1, 0, 0, 0]).unwrap();
        assert_eq!(key.to_string(), "1000");
        assert!(Key::from_digits([1, 2, 10, 4]).is_err());
    }

    #[test]
    fn test_from_timestamp() {
        // 1700000000 / 10 -> digits 0,0,0,0,0,0,7,1 (skipping zeros: 7, 1)
        assert_eq!(Key::from_timestamp(1_700_000_000), FALLBACK_KEY);
        // 1234567890 / 10 = 123456789 -> 9,8,7,6
        assert_eq!(Key::from_timestamp(1_234_567_890).digits(), [9, 8, 7, 6]);
        // zeros are skipped: 1203040506 / 10 = 120304050 -> 5,4,3,2
        assert_eq!(Key::from_timestamp(1_203_040_506).digits(), [5, 4, 3, 2]);
        assert_eq!(Key::from_timestamp(0), FALLBACK_KEY);
        assert_eq!(Key::from_timestamp(-5), FALLBACK_KEY);
    }

    #[test]
    fn test_generate_is_four_digits() {
        let key = Key::generate();
        assert!(key.digits().iter().all(|&d| d <= 9));
        assert_eq!(key.to_string().len(), 4);
    }

    #[test]
    fn test_digit_cycles() {
        let key: Key = "1234".parse().unwrap();
        let got: Vec<u8> = (0..6).map(|i| key.digit(i)).collect();
        assert_eq!(got, vec![1, 2, 3, 4, 1, 2]);
    }
}
