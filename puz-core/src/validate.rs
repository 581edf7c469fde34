//! Consistency checks for a puzzle's grids, clues and version string.
use crate::error::Error;
use crate::grid::{Grid, is_black};

const SYMBOLS: &[u8] = b"@#$%&+?";

/// Solution squares: letters, digits, rebus symbols and black squares.
pub fn is_solution_char(cell: u8) -> bool {
    cell.is_ascii_alphanumeric() || SYMBOLS.contains(&cell) || is_black(cell)
}

/// Player state squares: anything a solution may hold, plus `-` for blank.
pub fn is_state_char(cell: u8) -> bool {
    cell == b'-' || is_solution_char(cell)
}

/// Accepts `#.#` and `#.##`.
pub fn check_version(version: &str) -> Result<(), Error> {
    let ok = match version.split_once('.') {
        Some((major, minor)) => {
            major.len() == 1
                && (1..=2).contains(&minor.len())
                && major.bytes().chain(minor.bytes()).all(|b| b.is_ascii_digit())
        }
        None => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidVersion(version.to_string()))
    }
}

pub fn check_solution(solution: &Grid) -> Result<(), Error> {
    match solution.cells().iter().position(|&c| !is_solution_char(c)) {
        Some(index) => Err(Error::InvalidSolution {
            index,
            byte: solution.cells()[index],
        }),
        None => Ok(()),
    }
}

pub fn check_state(solution: &Grid, state: &[u8]) -> Result<(), Error> {
    let cells = solution.cells();
    if state.len() != cells.len() {
        return Err(Error::LengthMismatch {
            expected: cells.len(),
            actual: state.len(),
        });
    }
    if let Some(index) = (0..cells.len()).find(|&i| is_black(cells[i]) != is_black(state[i])) {
        return Err(Error::BlackSquareMismatch { index });
    }
    match state.iter().position(|&c| !is_state_char(c)) {
        Some(index) => Err(Error::InvalidState {
            index,
            byte: state[index],
        }),
        None => Ok(()),
    }
}

pub fn check_clue_count(solution: &Grid, found: usize) -> Result<(), Error> {
    let expected = solution.clue_count();
    if expected != found {
        return Err(Error::ClueCount { expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cells: &[u8]) -> Grid {
        Grid::new(2, 2, cells.to_vec()).unwrap()
    }

    #[test]
    fn test_version_format() {
        assert!(check_version("1.2").is_ok());
        assert!(check_version("1.3").is_ok());
        assert!(check_version("2.0").is_ok());
        assert!(check_version("1.21").is_ok());

        for bad in ["1", "", "1.", ".3", "1.2c", "12.3", "1.234", "a.b"] {
            assert_eq!(
                check_version(bad),
                Err(Error::InvalidVersion(bad.to_string())),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_solution_characters() {
        assert!(check_solution(&grid(b"ABCD")).is_ok());
        assert!(check_solution(&grid(b"a1.:")).is_ok());
        assert!(check_solution(&grid(b"@#$%")).is_ok());

        assert_eq!(
            check_solution(&grid(b"AB^D")),
            Err(Error::InvalidSolution { index: 2, byte: b'^' })
        );
        assert!(check_solution(&grid(b"ABC;")).is_err());
        assert!(check_solution(&grid(b"ABC-")).is_err());
    }

    #[test]
    fn test_state_length() {
        let solution = grid(b"ABCD");
        assert_eq!(
            check_state(&solution, b"-"),
            Err(Error::LengthMismatch {
                expected: 4,
                actual: 1
            })
        );
        assert!(check_state(&solution, b"-----").is_err());
    }

    #[test]
    fn test_state_black_squares_match() {
        assert_eq!(
            check_state(&grid(b"AB.D"), b"----"),
            Err(Error::BlackSquareMismatch { index: 2 })
        );
        assert_eq!(
            check_state(&grid(b"ABCD"), b"-.--"),
            Err(Error::BlackSquareMismatch { index: 1 })
        );
        assert!(check_state(&grid(b"AB.D"), b"--.-").is_ok());
    }

    #[test]
    fn test_state_characters() {
        let solution = grid(b"ABCD");
        assert_eq!(
            check_state(&solution, b"AB^D"),
            Err(Error::InvalidState { index: 2, byte: b'^' })
        );
        assert!(check_state(&solution, b"ABC-").is_ok());
    }

    #[test]
    fn test_clue_count() {
        assert!(check_clue_count(&grid(b"ABCD"), 4).is_ok());
        assert_eq!(
            check_clue_count(&grid(b".BCD"), 4),
            Err(Error::ClueCount {
                expected: 2,
                found: 4
            })
        );
        assert_eq!(
            check_clue_count(&grid(b"ABCD"), 5),
            Err(Error::ClueCount {
                expected: 4,
                found: 5
            })
        );
        assert!(check_clue_count(&grid(b"ABCD"), 3).is_err());
    }
}
