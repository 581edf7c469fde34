use anyhow::{Context, Result};
use puz_core::{Key, PuzFile};
use std::path::Path;

/// Service for scrambling and unscrambling puzzle files on disk
pub struct PuzzleService;

impl PuzzleService {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a puzzle file
    pub fn load(&self, path: &Path) -> Result<PuzFile> {
        PuzFile::read(path)
    }

    /// Scramble the puzzle at `path` in place, returning the fingerprint
    pub fn scramble(&self, path: &Path, key: Key) -> Result<u16> {
        let mut puz = self.load(path)?;
        let fingerprint = puz.scramble(key)?;
        puz.write(path)?;
        Ok(fingerprint)
    }

    /// Unscramble the puzzle at `path` in place; the file is left alone if
    /// the key is wrong
    pub fn unscramble(&self, path: &Path, key: Key) -> Result<()> {
        let mut puz = self.load(path)?;
        puz.unscramble(key)?;
        puz.write(path)
    }

    /// Write the puzzle at `path` as an Across Lite text file
    pub fn export_text(&self, path: &Path, dest: &Path) -> Result<()> {
        let text = self.load(path)?.to_text()?;
        std::fs::write(dest, text)
            .with_context(|| format!("Failed to write text puzzle: {}", dest.display()))
    }

    /// Solution grid as text, one row per line
    pub fn preview(&self, puz: &PuzFile) -> String {
        puz.solution()
            .rows()
            .map(|row| row.iter().map(|&c| c as char).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for PuzzleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puz_core::Grid;
    use tempfile::NamedTempFile;

    fn sample_file() -> NamedTempFile {
        let temp_file = NamedTempFile::new().unwrap();
        let grid = Grid::new(4, 4, b"ABCDEFGHIJKL.NO.".to_vec()).unwrap();
        let mut puz = PuzFile::new(grid);
        puz.set_title("Sample");
        puz.set_clues(&["Opener", "Ace", "Bee", "Sea", "Dee", "Eff", "Eye", "No"]);
        puz.write(temp_file.path()).unwrap();
        temp_file
    }

    #[test]
    fn test_scramble_and_unscramble_roundtrip() {
        let service = PuzzleService::new();
        let temp_file = sample_file();
        let original = std::fs::read(temp_file.path()).unwrap();
        let key: Key = "9999".parse().unwrap();

        let fingerprint = service.scramble(temp_file.path(), key).unwrap();
        assert_eq!(fingerprint, 0xfd8b);

        let loaded = service.load(temp_file.path()).unwrap();
        assert!(loaded.is_scrambled());
        assert_eq!(service.preview(&loaded), "MQTY\nUPKN\nRLVO\n.SX.");

        service.unscramble(temp_file.path(), key).unwrap();
        assert_eq!(std::fs::read(temp_file.path()).unwrap(), original);
    }

    #[test]
    fn test_wrong_key_keeps_file() {
        let service = PuzzleService::new();
        let temp_file = sample_file();

        service.scramble(temp_file.path(), "1234".parse().unwrap()).unwrap();
        let scrambled = std::fs::read(temp_file.path()).unwrap();

        assert!(service.unscramble(temp_file.path(), "4321".parse().unwrap()).is_err());
        assert_eq!(std::fs::read(temp_file.path()).unwrap(), scrambled);
    }

    #[test]
    fn test_export_text() {
        let service = PuzzleService::new();
        let temp_file = sample_file();
        let dest = NamedTempFile::new().unwrap();

        service.export_text(temp_file.path(), dest.path()).unwrap();
        let text = std::fs::read_to_string(dest.path()).unwrap();
        assert!(text.starts_with("<ACROSS PUZZLE V2>\n<TITLE>\n\tSample\n"));
        assert!(text.contains("<GRID>\n\tABCD\n\tEFGH\n\tIJKL\n\t.NO.\n"));

        service.scramble(temp_file.path(), "1234".parse().unwrap()).unwrap();
        assert!(service.export_text(temp_file.path(), dest.path()).is_err());
    }
}
