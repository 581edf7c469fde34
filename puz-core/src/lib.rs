//! core functionality for scrambling and unscrambling
//! the solutions of Across Lite (.puz) crosswords
//!
//! # Modules
//!
//! - `checksum`: rotate-and-add checksum used by the file format
//! - `grid`: solution grid and its column-major letter view
//! - `key`: four-digit scrambling keys
//! - `scramble`: the keyed permutation network and its inverse
//! - `puzfile`: .puz file reading, writing and checksum upkeep
//! - `validate`: consistency checks run whenever a puzzle is loaded
//! - `textfile`: Across Lite text format import and export
//! - `backup`: timestamped backups of files modified in place

pub mod backup;
pub mod checksum;
pub mod error;
pub mod grid;
pub mod key;
pub mod puzfile;
pub mod scramble;
pub mod textfile;
pub mod validate;

// Re-export commonly used items
pub use backup::{BackupInfo, BackupManager};
pub use checksum::checksum;
pub use error::Error;
pub use grid::{Grid, is_black, is_letter};
pub use key::Key;
pub use puzfile::{ChecksumReport, Extension, PuzFile, Toggle};
pub use scramble::{MIN_LETTERS, scramble, scramble_letters, unscramble, unscramble_letters};
pub use textfile::{Indent, LineEnding, TextStyle};
