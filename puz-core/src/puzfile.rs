/// Across Lite .puz reading, writing and checksum upkeep
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use std::path::Path;

use crate::checksum::checksum;
use crate::error::Error;
use crate::grid::{Grid, MAX_DIMENSION};
use crate::key::Key;
use crate::scramble;
use crate::validate;

/// File magic, found two bytes into the header
pub const SIGNATURE: &[u8; 12] = b"ACROSS&DOWN\0";

/// Header layout: [file cksum | magic | cib cksum | masked cksums | version |
/// reserved | scrambled cksum | reserved | w | h | clues | type | scrambled]
pub const HEADER_LEN: usize = 0x34;

const FILE_CHECKSUM_POS: usize = 0x00;
const SIGNATURE_POS: usize = 0x02;
const CIB_CHECKSUM_POS: usize = 0x0e;
const MASKED_CHECKSUM_POS: usize = 0x10;
const VERSION_POS: usize = 0x18;
const SCRAMBLED_CHECKSUM_POS: usize = 0x1e;
const WIDTH_POS: usize = 0x2c;
const HEIGHT_POS: usize = 0x2d;
const CLUE_COUNT_POS: usize = 0x2e;
const PUZZLE_TYPE_POS: usize = 0x30;
const SCRAMBLED_TAG_POS: usize = 0x32;

/// Bit of the scrambled tag set while the solution is scrambled
pub const SCRAMBLED_FLAG: u8 = 0x04;

const MASK: &[u8; 8] = b"ICHEATED";

/// Per-square rebus keys: 0 for none, otherwise table key + 1
pub const REBUS_GRID: &str = "GRBS";
/// Rebus table: ` n:WORD;` entries
pub const REBUS_TABLE: &str = "RTBL";
/// Per-square markup flags
pub const MARKUP_GRID: &str = "GEXT";
/// Markup flag of a circled square
pub const MARKUP_CIRCLED: u8 = 0x80;

/// One extension section (GRBS, RTBL, LTIM, GEXT, ...)
/// Layout: [tag(4) | len(2 LE) | checksum(2 LE) | data | NUL]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub data: Vec<u8>,
    pub checksum: u16,
}

impl Extension {
    pub fn calc_checksum(&self) -> u16 {
        checksum(0, &self.data)
    }
}

/// Stored and recomputed header checksums
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumReport {
    pub file_stored: u16,
    pub file_calc: u16,
    pub cib_stored: u16,
    pub cib_calc: u16,
    pub masked_stored: [u8; 8],
    pub masked_calc: [u8; 8],
}

impl ChecksumReport {
    pub fn is_ok(&self) -> bool {
        self.file_stored == self.file_calc
            && self.cib_stored == self.cib_calc
            && self.masked_stored == self.masked_calc
    }
}

/// Outcome of [`PuzFile::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// The solution was scrambled; carries the stored fingerprint
    Scrambled(u16),
    Unscrambled,
}

/// An Across Lite puzzle, kept close to its on-disk form so that writing
/// it back only changes what scrambling touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzFile {
    preamble: Vec<u8>,
    header: [u8; HEADER_LEN],
    solution: Grid,
    state: Vec<u8>,
    title: Vec<u8>,
    author: Vec<u8>,
    copyright: Vec<u8>,
    clues: Vec<Vec<u8>>,
    notes: Vec<u8>,
    extensions: IndexMap<String, Extension>,
    trailing: Vec<u8>,
}

/// Cursor over the body of a puzzle file
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            bail!(
                "unexpected end of file at offset {} (wanted {} bytes, {} left)",
                self.pos,
                n,
                self.remaining()
            );
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_cstr(&mut self) -> Result<Vec<u8>> {
        let rest = &self.data[self.pos..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            bail!("unterminated string at offset {}", self.pos);
        };
        let out = rest[..len].to_vec();
        self.pos += len + 1;
        Ok(out)
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }
}

fn read_u16_at(buf: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([buf[pos], buf[pos + 1]])
}

fn write_u16_at(buf: &mut [u8], pos: usize, value: u16) {
    buf[pos..pos + 2].copy_from_slice(&value.to_le_bytes());
}

/// Decodes file text for display: latin-1 before version 2, UTF-8 after.
fn decode_text(bytes: &[u8], utf8: bool) -> String {
    if utf8 {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Inverse of `decode_text`. Characters outside latin-1 become `?`.
fn encode_text(text: &str, utf8: bool) -> Vec<u8> {
    if utf8 {
        text.as_bytes().to_vec()
    } else {
        text.chars().map(|c| u8::try_from(c).unwrap_or(b'?')).collect()
    }
}

impl PuzFile {
    /// Creates an unscrambled version 1.3 puzzle with a blank player state
    /// and no text.
    pub fn new(solution: Grid) -> Self {
        let mut header = [0u8; HEADER_LEN];
        header[SIGNATURE_POS..SIGNATURE_POS + SIGNATURE.len()].copy_from_slice(SIGNATURE);
        header[VERSION_POS..VERSION_POS + 4].copy_from_slice(b"1.3\0");
        header[WIDTH_POS] = solution.width() as u8;
        header[HEIGHT_POS] = solution.height() as u8;
        write_u16_at(&mut header, PUZZLE_TYPE_POS, 0x0001);

        let state = solution
            .cells()
            .iter()
            .map(|&c| if c == b'.' || c == b':' { c } else { b'-' })
            .collect();

        let mut puz = Self {
            preamble: Vec::new(),
            header,
            solution,
            state,
            title: Vec::new(),
            author: Vec::new(),
            copyright: Vec::new(),
            clues: Vec::new(),
            notes: Vec::new(),
            extensions: IndexMap::new(),
            trailing: Vec::new(),
        };
        puz.update_checksums();
        puz
    }

    /// Parses and validates a puzzle from its file bytes. Checksum
    /// mismatches are reported as warnings, not errors.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let Some(sig) = data.windows(SIGNATURE.len()).position(|w| w == SIGNATURE) else {
            bail!("not a valid puz file (signature not found)");
        };
        if sig < SIGNATURE_POS {
            bail!("not a valid puz file (signature at offset {})", sig);
        }
        let start = sig - SIGNATURE_POS;
        let preamble = data[..start].to_vec();

        let mut reader = Reader::new(data, start);
        let header: [u8; HEADER_LEN] = reader
            .take(HEADER_LEN)
            .context("Failed to read header")?
            .try_into()?;

        let width = header[WIDTH_POS] as usize;
        let height = header[HEIGHT_POS] as usize;
        if !(1..=MAX_DIMENSION).contains(&width) {
            bail!("width of {} is invalid", width);
        }
        if !(1..=MAX_DIMENSION).contains(&height) {
            bail!("height of {} is invalid", height);
        }

        let size = width * height;
        let solution = reader.take(size).context("Failed to read solution")?.to_vec();
        let solution = Grid::new(width, height, solution)?;
        let state = reader.take(size).context("Failed to read player state")?.to_vec();

        let title = reader.read_cstr().context("Failed to read title")?;
        let author = reader.read_cstr().context("Failed to read author")?;
        let copyright = reader.read_cstr().context("Failed to read copyright")?;

        let clue_count = read_u16_at(&header, CLUE_COUNT_POS) as usize;
        let mut clues = Vec::with_capacity(clue_count);
        for i in 0..clue_count {
            clues.push(
                reader
                    .read_cstr()
                    .with_context(|| format!("Failed to read clue {}", i + 1))?,
            );
        }
        let notes = reader.read_cstr().context("Failed to read notes")?;

        let (extensions, trailing) = Self::parse_extensions(&mut reader);

        let puz = Self {
            preamble,
            header,
            solution,
            state,
            title,
            author,
            copyright,
            clues,
            notes,
            extensions,
            trailing,
        };

        puz.validate().context("Puzzle failed validation")?;

        let report = puz.checksum_report();
        if report.file_stored != report.file_calc {
            eprintln!(
                "[warn] file checksum mismatch: stored=0x{:04x} calc=0x{:04x}",
                report.file_stored, report.file_calc
            );
        }
        if report.cib_stored != report.cib_calc {
            eprintln!(
                "[warn] header checksum mismatch: stored=0x{:04x} calc=0x{:04x}",
                report.cib_stored, report.cib_calc
            );
        }
        if report.masked_stored != report.masked_calc {
            eprintln!("[warn] masked checksums do not match file contents");
        }

        Ok(puz)
    }

    /// Reads extension sections until the data runs out. Anything that
    /// doesn't look like a section is kept verbatim as trailing bytes.
    fn parse_extensions(reader: &mut Reader<'_>) -> (IndexMap<String, Extension>, Vec<u8>) {
        let mut extensions = IndexMap::new();

        while reader.remaining() >= 8 {
            let mark = reader.pos;
            let parsed = (|| -> Result<(String, Extension)> {
                let tag = reader.take(4)?;
                if !tag.iter().all(u8::is_ascii_alphanumeric) {
                    bail!("bad section tag");
                }
                let tag = String::from_utf8_lossy(tag).into_owned();
                let len = reader.read_u16_le()? as usize;
                let checksum = reader.read_u16_le()?;
                let data = reader.take(len)?.to_vec();
                if reader.take(1)?[0] != 0 {
                    bail!("section {} not terminated", tag);
                }
                Ok((tag, Extension { data, checksum }))
            })();

            match parsed {
                Ok((tag, ext)) if !extensions.contains_key(&tag) => {
                    extensions.insert(tag, ext);
                }
                Ok((tag, _)) => {
                    eprintln!("[warn] duplicate extension section {}; keeping raw bytes", tag);
                    reader.pos = mark;
                    break;
                }
                Err(e) => {
                    eprintln!("[warn] unreadable data at offset {}: {}", mark, e);
                    reader.pos = mark;
                    break;
                }
            }
        }

        let trailing = reader.data[reader.pos..].to_vec();
        (extensions, trailing)
    }

    /// Serializes the puzzle back into file bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.preamble.len() + HEADER_LEN + 2 * self.state.len() + self.trailing.len() + 256,
        );
        out.extend_from_slice(&self.preamble);
        out.extend_from_slice(&self.header);
        out.extend_from_slice(self.solution.cells());
        out.extend_from_slice(&self.state);

        for s in [&self.title, &self.author, &self.copyright]
            .into_iter()
            .chain(self.clues.iter())
            .chain(std::iter::once(&self.notes))
        {
            out.extend_from_slice(s);
            out.push(0);
        }

        for (tag, ext) in &self.extensions {
            out.extend_from_slice(tag.as_bytes());
            out.extend_from_slice(&(ext.data.len() as u16).to_le_bytes());
            out.extend_from_slice(&ext.checksum.to_le_bytes());
            out.extend_from_slice(&ext.data);
            out.push(0);
        }

        out.extend_from_slice(&self.trailing);
        out
    }

    /// Reads and parses a puzzle file.
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read puzzle file: {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Writes the puzzle to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes())
            .with_context(|| format!("Failed to write puzzle file: {}", path.display()))
    }

    pub fn width(&self) -> usize {
        self.solution.width()
    }

    pub fn height(&self) -> usize {
        self.solution.height()
    }

    pub fn solution(&self) -> &Grid {
        &self.solution
    }

    pub fn state(&self) -> &[u8] {
        &self.state
    }

    pub fn header(&self) -> &[u8; HEADER_LEN] {
        &self.header
    }

    /// Version string without its NUL padding, e.g. `1.3`
    pub fn version(&self) -> String {
        self.header[VERSION_POS..VERSION_POS + 4]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect()
    }

    fn version_numbers(&self) -> Option<(u32, u32)> {
        let version = self.version();
        let (major, minor) = version.split_once('.')?;
        Some((major.parse().ok()?, minor.parse().ok()?))
    }

    pub(crate) fn set_version(&mut self, version: &str) {
        let field = &mut self.header[VERSION_POS..VERSION_POS + 4];
        field.fill(0);
        let len = version.len().min(3);
        field[..len].copy_from_slice(&version.as_bytes()[..len]);
    }

    fn is_utf8(&self) -> bool {
        matches!(self.version_numbers(), Some((major, _)) if major >= 2)
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        encode_text(text, self.is_utf8())
    }

    /// Notes only count toward the checksums from version 1.3 on. Files with
    /// an unreadable version are treated as current.
    fn notes_in_checksum(&self) -> bool {
        self.version_numbers()
            .map(|v| v >= (1, 3))
            .unwrap_or(true)
    }

    pub fn title(&self) -> String {
        decode_text(&self.title, self.is_utf8())
    }

    pub fn author(&self) -> String {
        decode_text(&self.author, self.is_utf8())
    }

    pub fn copyright(&self) -> String {
        decode_text(&self.copyright, self.is_utf8())
    }

    pub fn notes(&self) -> String {
        decode_text(&self.notes, self.is_utf8())
    }

    pub fn clues(&self) -> Vec<String> {
        let utf8 = self.is_utf8();
        self.clues.iter().map(|c| decode_text(c, utf8)).collect()
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = self.encode(title);
        self.update_checksums();
    }

    pub fn set_author(&mut self, author: &str) {
        self.author = self.encode(author);
        self.update_checksums();
    }

    pub fn set_copyright(&mut self, copyright: &str) {
        self.copyright = self.encode(copyright);
        self.update_checksums();
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.notes = self.encode(notes);
        self.update_checksums();
    }

    /// Replaces the clues, in square order with across before down.
    pub fn set_clues<S: AsRef<str>>(&mut self, clues: &[S]) {
        self.clues = clues.iter().map(|c| self.encode(c.as_ref())).collect();
        write_u16_at(&mut self.header, CLUE_COUNT_POS, self.clues.len() as u16);
        self.update_checksums();
    }

    pub fn extensions(&self) -> &IndexMap<String, Extension> {
        &self.extensions
    }

    /// Adds or replaces an extension section, with a fresh checksum.
    pub fn set_extension(&mut self, tag: &str, data: Vec<u8>) {
        let checksum = checksum(0, &data);
        self.extensions
            .insert(tag.to_string(), Extension { data, checksum });
    }

    /// Entries of the rebus table as `(key, answer)`, in file order.
    /// Empty when the puzzle has no table.
    pub fn rebus_table(&self) -> Result<Vec<(u8, String)>, Error> {
        let Some(table) = self.extensions.get(REBUS_TABLE) else {
            return Ok(Vec::new());
        };

        decode_text(&table.data, self.is_utf8())
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| -> Result<(u8, String), Error> {
                let (key, answer) = entry
                    .split_once(':')
                    .ok_or_else(|| Error::InvalidRebus(format!("table entry \"{}\"", entry)))?;
                let key = key
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidRebus(format!("table key \"{}\"", key)))?;
                Ok((key, answer.to_string()))
            })
            .collect()
    }

    /// Circled squares from the markup section, if the puzzle has one.
    pub fn circled(&self) -> Option<Vec<bool>> {
        self.extensions
            .get(MARKUP_GRID)
            .map(|ext| ext.data.iter().map(|&m| m & MARKUP_CIRCLED != 0).collect())
    }

    /// Checks the version string, the solution and state contents, the clue
    /// count against the grid numbering and the per-square sections.
    pub fn validate(&self) -> Result<(), Error> {
        validate::check_version(&self.version())?;
        validate::check_solution(&self.solution)?;
        validate::check_state(&self.solution, &self.state)?;
        validate::check_clue_count(&self.solution, self.clues.len())?;

        let size = self.state.len();
        for tag in [REBUS_GRID, MARKUP_GRID] {
            if let Some(ext) = self.extensions.get(tag) {
                if ext.data.len() != size {
                    return Err(Error::SectionLength {
                        tag: tag.to_string(),
                        expected: size,
                        actual: ext.data.len(),
                    });
                }
            }
        }

        let table = self.rebus_table()?;
        if let Some(grid) = self.extensions.get(REBUS_GRID) {
            for &value in grid.data.iter().filter(|&&v| v != 0) {
                if !table.iter().any(|&(key, _)| key == value - 1) {
                    return Err(Error::InvalidRebus(format!(
                        "grid references key {} that is not in the table",
                        value - 1
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn is_scrambled(&self) -> bool {
        self.header[SCRAMBLED_TAG_POS] & SCRAMBLED_FLAG != 0
    }

    /// Fingerprint of the unscrambled solution; zero while unscrambled
    pub fn scrambled_checksum(&self) -> u16 {
        read_u16_at(&self.header, SCRAMBLED_CHECKSUM_POS)
    }

    fn set_scrambled(&mut self, fingerprint: Option<u16>) {
        match fingerprint {
            Some(sum) => {
                self.header[SCRAMBLED_TAG_POS] |= SCRAMBLED_FLAG;
                write_u16_at(&mut self.header, SCRAMBLED_CHECKSUM_POS, sum);
            }
            None => {
                self.header[SCRAMBLED_TAG_POS] &= !SCRAMBLED_FLAG;
                write_u16_at(&mut self.header, SCRAMBLED_CHECKSUM_POS, 0);
            }
        }
    }

    /// Checksum of the header fields from the dimensions onward
    pub fn cib_checksum(&self) -> u16 {
        checksum(0, &self.header[WIDTH_POS..HEADER_LEN])
    }

    fn text_checksum(&self, seed: u16) -> u16 {
        let mut sum = seed;
        for s in [&self.title, &self.author, &self.copyright] {
            if !s.is_empty() {
                sum = checksum(sum, s);
                sum = checksum(sum, &[0]);
            }
        }
        for clue in &self.clues {
            sum = checksum(sum, clue);
        }
        if self.notes_in_checksum() && !self.notes.is_empty() {
            sum = checksum(sum, &self.notes);
            sum = checksum(sum, &[0]);
        }
        sum
    }

    /// Whole-file checksum over the header block, both grids and the text
    pub fn file_checksum(&self) -> u16 {
        let sum = checksum(self.cib_checksum(), self.solution.cells());
        let sum = checksum(sum, &self.state);
        self.text_checksum(sum)
    }

    /// The four component checksums, low bytes then high bytes, each XORed
    /// with `ICHEATED`.
    pub fn masked_checksums(&self) -> [u8; 8] {
        let parts = [
            self.cib_checksum(),
            checksum(0, self.solution.cells()),
            checksum(0, &self.state),
            self.text_checksum(0),
        ];

        let mut out = [0u8; 8];
        for (i, part) in parts.iter().enumerate() {
            let [lo, hi] = part.to_le_bytes();
            out[i] = lo ^ MASK[i];
            out[i + 4] = hi ^ MASK[i + 4];
        }
        out
    }

    pub fn checksum_report(&self) -> ChecksumReport {
        let mut masked_stored = [0u8; 8];
        masked_stored.copy_from_slice(&self.header[MASKED_CHECKSUM_POS..MASKED_CHECKSUM_POS + 8]);

        ChecksumReport {
            file_stored: read_u16_at(&self.header, FILE_CHECKSUM_POS),
            file_calc: self.file_checksum(),
            cib_stored: read_u16_at(&self.header, CIB_CHECKSUM_POS),
            cib_calc: self.cib_checksum(),
            masked_stored,
            masked_calc: self.masked_checksums(),
        }
    }

    /// Rewrites every header checksum to match the current contents.
    pub fn update_checksums(&mut self) {
        let cib = self.cib_checksum();
        let masked = self.masked_checksums();
        let file = self.file_checksum();

        write_u16_at(&mut self.header, CIB_CHECKSUM_POS, cib);
        self.header[MASKED_CHECKSUM_POS..MASKED_CHECKSUM_POS + 8].copy_from_slice(&masked);
        write_u16_at(&mut self.header, FILE_CHECKSUM_POS, file);
    }

    /// Scrambles the solution with `key` and returns the stored fingerprint.
    pub fn scramble(&mut self, key: Key) -> Result<u16> {
        if self.is_scrambled() {
            bail!("puzzle is already scrambled");
        }

        let fingerprint = scramble::scramble(&mut self.solution, key)?;
        self.set_scrambled(Some(fingerprint));
        self.update_checksums();
        Ok(fingerprint)
    }

    /// Unscrambles the solution with `key`. Nothing changes if the key is
    /// wrong.
    pub fn unscramble(&mut self, key: Key) -> Result<()> {
        if !self.is_scrambled() {
            bail!("puzzle is not scrambled");
        }

        let fingerprint = self.scrambled_checksum();
        scramble::unscramble(&mut self.solution, key, fingerprint)?;
        self.set_scrambled(None);
        self.update_checksums();
        Ok(())
    }

    /// Scrambles an unscrambled puzzle, unscrambles a scrambled one.
    pub fn toggle(&mut self, key: Key) -> Result<Toggle> {
        if self.is_scrambled() {
            self.unscramble(key)?;
            Ok(Toggle::Unscrambled)
        } else {
            Ok(Toggle::Scrambled(self.scramble(key)?))
        }
    }

    /// Whether `key` unscrambles this puzzle, without modifying it.
    pub fn check_key(&self, key: Key) -> Result<bool> {
        if !self.is_scrambled() {
            bail!("puzzle is not scrambled");
        }

        let mut grid = self.solution.clone();
        match scramble::unscramble(&mut grid, key, self.scrambled_checksum()) {
            Ok(()) => Ok(true),
            Err(Error::KeyMismatch { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::NamedTempFile;

    fn sample() -> PuzFile {
        let grid = Grid::new(4, 4, b"ABCDEFGHIJKL.NO.".to_vec()).unwrap();
        let mut puz = PuzFile::new(grid);
        puz.set_title("Test");
        puz.set_author("Me");
        puz.set_clues(&CLUES);
        puz
    }

    // square order, across before down
    const CLUES: [&str; 8] = ["Opener", "Ace", "Bee", "Sea", "Dee", "Eff", "Eye", "No"];

    fn key(s: &str) -> Key {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_puzzle_checksums() {
        let puz = sample();
        let report = puz.checksum_report();

        assert!(report.is_ok());
        assert_eq!(report.cib_calc, 0x7800);
        assert_eq!(report.file_calc, 0x8785);
        assert_eq!(
            report.masked_calc,
            [0x49, 0xb9, 0x49, 0xc3, 0x39, 0x4b, 0x65, 0xdd]
        );
        assert_eq!(puz.state(), b"------------.--.");
        assert_eq!(puz.version(), "1.3");
    }

    #[test]
    fn test_parse_roundtrip_is_byte_exact() {
        let mut puz = sample();
        puz.set_notes("a note");
        puz.extensions.insert(
            "LTIM".to_string(),
            Extension {
                data: b"42,1".to_vec(),
                checksum: checksum(0, b"42,1"),
            },
        );
        puz.preamble = b"junk".to_vec();
        puz.trailing = vec![1, 2, 3];

        let bytes = puz.to_bytes();
        let parsed = PuzFile::parse(&bytes).unwrap();

        assert_eq!(parsed, puz);
        assert_eq!(parsed.to_bytes(), bytes);
        assert_eq!(parsed.title(), "Test");
        assert_eq!(parsed.author(), "Me");
        assert_eq!(parsed.clues(), CLUES);
        assert_eq!(parsed.notes(), "a note");

        let ltim = &parsed.extensions()["LTIM"];
        assert_eq!(ltim.data, b"42,1");
        assert_eq!(ltim.calc_checksum(), ltim.checksum);
    }

    #[test]
    fn test_scramble_updates_header() {
        let mut puz = sample();
        let fingerprint = puz.scramble(key("9999")).unwrap();

        assert_eq!(fingerprint, 0xfd8b);
        assert!(puz.is_scrambled());
        assert_eq!(puz.scrambled_checksum(), 0xfd8b);
        assert_eq!(puz.solution().cells(), b"MQTYUPKNRLVO.SX.");
        assert_eq!(puz.state(), b"------------.--.");

        let report = puz.checksum_report();
        assert!(report.is_ok());
        assert_eq!(report.cib_calc, 0x7802);
        assert_eq!(report.file_calc, 0xa3b2);
        assert_eq!(
            report.masked_calc,
            [0x4b, 0xef, 0x49, 0xc3, 0x39, 0xc4, 0x65, 0xdd]
        );
    }

    #[test]
    fn test_toggle_roundtrip() {
        let original = sample();
        let mut puz = original.clone();

        assert_eq!(puz.toggle(key("7294")).unwrap(), Toggle::Scrambled(0xfd8b));
        assert_eq!(puz.toggle(key("7294")).unwrap(), Toggle::Unscrambled);
        assert_eq!(puz, original);
        assert_eq!(puz.to_bytes(), original.to_bytes());
    }

    #[test]
    fn test_wrong_key_leaves_file_untouched() {
        let mut puz = sample();
        puz.scramble(key("1234")).unwrap();
        let scrambled = puz.clone();

        let err = puz.unscramble(key("4321")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::KeyMismatch { .. })
        ));
        assert_eq!(puz, scrambled);

        assert!(!puz.check_key(key("4321")).unwrap());
        assert!(puz.check_key(key("1234")).unwrap());
        assert_eq!(puz, scrambled);
    }

    #[test]
    fn test_state_errors() {
        let mut puz = sample();
        assert!(puz.unscramble(key("1234")).is_err());
        assert!(puz.check_key(key("1234")).is_err());

        puz.scramble(key("1234")).unwrap();
        assert!(puz.scramble(key("1234")).is_err());
    }

    #[test]
    fn test_too_few_letters() {
        let grid = Grid::new(3, 4, b"ABC.EFGHIJKL".to_vec()).unwrap();
        let mut puz = PuzFile::new(grid);
        let before = puz.clone();

        let err = puz.scramble(key("1234")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::TooFewLetters { found: 11 })
        );
        assert_eq!(puz, before);
    }

    #[test]
    fn test_notes_ignored_before_1_3() {
        let mut puz = sample();
        let without_notes = puz.file_checksum();

        puz.set_notes("hello");
        assert_ne!(puz.file_checksum(), without_notes);

        puz.header[VERSION_POS..VERSION_POS + 4].copy_from_slice(b"1.2\0");
        assert_eq!(puz.file_checksum(), without_notes);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(PuzFile::parse(b"hello world").is_err());

        let mut bytes = sample().to_bytes();
        bytes[WIDTH_POS] = 40;
        assert!(PuzFile::parse(&bytes).is_err());

        let bytes = sample().to_bytes();
        assert!(PuzFile::parse(&bytes[..HEADER_LEN + 20]).is_err());
    }

    #[test]
    fn test_latin1_text() {
        let mut puz = sample();
        puz.title = vec![b'C', 0xe9, b'z', b'a', b'n', b'n', b'e'];
        assert_eq!(puz.title(), "Cézanne");
    }

    #[test]
    fn test_setters_encode_by_version() {
        let mut puz = sample();
        puz.set_title("Cézanne");
        puz.set_author("Dvořák");
        assert_eq!(puz.title, b"C\xe9zanne");
        assert_eq!(puz.title(), "Cézanne");
        assert_eq!(puz.author(), "Dvo?ák");

        puz.set_version("2.0");
        puz.set_author("Dvořák");
        assert_eq!(puz.author, "Dvořák".as_bytes());
        assert_eq!(puz.author(), "Dvořák");

        let parsed = PuzFile::parse(&puz.to_bytes()).unwrap();
        assert_eq!(parsed.version(), "2.0");
        assert_eq!(parsed.author(), "Dvořák");
    }

    #[test]
    fn test_corrupted_checksums_still_parse() {
        let puz = sample();
        let mut bytes = puz.to_bytes();
        bytes[FILE_CHECKSUM_POS] ^= 0xff;
        bytes[CIB_CHECKSUM_POS + 1] ^= 0x01;
        bytes[MASKED_CHECKSUM_POS + 3] ^= 0x10;

        let parsed = PuzFile::parse(&bytes).unwrap();
        let report = parsed.checksum_report();
        assert!(!report.is_ok());
        assert_ne!(report.file_stored, report.file_calc);
        assert_ne!(report.cib_stored, report.cib_calc);
        assert_ne!(report.masked_stored, report.masked_calc);
        assert_eq!(report.file_calc, puz.file_checksum());

        let mut repaired = parsed;
        repaired.update_checksums();
        assert!(repaired.checksum_report().is_ok());
        assert_eq!(repaired.to_bytes(), puz.to_bytes());
    }

    fn parse_error(puz: &PuzFile) -> Error {
        let err = PuzFile::parse(&puz.to_bytes()).unwrap_err();
        err.downcast_ref::<Error>().cloned().unwrap()
    }

    #[test]
    fn test_parse_validates() {
        let mut puz = sample();
        puz.set_clues(&CLUES[..7]);
        assert_eq!(
            parse_error(&puz),
            Error::ClueCount {
                expected: 8,
                found: 7
            }
        );

        let mut puz = sample();
        puz.state[0] = b'.';
        assert_eq!(parse_error(&puz), Error::BlackSquareMismatch { index: 0 });

        let mut puz = sample();
        puz.state[1] = b'^';
        assert_eq!(
            parse_error(&puz),
            Error::InvalidState { index: 1, byte: b'^' }
        );

        let mut puz = sample();
        puz.set_version("1");
        assert_eq!(parse_error(&puz), Error::InvalidVersion("1".into()));

        let mut bytes = sample().to_bytes();
        bytes[HEADER_LEN + 2] = b'~';
        let err = PuzFile::parse(&bytes).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::InvalidSolution { index: 2, byte: b'~' })
        );
    }

    #[test]
    fn test_rebus_sections_validated() {
        let mut puz = sample();
        let mut grbs = vec![0u8; 16];
        grbs[5] = 2;
        puz.set_extension(REBUS_GRID, grbs.clone());
        puz.set_extension(REBUS_TABLE, b" 1:HEART;".to_vec());
        assert!(puz.validate().is_ok());
        assert_eq!(puz.rebus_table().unwrap(), vec![(1, "HEART".to_string())]);

        puz.set_extension(REBUS_TABLE, b" 0:HEART;".to_vec());
        assert!(matches!(puz.validate(), Err(Error::InvalidRebus(_))));

        puz.set_extension(REBUS_TABLE, b"HEART;".to_vec());
        assert!(matches!(puz.rebus_table(), Err(Error::InvalidRebus(_))));

        puz.set_extension(REBUS_TABLE, b" 1:HEART;".to_vec());
        puz.set_extension(MARKUP_GRID, vec![0; 15]);
        assert_eq!(
            puz.validate(),
            Err(Error::SectionLength {
                tag: MARKUP_GRID.to_string(),
                expected: 16,
                actual: 15
            })
        );

        let mut gext = vec![0u8; 16];
        gext[0] = MARKUP_CIRCLED;
        puz.set_extension(MARKUP_GRID, gext);
        assert!(puz.validate().is_ok());
        assert_eq!(puz.circled().unwrap()[..2], [true, false]);
    }

    #[test]
    fn test_read_write_file() {
        let mut puz = sample();
        let temp = NamedTempFile::new().unwrap();

        puz.scramble(key("2468")).unwrap();
        puz.write(temp.path()).unwrap();

        let mut loaded = PuzFile::read(temp.path()).unwrap();
        assert_eq!(loaded, puz);

        loaded.unscramble(key("2468")).unwrap();
        assert_eq!(loaded.solution().cells(), b"ABCDEFGHIJKL.NO.");
    }
}
