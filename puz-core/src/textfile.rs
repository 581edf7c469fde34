//! Across Lite text format (`<ACROSS PUZZLE>` and `<ACROSS PUZZLE V2>`)
//!
//! A text puzzle is a signature line followed by tagged sections. Section
//! contents may be indented; blank lines are ignored. V2 files may carry a
//! `<REBUS>` section: `MARK;` turns lowercase grid squares into circles, and
//! `c:ANSWER:f` lines replace every `c` in the grid with the rebus answer
//! `ANSWER` whose one-letter form is `f`.
use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::grid::Grid;
use crate::puzfile::{MARKUP_CIRCLED, MARKUP_GRID, PuzFile, REBUS_GRID, REBUS_TABLE};

const SIGNATURE_V1: &str = "<ACROSS PUZZLE>";
const SIGNATURE_V2: &str = "<ACROSS PUZZLE V2>";

/// Grid markers for rebus keys 1, 2, 3, ...
const REBUS_MARKERS: &[u8] = b"1234567890@#$%&+?ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Author,
    Copyright,
    Size,
    Grid,
    Across,
    Down,
    Notepad,
    Rebus,
}

impl Section {
    const REQUIRED: [Section; 7] = [
        Section::Title,
        Section::Author,
        Section::Copyright,
        Section::Size,
        Section::Grid,
        Section::Across,
        Section::Down,
    ];

    fn tag(self) -> &'static str {
        match self {
            Section::Title => "<TITLE>",
            Section::Author => "<AUTHOR>",
            Section::Copyright => "<COPYRIGHT>",
            Section::Size => "<SIZE>",
            Section::Grid => "<GRID>",
            Section::Across => "<ACROSS>",
            Section::Down => "<DOWN>",
            Section::Notepad => "<NOTEPAD>",
            Section::Rebus => "<REBUS>",
        }
    }

    fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        [Self::Notepad, Self::Rebus]
            .into_iter()
            .chain(Self::REQUIRED)
            .find(|s| s.tag() == line)
    }
}

/// Indentation of section contents when printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indent {
    None,
    TwoSpaces,
    FourSpaces,
    #[default]
    Tab,
}

impl Indent {
    fn as_str(self) -> &'static str {
        match self {
            Indent::None => "",
            Indent::TwoSpaces => "  ",
            Indent::FourSpaces => "    ",
            Indent::Tab => "\t",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Unix,
    Windows,
}

impl LineEnding {
    fn as_str(self) -> &'static str {
        match self {
            LineEnding::Unix => "\n",
            LineEnding::Windows => "\r\n",
        }
    }
}

/// Layout options for [`PuzFile::to_text_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub indent: Indent,
    pub line_ending: LineEnding,
}

fn marker_to_key(marker: u8) -> Option<u8> {
    REBUS_MARKERS
        .iter()
        .position(|&m| m == marker)
        .map(|i| i as u8 + 1)
}

fn key_to_marker(key: usize) -> Option<u8> {
    key.checked_sub(1).and_then(|i| REBUS_MARKERS.get(i)).copied()
}

fn is_v1_grid_char(c: u8) -> bool {
    c.is_ascii_uppercase() || c == b'.' || c == b':'
}

fn is_v2_grid_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"@#$%&+?.:".contains(&c)
}

/// Parses `c:ANSWER:f`. ANSWER is either capital letters or `[n]`.
fn parse_substitution(line: &str) -> Option<(u8, &str, u8)> {
    let mut parts = line.split(':');
    let (marker, answer, fallback) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let single = |s: &str| match s.as_bytes() {
        [c] if marker_to_key(*c).is_some() => Some(*c),
        _ => None,
    };

    let letters = !answer.is_empty() && answer.bytes().all(|b| b.is_ascii_uppercase());
    let symbol = answer
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    if !letters && !symbol {
        return None;
    }

    Some((single(marker)?, answer, single(fallback)?))
}

fn single_line<'a>(section: Section, lines: &[&'a str]) -> Result<&'a str> {
    match lines {
        [line] => Ok(line.trim()),
        _ => bail!(
            "{} section expects exactly one line. Found {} lines.",
            section.tag(),
            lines.len()
        ),
    }
}

fn parse_size(line: &str) -> Option<(usize, usize)> {
    let (w, h) = line.split_once('x')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(w) || !digits(h) {
        return None;
    }
    Some((w.parse().ok()?, h.parse().ok()?))
}

/// Sections as read, before they are assembled into a puzzle.
#[derive(Default)]
struct Draft {
    title: String,
    author: String,
    copyright: String,
    size: Option<(usize, usize)>,
    grid: Option<Vec<u8>>,
    across: Vec<String>,
    down: Vec<String>,
    notes: String,
    circled: Option<Vec<bool>>,
    rebus_grid: Vec<u8>,
    rebus_table: Vec<(u8, String)>,
}

impl Draft {
    fn read_rebus(&mut self, lines: &[&str]) -> Result<()> {
        let Some(grid) = self.grid.as_mut() else {
            bail!("The <REBUS> tag is expected to come after <GRID> in puzzle descriptions");
        };

        for line in lines.iter().map(|l| l.trim()) {
            if line.eq_ignore_ascii_case("MARK;") {
                if self.circled.is_none() {
                    let circled: Vec<bool> = grid.iter().map(u8::is_ascii_lowercase).collect();
                    if circled.contains(&true) {
                        self.circled = Some(circled);
                    }
                }
            } else if let Some((marker, answer, fallback)) = parse_substitution(line) {
                let Some(key) = marker_to_key(marker) else {
                    continue;
                };
                if self.rebus_grid.is_empty() {
                    self.rebus_grid = vec![0; grid.len()];
                }
                for (cell, rebus) in grid.iter_mut().zip(self.rebus_grid.iter_mut()) {
                    if *cell == marker {
                        *rebus = key + 1;
                        *cell = fallback;
                    }
                }
                self.rebus_table.push((key, answer.to_string()));
            } else {
                eprintln!("[warn] ignoring rebus line: {}", line);
            }
        }
        Ok(())
    }

    fn into_puzzle(self) -> Result<PuzFile> {
        let Some((width, height)) = self.size else {
            bail!("<SIZE> section is empty");
        };
        let mut cells = self.grid.unwrap_or_default();
        cells.make_ascii_uppercase();
        let grid = Grid::new(width, height, cells)?;

        let mut across = self.across.into_iter();
        let mut down = self.down.into_iter();
        let mut clues = Vec::new();
        for i in 0..width * height {
            if grid.needs_across(i) {
                clues.push(across.next().context("Not enough <ACROSS> clues for the grid")?);
            }
            if grid.needs_down(i) {
                clues.push(down.next().context("Not enough <DOWN> clues for the grid")?);
            }
        }
        let extra = across.len() + down.len();
        if extra > 0 {
            bail!("Found {} more clues than the grid numbering calls for", extra);
        }

        let mut puz = PuzFile::new(grid);
        let latin1 = [&self.title, &self.author, &self.copyright, &self.notes]
            .into_iter()
            .chain(clues.iter())
            .all(|s| s.chars().all(|c| u8::try_from(c).is_ok()));
        if !latin1 {
            puz.set_version("2.0");
        }

        puz.set_title(&self.title);
        puz.set_author(&self.author);
        puz.set_copyright(&self.copyright);
        puz.set_notes(&self.notes);
        puz.set_clues(&clues);

        if !self.rebus_table.is_empty() {
            let table: String = self
                .rebus_table
                .iter()
                .map(|(key, answer)| format!("{:>2}:{};", key, answer))
                .collect();
            puz.set_extension(REBUS_GRID, self.rebus_grid);
            puz.set_extension(REBUS_TABLE, table.into_bytes());
        }
        if let Some(circled) = self.circled {
            let markup = circled
                .iter()
                .map(|&c| if c { MARKUP_CIRCLED } else { 0 })
                .collect();
            puz.set_extension(MARKUP_GRID, markup);
        }

        puz.update_checksums();
        puz.validate()?;
        Ok(puz)
    }
}

impl PuzFile {
    /// Parses an Across Lite text puzzle into an unscrambled puzzle.
    pub fn from_text(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .filter(|l| !l.is_empty())
            .collect();

        let v2 = match lines.first().map(|l| l.trim()) {
            Some(SIGNATURE_V1) => false,
            Some(SIGNATURE_V2) => true,
            _ => bail!("File does not appear to be an Across Lite puzzle description"),
        };

        for section in Section::REQUIRED {
            if !lines.iter().any(|l| Section::from_line(l) == Some(section)) {
                bail!("File is missing required tag: {}", section.tag());
            }
        }

        let mut draft = Draft::default();
        let mut rest = lines[1..].iter().copied().peekable();

        while let Some(line) = rest.next() {
            let Some(section) = Section::from_line(line) else {
                bail!(
                    "Couldn't parse file. Expected section tag, but got: \"{}\"",
                    line
                );
            };
            let mut body = Vec::new();
            while let Some(next) = rest.next_if(|l| Section::from_line(l).is_none()) {
                body.push(next);
            }

            match section {
                Section::Title => draft.title = single_line(section, &body)?.to_string(),
                Section::Author => draft.author = single_line(section, &body)?.to_string(),
                Section::Copyright => draft.copyright = single_line(section, &body)?.to_string(),
                Section::Size => {
                    let line = single_line(section, &body)?;
                    let Some(size) = parse_size(line) else {
                        bail!(
                            "Puzzle size expected in the format \"WIDTHxHEIGHT\" (e.g. \"15x15\"). Received: \"{}\"",
                            line
                        );
                    };
                    draft.size = Some(size);
                }
                Section::Grid => {
                    let allowed = if v2 { is_v2_grid_char } else { is_v1_grid_char };
                    let rows: Vec<&str> = body.iter().map(|l| l.trim()).collect();
                    if !rows.iter().all(|r| r.bytes().all(allowed)) {
                        bail!("<GRID> section contains unsupported characters.");
                    }
                    draft.grid = Some(rows.concat().into_bytes());
                }
                Section::Across => draft.across = body.iter().map(|l| l.trim().to_string()).collect(),
                Section::Down => draft.down = body.iter().map(|l| l.trim().to_string()).collect(),
                Section::Notepad => draft.notes = body.join("\n"),
                Section::Rebus => {
                    if !v2 {
                        bail!(
                            "The <REBUS> tag is not supported in V1 text files. Consider using the <ACROSS PUZZLE V2> file tag"
                        );
                    }
                    draft.read_rebus(&body)?;
                }
            }
        }

        draft.into_puzzle()
    }

    /// Prints the puzzle as a V2 text file, tab indented with Unix line
    /// endings.
    pub fn to_text(&self) -> Result<String> {
        self.to_text_with(TextStyle::default())
    }

    pub fn to_text_with(&self, style: TextStyle) -> Result<String> {
        if self.is_scrambled() {
            bail!("puzzle is scrambled; unscramble it before exporting to text");
        }
        self.validate()?;

        let mut grid = self.solution().cells().to_vec();
        let circled = self.circled().filter(|c| c.contains(&true));
        if let Some(circled) = &circled {
            for (cell, &c) in grid.iter_mut().zip(circled) {
                if c {
                    cell.make_ascii_lowercase();
                }
            }
        }

        let mut annotations = Vec::new();
        if let Some(rebus_grid) = self.extensions().get(REBUS_GRID) {
            // markers are handed out in table order
            for (n, (key, answer)) in self.rebus_table()?.into_iter().enumerate() {
                let squares: Vec<usize> = (0..grid.len())
                    .filter(|&i| rebus_grid.data[i].checked_sub(1) == Some(key))
                    .collect();
                let Some(&first) = squares.first() else {
                    bail!("Rebus answer {} has no squares in the grid", answer);
                };
                let short = grid[first];
                if squares.iter().any(|&i| grid[i] != short) {
                    bail!("Text format cannot encode multiple short solutions for a single rebus substitution");
                }
                let Some(marker) = key_to_marker(n + 1) else {
                    bail!("Too many rebus answers for the text format");
                };
                for &i in &squares {
                    grid[i] = marker;
                }
                annotations.push(format!("{}:{}:{}", marker as char, answer, short as char));
            }
        }

        let indent = style.indent.as_str();
        let eol = style.line_ending.as_str();
        let mut out = String::new();
        let tag = |out: &mut String, section: Section| {
            out.push_str(section.tag());
            out.push_str(eol);
        };
        let line = |out: &mut String, content: &str| {
            out.push_str(indent);
            out.push_str(content);
            out.push_str(eol);
        };

        out.push_str(SIGNATURE_V2);
        out.push_str(eol);
        tag(&mut out, Section::Title);
        line(&mut out, &self.title());
        tag(&mut out, Section::Author);
        line(&mut out, &self.author());
        tag(&mut out, Section::Copyright);
        line(&mut out, &self.copyright());
        tag(&mut out, Section::Size);
        line(&mut out, &format!("{}x{}", self.width(), self.height()));

        tag(&mut out, Section::Grid);
        for row in grid.chunks(self.width()) {
            line(&mut out, &String::from_utf8_lossy(row));
        }

        if circled.is_some() || !annotations.is_empty() {
            tag(&mut out, Section::Rebus);
            if circled.is_some() {
                line(&mut out, "MARK;");
            }
            for annotation in &annotations {
                line(&mut out, annotation);
            }
        }

        let solution = self.solution();
        let mut clues = self.clues().into_iter();
        let (mut across, mut down) = (Vec::new(), Vec::new());
        for i in 0..solution.cells().len() {
            if solution.needs_across(i) {
                across.extend(clues.next());
            }
            if solution.needs_down(i) {
                down.extend(clues.next());
            }
        }
        tag(&mut out, Section::Across);
        for clue in &across {
            line(&mut out, clue);
        }
        tag(&mut out, Section::Down);
        for clue in &down {
            line(&mut out, clue);
        }

        let notes = self.notes();
        if !notes.is_empty() {
            tag(&mut out, Section::Notepad);
            out.push_str(&notes);
            out.push_str(eol);
        }

        Ok(out)
    }

    /// Reads a text puzzle from disk.
    pub fn read_text(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read text puzzle: {}", path.display()))?;
        Self::from_text(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
