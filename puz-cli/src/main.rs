use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use puz_core::{BackupManager, Indent, Key, LineEnding, PuzFile, TextStyle, Toggle};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "puz-cli")]
#[command(about = "Across Lite puzzle (un)scrambler – CLI tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scramble the puzzle if it is unscrambled, otherwise unscramble it
    Toggle {
        #[command(flatten)]
        target: Target,

        /// Four-digit key (digits 1-9); generated from the clock if omitted
        #[arg(short, long, env = "PUZ_KEY")]
        key: Option<Key>,

        /// Print the puzzle fields and the intended action, change nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Scramble the solution of an unscrambled puzzle
    Scramble {
        #[command(flatten)]
        target: Target,

        /// Four-digit key (digits 1-9); generated from the clock if omitted
        #[arg(short, long, env = "PUZ_KEY")]
        key: Option<Key>,
    },

    /// Unscramble the solution of a scrambled puzzle
    Unscramble {
        #[command(flatten)]
        target: Target,

        /// Four-digit key the puzzle was scrambled with
        #[arg(short, long, env = "PUZ_KEY")]
        key: Key,
    },

    /// Show header fields and verify the stored checksums
    Info {
        /// Path to the puzzle file
        file: PathBuf,
    },

    /// Test a key against a scrambled puzzle without writing anything
    Check {
        /// Path to the puzzle file
        file: PathBuf,

        /// Four-digit key to test
        #[arg(short, long, env = "PUZ_KEY")]
        key: Key,
    },

    /// Print a puzzle in the Across Lite text format (V2)
    ExportText {
        /// Path to the puzzle file
        file: PathBuf,

        /// Write the text here instead of to stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Indentation of section contents
        #[arg(long, value_enum, default_value_t = IndentArg::Tab)]
        indent: IndentArg,

        /// Use Windows line endings
        #[arg(long)]
        crlf: bool,
    },

    /// Build a .puz file from an Across Lite text puzzle
    ImportText {
        /// Path to the text puzzle
        file: PathBuf,

        /// Output path (defaults to FILE with a .puz extension)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IndentArg {
    None,
    Two,
    Four,
    Tab,
}

impl From<IndentArg> for Indent {
    fn from(arg: IndentArg) -> Self {
        match arg {
            IndentArg::None => Indent::None,
            IndentArg::Two => Indent::TwoSpaces,
            IndentArg::Four => Indent::FourSpaces,
            IndentArg::Tab => Indent::Tab,
        }
    }
}

#[derive(Args)]
struct Target {
    /// Path to the puzzle file
    file: PathBuf,

    /// Write the result here instead of modifying FILE in place
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Keep a timestamped copy of FILE before modifying it in place
    #[arg(long)]
    backup: bool,
}

impl Target {
    fn destination(&self) -> &Path {
        self.out.as_deref().unwrap_or(&self.file)
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Toggle {
            target,
            key,
            dry_run,
        } => {
            cmd_toggle(&target, key.unwrap_or_else(Key::generate), dry_run)?;
        }
        Commands::Scramble { target, key } => {
            cmd_scramble(&target, key.unwrap_or_else(Key::generate))?;
        }
        Commands::Unscramble { target, key } => {
            cmd_unscramble(&target, key)?;
        }
        Commands::Info { file } => {
            cmd_info(&file)?;
        }
        Commands::Check { file, key } => {
            cmd_check(&file, key)?;
        }
        Commands::ExportText {
            file,
            out,
            indent,
            crlf,
        } => {
            let style = TextStyle {
                indent: indent.into(),
                line_ending: if crlf { LineEnding::Windows } else { LineEnding::Unix },
            };
            cmd_export_text(&file, out.as_deref(), style)?;
        }
        Commands::ImportText { file, out } => {
            let out = out.unwrap_or_else(|| file.with_extension("puz"));
            cmd_import_text(&file, &out)?;
        }
    }

    Ok(())
}

fn cmd_toggle(target: &Target, key: Key, dry_run: bool) -> Result<()> {
    let mut puz = PuzFile::read(&target.file)?;

    if dry_run {
        print_fields(&target.file, &puz);
    }

    let action = if puz.is_scrambled() { "Unscrambling" } else { "Scrambling" };
    println!("{} puzzle with the key {} ...", action, key);

    if dry_run {
        return Ok(());
    }

    match puz.toggle(key)? {
        Toggle::Scrambled(fingerprint) => {
            println!("[info] fingerprint=0x{:04x}", fingerprint);
        }
        Toggle::Unscrambled => {
            println!("[info] key verified");
        }
    }

    save(target, &puz)
}

fn cmd_scramble(target: &Target, key: Key) -> Result<()> {
    let mut puz = PuzFile::read(&target.file)?;

    println!("Scrambling puzzle with the key {} ...", key);
    let fingerprint = puz.scramble(key)?;
    println!("[info] fingerprint=0x{:04x}", fingerprint);

    save(target, &puz)
}

fn cmd_unscramble(target: &Target, key: Key) -> Result<()> {
    let mut puz = PuzFile::read(&target.file)?;

    println!("Unscrambling puzzle with the key {} ...", key);
    puz.unscramble(key)?;

    save(target, &puz)
}

fn cmd_info(path: &Path) -> Result<()> {
    let puz = PuzFile::read(path)?;
    print_fields(path, &puz);

    println!("title [{}]", puz.title());
    println!("author [{}]", puz.author());
    println!("version [{}]", puz.version());
    println!("letters [{}]", puz.solution().letter_count());
    println!("clues [{}]", puz.clues().len());

    let report = puz.checksum_report();
    println!(
        "[info] file checksum stored=0x{:04x}  calc=0x{:04x}  -> {}",
        report.file_stored,
        report.file_calc,
        status(report.file_stored == report.file_calc)
    );
    println!(
        "[info] header checksum stored=0x{:04x}  calc=0x{:04x}  -> {}",
        report.cib_stored,
        report.cib_calc,
        status(report.cib_stored == report.cib_calc)
    );
    println!(
        "[info] masked checksums stored={}  calc={}  -> {}",
        hex(&report.masked_stored),
        hex(&report.masked_calc),
        status(report.masked_stored == report.masked_calc)
    );

    for (tag, ext) in puz.extensions() {
        println!(
            "[info] section {} len={} checksum stored=0x{:04x}  calc=0x{:04x}  -> {}",
            tag,
            ext.data.len(),
            ext.checksum,
            ext.calc_checksum(),
            status(ext.checksum == ext.calc_checksum())
        );
    }

    Ok(())
}

fn cmd_check(path: &Path, key: Key) -> Result<()> {
    let puz = PuzFile::read(path)?;

    if puz.check_key(key)? {
        println!("[ok] key {} unscrambles {}", key, path.display());
        Ok(())
    } else {
        bail!("incorrect key {} for {}", key, path.display());
    }
}

fn cmd_export_text(path: &Path, out: Option<&Path>, style: TextStyle) -> Result<()> {
    let puz = PuzFile::read(path)?;
    let text = puz.to_text_with(style)?;

    match out {
        Some(out) => {
            std::fs::write(out, text)
                .with_context(|| format!("Failed to write text puzzle: {}", out.display()))?;
            println!("[ok] wrote text puzzle -> {}", out.display());
        }
        None => print!("{}", text),
    }

    Ok(())
}

fn cmd_import_text(path: &Path, out: &Path) -> Result<()> {
    let puz = PuzFile::read_text(path)?;
    println!(
        "[info] {}x{} puzzle, {} clues, version {}",
        puz.width(),
        puz.height(),
        puz.clues().len(),
        puz.version()
    );

    puz.write(out)?;
    println!("[ok] wrote puzzle -> {}", out.display());

    Ok(())
}

fn print_fields(path: &Path, puz: &PuzFile) {
    println!("width [{}]", puz.width());
    println!("height [{}]", puz.height());
    println!("scrambled [{}]", puz.is_scrambled());
    println!("fillchecksum [0x{:04x}]", puz.scrambled_checksum());
    println!("filename [{}]", path.display());
}

fn save(target: &Target, puz: &PuzFile) -> Result<()> {
    let dest = target.destination();

    if target.backup && dest.exists() {
        let backup = BackupManager::beside(dest)
            .create_backup(dest)
            .context("Failed to back up puzzle before writing")?;
        println!("[info] backup -> {}", backup.display());
    }

    puz.write(dest)?;
    println!("[ok] wrote puzzle -> {}", dest.display());

    Ok(())
}

fn status(ok: bool) -> &'static str {
    if ok { "OK" } else { "MISMATCH" }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
