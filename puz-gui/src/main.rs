mod services;

use eframe::egui;
use puz_core::{BackupInfo, BackupManager, Error as ScrambleError, Key};
use services::PuzzleService;
use std::path::{Path, PathBuf};

fn main() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([518.0, 340.0])
            .with_max_inner_size([518.0, 900.0])
            .with_min_inner_size([518.0, 340.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "Puzzle Scrambler",
        options,
        Box::new(|_cc| Ok(Box::new(ScramblerApp::default()))),
    )
}

#[derive(Default)]
struct ScramblerApp {
    service: PuzzleService,

    // Inputs
    puzzle_path: String,
    key_input: String,
    make_backup: bool,

    // Operation state
    operation_mode: OperationMode,
    status_message: String,
    error_message: String,

    // Loaded puzzle info
    loaded: Option<PuzzleSummary>,
    backups: Vec<BackupInfo>,

    // UI state
    needs_resize: bool,
}

struct PuzzleSummary {
    title: String,
    width: usize,
    height: usize,
    letters: usize,
    scrambled: bool,
    fingerprint: u16,
    preview: String,
}

#[derive(Default, PartialEq)]
enum OperationMode {
    #[default]
    Scramble,
    Unscramble,
}

impl ScramblerApp {
    fn path(&self) -> PathBuf {
        PathBuf::from(self.puzzle_path.trim())
    }

    fn fail(&mut self, message: String) {
        self.error_message = message;
        self.needs_resize = true;
    }

    fn load_puzzle(&mut self) {
        self.error_message.clear();
        self.status_message.clear();

        let path = self.path();
        match self.service.load(&path) {
            Ok(puz) => {
                self.operation_mode = if puz.is_scrambled() {
                    OperationMode::Unscramble
                } else {
                    OperationMode::Scramble
                };
                self.loaded = Some(PuzzleSummary {
                    title: puz.title(),
                    width: puz.width(),
                    height: puz.height(),
                    letters: puz.solution().letter_count(),
                    scrambled: puz.is_scrambled(),
                    fingerprint: puz.scrambled_checksum(),
                    preview: self.service.preview(&puz),
                });
                self.refresh_backups(&path);
                self.needs_resize = true;
            }
            Err(e) => {
                self.loaded = None;
                self.fail(format!("Failed to load puzzle: {:?}", e));
            }
        }
    }

    fn refresh_backups(&mut self, path: &Path) {
        self.backups = BackupManager::beside(path)
            .list_backups()
            .unwrap_or_default();
    }

    fn run_operation(&mut self) {
        self.error_message.clear();
        self.status_message.clear();

        let key: Key = match self.key_input.trim().parse() {
            Ok(key) => key,
            Err(e) => return self.fail(format!("{}", e)),
        };

        let path = self.path();

        if self.make_backup {
            if let Err(e) = BackupManager::beside(&path).create_backup(&path) {
                return self.fail(format!("Backup failed, puzzle not modified: {:?}", e));
            }
        }

        let result = match self.operation_mode {
            OperationMode::Scramble => self.service.scramble(&path, key).map(|fingerprint| {
                format!(
                    "✓ Scrambled with key {}\nFingerprint: 0x{:04x}",
                    key, fingerprint
                )
            }),
            OperationMode::Unscramble => self
                .service
                .unscramble(&path, key)
                .map(|_| format!("✓ Unscrambled with key {}", key)),
        };

        match result {
            Ok(message) => {
                self.load_puzzle();
                self.status_message = message;
            }
            Err(e) => match e.downcast_ref::<ScrambleError>() {
                Some(ScrambleError::KeyMismatch { .. }) => {
                    self.fail(format!("Incorrect key {}; the puzzle was not changed.", key))
                }
                _ => self.fail(format!("Operation failed: {:?}", e)),
            },
        }
    }

    fn export_text(&mut self) {
        self.error_message.clear();
        self.status_message.clear();

        let path = self.path();
        let Some(dest) = rfd::FileDialog::new()
            .add_filter("Across Lite text", &["txt"])
            .set_file_name(format!(
                "{}.txt",
                path.file_stem().and_then(|s| s.to_str()).unwrap_or("puzzle")
            ))
            .save_file()
        else {
            return;
        };

        match self.service.export_text(&path, &dest) {
            Ok(()) => self.status_message = format!("✓ Exported {}", dest.display()),
            Err(e) => self.fail(format!("Export failed: {:?}", e)),
        }
        self.needs_resize = true;
    }

    fn restore(&mut self, backup_path: PathBuf) {
        self.error_message.clear();
        self.status_message.clear();

        let path = self.path();
        match BackupManager::beside(&path).restore_backup(&backup_path, &path) {
            Ok(()) => {
                self.load_puzzle();
                self.status_message = format!("✓ Restored {}", backup_path.display());
            }
            Err(e) => self.fail(format!("Restore failed: {:?}", e)),
        }
    }
}

impl eframe::App for ScramblerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let version = env!("CARGO_PKG_VERSION");

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(format!("Puzzle Scrambler v{}", version));

            ui.add_space(10.0);
            ui.separator();
            ui.add_space(10.0);

            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.label("Puzzle file:");
                    ui.text_edit_singleline(&mut self.puzzle_path);
                    if ui.button("Browse...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Across Lite puzzles", &["puz"])
                            .add_filter("All files", &["*"])
                            .pick_file()
                        {
                            self.puzzle_path = path.display().to_string();
                            self.load_puzzle();
                        }
                    }
                    if ui.button("Load").clicked() {
                        self.load_puzzle();
                    }
                    if self.loaded.as_ref().is_some_and(|p| !p.scrambled)
                        && ui.button("📝 Export Text...").clicked()
                    {
                        self.export_text();
                    }
                });

                ui.add_space(5.0);

                ui.horizontal(|ui| {
                    ui.label("Key:");
                    ui.text_edit_singleline(&mut self.key_input);
                    if ui.button("🎲 Generate").clicked() {
                        self.key_input = Key::generate().to_string();
                    }
                });

                ui.add_space(5.0);

                ui.horizontal(|ui| {
                    ui.label("Mode:");
                    ui.radio_value(&mut self.operation_mode, OperationMode::Scramble, "🔒 Scramble");
                    ui.radio_value(&mut self.operation_mode, OperationMode::Unscramble, "🔓 Unscramble");
                });

                ui.checkbox(&mut self.make_backup, "Back up the file before modifying it");

                ui.add_space(10.0);

                let label = match self.operation_mode {
                    OperationMode::Scramble => "🔒 Scramble Puzzle",
                    OperationMode::Unscramble => "🔓 Unscramble Puzzle",
                };
                if ui.button(label).clicked() {
                    self.run_operation();
                }
            });

            ui.add_space(15.0);

            if !self.error_message.is_empty() {
                ui.group(|ui| {
                    ui.colored_label(egui::Color32::RED, "Error");
                    ui.label(&self.error_message);
                });
            }

            if !self.status_message.is_empty() {
                ui.group(|ui| {
                    ui.colored_label(egui::Color32::GREEN, "Success");
                    ui.label(&self.status_message);
                });
            }

            if let Some(summary) = &self.loaded {
                ui.add_space(10.0);
                ui.label(format!(
                    "{} – {}x{}, {} letters, {}",
                    if summary.title.is_empty() { "(untitled)" } else { summary.title.as_str() },
                    summary.width,
                    summary.height,
                    summary.letters,
                    if summary.scrambled {
                        format!("scrambled (fingerprint 0x{:04x})", summary.fingerprint)
                    } else {
                        "unscrambled".to_string()
                    }
                ));

                ui.collapsing("📄 Solution Grid", |ui| {
                    egui::ScrollArea::vertical()
                        .max_height(200.0)
                        .show(ui, |ui| {
                            ui.add(
                                egui::TextEdit::multiline(&mut summary.preview.as_str())
                                    .code_editor()
                                    .desired_width(f32::INFINITY),
                            );
                        });
                });
            }

            let mut restore = None;
            if !self.backups.is_empty() {
                ui.collapsing(format!("🗄 Backups ({})", self.backups.len()), |ui| {
                    for backup in &self.backups {
                        ui.horizontal(|ui| {
                            ui.label(format!(
                                "{}  {}  {} bytes{}",
                                backup.timestamp.format("%Y-%m-%d %H:%M:%S"),
                                backup.filename,
                                backup.size,
                                match (backup.is_valid, backup.is_scrambled) {
                                    (false, _) => "  (invalid)",
                                    (true, true) => "  (scrambled)",
                                    (true, false) => "",
                                }
                            ));
                            if backup.is_valid && ui.button("Restore").clicked() {
                                restore = Some(backup.path.clone());
                            }
                        });
                    }
                });
            }
            if let Some(path) = restore {
                self.restore(path);
            }

            ui.add_space(15.0);
            ui.separator();

            ui.horizontal(|ui| {
                ui.label("by Anatolij <tolik518> Vasilev");
            });
        });

        if self.needs_resize {
            self.needs_resize = false;
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(518.0, 620.0)));
        }
    }
}
