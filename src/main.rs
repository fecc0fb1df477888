// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(windows)]
mod app {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use eframe::{egui, App, Frame, NativeOptions};
    use egui::{Button, FontFamily, FontId, RichText};
    use egui_dialogs::{DialogDetails, Dialogs, StandardDialog, StandardReply};
    use indexmap::IndexMap;
    use latency_optimizer::{
        backup::BackupManager,
        constants::{
            BACKUP_LOG_FILE, LABEL_FONT_SIZE, MANUAL_RESTORE_POINT, TWEAK_CONTAINER_HEIGHT,
            TWEAK_CONTAINER_WIDTH, UI_PADDING, UI_SPACING, WINDOW_HEIGHT, WINDOW_WIDTH,
        },
        orchestrator::{InitialStateProgress, TaskOrchestrator, TweakAction, TweakTask},
        state::{SystemState, SystemStateAccess},
        tweaks::{self, Tweak, TweakCategory, TweakId, TweakStatus},
        ui::{
            button::{ActionButton, ButtonState},
            switch::toggle_switch,
            TweakWidget,
        },
        utils::windows::is_elevated,
    };
    use tracing::Level;

    pub struct LatencyOptimizerApp {
        /// The full catalog, in display order.
        tweaks: IndexMap<TweakId, Tweak>,

        orchestrator: TaskOrchestrator,
        backup: Arc<Mutex<BackupManager>>,
        state: Arc<dyn SystemStateAccess>,

        // State tracking for initial state reads
        initial_reads: InitialStateProgress,

        /// Outcome of the most recent backup panel action.
        backup_message: Option<String>,

        dialogs: Dialogs<'static>,
    }

    impl LatencyOptimizerApp {
        fn new(_cc: &eframe::CreationContext<'_>) -> Self {
            let tweaks = tweaks::all_tweaks();
            let backup = Arc::new(Mutex::new(BackupManager::new()));
            let state: Arc<dyn SystemStateAccess> = Arc::new(SystemState);
            let orchestrator = TaskOrchestrator::new(Arc::clone(&backup), Arc::clone(&state));

            let initial_reads = InitialStateProgress::new(tweaks.len());

            let mut dialogs = Dialogs::new();
            if !is_elevated() {
                dialogs.add(DialogDetails::new(
                    StandardDialog::info(
                        "Warning",
                        "This program must be run in administrator mode.",
                    )
                    .buttons(vec![("OK".into(), StandardReply::Cancel)]),
                ));
            }

            for (id, tweak) in tweaks.iter() {
                let task = TweakTask {
                    id: *id,
                    name: tweak.name,
                    method: Arc::clone(&tweak.method),
                    action: TweakAction::ReadInitialState,
                };
                if let Err(e) = orchestrator.submit_task(task) {
                    tracing::error!(
                        "Failed to submit initial state task for tweak {:?}: {:?}",
                        id,
                        e
                    );
                }
            }

            Self {
                tweaks,
                orchestrator,
                backup,
                state,
                initial_reads,
                backup_message: None,
                dialogs,
            }
        }

        fn count_tweaks_pending_reboot(&self) -> usize {
            self.tweaks
                .values()
                .filter(|tweak| tweak.pending_reboot)
                .count()
        }

        /// Drains the orchestrator channel and folds results into tweak state.
        fn update_tweak_states(&mut self) {
            while let Some(result) = self.orchestrator.try_recv_result() {
                let Some(tweak) = self.tweaks.get_mut(&result.id) else {
                    continue;
                };
                if result.success {
                    match result.action {
                        TweakAction::Apply => {
                            tweak.enabled = true;
                            tweak.status = TweakStatus::Idle;
                            tracing::debug!("Applied tweak {:?}", result.id);
                        }
                        TweakAction::Revert => {
                            tweak.enabled = false;
                            tweak.status = TweakStatus::Idle;
                            tracing::debug!("Reverted tweak {:?}", result.id);
                        }
                        TweakAction::ReadInitialState => {
                            tweak.enabled = result.enabled_state.unwrap_or(false);
                            tweak.status = TweakStatus::Idle;
                            self.initial_reads.note_read_finished();
                        }
                    }
                } else if let Some(err) = result.error {
                    tweak.status = TweakStatus::Failed(format!("{:#}", err));
                    tracing::error!("Tweak {:?} failed: {:?}", result.id, err);

                    match result.action {
                        // The loading splash waits on this counter; a failed
                        // probe still answers it, and is not retried.
                        TweakAction::ReadInitialState => {
                            self.initial_reads.note_read_finished();
                        }
                        // Re-read so the toggle reflects what actually
                        // happened on the system.
                        TweakAction::Apply | TweakAction::Revert => {
                            if let Err(e) = self.orchestrator.submit_task(TweakTask {
                                id: result.id,
                                name: tweak.name,
                                method: Arc::clone(&tweak.method),
                                action: TweakAction::ReadInitialState,
                            }) {
                                tracing::error!("Failed to submit state read task: {:?}", e);
                            }
                        }
                    }
                }
            }
        }

        fn draw_ui(&mut self, ui: &mut egui::Ui) {
            ui.columns(3, |columns| {
                for category in TweakCategory::left() {
                    self.draw_category_section(&mut columns[0], category);
                }
                for category in TweakCategory::middle() {
                    self.draw_category_section(&mut columns[1], category);
                }
                for category in TweakCategory::right() {
                    self.draw_category_section(&mut columns[2], category);
                }
            });
        }

        fn draw_category_section(&mut self, ui: &mut egui::Ui, category: TweakCategory) {
            let category_tweaks: Vec<TweakId> = self
                .tweaks
                .iter()
                .filter(|(_, tweak)| tweak.category == category)
                .map(|(id, _)| *id)
                .collect();

            if category_tweaks.is_empty() {
                return;
            }

            ui.heading(format!("{} Tweaks", category));
            ui.separator();

            for tweak_id in category_tweaks {
                egui::Frame::none().show(ui, |ui| {
                    ui.set_width(TWEAK_CONTAINER_WIDTH);
                    self.draw_tweak_container(ui, tweak_id);
                });
            }

            ui.add_space(UI_SPACING);
        }

        fn draw_tweak_container(&mut self, ui: &mut egui::Ui, tweak_id: TweakId) {
            let Some((name, description)) = self
                .tweaks
                .get(&tweak_id)
                .map(|tweak| (tweak.name, tweak.description))
            else {
                return;
            };

            egui::Grid::new(format!("tweak_grid_{:?}", tweak_id))
                .num_columns(2)
                .min_col_width(TWEAK_CONTAINER_WIDTH - 60.0 - UI_SPACING * 2.0)
                .spacing([UI_SPACING, 0.0])
                .show(ui, |ui| {
                    ui.vertical(|ui| {
                        ui.collapsing(name, |ui| {
                            ui.label(
                                RichText::new(description)
                                    .font(FontId::new(12.0, FontFamily::Proportional)),
                            );
                            if let Some(tweak) = self.tweaks.get(&tweak_id) {
                                if let TweakStatus::Failed(ref err) = tweak.status {
                                    ui.colored_label(
                                        egui::Color32::RED,
                                        format!("Error: {}", err),
                                    );
                                }
                                if tweak.pending_reboot {
                                    ui.label("Takes effect after restart.");
                                }
                            }
                            ui.add_space(UI_SPACING);
                        });
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                        let widget = self.tweaks.get(&tweak_id).map(|tweak| tweak.widget);
                        match widget {
                            Some(TweakWidget::Toggle) => self.draw_toggle_widget(ui, tweak_id),
                            Some(TweakWidget::Button) => self.draw_button_widget(ui, tweak_id),
                            None => {}
                        }
                    });

                    ui.end_row();
                });
        }

        fn draw_toggle_widget(&mut self, ui: &mut egui::Ui, tweak_id: TweakId) {
            let Some(tweak) = self.tweaks.get_mut(&tweak_id) else {
                return;
            };
            let busy = tweak.status == TweakStatus::Busy;
            let mut enabled = tweak.enabled;

            let response = ui.add(toggle_switch(&mut enabled, busy));

            if response.changed() && !busy {
                tweak.enabled = enabled;
                if tweak.requires_reboot {
                    tweak.pending_reboot = true;
                }
                tweak.status = TweakStatus::Busy;
                let result = self.orchestrator.submit_task(TweakTask {
                    id: tweak_id,
                    name: tweak.name,
                    method: Arc::clone(&tweak.method),
                    action: if enabled {
                        TweakAction::Apply
                    } else {
                        TweakAction::Revert
                    },
                });
                if let Err(e) = result {
                    tweak.status = TweakStatus::Failed(e.to_string());
                }
            }
        }

        fn draw_button_widget(&mut self, ui: &mut egui::Ui, tweak_id: TweakId) {
            let Some(tweak) = self.tweaks.get_mut(&tweak_id) else {
                return;
            };
            let state = match tweak.status {
                TweakStatus::Busy => ButtonState::InProgress,
                _ => ButtonState::Default,
            };

            let response = ui.add(ActionButton::new("Apply", "Applying...", state));

            if response.clicked() && state == ButtonState::Default {
                tweak.status = TweakStatus::Busy;
                if tweak.requires_reboot {
                    tweak.pending_reboot = true;
                }
                if let Err(e) = self.orchestrator.submit_task(TweakTask {
                    id: tweak_id,
                    name: tweak.name,
                    method: Arc::clone(&tweak.method),
                    action: TweakAction::Apply,
                }) {
                    tweak.status = TweakStatus::Failed(e.to_string());
                }
            }
        }

        /// Restore point list plus the backup action row.
        fn draw_backup_panel(&mut self, ctx: &egui::Context) {
            egui::TopBottomPanel::bottom("backup_panel")
                .resizable(false)
                .min_height(140.0)
                .show(ctx, |ui| {
                    ui.add_space(UI_PADDING);
                    ui.heading("Restore Points");

                    let lines = self.backup.lock().unwrap().status_lines();
                    egui::ScrollArea::vertical()
                        .max_height(70.0)
                        .auto_shrink([false, true])
                        .show(ui, |ui| {
                            for line in &lines {
                                ui.label(
                                    RichText::new(line)
                                        .font(FontId::monospace(LABEL_FONT_SIZE - 2.0)),
                                );
                            }
                        });

                    ui.separator();
                    ui.horizontal(|ui| {
                        if ui.button("Create Restore Point").clicked() {
                            let mut backup = self.backup.lock().unwrap();
                            let captured = backup.pending_captures();
                            backup.create_restore_point(MANUAL_RESTORE_POINT);
                            self.backup_message =
                                Some(format!("Restore point sealed ({} entries).", captured));
                        }
                        if ui.button("Restore Last").clicked() {
                            let backup = self.backup.lock().unwrap();
                            let ok = backup.restore_latest(self.state.as_ref());
                            self.backup_message = Some(if ok {
                                "Latest restore point applied.".to_string()
                            } else {
                                "Restore failed or no restore points exist.".to_string()
                            });
                        }
                        if ui.button("Restore All").clicked() {
                            let backup = self.backup.lock().unwrap();
                            let ok = backup.restore_all(self.state.as_ref());
                            self.backup_message = Some(if ok {
                                "All restore points replayed.".to_string()
                            } else {
                                "Some entries could not be restored.".to_string()
                            });
                        }
                        if ui.button("Export Log").clicked() {
                            let backup = self.backup.lock().unwrap();
                            self.backup_message =
                                Some(match backup.export_log(Path::new(BACKUP_LOG_FILE)) {
                                    Ok(()) => format!("Log written to {}.", BACKUP_LOG_FILE),
                                    Err(e) => format!("Export failed: {:#}", e),
                                });
                        }
                        if ui.button("Clear History").clicked() {
                            self.backup.lock().unwrap().clear();
                            self.backup_message = Some("Backup history cleared.".to_string());
                        }
                    });

                    if let Some(message) = &self.backup_message {
                        ui.label(
                            RichText::new(message).font(FontId::proportional(LABEL_FONT_SIZE)),
                        );
                    }
                    ui.add_space(UI_PADDING);
                });
        }

        fn draw_status_bar(&mut self, ctx: &egui::Context) {
            egui::TopBottomPanel::bottom("status_bar")
                .min_height(TWEAK_CONTAINER_HEIGHT)
                .resizable(false)
                .show(ctx, |ui| {
                    egui::Frame::none()
                        .inner_margin(egui::Margin::same(UI_PADDING))
                        .show(ui, |ui| {
                            ui.horizontal(|ui| {
                                ui.label(
                                    RichText::new(concat!("v", env!("CARGO_PKG_VERSION")))
                                        .font(FontId::proportional(LABEL_FONT_SIZE)),
                                );
                                ui.separator();

                                let pending = self.count_tweaks_pending_reboot();
                                ui.label(
                                    RichText::new(format!(
                                        "{} tweak{} pending restart",
                                        pending,
                                        if pending != 1 { "s" } else { "" }
                                    ))
                                    .font(FontId::proportional(LABEL_FONT_SIZE)),
                                );

                                ui.with_layout(
                                    egui::Layout::right_to_left(egui::Align::Center),
                                    |ui| {
                                        if ui.add(Button::new("Apply All Safe")).clicked() {
                                            self.apply_all_safe();
                                        }
                                        if ui.add(Button::new("Revert All")).clicked() {
                                            self.revert_all();
                                        }
                                    },
                                );
                            });
                        });
                });
        }

        fn apply_all_safe(&mut self) {
            for (id, tweak) in self.tweaks.iter_mut() {
                if tweak.risk != tweaks::TweakRisk::Safe
                    || tweak.enabled
                    || tweak.status == TweakStatus::Busy
                {
                    continue;
                }
                tweak.status = TweakStatus::Busy;
                if tweak.requires_reboot {
                    tweak.pending_reboot = true;
                }
                if let Err(e) = self.orchestrator.submit_task(TweakTask {
                    id: *id,
                    name: tweak.name,
                    method: Arc::clone(&tweak.method),
                    action: TweakAction::Apply,
                }) {
                    tweak.status = TweakStatus::Failed(e.to_string());
                }
            }
        }

        fn revert_all(&mut self) {
            for (id, tweak) in self.tweaks.iter_mut() {
                if !tweak.enabled || tweak.status == TweakStatus::Busy {
                    continue;
                }
                tweak.status = TweakStatus::Busy;
                if let Err(e) = self.orchestrator.submit_task(TweakTask {
                    id: *id,
                    name: tweak.name,
                    method: Arc::clone(&tweak.method),
                    action: TweakAction::Revert,
                }) {
                    tweak.status = TweakStatus::Failed(e.to_string());
                }
            }
        }
    }

    impl App for LatencyOptimizerApp {
        fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
            if !self.dialogs.dialogs().is_empty() {
                if let Some(res) = self.dialogs.show(ctx) {
                    if let Ok(StandardReply::Cancel) = res.reply() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                }
                return;
            }

            self.update_tweak_states();

            if !self.initial_reads.complete() {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Reading system state...");
                    ui.add(egui::widgets::Spinner::new());
                });
                return;
            }

            self.draw_status_bar(ctx);
            self.draw_backup_panel(ctx);

            egui::CentralPanel::default().show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        self.draw_ui(ui);
                    });
            });
        }
    }

    pub fn run() -> eframe::Result<()> {
        #[cfg(debug_assertions)]
        {
            tracing_subscriber::fmt()
                .with_max_level(Level::DEBUG)
                .with_target(false)
                .init();
        }

        #[cfg(not(debug_assertions))]
        {
            // No-op subscriber so tracing macros are silent in release builds.
            use tracing_subscriber::Registry;
            tracing::subscriber::set_global_default(Registry::default())
                .expect("Failed to set global subscriber.");
        }

        let options = NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
                .with_min_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT / 2.0]),
            ..Default::default()
        };

        eframe::run_native(
            "Latency Optimizer",
            options,
            Box::new(|cc| Ok(Box::new(LatencyOptimizerApp::new(cc)))),
        )
    }
}

#[cfg(windows)]
fn main() -> eframe::Result<()> {
    app::run()
}

#[cfg(not(windows))]
fn main() {
    eprintln!("latency_optimizer only runs on Windows.");
}
