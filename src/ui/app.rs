use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use eframe::egui::{self, Color32, Key, RichText, TextEdit, TopBottomPanel, Ui};

use crate::config::ConsoleConfig;
use crate::console::{Console, ConsoleError};
use crate::dispatch::{DispatchOutcome, FixedAnswer, TXT_ARE_YOU_SURE, TXT_PLEASE_CONFIRM};
use crate::gateway::CommandGateway;
use crate::schedule::model::{ScheduleKind, ScriptCatalog};
use crate::session::FieldGroup;

const STATUS_TTL: Duration = Duration::from_secs(4);
const FIELD_WIDTH: f32 = 32.0;

pub fn run_gui(gateway: Box<dyn CommandGateway>, config: ConsoleConfig) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Witty Pi Console")
            .with_inner_size([560.0, 420.0])
            .with_min_inner_size([480.0, 360.0]),
        ..Default::default()
    };

    let app = ConsoleApp::new(Console::new(gateway, config, Instant::now()));

    eframe::run_native(
        "Witty Pi Console",
        native_options,
        Box::new(move |cc| {
            configure_theme(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed to launch Witty Pi Console GUI: {err}"))?;

    Ok(())
}

fn configure_theme(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.override_text_color = Some(Color32::from_rgb(226, 234, 246));
    visuals.panel_fill = Color32::from_rgb(8, 16, 26);
    visuals.window_fill = Color32::from_rgb(12, 20, 32);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(16, 24, 38);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(26, 42, 62);
    visuals.selection.bg_fill = Color32::from_rgb(43, 148, 178);
    ctx.set_visuals(visuals);
}

#[derive(Debug, Clone, Copy)]
enum PendingClear {
    Schedule(ScheduleKind),
    Script,
}

struct ConsoleApp {
    console: Console,
    status_message: Option<(String, Instant)>,
    pending_clear: Option<PendingClear>,
    picker: Option<Vec<PathBuf>>,
    picker_path: String,
}

impl ConsoleApp {
    fn new(console: Console) -> Self {
        Self {
            console,
            status_message: None,
            pending_clear: None,
            picker: None,
            picker_path: String::new(),
        }
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status_message = Some((text.into(), Instant::now() + STATUS_TTL));
    }

    fn report(&mut self, action: &str, result: Result<DispatchOutcome, ConsoleError>) {
        match result {
            Ok(outcome) => self.set_status(outcome.summary(action)),
            Err(err) => self.set_status(format!("{action}: {err}")),
        }
    }

    fn idle(&self) -> bool {
        !self.console.sessions().any_active()
    }

    fn show_edit_buttons(&mut self, ui: &mut Ui, group: FieldGroup) {
        if self.console.sessions().is_editing(group) {
            if ui.button("Done").clicked() {
                let result = self.console.commit_displayed(group);
                self.report(group.label(), result);
            }
            if ui.button("Cancel").clicked() {
                self.console.cancel(group);
            }
        } else if ui.button("Edit").clicked()
            && let Err(err) = self.console.begin_edit(group)
        {
            self.set_status(err.to_string());
        }
    }

    fn show_clock_row(&mut self, ui: &mut Ui, group: FieldGroup, title: &str) {
        ui.horizontal(|ui| {
            ui.label(RichText::new(title).strong());
            if let Some(text) = self.console.edit_clock(group) {
                ui.add(TextEdit::singleline(text).desired_width(170.0));
            } else {
                let display = self.console.display();
                let text = match group {
                    FieldGroup::DeviceClock => &display.device_clock,
                    _ => &display.host_clock,
                };
                ui.label(RichText::new(text).monospace());
            }
            self.show_edit_buttons(ui, group);
        });
    }

    fn show_clock_actions(&mut self, ui: &mut Ui) {
        let idle = self.idle();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(idle, egui::Button::new("System -> RTC"))
                .clicked()
            {
                let result = self.console.copy_host_to_device();
                self.report("system to RTC", result);
            }
            if ui
                .add_enabled(idle, egui::Button::new("RTC -> System"))
                .clicked()
            {
                let result = self.console.copy_device_to_host();
                self.report("RTC to system", result);
            }
            let online = self.console.display().network_sync_offered;
            if ui
                .add_enabled(idle && online, egui::Button::new("Sync with network time"))
                .on_disabled_hover_text("No internet connection")
                .clicked()
            {
                let result = self.console.network_time_sync();
                self.report("network time sync", result);
            }
        });
    }

    fn show_schedule_row(&mut self, ui: &mut Ui, kind: ScheduleKind, title: &str) {
        ui.horizontal(|ui| {
            ui.label(RichText::new(title).strong());
            if let Some(fields) = self.console.edit_schedule(kind) {
                ui.add(TextEdit::singleline(&mut fields.date).desired_width(FIELD_WIDTH));
                ui.add(TextEdit::singleline(&mut fields.hour).desired_width(FIELD_WIDTH));
                ui.label(":");
                ui.add(TextEdit::singleline(&mut fields.minute).desired_width(FIELD_WIDTH));
                if kind.has_seconds() {
                    ui.label(":");
                    ui.add(TextEdit::singleline(&mut fields.second).desired_width(FIELD_WIDTH));
                }
            } else {
                let fields = self.console.display().schedule(kind);
                let text = if fields.is_empty() {
                    "--".to_string()
                } else if kind.has_seconds() {
                    format!("{} {}:{}:{}", fields.date, fields.hour, fields.minute, fields.second)
                } else {
                    format!("{} {}:{}", fields.date, fields.hour, fields.minute)
                };
                ui.label(RichText::new(text).monospace());
            }
            self.show_edit_buttons(ui, kind.into());

            let can_clear = self.idle() && self.console.display().clear_enabled(kind);
            if ui
                .add_enabled(can_clear, egui::Button::new("Clear"))
                .clicked()
            {
                self.pending_clear = Some(PendingClear::Schedule(kind));
            }
        });
    }

    fn show_script_row(&mut self, ui: &mut Ui) {
        let idle = self.idle();
        ui.horizontal(|ui| {
            ui.label(RichText::new("Schedule script:").strong());
            let display = self.console.display();
            let status = ui.label(display.script_status.as_str());
            if let Some(detail) = &display.script_detail {
                status.on_hover_text(detail.as_str());
            }
            if let Some(source) = &display.script_source {
                ui.label(RichText::new(source).color(Color32::from_rgb(161, 180, 201)));
            }
            let can_clear = idle && display.script_clear_enabled;

            if ui.add_enabled(idle, egui::Button::new("Choose")).clicked() {
                self.open_picker();
            }
            if ui
                .add_enabled(can_clear, egui::Button::new("Clear"))
                .clicked()
            {
                self.pending_clear = Some(PendingClear::Script);
            }
        });
    }

    // The catalog directory is only the starting point; any path can be typed.
    fn open_picker(&mut self) {
        let config = self.console.config();
        let dir = config.schedules_dir.clone();
        let listed = ScriptCatalog::list(&dir, &config.script_extension);
        self.picker_path = format!("{}/", dir.display());
        match listed {
            Ok(scripts) => self.picker = Some(scripts),
            Err(err) => {
                self.set_status(format!("cannot list {}: {err}", dir.display()));
                self.picker = Some(Vec::new());
            }
        }
    }

    fn show_picker(&mut self, ctx: &egui::Context) {
        let Some(scripts) = self.picker.clone() else {
            return;
        };
        let mut chosen = None;
        let mut close = false;
        egui::Window::new("Choose schedule script")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                if scripts.is_empty() {
                    ui.label("No schedule scripts found.");
                }
                for path in &scripts {
                    let name = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    if ui.button(name).clicked() {
                        chosen = Some(path.clone());
                    }
                }
                ui.separator();
                ui.horizontal(|ui| {
                    ui.add(
                        TextEdit::singleline(&mut self.picker_path)
                            .hint_text("path to a .wpi file")
                            .desired_width(260.0),
                    );
                    if ui.button("Install").clicked() && !self.picker_path.trim().is_empty() {
                        chosen = Some(PathBuf::from(self.picker_path.trim()));
                    }
                });
                close = ui.button("Cancel").clicked();
            });

        if let Some(path) = chosen {
            self.picker = None;
            let result = self.console.install_script(&path);
            self.report("install schedule script", result);
        } else if close {
            self.picker = None;
        }
    }

    fn show_confirm(&mut self, ctx: &egui::Context) {
        let Some(pending) = self.pending_clear else {
            return;
        };
        let mut answer = None;
        egui::Window::new(TXT_PLEASE_CONFIRM)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(TXT_ARE_YOU_SURE);
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        answer = Some(true);
                    }
                    if ui.button("No").clicked() {
                        answer = Some(false);
                    }
                });
            });

        let Some(answer) = answer else {
            return;
        };
        self.pending_clear = None;
        let mut prompt = FixedAnswer(answer);
        match pending {
            PendingClear::Schedule(kind) => {
                let result = self.console.clear_schedule(kind, &mut prompt);
                self.report(&format!("clear {} time", kind.label()), result);
            }
            PendingClear::Script => {
                let result = self.console.clear_script(&mut prompt);
                self.report("clear schedule script", result);
            }
        }
    }
}

impl eframe::App for ConsoleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some((_, expires_at)) = &self.status_message
            && Instant::now() >= *expires_at
        {
            self.status_message = None;
        }

        if ctx.input(|input| input.key_pressed(Key::Escape)) {
            let cancelled = self.console.cancel_all();
            if cancelled > 0 {
                self.set_status(format!("Cancelled {cancelled} edit(s)."));
            }
            self.pending_clear = None;
            self.picker = None;
        }

        self.console.tick(Instant::now(), Local::now());

        TopBottomPanel::top("header")
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(
                    RichText::new("Witty Pi Console")
                        .size(22.0)
                        .color(Color32::from_rgb(96, 228, 206))
                        .strong(),
                );
                if let Some((msg, _)) = &self.status_message {
                    ui.label(
                        RichText::new(msg)
                            .color(Color32::from_rgb(111, 228, 134))
                            .strong(),
                    );
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_clock_row(ui, FieldGroup::HostClock, "System time:");
            self.show_clock_row(ui, FieldGroup::DeviceClock, "RTC time:");
            self.show_clock_actions(ui);
            ui.label(
                RichText::new(&self.console.display().temperature)
                    .color(Color32::from_rgb(255, 214, 117)),
            );
            ui.separator();
            self.show_schedule_row(ui, ScheduleKind::Shutdown, "Auto shutdown:");
            self.show_schedule_row(ui, ScheduleKind::Startup, "Auto startup:");
            ui.separator();
            self.show_script_row(ui);
        });

        self.show_confirm(ctx);
        self.show_picker(ctx);

        let now = Instant::now();
        let wait = if self.console.sessions().poll_allowed() {
            self.console.until_next_poll(now)
        } else {
            self.console.config().poll_interval
        };
        ctx.request_repaint_after(wait);
    }
}
