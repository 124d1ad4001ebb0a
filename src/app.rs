use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

use eframe::egui;
use eframe::egui::{
    Align, Align2, Color32, CornerRadius, FontId, Rect, Sense, Stroke, StrokeKind, Vec2,
};
use time::OffsetDateTime;

use crate::async_config::ConfigSaver;
use crate::config;
use crate::engine::{self, EngineMessage, ListenerMessage};
use crate::model::{path_segments, TransferIntent, TransferKind};
use crate::popup::{self, Action, Dispatch};
use crate::state::{SyncEvent, SyncSnapshot};
use crate::styles;

const APP_TITLE_TEXT: &str = concat!("LoftSync - v", env!("CARGO_PKG_VERSION"));
const TITLE_BAR_H: f32 = 30.0;
const MAX_EVENTS_PER_FRAME: usize = 256;

#[derive(Clone, Copy)]
struct UiTheme {
    bg: Color32,
    fg: Color32,
    top_bg: Color32,
    top_border: Color32,
    accent: Color32,
    muted: Color32,
}

impl Default for UiTheme {
    fn default() -> Self {
        Self {
            bg: Color32::from_rgb(10, 12, 14),
            fg: Color32::from_rgb(220, 220, 220),
            top_bg: Color32::from_rgb(18, 20, 24),
            top_border: Color32::from_rgb(45, 50, 58),
            accent: Color32::from_rgb(255, 184, 108),
            muted: Color32::from_rgb(140, 150, 160),
        }
    }
}

impl UiTheme {
    fn light_default() -> Self {
        Self {
            bg: Color32::from_rgb(244, 246, 249),
            fg: Color32::from_rgb(28, 34, 42),
            top_bg: Color32::from_rgb(231, 235, 241),
            top_border: Color32::from_rgb(170, 178, 190),
            accent: Color32::from_rgb(196, 120, 20),
            muted: Color32::from_rgb(102, 112, 124),
        }
    }

    fn for_mode(mode: config::UiThemeMode) -> Self {
        match mode {
            config::UiThemeMode::Dark => Self::default(),
            config::UiThemeMode::Light => Self::light_default(),
        }
    }
}

fn adjust_color(c: Color32, delta: f32) -> Color32 {
    let (r, g, b, a) = c.to_tuple();
    let t = delta.abs().clamp(0.0, 1.0);
    let (tr, tg, tb) = if delta >= 0.0 {
        (255u8, 255u8, 255u8)
    } else {
        (0u8, 0u8, 0u8)
    };
    let lerp = |x: u8, y: u8| -> u8 {
        (x as f32 + (y as f32 - x as f32) * t)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Color32::from_rgba_premultiplied(lerp(r, tr), lerp(g, tg), lerp(b, tb), a)
}

fn file_size_label(size: u64, is_dir: bool) -> String {
    if is_dir {
        "-".to_string()
    } else if size >= 1_000_000_000 {
        format!("{:.1} GB", size as f64 / 1_000_000_000.0)
    } else if size >= 1_000_000 {
        format!("{:.1} MB", size as f64 / 1_000_000.0)
    } else if size >= 1_000 {
        format!("{:.1} KB", size as f64 / 1_000.0)
    } else {
        format!("{size} B")
    }
}

/// One entry on the navigation stack. `NavigateUp` pops; the files view is
/// the root and never leaves the stack.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Route {
    Files,
    TransferPopup { path: String },
}

pub struct AppState {
    theme: UiTheme,

    config: config::AppConfig,
    config_saver: ConfigSaver,

    snapshot: SyncSnapshot,
    route_stack: Vec<Route>,

    engine_rx: Receiver<EngineMessage>,
    engine_ctl_tx: Sender<ListenerMessage>,
    engine_handle: Option<JoinHandle<()>>,
    engine_connected: bool,
    engine_status: String,

    action_tx: Sender<Action>,
    action_rx: Receiver<Action>,

    style_initialized: bool,
    restored_window: bool,
    window_geometry: Option<config::SavedWindow>,
}

impl AppState {
    pub fn new() -> Self {
        let config = config::load();
        let theme = UiTheme::for_mode(config.ui_theme_mode);

        let (engine_tx, engine_rx) = mpsc::channel::<EngineMessage>();
        let (engine_ctl_tx, engine_ctl_rx) = mpsc::channel::<ListenerMessage>();
        let engine_handle = Some(engine::start_listener(
            config.daemon_addr.clone(),
            engine_tx,
            engine_ctl_rx,
        ));

        let (action_tx, action_rx) = mpsc::channel::<Action>();

        let mut snapshot = SyncSnapshot::default();
        snapshot.username = config.username_override.clone();

        Self {
            theme,
            config,
            config_saver: ConfigSaver::spawn(),
            snapshot,
            route_stack: vec![Route::Files],
            engine_rx,
            engine_ctl_tx,
            engine_handle,
            engine_connected: false,
            engine_status: "Starting...".to_string(),
            action_tx,
            action_rx,
            style_initialized: false,
            restored_window: false,
            window_geometry: None,
        }
    }

    fn poll_engine_messages(&mut self) {
        let mut processed = 0usize;
        loop {
            if processed >= MAX_EVENTS_PER_FRAME {
                break;
            }
            match self.engine_rx.try_recv() {
                Ok(EngineMessage::Status(s)) => {
                    self.engine_status = s;
                }
                Ok(EngineMessage::Connected(ok)) => {
                    self.engine_connected = ok;
                }
                Ok(EngineMessage::Event(event)) => {
                    self.route_for_event(&event);
                    self.snapshot.apply_event(event);
                    // The override wins over whatever the daemon reports.
                    if let Some(username) = &self.config.username_override {
                        self.snapshot.username = Some(username.clone());
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.engine_connected = false;
                    self.engine_status = "Sync daemon listener stopped".to_string();
                    break;
                }
            }
            processed += 1;
        }
    }

    /// A starting foreground download surfaces the popup, unless one is
    /// already showing.
    fn route_for_event(&mut self, event: &SyncEvent) {
        let SyncEvent::TransferStarted { path, record, .. } = event else {
            return;
        };
        if record.kind != TransferKind::Download || record.intent == TransferIntent::None {
            return;
        }
        if matches!(self.route_stack.last(), Some(Route::TransferPopup { .. })) {
            return;
        }
        self.route_stack.push(Route::TransferPopup { path: path.clone() });
    }

    fn apply_actions(&mut self) {
        while let Ok(action) = self.action_rx.try_recv() {
            match action {
                Action::NavigateUp => {
                    if self.route_stack.len() > 1 {
                        self.route_stack.pop();
                    }
                }
                Action::DismissTransfer(key) => {
                    self.snapshot.remove_transfer(&key);
                }
            }
        }
    }

    fn apply_global_style(&self, ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();
        style.visuals = match self.config.ui_theme_mode {
            config::UiThemeMode::Dark => egui::Visuals::dark(),
            config::UiThemeMode::Light => egui::Visuals::light(),
        };
        style.visuals.override_text_color = Some(self.theme.fg);
        style.visuals.panel_fill = self.theme.bg;
        style.visuals.window_fill = adjust_color(self.theme.top_bg, 0.06);
        style.visuals.window_stroke = Stroke::new(1.0, self.theme.top_border);
        style.visuals.faint_bg_color = adjust_color(self.theme.top_bg, 0.04);
        style.visuals.extreme_bg_color = self.theme.bg;
        style.visuals.hyperlink_color = self.theme.accent;
        style.visuals.selection.bg_fill = self.theme.accent;
        ctx.set_style(style);
    }

    fn maybe_restore_window(&mut self, ctx: &egui::Context) {
        if self.restored_window {
            return;
        }
        self.restored_window = true;
        let Some(saved) = self.config.saved_window else {
            return;
        };
        if saved.maximized {
            ctx.send_viewport_cmd(egui::ViewportCommand::Maximized(true));
            return;
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(
            saved.outer_pos.into(),
        ));
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(saved.inner_size.into()));
    }

    fn track_window_geometry(&mut self, ctx: &egui::Context) {
        let (outer, inner, maximized) = ctx.input(|i| {
            (
                i.viewport().outer_rect,
                i.viewport().inner_rect,
                i.viewport().maximized.unwrap_or(false),
            )
        });
        if let (Some(outer), Some(inner)) = (outer, inner) {
            self.window_geometry = Some(config::SavedWindow {
                outer_pos: [outer.min.x, outer.min.y],
                inner_size: [inner.width(), inner.height()],
                maximized,
            });
        }
    }

    fn draw_progress_bar(&self, ui: &mut egui::Ui, frac: f32, text: &str) {
        let frac = frac.clamp(0.0, 1.0);
        let bar_height = (ui.spacing().interact_size.y - 4.0).max(14.0);
        let (rect, _) =
            ui.allocate_exact_size(Vec2::new(ui.available_width(), bar_height), Sense::hover());
        let rounding = CornerRadius::same(4);

        ui.painter()
            .rect_filled(rect, rounding, adjust_color(self.theme.top_bg, 0.04));
        ui.painter().rect_stroke(
            rect,
            rounding,
            Stroke::new(1.0, self.theme.top_border),
            StrokeKind::Inside,
        );

        if frac > 0.0 {
            let fill_rect = Rect::from_min_size(
                rect.min,
                Vec2::new(rect.width() * frac, rect.height()),
            );
            ui.painter()
                .rect_filled(fill_rect, rounding, self.theme.accent);
        }

        let label = if frac > 0.0 {
            format!("{text} ({:.0}%)", frac * 100.0)
        } else {
            text.to_string()
        };
        ui.painter().text(
            rect.center(),
            Align2::CENTER_CENTER,
            label,
            FontId::proportional(11.0),
            self.theme.fg,
        );
    }

    fn draw_transfer_popup(&mut self, ctx: &egui::Context, path: &str) {
        let dispatch = Dispatch::new(self.action_tx.clone());
        let props = popup::connect(
            &self.snapshot,
            path,
            &dispatch,
            OffsetDateTime::now_utc(),
        );
        if props.is_done {
            // connect() already issued the dismissal; skip one frame of a
            // finished popup.
            return;
        }

        let title = match props.intent {
            TransferIntent::CameraRoll => "Saving",
            _ => "Downloading",
        };
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_BOTTOM, Vec2::new(0.0, -24.0))
            .min_width(320.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(props.item_styles.icon.glyph())
                            .size(18.0)
                            .color(props.item_styles.tint),
                    );
                    let name = egui::RichText::new(&props.name).color(self.theme.fg);
                    ui.label(if props.item_styles.owned_by_self {
                        name.strong()
                    } else {
                        name
                    });
                });
                ui.add_space(4.0);
                self.draw_progress_bar(ui, props.complete_portion, &props.progress_text);
                ui.add_space(6.0);
                ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("Hide").clicked() {
                        props.on_hidden.invoke();
                    }
                });
            });
    }

    fn draw_files_view(&mut self, ui: &mut egui::Ui) {
        ui.visuals_mut().override_text_color = Some(self.theme.fg);
        if self.snapshot.path_items.is_empty() {
            ui.label(egui::RichText::new("No synced items yet.").color(self.theme.muted));
            return;
        }

        let mut paths: Vec<&String> = self.snapshot.path_items.keys().collect();
        paths.sort();

        egui::ScrollArea::vertical()
            .id_salt("files_view_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for path in paths {
                    let item = &self.snapshot.path_items[path];
                    let segments = path_segments(path);
                    let item_styles = styles::item_styles(
                        &segments,
                        item.ptype,
                        self.snapshot.username.as_deref(),
                    );
                    ui.horizontal(|ui| {
                        ui.label(
                            egui::RichText::new(item_styles.icon.glyph())
                                .color(item_styles.tint),
                        );
                        let name = egui::RichText::new(&item.name).color(self.theme.fg);
                        ui.label(if item_styles.owned_by_self {
                            name.strong()
                        } else {
                            name
                        });
                        ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                            ui.label(
                                egui::RichText::new(file_size_label(
                                    item.size,
                                    item.ptype == crate::model::PathType::Folder,
                                ))
                                .color(self.theme.muted)
                                .size(11.0),
                            );
                        });
                    });
                }
            });
    }
}

impl eframe::App for AppState {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        self.theme.bg.to_normalized_gamma_f32()
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.style_initialized {
            self.apply_global_style(ctx);
            self.style_initialized = true;
        }
        self.maybe_restore_window(ctx);

        self.poll_engine_messages();

        // A live download redraws at interactive cadence; otherwise idle.
        let repaint_ms = if self.snapshot.has_active_downloads() {
            16
        } else {
            250
        };
        ctx.request_repaint_after(Duration::from_millis(repaint_ms));

        egui::TopBottomPanel::top("loftsync_title_bar")
            .exact_height(TITLE_BAR_H)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(APP_TITLE_TEXT)
                            .strong()
                            .color(self.theme.accent)
                            .size(15.0),
                    );
                    ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                        let (dot, color) = if self.engine_connected {
                            ("\u{25CF}", Color32::from_rgb(95, 200, 115))
                        } else {
                            ("\u{25CF}", Color32::from_rgb(220, 120, 120))
                        };
                        ui.label(egui::RichText::new(dot).color(color));
                        ui.label(
                            egui::RichText::new(&self.engine_status)
                                .color(self.theme.muted)
                                .size(11.0),
                        );
                    });
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_files_view(ui);
        });

        if let Some(Route::TransferPopup { path }) = self.route_stack.last().cloned() {
            self.draw_transfer_popup(ctx, &path);
        }

        // Apply popup actions after drawing: navigation pops before the
        // transfer record is removed.
        self.apply_actions();

        self.track_window_geometry(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(geometry) = self.window_geometry {
            self.config.saved_window = Some(geometry);
        }
        self.config_saver.request_save(self.config.clone());
        self.config_saver.flush(Duration::from_secs(2));
        let _ = self.engine_ctl_tx.send(ListenerMessage::Shutdown);
        if let Some(handle) = self.engine_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TransferIntent, TransferKey, TransferKind, TransferRecord};
    use crate::popup::Dispatch;
    use crate::state::SyncEvent;

    /// An `AppState` with no engine thread behind it; events and actions are
    /// fed by the test.
    fn offline_app() -> AppState {
        let config = config::AppConfig::default();
        let theme = UiTheme::for_mode(config.ui_theme_mode);
        let (_engine_tx, engine_rx) = mpsc::channel::<EngineMessage>();
        let (engine_ctl_tx, _engine_ctl_rx) = mpsc::channel::<ListenerMessage>();
        let (action_tx, action_rx) = mpsc::channel::<Action>();
        AppState {
            theme,
            config,
            config_saver: ConfigSaver::spawn(),
            snapshot: SyncSnapshot::default(),
            route_stack: vec![Route::Files],
            engine_rx,
            engine_ctl_tx,
            engine_handle: None,
            engine_connected: false,
            engine_status: String::new(),
            action_tx,
            action_rx,
            style_initialized: false,
            restored_window: false,
            window_geometry: None,
        }
    }

    fn foreground_download() -> TransferRecord {
        let mut record = TransferRecord::empty();
        record.kind = TransferKind::Download;
        record.intent = TransferIntent::Share;
        record
    }

    #[test]
    fn hide_sequence_pops_navigation_then_drops_the_transfer() {
        let mut app = offline_app();
        let key = TransferKey::new("dl-1");
        let record = foreground_download();

        app.route_for_event(&SyncEvent::TransferStarted {
            key: key.clone(),
            path: "/loft/private/alice/doc.txt".to_string(),
            record: record.clone(),
        });
        app.snapshot.upsert_transfer(key.clone(), record);
        assert!(matches!(
            app.route_stack.last(),
            Some(Route::TransferPopup { .. })
        ));

        // The queued hide sequence: navigation first, then the removal.
        let dispatch = Dispatch::new(app.action_tx.clone());
        dispatch.navigate_up();
        dispatch.dismiss_transfer(key.clone());
        app.apply_actions();

        assert_eq!(app.route_stack, vec![Route::Files]);
        assert!(app.snapshot.transfer(&key).is_none());
        assert!(!app.snapshot.has_active_downloads());
    }

    #[test]
    fn navigate_up_never_pops_the_root() {
        let mut app = offline_app();
        let dispatch = Dispatch::new(app.action_tx.clone());
        dispatch.navigate_up();
        app.apply_actions();
        assert_eq!(app.route_stack, vec![Route::Files]);
    }
}
