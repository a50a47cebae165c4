//! Chatter Desktop: egui app state and UI.

use chatter_core::auth::{enter_display_name, Authenticator, LoginClient, LoginError, LoginForm};
use chatter_core::chat::{ChatView, MountError};
use chatter_core::config::{self, Config};
use chatter_core::demo::DemoChat;
use chatter_core::message::Sender;
use chatter_core::render::{Align, RenderRecord, ScrollAnchor};
use chatter_core::session::SessionStore;
use chatter_core::transport::{TransportError, WsConnection};
use eframe::egui;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

const LOG_BUFFER_MAX_LINES: usize = 2000;
const INPUT_ROW_HEIGHT: f32 = 48.0;
const SEND_BUTTON_WIDTH: f32 = 72.0;
const FORM_WIDTH: f32 = 280.0;
/// How often the UI wakes up to drain inbound events while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const OWN_BUBBLE: egui::Color32 = egui::Color32::from_rgb(0xfe, 0xe5, 0x00);
const OWN_TEXT: egui::Color32 = egui::Color32::from_rgb(0x33, 0x33, 0x33);
const ERROR_TEXT: egui::Color32 = egui::Color32::from_rgb(0xe7, 0x4c, 0x3c);

/// Ring buffer of log lines for the Logs screen. Written by DesktopLogger.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

fn format_log_line(level: log::Level, args: &std::fmt::Arguments<'_>) -> String {
    format!(
        "{} [{}] {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        level,
        args
    )
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            push_log_line(format_log_line(record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: DesktopLogger = DesktopLogger;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Chat,
    Demo,
    Logs,
}

fn connection_label(connected: bool) -> &'static str {
    if connected {
        "connected"
    } else {
        "disconnected"
    }
}

pub struct ChatterApp {
    /// Runtime hosting login requests and the socket task. None if it failed to start.
    runtime: Option<tokio::runtime::Runtime>,
    config: Config,
    /// Identity handed from the login screen to the chat screen.
    store: SessionStore,
    login_form: LoginForm,
    /// When Some, a login request is in flight; we read the result here.
    login_receiver: Option<mpsc::Receiver<Result<Sender, LoginError>>>,
    /// When Some, the realtime connection is being opened.
    connect_receiver: Option<mpsc::Receiver<Result<WsConnection, TransportError>>>,
    /// Mounted chat view; None while on the login screen.
    chat: Option<ChatView<WsConnection>>,
    /// Last error from opening the realtime connection, shown on the login screen.
    connect_error: Option<String>,
    chat_scroll: ScrollAnchor,
    demo_name_input: String,
    demo_error: Option<String>,
    demo: Option<DemoChat>,
    demo_scroll: ScrollAnchor,
    current_screen: Screen,
}

impl ChatterApp {
    /// Space between the main screen title and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let _ = LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()));
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Info);

        let config = match config::load_config(None) {
            Ok((config, path)) => {
                log::info!("config loaded from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("config load failed, using defaults: {}", e);
                Config::default()
            }
        };
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => Some(rt),
            Err(e) => {
                log::error!("failed to start async runtime: {}", e);
                None
            }
        };
        log::info!("desktop started");

        Self {
            runtime,
            config,
            store: SessionStore::new(),
            login_form: LoginForm::new(),
            login_receiver: None,
            connect_receiver: None,
            chat: None,
            connect_error: None,
            chat_scroll: ScrollAnchor::new(),
            demo_name_input: String::new(),
            demo_error: None,
            demo: None,
            demo_scroll: ScrollAnchor::new(),
            current_screen: Screen::default(),
        }
    }

    fn busy(&self) -> bool {
        self.login_receiver.is_some() || self.connect_receiver.is_some()
    }

    /// Validate the form and send the login request in the background.
    fn start_login(&mut self) {
        if self.busy() {
            return;
        }
        self.connect_error = None;
        let Some((id, password)) = self.login_form.begin_submit() else {
            return;
        };
        let Some(rt) = &self.runtime else {
            self.login_form.finish(
                Err(LoginError::Unreachable("async runtime unavailable".to_string())),
                &self.store,
            );
            return;
        };
        let client = LoginClient::new(config::resolve_server_url(&self.config));
        let (tx, rx) = mpsc::channel();
        rt.spawn(async move {
            let result = client.authenticate(&id, &password).await;
            let _ = tx.send(result);
        });
        self.login_receiver = Some(rx);
    }

    /// Poll for the login result; on success move on to mounting the chat view.
    fn poll_login(&mut self) {
        let Some(rx) = &self.login_receiver else {
            return;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Empty) => return,
            Err(mpsc::TryRecvError::Disconnected) => Err(LoginError::Unreachable(
                "login task ended without a result".to_string(),
            )),
        };
        self.login_receiver = None;
        if self.login_form.finish(result, &self.store).is_some() {
            self.start_connect();
        }
    }

    /// Open the realtime connection for the stored session. Without one, stay on the login screen.
    fn start_connect(&mut self) {
        let Some(session) = self.store.load() else {
            log::debug!("no session; staying on the login screen");
            return;
        };
        let url = match config::resolve_realtime_url(&self.config) {
            Ok(url) => url,
            Err(e) => {
                self.connect_error = Some(e.to_string());
                return;
            }
        };
        let Some(rt) = &self.runtime else {
            self.connect_error = Some("async runtime unavailable".to_string());
            return;
        };
        let (tx, rx) = mpsc::channel();
        rt.spawn(async move {
            let result = WsConnection::connect(&url, &session).await;
            let _ = tx.send(result);
        });
        self.connect_receiver = Some(rx);
    }

    fn poll_connect(&mut self) {
        let Some(rx) = &self.connect_receiver else {
            return;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Empty) => return,
            Err(mpsc::TryRecvError::Disconnected) => Err(TransportError::Closed),
        };
        self.connect_receiver = None;
        let mounted = result
            .map_err(MountError::from)
            .and_then(|conn| ChatView::mount_with(&self.store, move |_| Ok(conn)));
        match mounted {
            Ok(view) => {
                log::info!("chat mounted for {}", view.session().id());
                self.chat_scroll = ScrollAnchor::new();
                self.chat = Some(view);
            }
            Err(MountError::NoSession) => {
                log::debug!("session gone before mount; back to login");
            }
            Err(MountError::Transport(e)) => {
                log::warn!("realtime connect failed: {}", e);
                self.connect_error = Some(format!("Could not connect to the chat server: {}", e));
            }
        }
    }

    /// Unmount the chat view (closing its connection) and return to the login screen.
    fn leave_chat(&mut self) {
        if let Some(view) = self.chat.take() {
            view.unmount();
        }
        self.store.clear();
        self.login_form = LoginForm::new();
        log::info!("left chat");
    }

    fn render_record(ui: &mut egui::Ui, record: &RenderRecord) {
        match record {
            RenderRecord::Placeholder { text } => {
                ui.add_space(40.0);
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new(text.as_str()).weak());
                });
            }
            RenderRecord::Message {
                text,
                sender_label,
                is_own,
                align,
                ..
            } => {
                let layout = match align {
                    Align::Start => egui::Layout::top_down(egui::Align::Min),
                    Align::End => egui::Layout::top_down(egui::Align::Max),
                };
                let max_bubble_width = ui.available_width() * 0.7;
                ui.with_layout(layout, |ui| {
                    if let Some(label) = sender_label {
                        ui.label(egui::RichText::new(label.as_str()).small().strong());
                    }
                    let (fill, text_color) = if *is_own {
                        (OWN_BUBBLE, OWN_TEXT)
                    } else {
                        (
                            ui.style().visuals.extreme_bg_color,
                            ui.style().visuals.text_color(),
                        )
                    };
                    egui::Frame::none()
                        .fill(fill)
                        .rounding(egui::Rounding::same(10.0))
                        .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                        .show(ui, |ui| {
                            ui.set_max_width(max_bubble_width);
                            ui.label(egui::RichText::new(text.as_str()).color(text_color));
                        });
                });
                ui.add_space(8.0);
            }
        }
    }

    /// Message list: scrolls to the bottom once after every list mutation.
    fn ui_message_list(ui: &mut egui::Ui, records: &[RenderRecord], scroll_now: bool) {
        let height = (ui.available_height() - INPUT_ROW_HEIGHT).max(80.0);
        egui::ScrollArea::vertical()
            .id_source("messages")
            .auto_shrink([false; 2])
            .max_height(height)
            .show(ui, |ui| {
                for record in records {
                    Self::render_record(ui, record);
                }
                if scroll_now {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });
    }

    /// Single-line composer plus Send. Returns true when the user asked to send.
    fn ui_composer(ui: &mut egui::Ui, text: &mut String, can_send: bool) -> bool {
        let mut send = false;
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(text)
                    .hint_text("Type a message")
                    .desired_width(ui.available_width() - SEND_BUTTON_WIDTH),
            );
            let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let clicked = ui
                .add_enabled(can_send, egui::Button::new("Send"))
                .clicked();
            if (enter && can_send) || clicked {
                send = true;
                response.request_focus();
            }
        });
        send
    }

    fn ui_login_screen(&mut self, ui: &mut egui::Ui) {
        let busy = self.busy();
        let mut submit = false;
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.heading("Log in");
            ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
            ui.add(
                egui::TextEdit::singleline(&mut self.login_form.id)
                    .hint_text("User id")
                    .desired_width(FORM_WIDTH),
            );
            ui.add_space(12.0);
            let password = ui.add(
                egui::TextEdit::singleline(&mut self.login_form.password)
                    .password(true)
                    .hint_text("Password")
                    .desired_width(FORM_WIDTH),
            );
            let enter = password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            ui.add_space(12.0);
            let clicked = ui
                .add_enabled(
                    !busy,
                    egui::Button::new("Log in").min_size(egui::vec2(FORM_WIDTH, 0.0)),
                )
                .clicked();
            submit = (enter || clicked) && !busy;
            if busy {
                ui.add_space(8.0);
                ui.spinner();
            }
            if let Some(err) = self.login_form.error().or(self.connect_error.as_deref()) {
                ui.add_space(8.0);
                ui.colored_label(ERROR_TEXT, err);
            }
        });
        if submit {
            self.start_login();
        }
    }

    fn ui_chat_screen(&mut self, ui: &mut egui::Ui) {
        if self.chat.is_none() {
            self.ui_login_screen(ui);
            return;
        }
        let Some(chat) = self.chat.as_mut() else {
            return;
        };
        let mut leave = false;
        ui.add_space(16.0);
        ui.horizontal(|ui| {
            ui.heading("Chat room");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Leave").clicked() {
                    leave = true;
                }
                ui.label(connection_label(chat.is_connected()));
                ui.label(format!("Current user: {}", chat.session().name()));
            });
        });
        ui.add_space(8.0);
        ui.separator();

        let scroll_now = self.chat_scroll.should_scroll(chat.messages());
        Self::ui_message_list(ui, &chat.render(), scroll_now);
        let can_send = chat.is_connected();
        if Self::ui_composer(ui, chat.composer_mut(), can_send) {
            if let Err(e) = chat.send() {
                log::warn!("send failed: {}", e);
            }
        }

        if leave {
            self.leave_chat();
        }
    }

    fn ui_demo_entry(&mut self, ui: &mut egui::Ui) {
        let mut enter = false;
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.heading("Demo room");
            ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
            let name = ui.add(
                egui::TextEdit::singleline(&mut self.demo_name_input)
                    .hint_text("Display name")
                    .desired_width(FORM_WIDTH),
            );
            let pressed = name.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            ui.add_space(12.0);
            let clicked = ui
                .add(egui::Button::new("Enter").min_size(egui::vec2(FORM_WIDTH, 0.0)))
                .clicked();
            enter = pressed || clicked;
            if let Some(err) = &self.demo_error {
                ui.add_space(8.0);
                ui.colored_label(ERROR_TEXT, err.as_str());
            }
        });
        if enter {
            match enter_display_name(&self.demo_name_input) {
                Ok(name) => {
                    self.demo_error = None;
                    self.demo_scroll = ScrollAnchor::new();
                    self.demo = Some(DemoChat::new(name));
                }
                Err(e) => self.demo_error = Some(e.to_string()),
            }
        }
    }

    fn ui_demo_screen(&mut self, ui: &mut egui::Ui) {
        if self.demo.is_none() {
            self.ui_demo_entry(ui);
            return;
        }
        let Some(demo) = self.demo.as_mut() else {
            return;
        };

        ui.add_space(16.0);
        ui.horizontal(|ui| {
            ui.heading("Demo room");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Add sample message").clicked() {
                    demo.add_sample_message();
                }
                ui.label(format!("Current user: {}", demo.name()));
            });
        });
        ui.add_space(8.0);
        ui.separator();

        let scroll_now = self.demo_scroll.should_scroll(demo.messages());
        Self::ui_message_list(ui, &demo.render(), scroll_now);
        if Self::ui_composer(ui, demo.composer_mut(), true) {
            demo.send();
        }
    }

    fn ui_logs_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default();

        egui::ScrollArea::vertical()
            .id_source("logs")
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(
                        egui::RichText::new(line.as_str()).family(egui::FontFamily::Monospace),
                    );
                }
                if lines.is_empty() {
                    ui.label("No log output yet.");
                }
            });
    }
}

impl eframe::App for ChatterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_login();
        self.poll_connect();
        if let Some(chat) = self.chat.as_mut() {
            chat.pump();
        }
        if self.chat.is_some() || self.busy() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        let current_screen = &mut self.current_screen;
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(110.0)
            .show(ctx, |ui| {
                ui.add_space(24.0);
                if ui.selectable_label(*current_screen == Screen::Chat, "Chat").clicked() {
                    *current_screen = Screen::Chat;
                }
                ui.add_space(12.0);
                if ui.selectable_label(*current_screen == Screen::Demo, "Demo").clicked() {
                    *current_screen = Screen::Demo;
                }
                ui.add_space(12.0);
                if ui.selectable_label(*current_screen == Screen::Logs, "Logs").clicked() {
                    *current_screen = Screen::Logs;
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| match self.current_screen {
            Screen::Chat => self.ui_chat_screen(ui),
            Screen::Demo => self.ui_demo_screen(ui),
            Screen::Logs => self.ui_logs_screen(ui),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_buffer_keeps_only_latest_lines() {
        for i in 0..(LOG_BUFFER_MAX_LINES + 10) {
            push_log_line(format!("line {}", i));
        }
        let buf = log_buffer().lock().unwrap();
        assert_eq!(buf.len(), LOG_BUFFER_MAX_LINES);
        assert_eq!(
            buf.back().map(String::as_str),
            Some(format!("line {}", LOG_BUFFER_MAX_LINES + 9).as_str())
        );
    }

    #[test]
    fn log_line_has_level_and_message() {
        let line = format_log_line(log::Level::Warn, &format_args!("socket {}", "closed"));
        assert!(line.ends_with("[WARN] socket closed"));
    }

    #[test]
    fn connection_state_labels() {
        assert_eq!(connection_label(true), "connected");
        assert_eq!(connection_label(false), "disconnected");
    }
}
