//! Courier TUI - terminal front-end for the booking server
//!
//! Two tabs:
//! - Book: the three-step booking wizard, submitted to `POST /api/bookings`
//! - Track: tracking code lookup via `GET /api/track/{code}`
//!
//! Keys: Tab switches tabs, Up/Down moves between fields, Left/Right changes a
//! selection, Enter advances/submits/looks up, Esc goes back (or quits on the
//! first step), Ctrl+C quits.

use chrono::NaiveDate;
use clap::Parser;
use courier_desk::domain::booking::BookingDraft;
use courier_desk::domain::tracking::TrackingRecord;
use courier_desk::domain::types::{PickupWindow, ServiceType};
use courier_desk::domain::BookingPayload;
use courier_desk::infra::Config;
use courier_desk::io::client::ServiceInfo;
use courier_desk::io::{BookingClient, RemoteLookup};
use courier_desk::services::{LookupError, Step, TrackingLookup, Wizard, WizardError};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, Tabs},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Courier TUI - book and track shipments against a courier-desk server
#[derive(Parser, Debug)]
#[command(name = "courier-tui", version, about)]
struct Args {
    /// Path to TOML configuration file (uses the [client] section)
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml")]
    config: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Book,
    Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Service,
    PickupAddress,
    DeliveryAddress,
    PickupDate,
    PickupWindow,
    PackageDetails,
    ContactName,
    ContactEmail,
    ContactPhone,
}

impl Field {
    fn label(&self) -> &'static str {
        match self {
            Field::Service => "Service type",
            Field::PickupAddress => "Pickup address",
            Field::DeliveryAddress => "Delivery address",
            Field::PickupDate => "Pickup date (YYYY-MM-DD)",
            Field::PickupWindow => "Pickup time",
            Field::PackageDetails => "Package details",
            Field::ContactName => "Full name",
            Field::ContactEmail => "Email",
            Field::ContactPhone => "Phone",
        }
    }

    fn is_choice(&self) -> bool {
        matches!(self, Field::Service | Field::PickupWindow)
    }

    fn for_step(step: Step) -> &'static [Field] {
        match step {
            Step::Shipment => &[Field::Service, Field::PickupAddress, Field::DeliveryAddress],
            Step::Schedule => &[Field::PickupDate, Field::PickupWindow, Field::PackageDetails],
            Step::Contact => &[Field::ContactName, Field::ContactEmail, Field::ContactPhone],
            Step::Complete => &[],
        }
    }

    fn text_mut<'a>(&self, draft: &'a mut BookingDraft) -> Option<&'a mut String> {
        match self {
            Field::PickupAddress => Some(&mut draft.pickup_address),
            Field::DeliveryAddress => Some(&mut draft.delivery_address),
            Field::PackageDetails => Some(&mut draft.package_details),
            Field::ContactName => Some(&mut draft.contact_name),
            Field::ContactEmail => Some(&mut draft.contact_email),
            Field::ContactPhone => Some(&mut draft.contact_phone),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum LookupView {
    Idle,
    Loading(String),
    Found(String, TrackingRecord),
    Failed(String),
}

/// Work the event loop hands off to a background task
#[derive(Debug)]
enum Action {
    None,
    Quit,
    Submit(BookingPayload),
    Lookup(u64, String),
}

struct AppState {
    tab: Tab,
    wizard: Wizard,
    focus: usize,
    date_input: String,
    notice: Option<String>,
    track_input: String,
    /// Only the lookup carrying the latest generation may update the view
    track_generation: u64,
    lookup: LookupView,
    services: Option<Vec<ServiceInfo>>,
    server: String,
}

impl AppState {
    fn new(server: String) -> Self {
        Self {
            tab: Tab::Book,
            wizard: Wizard::new(),
            focus: 0,
            date_input: String::new(),
            notice: None,
            track_input: String::new(),
            track_generation: 0,
            lookup: LookupView::Idle,
            services: None,
            server,
        }
    }

    fn focused(&self) -> Option<Field> {
        Field::for_step(self.wizard.step()).get(self.focus).copied()
    }

    fn set_wizard(&mut self, result: Result<Wizard, WizardError>) {
        match result {
            Ok(wizard) => {
                if wizard.step() != self.wizard.step() {
                    self.focus = 0;
                }
                self.wizard = wizard;
                self.notice = None;
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    fn service_description(&self, service: ServiceType) -> String {
        self.services
            .as_ref()
            .and_then(|list| list.iter().find(|s| s.id == service.as_str()))
            .map(|s| s.description.clone())
            .unwrap_or_else(|| service.description().to_string())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        if key.code == KeyCode::Tab {
            self.tab = match self.tab {
                Tab::Book => Tab::Track,
                Tab::Track => Tab::Book,
            };
            return Action::None;
        }
        match self.tab {
            Tab::Book => self.handle_book_key(key),
            Tab::Track => self.handle_track_key(key),
        }
    }

    fn handle_book_key(&mut self, key: KeyEvent) -> Action {
        let fields = Field::for_step(self.wizard.step());
        match key.code {
            KeyCode::Esc => match self.wizard.step() {
                Step::Schedule | Step::Contact => {
                    let back = self.wizard.back();
                    self.set_wizard(back);
                }
                _ => return Action::Quit,
            },
            KeyCode::Up => self.focus = self.focus.saturating_sub(1),
            KeyCode::Down => {
                if self.focus + 1 < fields.len() {
                    self.focus += 1;
                }
            }
            KeyCode::Left => self.cycle_choice(false),
            KeyCode::Right => self.cycle_choice(true),
            KeyCode::Enter => match self.wizard.step() {
                Step::Shipment | Step::Schedule => {
                    let next = self.wizard.next();
                    self.set_wizard(next);
                }
                Step::Contact => match self.wizard.submit() {
                    Ok((wizard, payload)) => {
                        self.wizard = wizard;
                        self.notice = None;
                        return Action::Submit(payload);
                    }
                    Err(e) => self.notice = Some(e.to_string()),
                },
                Step::Complete => {
                    self.wizard = Wizard::new();
                    self.date_input.clear();
                    self.focus = 0;
                    self.notice = None;
                }
            },
            KeyCode::Backspace => self.edit_text(|s| {
                s.pop();
            }),
            KeyCode::Char(c) => self.edit_text(|s| s.push(c)),
            _ => {}
        }
        Action::None
    }

    fn edit_text(&mut self, apply: impl FnOnce(&mut String)) {
        match self.focused() {
            Some(Field::PickupDate) => {
                apply(&mut self.date_input);
                let parsed = NaiveDate::parse_from_str(self.date_input.trim(), "%Y-%m-%d").ok();
                let edited = self.wizard.edit(|d| d.pickup_date = parsed);
                self.set_wizard(edited);
            }
            Some(field) if !field.is_choice() => {
                let edited = self.wizard.edit(|d| {
                    if let Some(text) = field.text_mut(d) {
                        apply(text);
                    }
                });
                self.set_wizard(edited);
            }
            _ => {}
        }
    }

    fn cycle_choice(&mut self, forward: bool) {
        let edited = match self.focused() {
            Some(Field::Service) => {
                let current = self.wizard.draft().service_type;
                let chosen = cycle(&ServiceType::ALL, current, forward);
                self.wizard.edit(|d| d.service_type = Some(chosen))
            }
            Some(Field::PickupWindow) => {
                let current = self.wizard.draft().pickup_window;
                let chosen = cycle(&PickupWindow::ALL, current, forward);
                self.wizard.edit(|d| d.pickup_window = Some(chosen))
            }
            _ => return,
        };
        self.set_wizard(edited);
    }

    fn handle_track_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => return Action::Quit,
            KeyCode::Enter => {
                self.track_generation += 1;
                let code = self.track_input.clone();
                self.lookup = LookupView::Loading(code.clone());
                return Action::Lookup(self.track_generation, code);
            }
            KeyCode::Backspace => {
                self.track_input.pop();
            }
            KeyCode::Char(c) => self.track_input.push(c),
            _ => {}
        }
        Action::None
    }

    /// Apply a finished lookup unless a newer one has started since
    fn finish_lookup(&mut self, generation: u64, code: String, result: Result<TrackingRecord, LookupError>) {
        if generation != self.track_generation {
            return;
        }
        self.lookup = match result {
            Ok(record) => LookupView::Found(code, record),
            Err(e) => LookupView::Failed(e.to_string()),
        };
    }
}

/// Step through `options` from `current`, wrapping at either end
fn cycle<T: Copy + PartialEq>(options: &[T], current: Option<T>, forward: bool) -> T {
    let len = options.len();
    let index = match current.and_then(|c| options.iter().position(|o| *o == c)) {
        None if forward => 0,
        None => len - 1,
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
    };
    options[index]
}

type SharedState = Arc<Mutex<AppState>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    let client = BookingClient::new(
        config.client_base_url(),
        Duration::from_millis(config.client_timeout_ms()),
    )?;
    let lookup: Arc<dyn TrackingLookup> = Arc::new(RemoteLookup::new(client.clone()));

    let state = Arc::new(Mutex::new(AppState::new(client.base_url().to_string())));

    let catalog_client = client.clone();
    let catalog_state = state.clone();
    tokio::spawn(async move {
        if let Ok(services) = catalog_client.services().await {
            catalog_state.lock().await.services = Some(services);
        }
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, state, client, lookup).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: SharedState,
    client: BookingClient,
    lookup: Arc<dyn TrackingLookup>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(100);

    loop {
        let s = state.lock().await;
        terminal.draw(|f| draw_ui(f, &s))?;
        drop(s);

        if !event::poll(tick_rate)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let action = state.lock().await.handle_key(key);
        match action {
            Action::None => {}
            Action::Quit => return Ok(()),
            Action::Submit(payload) => {
                let client = client.clone();
                let state = state.clone();
                tokio::spawn(async move {
                    let result = client.submit(&payload).await;
                    let mut s = state.lock().await;
                    let next = match result {
                        Ok(record) => s.wizard.complete(&record),
                        Err(e) => s.wizard.reject(e.to_string()),
                    };
                    s.set_wizard(next);
                });
            }
            Action::Lookup(generation, code) => {
                let lookup = lookup.clone();
                let state = state.clone();
                tokio::spawn(async move {
                    let result = lookup.resolve(&code).await;
                    state.lock().await.finish_lookup(generation, code, result);
                });
            }
        }
    }
}

fn draw_ui(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Status
        ])
        .split(f.area());

    draw_tabs(f, chunks[0], state);
    match state.tab {
        Tab::Book => draw_booking(f, chunks[1], state),
        Tab::Track => draw_tracking(f, chunks[1], state),
    }
    draw_status(f, chunks[2], state);
}

fn draw_tabs(f: &mut Frame, area: Rect, state: &AppState) {
    let selected = match state.tab {
        Tab::Book => 0,
        Tab::Track => 1,
    };
    let (server_text, server_color) = match &state.services {
        Some(_) => ("online", Color::Green),
        None => ("unreachable", Color::Red),
    };
    let tabs = Tabs::new(vec![" Book a pickup ", " Track a package "])
        .select(selected)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from(vec![
                    Span::styled(" Courier ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                    Span::raw(format!("| {} ", state.server)),
                    Span::styled(format!("{server_text} "), Style::default().fg(server_color)),
                ])),
        );
    f.render_widget(tabs, area);
}

fn field_value(state: &AppState, field: Field) -> String {
    let draft = state.wizard.draft();
    match field {
        Field::Service => draft
            .service_type
            .map(|s| format!("< {} >  {}", s.name(), state.service_description(s)))
            .unwrap_or_else(|| "< choose >".to_string()),
        Field::PickupWindow => draft
            .pickup_window
            .map(|w| format!("< {} >", w.label()))
            .unwrap_or_else(|| "< choose >".to_string()),
        Field::PickupDate => state.date_input.clone(),
        Field::PickupAddress => draft.pickup_address.clone(),
        Field::DeliveryAddress => draft.delivery_address.clone(),
        Field::PackageDetails => draft.package_details.clone(),
        Field::ContactName => draft.contact_name.clone(),
        Field::ContactEmail => draft.contact_email.clone(),
        Field::ContactPhone => draft.contact_phone.clone(),
    }
}

fn draw_booking(f: &mut Frame, area: Rect, state: &AppState) {
    let wizard = &state.wizard;
    let mut lines: Vec<Line> = Vec::new();

    if wizard.is_complete() {
        lines.push(Line::from(Span::styled(
            "Booking confirmed",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("Reference: "),
            Span::styled(wizard.reference().unwrap_or("-"), Style::default().fg(Color::Yellow)),
        ]));
        for (label, value) in wizard.summary() {
            lines.push(Line::from(format!("{label}: {value}")));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Enter to book another shipment",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        let step = wizard.step();
        lines.push(Line::from(Span::styled(
            format!("Step {} of 3: {}", step.number(), step.title()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));

        for (i, field) in Field::for_step(step).iter().enumerate() {
            let focused = i == state.focus;
            let marker = if focused { "> " } else { "  " };
            let style = if focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{marker}{:<26}", field.label()), style),
                Span::raw(field_value(state, *field)),
            ]));
        }

        lines.push(Line::from(""));
        let hint = if wizard.is_submitting() {
            Span::styled("Submitting...", Style::default().fg(Color::Yellow))
        } else if step == Step::Contact {
            let color = if wizard.can_submit() { Color::Green } else { Color::DarkGray };
            Span::styled("[Enter] Submit booking", Style::default().fg(color))
        } else {
            let color = if wizard.can_advance() { Color::Green } else { Color::DarkGray };
            Span::styled("[Enter] Next", Style::default().fg(color))
        };
        lines.push(Line::from(hint));

        if let Some(error) = wizard.last_error() {
            lines.push(Line::from(Span::styled(
                format!("Booking failed: {error}"),
                Style::default().fg(Color::Red),
            )));
        }
    }

    let body = Paragraph::new(lines).block(
        Block::default()
            .title(" Book a pickup ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(body, area);
}

fn draw_tracking(f: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Input
            Constraint::Length(6), // Summary
            Constraint::Min(0),    // History
        ])
        .split(area);

    let input = Paragraph::new(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Yellow)),
        Span::raw(state.track_input.as_str()),
    ]))
    .block(Block::default().title(" Tracking number ").borders(Borders::ALL));
    f.render_widget(input, chunks[0]);

    let summary_block = Block::default().title(" Shipment ").borders(Borders::ALL);
    let (summary, history) = match &state.lookup {
        LookupView::Idle => {
            (vec![Line::from("Enter a tracking number and press Enter")], None)
        }
        LookupView::Loading(code) => (
            vec![Line::from(Span::styled(
                format!("Looking up {code}..."),
                Style::default().fg(Color::Yellow),
            ))],
            None,
        ),
        LookupView::Failed(message) => {
            (vec![Line::from(Span::styled(message.as_str(), Style::default().fg(Color::Red)))], None)
        }
        LookupView::Found(code, record) => {
            let status_color = if record.is_delivered() { Color::Green } else { Color::Yellow };
            let mut lines = vec![
                Line::from(vec![
                    Span::raw(format!("{code}  ")),
                    Span::styled(record.status.as_str(), Style::default().fg(status_color)),
                ]),
                Line::from(format!("{} -> {}", record.origin, record.destination)),
            ];
            if record.is_delivered() {
                lines.push(Line::from(format!(
                    "Delivered {} {}",
                    record.delivery_date.as_deref().unwrap_or(""),
                    record.delivery_time.as_deref().unwrap_or("")
                )));
                if let Some(signed_by) = &record.signed_by {
                    lines.push(Line::from(format!("Signed by {signed_by}")));
                }
            } else {
                if let Some(location) = &record.current_location {
                    lines.push(Line::from(format!("Current location: {location}")));
                }
                if let Some(eta) = &record.estimated_delivery {
                    lines.push(Line::from(format!("Estimated delivery: {eta}")));
                }
            }
            (lines, Some(record))
        }
    };
    f.render_widget(Paragraph::new(summary).block(summary_block), chunks[1]);

    let rows: Vec<Row> = history
        .map(|record| {
            record
                .history
                .iter()
                .map(|e| {
                    Row::new(vec![e.date.clone(), e.time.clone(), e.location.clone(), e.status.clone()])
                })
                .collect()
        })
        .unwrap_or_default();
    let table = Table::new(
        rows,
        [
            Constraint::Length(16), // Date
            Constraint::Length(10), // Time
            Constraint::Length(18), // Location
            Constraint::Min(10),    // Status
        ],
    )
    .header(
        Row::new(vec!["Date", "Time", "Location", "Status"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .title(" History ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(table, chunks[2]);
}

fn draw_status(f: &mut Frame, area: Rect, state: &AppState) {
    let line = match &state.notice {
        Some(notice) => Line::from(Span::styled(notice.as_str(), Style::default().fg(Color::Red))),
        None => Line::from(Span::styled(
            "Tab: switch | Up/Down: field | Left/Right: choose | Enter: next | Esc: back | Ctrl+C: quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
}
