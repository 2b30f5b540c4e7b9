mod app;

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Frame, Terminal,
};
use tokio::sync::oneshot;

use app::{
    format_confidence, format_countdown, format_entry_time, truncate, AppState, ConnectionStatus,
    Focus,
};
use signal_desk::client::{generate_with_min_delay, RequestState, SignalClient, MIN_ANALYSIS_DELAY};
use signal_desk::config::DEFAULT_API_URL;
use signal_desk::error::AppError;
use signal_desk::types::{AssetPair, GenerateSignalResponse, HistoryEntry, SignalType, Timeframe};

type PendingSignal = oneshot::Receiver<Result<GenerateSignalResponse, AppError>>;
type PendingHistory = oneshot::Receiver<Result<Vec<HistoryEntry>, AppError>>;

const HISTORY_REFRESH: Duration = Duration::from_secs(5);
const FRAME_INTERVAL: Duration = Duration::from_millis(100);
const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

    let client = SignalClient::new(base_url)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let mut app = AppState::new(client.base_url().to_string());

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &SignalClient,
) -> io::Result<()> {
    let mut last_refresh = Instant::now();
    let mut pending: Option<PendingSignal> = None;
    let mut history: Option<PendingHistory> = Some(spawn_history(client.clone()));

    loop {
        terminal.draw(|f| render(f, app))?;

        if event::poll(FRAME_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Tab | KeyCode::Left | KeyCode::Right => app.toggle_focus(),
                        KeyCode::Down | KeyCode::Char('j') => app.cursor_down(),
                        KeyCode::Up | KeyCode::Char('k') => app.cursor_up(),
                        KeyCode::Enter | KeyCode::Char(' ') => app.select_at_cursor(),
                        KeyCode::Char('g') | KeyCode::Char('G') => {
                            if let Some((pair, timeframe)) = app.begin_request(Instant::now()) {
                                pending = Some(spawn_generate(client.clone(), pair, timeframe));
                            }
                        }
                        KeyCode::Char('n') | KeyCode::Char('N') => app.reset(),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            if history.is_none() {
                                history = Some(spawn_history(client.clone()));
                                last_refresh = Instant::now();
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if let Some(rx) = pending.as_mut() {
            match rx.try_recv() {
                Ok(result) => {
                    pending = None;
                    app.finish_request(result, Instant::now());
                    if history.is_none() {
                        history = Some(spawn_history(client.clone()));
                        last_refresh = Instant::now();
                    }
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    pending = None;
                    app.finish_request(
                        Err(AppError::Internal("request task ended without a result".to_string())),
                        Instant::now(),
                    );
                }
            }
        }

        if let Some(rx) = history.as_mut() {
            match rx.try_recv() {
                Ok(result) => {
                    history = None;
                    app.apply_history(result);
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => history = None,
            }
        }

        if history.is_none() && last_refresh.elapsed() >= HISTORY_REFRESH {
            history = Some(spawn_history(client.clone()));
            last_refresh = Instant::now();
        }
    }
}

/// Run the request off the UI loop so the spinner keeps animating.
fn spawn_generate(client: SignalClient, pair: AssetPair, timeframe: Timeframe) -> PendingSignal {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = generate_with_min_delay(&client, pair, timeframe, MIN_ANALYSIS_DELAY).await;
        let _ = tx.send(result);
    });
    rx
}

/// History polls go through the same path; at most one is outstanding.
fn spawn_history(client: SignalClient) -> PendingHistory {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = tx.send(client.history().await);
    });
    rx
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, chunks[1]);
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let line = Line::from(vec![
        Span::styled(
            " Signal Desk  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(app.base_url.clone(), Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, area: Rect) {
    // Horizontal split: selectors (35%) | signal + history (65%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(AssetPair::ALL.len() as u16 + 2),
            Constraint::Length(Timeframe::ALL.len() as u16 + 2),
            Constraint::Min(0),
        ])
        .split(halves[0]);

    let pairs: Vec<&str> = AssetPair::ALL.iter().map(|p| p.as_str()).collect();
    let selected_pair = app.pair.map(|p| p.as_str());
    render_selector(
        f,
        " ASSET ",
        &pairs,
        app.pair_cursor,
        selected_pair,
        app.focus == Focus::Pair,
        left[0],
    );

    let timeframes: Vec<&str> = Timeframe::ALL.iter().map(|t| t.as_str()).collect();
    let selected_tf = app.timeframe.map(|t| t.as_str());
    render_selector(
        f,
        " TIMEFRAME ",
        &timeframes,
        app.timeframe_cursor,
        selected_tf,
        app.focus == Focus::Timeframe,
        left[1],
    );

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(halves[1]);

    render_signal_card(f, app, right[0]);
    render_history_table(f, app, right[1]);
}

fn render_selector(
    f: &mut Frame,
    title: &str,
    options: &[&str],
    cursor: usize,
    selected: Option<&str>,
    focused: bool,
    area: Rect,
) {
    let items: Vec<ListItem> = options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let marker = if selected == Some(*option) { "✓ " } else { "  " };
            let mut style = Style::default().fg(Color::White);
            if selected == Some(*option) {
                style = style.fg(Color::Green);
            }
            if focused && i == cursor {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            ListItem::new(format!("{marker}{option}")).style(style)
        })
        .collect();

    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(Span::styled(
                title.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(list, area);
}

fn render_signal_card(f: &mut Frame, app: &AppState, area: Rect) {
    let now = Instant::now();

    let (lines, border): (Vec<Line>, Color) = match &app.signal {
        RequestState::InFlight { started } => {
            let frame = (started.elapsed().as_millis() / 150) as usize % SPINNER.len();
            (
                vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        format!("{} Analyzing...", SPINNER[frame]),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )),
                ],
                Color::Yellow,
            )
        }
        RequestState::Resolved(Ok(signal)) => {
            let (label, color) = match signal.signal_type {
                SignalType::Call => ("CALL ⬆", Color::Green),
                SignalType::Put => ("PUT ⬇", Color::Red),
            };
            let validity = match app.remaining_validity(now) {
                Some(left) => Span::styled(
                    format!("valid for {}", format_countdown(left)),
                    Style::default().fg(Color::White),
                ),
                None => Span::styled("EXPIRED", Style::default().fg(Color::DarkGray)),
            };
            (
                vec![
                    Line::from(Span::styled(
                        label,
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(format!("{}  ·  {}", signal.pair, signal.timeframe)),
                    Line::from(format!("confidence {}", format_confidence(signal.confidence))),
                    Line::from(validity),
                    Line::from(Span::styled(
                        format_entry_time(&signal.timestamp),
                        Style::default().fg(Color::DarkGray),
                    )),
                ],
                color,
            )
        }
        RequestState::Resolved(Err(_)) | RequestState::Idle => {
            let hint = if app.can_request() {
                "Press [g] to GET SIGNAL"
            } else {
                "Select an asset and a timeframe"
            };
            let mut lines = vec![Line::from(""), Line::from(hint)];
            if let Some(notice) = &app.notice {
                lines.push(Line::from(Span::styled(
                    notice.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            if let Some(detail) = app.signal.error() {
                lines.push(Line::from(Span::styled(
                    truncate(detail, 60),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            (lines, Color::DarkGray)
        }
    };

    let paragraph = Paragraph::new(lines)
        .alignment(ratatui::layout::Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(Span::styled(
                    " SIGNAL ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        );

    f.render_widget(paragraph, area);
}

fn render_history_table(f: &mut Frame, app: &AppState, area: Rect) {
    let header_cells = ["Time", "Asset", "TF", "Signal"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .history
        .iter()
        .map(|h| {
            let type_color = match h.signal_type.as_str() {
                "CALL" => Color::Green,
                "PUT" => Color::Red,
                _ => Color::White,
            };
            Row::new(vec![
                Cell::from(format_entry_time(&h.entry_time)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&h.pair, 14)),
                Cell::from(h.timeframe.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(h.signal_type.clone()).style(Style::default().fg(type_color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(10),
            Constraint::Length(4),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " RECENT SIGNALS ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let get_style = if app.can_request() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[tab] ", Style::default().fg(Color::Yellow)),
        Span::raw("switch list  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("move  "),
        Span::styled("[enter] ", Style::default().fg(Color::Yellow)),
        Span::raw("select  "),
        Span::styled("[g] ", get_style),
        Span::raw("get signal  "),
        Span::styled("[n] ", Style::default().fg(Color::Yellow)),
        Span::raw("new analysis  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh"),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
