//! Journey TUI - interactive SCATS map in the terminal
//!
//! Draws every site on a canvas map and lets the user:
//! - start a journey (n)
//! - move the cursor between sites (arrows) and pick one (Enter/space)
//! - submit for the best route (s) or ask for alternates (a)
//!
//! Route requests run in background tasks; results come back over a
//! channel and go through `JourneyPlanner::apply`, so the map keeps
//! responding while a request is outstanding. Logs go to a file.
//!
//! Usage:
//!   cargo run --bin scats-journey-tui -- --config config/dev.toml --mock

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::canvas::{Canvas, Line as CanvasLine, Points},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use scats_journey::domain::{RouteError, RouteResult};
use scats_journey::infra::{Config, Metrics};
use scats_journey::io::HttpRouteService;
use scats_journey::services::{JourneyPlanner, MapScene, MarkerKind, PendingRoute};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

type RouteOutcome = (PendingRoute, Result<Vec<RouteResult>, RouteError>);

#[derive(Parser, Debug)]
#[command(name = "scats-journey-tui")]
#[command(about = "Interactive SCATS journey map")]
struct Args {
    /// Path to TOML configuration file (else CONFIG_FILE, else config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Route against an in-process mock router
    #[arg(long)]
    mock: bool,

    /// Log file (the terminal is taken by the UI)
    #[arg(long, default_value = "scats-journey-tui.log")]
    log_file: String,
}

struct App {
    planner: JourneyPlanner,
    /// Index into the registry's site list
    cursor: usize,
    /// Blocking alert; dismissed by any key
    alert: Option<String>,
    in_flight: usize,
    outcome_tx: mpsc::UnboundedSender<RouteOutcome>,
    metrics: Arc<Metrics>,
}

impl App {
    fn cursor_id(&self) -> Option<String> {
        self.planner.registry().sites().get(self.cursor).map(|site| site.id.to_string())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.planner.registry().len() as isize;
        if len > 0 {
            self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
        }
    }

    fn pick(&mut self) {
        if let Some(id) = self.cursor_id() {
            self.planner.click_site(&id);
        }
    }

    /// Issue a request and send it off the UI thread
    fn request(&mut self, alternate_count: u32) {
        let pending = match self.planner.prepare(alternate_count) {
            Ok(pending) => pending,
            Err(e) => {
                self.alert = Some(capitalize(&e.to_string()));
                return;
            }
        };

        let dispatcher = self.planner.dispatcher();
        let outcome_tx = self.outcome_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcome = dispatcher.send(&pending.request).await;
            let _ = outcome_tx.send((pending, outcome));
        });
    }

    fn apply(&mut self, pending: PendingRoute, outcome: Result<Vec<RouteResult>, RouteError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        // Failures are already reflected in the planner status
        let _ = self.planner.apply(&pending, outcome);
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn css_to_color(css: &str) -> Color {
    match css {
        "purple" => Color::Magenta,
        "orange" => Color::LightRed,
        other => other.parse().unwrap_or(Color::White),
    }
}

fn init_logging(path: &str) -> io::Result<()> {
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

#[cfg(feature = "mock")]
async fn start_mock_router(
    config: Config,
    shutdown: watch::Receiver<bool>,
) -> Result<Config, Box<dyn std::error::Error>> {
    use scats_journey::io::mock_router::{serve_mock_router, RoadGraph, DEFAULT_DEGREE};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let graph = Arc::new(RoadGraph::from_registry(&config.site_registry(), DEFAULT_DEGREE));
    tokio::spawn(async move {
        if let Err(e) = serve_mock_router(listener, graph, shutdown).await {
            tracing::error!(error = %e, "mock_router_error");
        }
    });
    Ok(config.with_service_base_url(&format!("http://{addr}")))
}

#[cfg(not(feature = "mock"))]
async fn start_mock_router(
    _: Config,
    _: watch::Receiver<bool>,
) -> Result<Config, Box<dyn std::error::Error>> {
    Err("--mock needs a build with the `mock` feature".into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let mut config = Config::load(args.config.as_deref());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if args.mock {
        config = start_mock_router(config, shutdown_rx).await?;
    }

    info!(config_file = %config.config_file(), base_url = %config.service_base_url(), "tui_starting");

    let metrics = Arc::new(Metrics::new());
    let service = HttpRouteService::new(&config)?;
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let mut app = App {
        planner: JourneyPlanner::new(&config, Arc::new(service), metrics.clone()),
        cursor: 0,
        alert: None,
        in_flight: 0,
        outcome_tx,
        metrics,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, &mut app, outcome_rx).await;

    let _ = shutdown_tx.send(true);
    app.metrics.report().log();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut outcome_rx: mpsc::UnboundedReceiver<RouteOutcome>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok((pending, outcome)) = outcome_rx.try_recv() {
            app.apply(pending, outcome);
        }

        terminal.draw(|f| draw_ui(f, app))?;

        if !event::poll(tick_rate)? {
            tokio::task::yield_now().await;
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.alert.take().is_some() {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Char('n') => app.planner.start_journey(),
            KeyCode::Right | KeyCode::Down => app.move_cursor(1),
            KeyCode::Left | KeyCode::Up => app.move_cursor(-1),
            KeyCode::Enter | KeyCode::Char(' ') => app.pick(),
            KeyCode::Char('s') => app.request(0),
            KeyCode::Char('a') => {
                let count = app.planner.alternate_count();
                app.request(count);
            }
            _ => {}
        }
    }
}

fn draw_ui(f: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Map + side panel
            Constraint::Length(3), // Key help
        ])
        .split(f.area());

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(main_chunks[1]);

    let scene = app.planner.scene();

    draw_header(f, main_chunks[0], app);
    draw_map(f, body_chunks[0], app, &scene);
    draw_side_panel(f, body_chunks[1], app);
    draw_help(f, main_chunks[2], app);

    if let Some(alert) = &app.alert {
        draw_alert(f, alert);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let busy = if app.in_flight > 0 {
        Span::styled(format!(" | {} request(s) in flight", app.in_flight), Style::default().fg(Color::Yellow))
    } else {
        Span::raw("")
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled("SCATS Journey ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(app.planner.status().to_string(), Style::default().fg(Color::Green)),
        busy,
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn draw_map(f: &mut Frame, area: Rect, app: &App, scene: &MapScene) {
    // Bounds from the markers, padded so edge sites stay visible
    let (mut min_lat, mut max_lat, mut min_lng, mut max_lng) =
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for marker in &scene.markers {
        min_lat = min_lat.min(marker.position.lat);
        max_lat = max_lat.max(marker.position.lat);
        min_lng = min_lng.min(marker.position.lng);
        max_lng = max_lng.max(marker.position.lng);
    }
    if !min_lat.is_finite() {
        (min_lat, max_lat, min_lng, max_lng) =
            (scene.center.lat - 0.01, scene.center.lat + 0.01, scene.center.lng - 0.01, scene.center.lng + 0.01);
    }
    let pad_lat = ((max_lat - min_lat) * 0.05).max(0.002);
    let pad_lng = ((max_lng - min_lng) * 0.05).max(0.002);

    let cursor_id = app.cursor_id();

    let canvas = Canvas::default()
        .block(Block::default().title(format!(" Map (zoom {}) ", scene.zoom)).borders(Borders::ALL))
        .marker(symbols::Marker::Braille)
        .x_bounds([min_lng - pad_lng, max_lng + pad_lng])
        .y_bounds([min_lat - pad_lat, max_lat + pad_lat])
        .paint(|ctx| {
            for polyline in &scene.polylines {
                let color = css_to_color(&polyline.css_color);
                for pair in polyline.coordinates.windows(2) {
                    ctx.draw(&CanvasLine::new(pair[0].lng, pair[0].lat, pair[1].lng, pair[1].lat, color));
                }
            }
            ctx.layer();

            for marker in &scene.markers {
                let color = match marker.kind {
                    MarkerKind::Start => Color::Green,
                    MarkerKind::Target => Color::Red,
                    MarkerKind::Site => Color::Gray,
                };
                ctx.draw(&Points { coords: &[(marker.position.lng, marker.position.lat)], color });

                let is_cursor = cursor_id.as_deref() == Some(marker.site_id.as_str());
                if is_cursor || marker.kind != MarkerKind::Site {
                    let style = if is_cursor {
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(color)
                    };
                    ctx.print(
                        marker.position.lng,
                        marker.position.lat,
                        Span::styled(marker.site_id.to_string(), style),
                    );
                }
            }
        });

    f.render_widget(canvas, area);
}

fn draw_side_panel(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0), Constraint::Length(6)])
        .split(area);

    // Selection
    let selection = app.planner.selection();
    let describe = |site: Option<&scats_journey::domain::Site>| {
        site.map(|s| s.label()).unwrap_or_else(|| "-".to_string())
    };
    let cursor = app
        .planner
        .registry()
        .sites()
        .get(app.cursor)
        .map(|site| format!("{} ({:.4}, {:.4})", site.label(), site.coordinate.lat, site.coordinate.lng))
        .unwrap_or_default();
    let selection_text = vec![
        Line::from(vec![Span::raw("Phase:  "), Span::raw(selection.phase().as_str())]),
        Line::from(vec![Span::styled("Start:  ", Style::default().fg(Color::Green)), Span::raw(describe(selection.start()))]),
        Line::from(vec![Span::styled("Target: ", Style::default().fg(Color::Red)), Span::raw(describe(selection.target()))]),
        Line::from(vec![Span::styled("Cursor: ", Style::default().fg(Color::Yellow)), Span::raw(cursor)]),
    ];
    f.render_widget(
        Paragraph::new(selection_text)
            .block(Block::default().title(" Selection ").borders(Borders::ALL))
            .wrap(Wrap { trim: true }),
        chunks[0],
    );

    // Routes, primary first
    let routes = app.planner.routes();
    let items: Vec<ListItem> = routes
        .primary
        .iter()
        .chain(routes.alternates.iter())
        .map(|route| {
            let path: Vec<&str> = route.labels().iter().map(|id| id.as_str()).collect();
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!("{:<8}", route.color.to_string()),
                        Style::default().fg(css_to_color(&route.css_color)).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(route.cost_label.clone()),
                ]),
                Line::from(Span::styled(path.join(" > "), Style::default().fg(Color::DarkGray))),
            ])
        })
        .collect();
    f.render_widget(
        List::new(items).block(Block::default().title(" Routes ").borders(Borders::ALL)),
        chunks[1],
    );

    // Metrics (lock-free counters)
    let summary_lines = vec![
        Line::from(format!("Requests: {}", app.metrics.requests_total())),
        Line::from(format!("Stale discarded: {}", app.metrics.responses_stale())),
        Line::from(format!("Journey: {}", app.planner.journey_id().unwrap_or("-"))),
    ];
    f.render_widget(
        Paragraph::new(summary_lines).block(Block::default().title(" Metrics ").borders(Borders::ALL)),
        chunks[2],
    );
}

fn draw_help(f: &mut Frame, area: Rect, app: &App) {
    let controls = app.planner.controls();
    let key = |label: &'static str, enabled: bool| {
        let style = if enabled { Style::default().fg(Color::White) } else { Style::default().fg(Color::DarkGray) };
        Span::styled(label, style)
    };

    let help = Paragraph::new(Line::from(vec![
        key("[n] Start Journey  ", controls.start_journey),
        key("[arrows] Move  [enter] Pick site  ", app.planner.phase().is_selecting()),
        key("[s] Submit  ", controls.submit),
        key("[a] Get Alternate Paths  ", controls.alternates),
        key("[q] Quit", true),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, area);
}

fn draw_alert(f: &mut Frame, message: &str) {
    let area = f.area();
    let width = (message.len() as u16 + 6).min(area.width);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(5) / 2,
        width,
        height: 5.min(area.height),
    };

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(vec![Line::from(message.to_string()), Line::from(""), Line::from("press any key")])
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().title(" Alert ").borders(Borders::ALL)),
        popup,
    );
}
