mod help;

use crate::cli::Cli;
use crate::evaluate;
use crate::model::{Phase, RecordStatus, RunMode};
use crate::profiles;
use crate::report::{self, ReportContext};
use crate::runner::{TestRunner, TICK};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Sparkline, Table, Tabs},
    Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

struct UiState {
    tab: usize,
    info: String,
}

pub async fn run(args: Cli) -> Result<()> {
    // The TUI loop is blocking; keep it off the async runtime's workers.
    tokio::task::spawn_blocking(move || run_threaded(args))
        .await
        .context("TUI thread panicked")?
}

fn run_threaded(args: Cli) -> Result<()> {
    let (mode, cfg) = crate::cli::build_config(&args)?;
    let mut runner = crate::cli::make_runner(&args, cfg, mode);

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut ui = UiState {
        tab: 0,
        info: String::new(),
    };
    if args.test_on_launch {
        runner.start(Instant::now());
    }

    let mut last_tick = Instant::now();
    let res = loop {
        // The 50 ms cadence drives both the state machine and the redraw;
        // rendering always reads the freshly ticked snapshot.
        if last_tick.elapsed() >= TICK {
            runner.tick(Instant::now());
            last_tick = Instant::now();
            terminal.draw(|f| draw(f.area(), f, &runner, &ui)).ok();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        break Ok(());
                    }
                    (_, KeyCode::Char('s')) => {
                        if runner.phase().is_restartable() {
                            runner.start(Instant::now());
                            ui.info = "Test started".into();
                        } else {
                            ui.info = "A test is already running".into();
                        }
                    }
                    (_, KeyCode::Char('x')) => {
                        if runner.is_running() {
                            runner.stop();
                            ui.info = "Stopped".into();
                        }
                    }
                    (_, KeyCode::Char('m')) => {
                        let next = match runner.mode() {
                            RunMode::Quick => RunMode::Monitoring,
                            RunMode::Monitoring => RunMode::Quick,
                        };
                        if runner.set_mode(next) {
                            ui.info = match next {
                                RunMode::Quick => "Mode: quick test".into(),
                                RunMode::Monitoring => "Mode: long-term monitoring".into(),
                            };
                        } else {
                            ui.info = "Stop the run before switching modes".into();
                        }
                    }
                    (_, KeyCode::Char('p')) => {
                        cycle_profile(&mut runner, &mut ui);
                    }
                    (_, KeyCode::Char('e')) => {
                        export_report(&runner, &mut ui);
                    }
                    (_, KeyCode::Tab) => {
                        ui.tab = (ui.tab + 1) % 3;
                    }
                    (_, KeyCode::Char('?')) => {
                        ui.tab = 2;
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    res
}

/// Select the next profile available in the current mode.
fn cycle_profile(runner: &mut TestRunner, ui: &mut UiState) {
    let available: Vec<_> = profiles::for_mode(runner.mode()).collect();
    if available.is_empty() {
        return;
    }
    let current = available
        .iter()
        .position(|p| p.id == runner.config().profile_id)
        .unwrap_or(0);
    let next = available[(current + 1) % available.len()];
    if runner.set_profile(next.id) {
        ui.info = format!("Profile: {}", next.name);
    } else {
        ui.info = "Stop the run before changing the profile".into();
    }
}

/// Write the diagnostic report next to the working directory with a
/// timestamped default filename.
fn export_report(runner: &TestRunner, ui: &mut UiState) {
    if runner.records().is_empty() {
        ui.info = "No records to export yet".into();
        return;
    }
    let cfg = runner.config();
    let profile_name = profiles::find(&cfg.profile_id)
        .map(|p| p.name)
        .unwrap_or("Custom");
    let server_name = profiles::find_server(&cfg.server_id)
        .map(|s| s.name)
        .unwrap_or("Unknown");
    let summary = evaluate::summarize_records(runner.records(), profile_name);
    let ctx = ReportContext {
        profile_name,
        server_name,
        config: cfg,
    };
    let text = report::build_report(runner.records(), &ctx, &summary);

    let stamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "now".into())
        .replace(':', "-");
    let path = std::path::PathBuf::from(format!("speedsim-report-{stamp}.txt"));
    match report::write_report(&path, &text) {
        Ok(()) => ui.info = format!("Report written: {}", path.display()),
        Err(e) => ui.info = format!("Export failed: {e:#}"),
    }
}

fn format_hms(d: Duration) -> String {
    let total = d.as_secs();
    format!("{}h {}m {}s", total / 3600, (total % 3600) / 60, total % 60)
}

fn draw(area: Rect, f: &mut ratatui::Frame, runner: &TestRunner, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("Log"),
        Line::from("Help"),
    ])
    .select(ui.tab)
    .block(Block::default().borders(Borders::ALL).title("speedsim"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match ui.tab {
        0 => draw_dashboard(chunks[1], f, runner, ui),
        1 => draw_log(chunks[1], f, runner),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, runner: &TestRunner, ui: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),  // progress gauge
                Constraint::Length(9),  // live phase/speed + sparkline
                Constraint::Length(7),  // current results
                Constraint::Length(6),  // configuration + monitoring status
                Constraint::Min(1),     // status line
            ]
            .as_ref(),
        )
        .split(area);

    let gauge_title = match runner.mode() {
        RunMode::Quick => "Test progress",
        RunMode::Monitoring => "Monitoring progress",
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(gauge_title))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio((runner.progress() / 100.0).clamp(0.0, 1.0))
        .label(format!("{:.1}%", runner.progress()));
    f.render_widget(gauge, main[0]);

    let live = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(0)].as_ref())
        .split(main[1]);

    let phase_color = if runner.is_running() {
        Color::Green
    } else {
        Color::Gray
    };
    let live_panel = Paragraph::new(vec![
        Line::from(Span::styled(
            runner.phase().label(),
            Style::default().fg(phase_color),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("{:>8.1} Mb/s", runner.current_mbps()),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from(match runner.mode() {
            RunMode::Quick => "Quick test",
            RunMode::Monitoring => "Long-term monitoring",
        }),
    ])
    .block(Block::default().borders(Borders::ALL).title("Live"));
    f.render_widget(live_panel, live[0]);

    let data: Vec<u64> = runner
        .samples()
        .iter()
        .map(|s| s.mbps.max(0.0).round() as u64)
        .collect();
    let window = match (runner.samples().first(), runner.samples().last()) {
        (Some(first), Some(last)) => last.at_secs - first.at_secs,
        _ => 0.0,
    };
    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Throughput ({window:.0}s window)")),
        )
        .style(Style::default().fg(Color::Cyan))
        .data(&data);
    f.render_widget(sparkline, live[1]);

    let results = runner.results();
    let stat = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<10}"), Style::default().fg(Color::Gray)),
            Span::raw(value),
        ])
    };
    let stats = Paragraph::new(vec![
        stat("Ping", format!("{:.0} ms", results.ping_ms)),
        stat("Jitter", format!("{:.1} ms", results.jitter_ms)),
        stat("Download", format!("{:.1} Mb/s", results.download_mbps)),
        stat("Upload", format!("{:.1} Mb/s", results.upload_mbps)),
        stat("Loss", format!("{:.2} %", results.loss_pct)),
    ])
    .block(Block::default().borders(Borders::ALL).title("Results"));
    f.render_widget(stats, main[2]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main[3]);

    let cfg = runner.config();
    let profile = profiles::find(&cfg.profile_id);
    let server = profiles::find_server(&cfg.server_id);
    let config_panel = Paragraph::new(vec![
        stat(
            "Profile",
            profile
                .map(|p| format!("{} [{:?}]", p.name, p.connection))
                .unwrap_or_else(|| cfg.profile_id.clone()),
        ),
        stat(
            "Server",
            server
                .map(|s| format!("{} ({}, {} km)", s.name, s.location, s.distance_km))
                .unwrap_or_else(|| cfg.server_id.clone()),
        ),
        stat(
            "Schedule",
            format!(
                "{} over {}",
                cfg.interval,
                humantime::format_duration(cfg.duration)
            ),
        ),
        stat(
            "Metrics",
            format!(
                "download {} / upload {} / latency {}",
                onoff(cfg.measure_download),
                onoff(cfg.measure_upload),
                onoff(cfg.measure_latency)
            ),
        ),
    ])
    .block(Block::default().borders(Borders::ALL).title("Configuration"));
    f.render_widget(config_panel, bottom[0]);

    let monitor_panel = if runner.mode() == RunMode::Monitoring {
        let next = if runner.phase() == Phase::Waiting {
            format_hms(runner.next_cycle_in())
        } else {
            "RUNNING".into()
        };
        Paragraph::new(vec![
            stat("Remaining", format_hms(runner.time_remaining())),
            stat("Next test", next),
            stat("Records", runner.records().len().to_string()),
        ])
    } else {
        Paragraph::new(vec![Line::from(Span::styled(
            "Single-cycle run",
            Style::default().fg(Color::Gray),
        ))])
    };
    f.render_widget(
        monitor_panel.block(Block::default().borders(Borders::ALL).title("Monitoring")),
        bottom[1],
    );

    let status = Paragraph::new(Line::from(vec![
        Span::styled(ui.info.as_str(), Style::default().fg(Color::Yellow)),
        Span::raw("   "),
        Span::styled(
            "s start  x stop  m mode  p profile  e export  tab views  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    f.render_widget(status, main[4]);
}

fn draw_log(area: Rect, f: &mut ratatui::Frame, runner: &TestRunner) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(4)].as_ref())
        .split(area);

    let clock_fmt = format_description!("[hour]:[minute]:[second]");
    let rows: Vec<Row> = runner
        .records()
        .iter()
        .map(|r| {
            let status_color = match r.status {
                RecordStatus::Ok => Color::Green,
                RecordStatus::Warning => Color::Yellow,
                RecordStatus::Error => Color::Red,
            };
            Row::new(vec![
                Cell::from(
                    r.timestamp
                        .format(clock_fmt)
                        .unwrap_or_else(|_| "--:--:--".into()),
                ),
                Cell::from(format!("{:.0}", r.ping_ms)),
                Cell::from(format!("{:.1}", r.download_mbps)),
                Cell::from(format!("{:.1}", r.upload_mbps)),
                Cell::from(Span::styled(
                    r.status.to_string(),
                    Style::default().fg(status_color),
                )),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Time", "Ping (ms)", "Down (Mb/s)", "Up (Mb/s)", "Status"])
            .style(Style::default().fg(Color::Gray)),
    )
    .block(Block::default().borders(Borders::ALL).title("Test log"));
    f.render_widget(table, chunks[0]);

    let profile_name = profiles::find(&runner.config().profile_id)
        .map(|p| p.name)
        .unwrap_or("Custom");
    let summary = Paragraph::new(evaluate::summarize_records(runner.records(), profile_name))
        .wrap(ratatui::widgets::Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Summary"));
    f.render_widget(summary, chunks[1]);
}

fn onoff(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
