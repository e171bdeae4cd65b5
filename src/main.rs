use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use partytea::app::{App, InputMode, StatusLevel, Tab};
use partytea::config::{self, AppConfig};
use partytea::infrastructure::ethereum::{create_provider, signer_from_env};
use partytea::infrastructure::runtime::RuntimeBridge;
use partytea::ui;

#[derive(Debug, Parser)]
#[command(
    name = "partytea",
    version,
    about = "PartyTea: join membership parties on Tea Sepolia from the terminal"
)]
struct Args {
    /// Log file (defaults to partytea.log in the data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Ignore the private key and browse read-only
    #[arg(long)]
    no_wallet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.clone())?;

    let config = config::load();
    let signer = if args.no_wallet {
        None
    } else {
        signer_from_env(&config.private_key_env)?
    };
    if signer.is_none() {
        warn!(var = %config.private_key_env, "no signer configured, running read-only");
    }
    let provider = create_provider(&config.network, signer)?;
    info!(
        network = config.network.name,
        contract = %config.contract,
        "starting"
    );

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runtime = RuntimeBridge::new(config.clone(), Arc::from(provider))?;

    let mut app = App::new(config.network.clone());
    app.set_status(format!("Connecting to {}…", config.network.name), StatusLevel::Info);

    let res = run_app(&mut terminal, app, runtime, &config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err:?}");
    }

    Ok(())
}

/// Log to a file; the terminal belongs to the TUI
fn init_tracing(log_file: Option<PathBuf>) -> Result<()> {
    let Some(path) = log_file.or_else(config::log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "partytea=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    runtime: RuntimeBridge,
    config: &AppConfig,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    info!(poll_interval = ?config.poll_interval, "ui loop started");

    loop {
        pump_background(&mut app, &runtime);
        terminal.draw(|f| ui::draw(f, &app))?;
        if app.should_quit {
            return Ok(());
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut app, key);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

/// Apply worker events, re-evaluate the subscription, flush queued commands
fn pump_background(app: &mut App, runtime: &RuntimeBridge) {
    for event in runtime.poll_events() {
        app.apply_event(event);
    }
    app.sync();
    for cmd in app.take_commands() {
        if let Err(err) = runtime.send(cmd) {
            app.set_status(format!("{err:#}"), StatusLevel::Error);
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.notification.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_notification();
        }
        return;
    }

    if app.help_open {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
            app.help_open = false;
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Command => handle_command_mode(app, key),
        InputMode::Form => handle_form_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), mods) if mods.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true
        }
        (KeyCode::Char('q'), _) => app.should_quit = true,
        (KeyCode::Char('?'), _) => app.help_open = true,
        (KeyCode::Char(':'), _) => app.enter_command(),
        (KeyCode::Char('r'), _) => app.refresh(),
        (KeyCode::Char('c'), _) => app.connect(),
        (KeyCode::Char('d'), _) => app.disconnect(),
        (KeyCode::Char('1'), _) => app.set_tab(Tab::Join),
        (KeyCode::Char('2'), _) => app.set_tab(Tab::Memberships),
        (KeyCode::Char('3'), _) => app.set_tab(Tab::Admin),
        (KeyCode::Tab, _) => app.cycle_tab(true),
        (KeyCode::BackTab, _) => app.cycle_tab(false),
        (KeyCode::Up | KeyCode::Char('k'), _) => app.move_selection_up(),
        (KeyCode::Down | KeyCode::Char('j'), _) => app.move_selection_down(),
        (KeyCode::Enter, _) => {
            if app.current_tab == Tab::Join {
                app.join_selected();
            }
        }
        (KeyCode::Char('n'), _) => {
            if app.current_tab == Tab::Admin {
                app.enter_form();
            } else {
                app.set_status("Create is available on the Admin tab", StatusLevel::Warn);
            }
        }
        (KeyCode::Char('w'), _) => {
            if app.current_tab == Tab::Admin {
                app.withdraw_selected();
            } else {
                app.set_status("Withdraw is available on the Admin tab", StatusLevel::Warn);
            }
        }
        _ => {}
    }
}

fn handle_command_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.exit_command(),
        KeyCode::Enter => app.apply_command(),
        KeyCode::Backspace => {
            app.command.input.pop();
        }
        KeyCode::Char(ch) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return;
            }
            app.command.input.push(ch);
        }
        _ => {}
    }
}

fn handle_form_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.exit_form(),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Tab | KeyCode::BackTab => app.toggle_form_field(),
        KeyCode::Backspace => app.form_backspace(),
        KeyCode::Char(ch) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return;
            }
            app.form_push(ch);
        }
        _ => {}
    }
}
