//! CLI application for echofield
//!
//! Runs a spatial session against the default (or a named) output device.
//! With `--path` the listener walks a scripted route and the mix is logged;
//! otherwise an interactive terminal view lets you steer the listener.

mod app;
mod canvas;
mod link;
mod scene;
mod ui;

use anyhow::{Context, Result};
use app::App;
use audio::{MuteSwitch, NullBackend, PlaybackBackend};
use audio_io::CpalBackend;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use link::Link;
use log::{debug, error, info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use room::{SessionCommand, SessionHandler, SessionSnapshot, SpatialSession};
use room_core::{Position, SessionEvent};
use settings_manager::{ConfigManager, Settings};
use std::{
    fs::File,
    io,
    net::SocketAddr,
    path::PathBuf,
    time::Duration,
};
use tokio::sync::{mpsc, oneshot};

/// echofield - walk a canvas of looping voices
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Write logs to this file instead of stderr
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Settings file (defaults to the user config directory)
    #[clap(short, long)]
    settings: Option<PathBuf>,

    /// JSON node list to start from
    #[clap(long)]
    scene: Option<PathBuf>,

    /// Upstream that streams node lists, one JSON array per line
    #[clap(long)]
    link: Option<SocketAddr>,

    /// Output device name, overriding the settings file
    #[clap(long)]
    device: Option<String>,

    /// List output devices and exit
    #[clap(long)]
    list_devices: bool,

    /// Never open an audio device
    #[clap(long)]
    silent: bool,

    /// Listener start position
    #[clap(long, value_parser = scene::parse_waypoint, default_value = "0,0")]
    start: Position,

    /// Scripted listener waypoints (x,y); repeat to form a path
    #[clap(long = "path", value_parser = scene::parse_waypoint)]
    path: Vec<Position>,

    /// Canvas units per listener move
    #[clap(long, default_value_t = 10.0)]
    step: f32,

    /// Milliseconds between scripted moves
    #[clap(long, default_value_t = 200)]
    tick_ms: u64,

    /// Audio clip attached when replying from the interactive view
    #[clap(long)]
    reply_clip: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    info!("Starting echofield CLI");

    if args.list_devices {
        for name in audio_io::list_output_devices() {
            println!("{}", name);
        }
        return Ok(());
    }

    let settings = load_settings(&args);
    let mute = MuteSwitch::new();
    let backend = open_backend(&args, &settings, &mute);
    let session = SpatialSession::new(backend, mute, &settings)
        .context("Failed to start spatial session")?;

    let (command_tx, command_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(64);
    let handler = tokio::spawn(SessionHandler::new(session, command_rx, event_tx).run());

    command_tx
        .send(SessionCommand::MoveListener {
            x: args.start.x,
            y: args.start.y,
        })
        .await?;

    if let Some(path) = &args.scene {
        let nodes = scene::load_scene(path)?;
        info!("Loaded {} nodes from {:?}", nodes.len(), path);
        command_tx.send(SessionCommand::ReplaceNodes(nodes)).await?;
    }

    let link = args
        .link
        .map(|address| Link::spawn(address, &settings.link, command_tx.clone()));

    let result = if args.path.is_empty() {
        run_interactive(&args, &command_tx, event_rx).await
    } else {
        run_scripted(&args, &command_tx, event_rx).await
    };

    if let Some(link) = link {
        link.stop().await;
    }
    // The handler may already be gone if it failed
    let _ = command_tx.send(SessionCommand::Shutdown).await;
    match handler.await? {
        Ok(session) => debug!("Session ended with {} nodes", session.store().len()),
        Err(e) => error!("Session handler failed: {}", e),
    }

    info!("Exiting echofield CLI");
    result
}

fn init_logging(args: &Args) -> Result<()> {
    let level = if args.debug { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else if args.path.is_empty() && !args.list_devices {
        // Log lines would tear through the interactive view
        builder.filter_level(log::LevelFilter::Error);
    }

    builder.init();
    debug!("Debug logging enabled");
    Ok(())
}

fn load_settings(args: &Args) -> Settings {
    let manager = match &args.settings {
        Some(path) => ConfigManager::with_file(path),
        None => ConfigManager::new(),
    };

    let mut settings = match manager {
        Ok(manager) => manager.settings().clone(),
        Err(e) => {
            warn!("Failed to load settings, using defaults: {}", e);
            Settings::default()
        }
    };

    if let Some(device) = &args.device {
        settings.output_device = device.clone();
    }
    settings
}

fn open_backend(args: &Args, settings: &Settings, mute: &MuteSwitch) -> Box<dyn PlaybackBackend> {
    if args.silent {
        info!("Running without audio output");
        return Box::new(NullBackend);
    }

    match CpalBackend::new(settings.output_device(), mute.clone()) {
        Ok(backend) => {
            info!("Audio output running at {} Hz", backend.output_rate());
            Box::new(backend)
        }
        Err(e) => {
            warn!("No audio output ({}), continuing silently", e);
            Box::new(NullBackend)
        }
    }
}

async fn snapshot(commands: &mpsc::Sender<SessionCommand>) -> Option<SessionSnapshot> {
    let (reply_tx, reply_rx) = oneshot::channel();
    commands.send(SessionCommand::Snapshot(reply_tx)).await.ok()?;
    reply_rx.await.ok()
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::ReplyUnlocked(_) | SessionEvent::FocusChanged(_) => info!("{}", event),
        _ => debug!("{}", event),
    }
}

async fn run_scripted(
    args: &Args,
    commands: &mpsc::Sender<SessionCommand>,
    mut events: mpsc::Receiver<SessionEvent>,
) -> Result<()> {
    let mut waypoints = vec![args.start];
    waypoints.extend(args.path.iter().copied());
    let positions = scene::walk(&waypoints, args.step);
    info!("Walking {} listener positions", positions.len());

    let mut ticker = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));
    for position in positions {
        ticker.tick().await;
        commands
            .send(SessionCommand::MoveListener {
                x: position.x,
                y: position.y,
            })
            .await?;

        while let Ok(event) = events.try_recv() {
            log_event(&event);
        }

        if let Some(snapshot) = snapshot(commands).await {
            let mix: Vec<String> = snapshot
                .gains
                .iter()
                .map(|(id, gain)| format!("{}={:.2}", id, gain))
                .collect();
            info!(
                "({:.0}, {:.0}) blur {:.2} [{}]",
                position.x,
                position.y,
                snapshot.blur,
                mix.join(" ")
            );
        }
    }

    Ok(())
}

async fn run_interactive(
    args: &Args,
    commands: &mpsc::Sender<SessionCommand>,
    mut events: mpsc::Receiver<SessionEvent>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = App::new(args.start, args.step, args.reply_clip.clone());
    let result = interactive_loop(&mut terminal, &mut app, commands, &mut events).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn interactive_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    commands: &mpsc::Sender<SessionCommand>,
    events: &mut mpsc::Receiver<SessionEvent>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(50);

    while !app.should_quit {
        while let Ok(event) = events.try_recv() {
            app.on_event(&event);
        }
        if let Some(snapshot) = snapshot(commands).await {
            app.on_snapshot(snapshot);
        }

        terminal.draw(|f| ui::ui(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if let Some(command) = app.handle_key(key) {
                    commands.send(command).await?;
                }
            }
        }
    }

    Ok(())
}
