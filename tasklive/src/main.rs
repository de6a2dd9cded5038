//! `TaskLive` — terminal task board with live sync.
//!
//! Launches the TUI, signs in against the task backend, and connects to
//! the event hub for live updates. Configuration via CLI flags,
//! environment variables, or config file (`~/.config/tasklive/config.toml`).
//!
//! ```bash
//! # Local dev backend
//! cargo run --bin tasklive
//!
//! # Point at another deployment
//! cargo run --bin tasklive -- --api-url https://tasks.example.com/api/v1 \
//!     --hub-url wss://tasks.example.com/ws
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use tasklive::api::ApiClient;
use tasklive::app::{App, AppAction};
use tasklive::config::{CliArgs, ClientConfig};
use tasklive::net::{self, NetCommand, NetEvent};
use tasklive::push::loopback::LoopbackChannel;
use tasklive::push::ws::WsChannel;
use tasklive::session::{Credential, SessionStore};
use tasklive::sync::{SubscriptionRegistry, shared_engine};
use tasklive::ui;
use tasklive_proto::user::AuthUser;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Initialize logging before terminal setup (logs go to file, not stdout).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("tasklive starting");

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &config).await;

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("tasklive exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the
/// terminal). Returns a [`WorkerGuard`] that must be held until shutdown
/// to ensure all buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("tasklive.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Handles to the networking tasks for the current session.
struct NetHandles {
    cmd_tx: mpsc::Sender<NetCommand>,
    evt_rx: mpsc::Receiver<NetEvent>,
}

/// Main application loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &ClientConfig,
) -> io::Result<()> {
    let session = match SessionStore::new() {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(err = %e, "no config directory, session will not persist");
            SessionStore::at_path(std::env::temp_dir().join("tasklive-session.json"))
        }
    };
    let api = match ApiClient::new(&config.api_url, config.request_timeout) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!(err = %e, "invalid API configuration");
            return Err(io::Error::other(e.to_string()));
        }
    };

    let engine = shared_engine();
    let mut app = App::new(Arc::clone(&engine), config.timestamp_format.clone());
    let mut net: Option<NetHandles> = None;

    // Resume a persisted session if the server still accepts the token.
    if let Some(credential) = session.load() {
        let mut authed = api.clone();
        authed.set_token(Some(credential.token.clone()));
        match authed.me().await {
            Ok(_) => {
                net = start_session(&mut app, config, &session, authed, credential.user).await;
            }
            Err(e) => {
                tracing::info!(err = %e, "persisted session rejected");
                let _ = session.clear();
            }
        }
    }

    loop {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        if let Some(handles) = net.as_mut() {
            drain_net_events(&mut app, &mut handles.evt_rx);
        }

        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match app.handle_key_event(key) {
                Some(AppAction::Login(form)) => match api.login(&form).await {
                    Ok(auth) => {
                        let mut authed = api.clone();
                        authed.set_token(Some(auth.token.clone()));
                        save_credential(&session, &auth.token, &auth.user);
                        net = start_session(&mut app, config, &session, authed, auth.user).await;
                    }
                    Err(e) => app.status_line = Some(e.to_string()),
                },
                Some(AppAction::Register(form)) => match api.register(&form).await {
                    Ok(auth) => {
                        let mut authed = api.clone();
                        authed.set_token(Some(auth.token.clone()));
                        save_credential(&session, &auth.token, &auth.user);
                        net = start_session(&mut app, config, &session, authed, auth.user).await;
                    }
                    Err(e) => app.status_line = Some(e.to_string()),
                },
                Some(AppAction::Logout) => {
                    if let Some(handles) = net.take() {
                        let _ = handles.cmd_tx.try_send(NetCommand::Shutdown);
                    }
                    if let Err(e) = session.clear() {
                        tracing::warn!(err = %e, "failed to clear session on logout");
                    }
                    engine.write().load_snapshot(Vec::new());
                    app.signed_out(None);
                }
                Some(AppAction::Net(cmd)) => {
                    if let Some(handles) = net.as_ref() {
                        match handles.cmd_tx.try_send(cmd) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                app.status_line = Some("network busy, try again".to_string());
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                app.status_line = Some("network task stopped".to_string());
                            }
                        }
                    }
                }
                None => {}
            }
        }

        // A 401 shuts the session down from inside the net tasks.
        if app.current_user.is_none()
            && let Some(handles) = net.take()
        {
            let _ = handles.cmd_tx.try_send(NetCommand::Shutdown);
            engine.write().load_snapshot(Vec::new());
        }

        if app.should_quit {
            if let Some(handles) = net.as_ref() {
                let _ = handles.cmd_tx.try_send(NetCommand::Shutdown);
            }
            return Ok(());
        }
    }
}

/// Connect to the hub and spawn the networking tasks for a fresh session.
///
/// A hub connection failure degrades to HTTP-only mode: commands still
/// hit the REST API, but no live events flow until the next sign-in.
async fn start_session(
    app: &mut App,
    config: &ClientConfig,
    session: &SessionStore,
    api: ApiClient,
    user: AuthUser,
) -> Option<NetHandles> {
    let token = session.load().map(|c| c.token).unwrap_or_default();
    let engine = Arc::clone(&app.engine);
    let registry = Arc::new(SubscriptionRegistry::new());

    let spawned = match WsChannel::connect(&config.hub_url, &token).await {
        Ok(channel) => {
            net::spawn_net(
                api,
                channel,
                engine,
                registry,
                session.clone(),
                config.channel_capacity,
            )
            .await
        }
        Err(e) => {
            tracing::warn!(err = %e, url = %config.hub_url, "hub unavailable, running without live updates");
            app.status_line = Some(format!("live updates unavailable: {e}"));
            // A loopback channel with its peer dropped keeps the command
            // path alive while the event pump exits immediately.
            let (channel, _peer) = LoopbackChannel::create_pair(1);
            net::spawn_net(
                api,
                channel,
                engine,
                registry,
                session.clone(),
                config.channel_capacity,
            )
            .await
        }
    };

    match spawned {
        Ok((cmd_tx, evt_rx)) => {
            app.signed_in(user);
            Some(NetHandles { cmd_tx, evt_rx })
        }
        Err(e) => {
            tracing::error!(err = %e, "failed to start networking tasks");
            app.status_line = Some(format!("could not start sync: {e}"));
            None
        }
    }
}

fn save_credential(session: &SessionStore, token: &str, user: &AuthUser) {
    let credential = Credential {
        token: token.to_string(),
        user: user.clone(),
    };
    if let Err(e) = session.save(&credential) {
        tracing::warn!(err = %e, "failed to persist session");
    }
}

/// Drain all pending `NetEvent`s from the receiver and apply them.
fn drain_net_events(app: &mut App, rx: &mut mpsc::Receiver<NetEvent>) {
    while let Ok(event) = rx.try_recv() {
        app.apply_net_event(event);
    }
}
