mod app;
mod cli;
mod config;
mod error;
mod input;
mod k8s;
mod model;
mod quantity;
mod report;
mod top;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cli::{CliArgs, Command, OutputFormat};
use config::{HoggersConfigFile, kubeconfig_paths};
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use k8s::{ClusterLister, KubeGateway, MetricsLister};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use top::TopConfig;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let (settings, settings_source) = HoggersConfigFile::load(args.config.as_deref())?;
    if let Some(source) = settings_source {
        debug!(source = %source.display(), "loaded settings file");
    }

    let paths = kubeconfig_paths(args.kubeconfig.as_deref())?;
    let gateway = Arc::new(KubeGateway::connect(&paths, args.context.clone()).await?);
    info!(
        context = gateway.context(),
        cluster = gateway.cluster(),
        "connected"
    );

    match args.command {
        Command::Report { output } => run_report(gateway, output).await,
        Command::Top(top_args) => run_top(gateway, settings.top_config(&top_args)).await,
    }
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // The terminal belongs to the TUI, so logs never go to stdout or stderr.
    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::sink).try_init(),
    };

    Ok(())
}

/// The report is fully built before the terminal is touched, so a listing
/// failure is printed on a normal screen.
async fn run_report(gateway: Arc<KubeGateway>, output: OutputFormat) -> Result<()> {
    let nodes = report::build_report(gateway.as_ref()).await?;

    match output {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&nodes).context("failed to serialize report")?;
            println!("{json}");
            Ok(())
        }
        OutputFormat::Table => {
            let mut app = App::report(
                gateway.context().to_string(),
                gateway.cluster().to_string(),
                nodes,
            );
            let mut terminal = init_terminal()?;
            let run_result = report_loop(&mut terminal, &mut app).await;
            let restore_result = restore_terminal(&mut terminal);
            combine_results(run_result, restore_result)
        }
    }
}

async fn run_top(gateway: Arc<KubeGateway>, config: TopConfig) -> Result<()> {
    info!(
        interval_secs = config.interval.as_secs(),
        rows = config.rows_limit,
        keep_going = config.keep_going,
        "starting live view"
    );
    let mut app = App::top(
        gateway.context().to_string(),
        gateway.cluster().to_string(),
        &config,
    );
    let mut terminal = init_terminal()?;
    let run_result = top_loop(&mut terminal, &mut app, gateway, config).await;
    let restore_result = restore_terminal(&mut terminal);
    combine_results(run_result, restore_result)
}

fn combine_results(run_result: Result<()>, restore_result: Result<()>) -> Result<()> {
    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    install_panic_restore();
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

// A panic on any task must not leave the shell in raw mode.
fn install_panic_restore() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        previous(info);
    }));
}

async fn report_loop(terminal: &mut TuiTerminal, app: &mut App) -> Result<()> {
    let mut reader = EventStream::new();

    while app.running() {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        match reader.next().await {
            Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                if let Some(action) = input::map_key(key) {
                    debug!("action={action:?}");
                    app.apply_action(action);
                }
            }
            Some(Ok(_)) => {}
            Some(Err(error)) => return Err(error).context("terminal event error"),
            None => break,
        }
    }

    Ok(())
}

async fn top_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: Arc<KubeGateway>,
    config: TopConfig,
) -> Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let cluster: Arc<dyn ClusterLister> = gateway.clone();
    let metrics: Arc<dyn MetricsLister> = gateway;
    let mut refresh = tokio::spawn(top::run_refresh_loop(cluster, metrics, config, events_tx));
    let mut reader = EventStream::new();

    let result = loop {
        if !app.running() {
            break Ok(());
        }
        if let Err(error) = terminal.draw(|frame| ui::render(frame, app)) {
            break Err(error).context("failed to render terminal frame");
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(key) {
                            debug!("action={action:?}");
                            app.apply_action(action);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => break Err(error).context("terminal event error"),
                    None => break Ok(()),
                }
            }
            Some(event) = events_rx.recv() => app.update(event),
            joined = &mut refresh => {
                break match joined {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(error)) => Err(error.into()),
                    Err(error) => Err(error).context("refresh task failed"),
                };
            }
        }
    };

    refresh.abort();
    drop(events_rx);
    result
}
