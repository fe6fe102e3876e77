use color_eyre::Result;
use ratatui::{backend::CrosstermBackend, Terminal};
use sanisette_tui::{
    api::OpenDataClient,
    app::App,
    config::Config,
    events::EventHandler,
    location::DeviceLocation,
    logging,
    report::Submission,
    ui,
};
use std::io;
use tokio::sync::mpsc;
use tracing::info;

// One logical thread of control: the controller is only ever touched here.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging();
    color_eyre::install()?;
    install_panic_hook();

    let config = Config::load();
    let location = DeviceLocation::from_config(&config.location);
    let source = OpenDataClient::new(&config.data)?;

    // Report delivery: session only, nothing is persisted.
    let (outbox, mut submissions) = mpsc::unbounded_channel::<Submission>();
    tokio::spawn(async move {
        let mut count = 0usize;
        while let Some(s) = submissions.recv().await {
            count += 1;
            info!(
                "Report #{}: facility {} marked '{}' at {}",
                count,
                s.facility_id,
                s.option,
                s.submitted_at.to_rfc3339()
            );
        }
    });

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut events = EventHandler::new();
    events.spawn_input(config.ui.tick_rate_ms);
    let mut app = App::new(location, source, events.tx.clone(), outbox);

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(event) = events.next().await {
            app.handle_event(event);
        }
    }

    if app.map.is_some() {
        app.close_map();
    }
    restore_terminal(terminal)?;
    info!("Exited after {} report(s)", app.reports_sent);
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}
