use std::io;
use std::time::Duration;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use bioforge::config::AppConfig;
use bioforge::tui::app::AppState;
use bioforge::tui::services::Services;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // File-only logging; the terminal belongs to the TUI
    let _log_guard = bioforge::core::logging::init_tui();
    log::info!("{} v{} starting", bioforge::NAME, bioforge::VERSION);

    let config = AppConfig::load();
    let tick_rate = Duration::from_millis(config.tui.tick_rate_ms.max(10));

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let services = Services::init(config, event_tx)?;
    let mut app = AppState::new(event_rx, services);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal, tick_rate).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(sheet) = app.take_printable() {
        println!("{sheet}");
    }

    if let Err(e) = result {
        log::error!("TUI exited with error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    log::info!("{} exiting", bioforge::NAME);
    Ok(())
}
