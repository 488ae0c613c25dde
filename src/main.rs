use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod app;
mod config;
mod dataset;
mod db;
mod error;
mod filter;
mod map;
mod models;
mod report;
mod services;
mod store;
mod topics;
mod tui;
mod views;

use app::App;
use config::Config;
use error::Result;
use tui::{draw, handle_key_event, handle_mouse_event};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    // Check for --export flag
    let export_path = if args.len() >= 3 && args[1] == "--export" {
        Some(PathBuf::from(&args[2]))
    } else {
        None
    };

    // Check for --summary flag (headless counts)
    let headless_summary = args.len() >= 2 && args[1] == "--summary";

    // Initialize app
    let mut app = App::new(&config).await?;

    // If export path provided, write the unified table and exit
    if let Some(path) = export_path {
        let rows = app.export_csv(&path)?;
        println!("Exported {} projects to {:?}", rows, path);
        return Ok(());
    }

    if headless_summary {
        for line in app.summary_lines() {
            println!("{line}");
        }
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            let action = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key_event(key, &app.mode, app.page)
                }
                Event::Mouse(mouse) => handle_mouse_event(mouse, &app.mode),
                _ => None,
            };
            if let Some(action) = action {
                let should_quit = app.handle_action(action).await?;
                if should_quit {
                    return Ok(());
                }
            }
        }
    }
}
