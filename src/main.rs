mod app;
mod event;
mod games;
mod leaderboard;
mod scores;
mod settings;
mod ui;

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use app::App;
use event::{Event, EventHandler};
use leaderboard::{LocalLeaderboard, LEADERBOARD_FILE};
use scores::{HighScores, SCORES_FILE};
use settings::{Settings, MAX_FRAME_MS, SETTINGS_FILE};

const LOG_FILE: &str = "termcade.log";

#[derive(Debug, Parser)]
#[command(name = "termcade")]
#[command(about = "Terminal games hub: snake, tetris, pong and space invaders")]
struct Cli {
    /// Directory for scores, settings and the log. Defaults to the executable's directory.
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// Milliseconds between frames.
    #[arg(long, value_name = "MILLISECONDS", value_parser = clap::value_parser!(u64).range(1..=MAX_FRAME_MS))]
    frame_ms: Option<u64>,
    /// Fixed seed for every game, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
    /// Player name used for leaderboard submissions.
    #[arg(long)]
    name: Option<String>,
}

fn init_logging(data_dir: &std::path::Path) -> Result<()> {
    // The terminal belongs to the UI, so logs go to a file.
    let path = data_dir.join(LOG_FILE);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(settings::default_data_dir);
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    init_logging(&data_dir)?;
    log::info!("termcade starting, data in {}", data_dir.display());

    let settings_path = data_dir.join(SETTINGS_FILE);
    let mut settings = Settings::load(&settings_path);
    if let Some(frame_ms) = cli.frame_ms {
        settings.frame_ms = frame_ms;
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }
    if cli.name.is_some() {
        settings.player_name = cli.name.clone();
    }

    let high_scores = HighScores::load(&data_dir.join(SCORES_FILE));
    let leaderboard = LocalLeaderboard::new(data_dir.join(LEADERBOARD_FILE));
    let frame_ms = settings.frame_ms;
    let mut app = App::new(settings, Some(settings_path), high_scores, Box::new(leaderboard));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    // Key release events drive held movement where the terminal supports them.
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run(&mut terminal, &mut app, frame_ms);

    // Restore terminal
    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    log::info!("termcade exiting");
    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    frame_ms: u64,
) -> Result<()> {
    let event_handler = EventHandler::new(frame_ms);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        match event_handler.next()? {
            Event::Tick => app.on_tick(),
            Event::Key(key) => app.on_key(key),
        }

        if app.should_quit {
            // A game left open on quit still counts.
            app.exit_game("quit");
            return Ok(());
        }
    }
}
