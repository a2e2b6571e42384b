mod app;
mod audio;
mod config;
mod engine;
mod event;
mod logging;
mod session;
mod store;
mod ui;

use std::io;

use anyhow::Result;
use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::error;

use app::App;
use audio::synth::SampleFormat;
use config::Config;
use event::KeyInput;
use store::json_store::JsonStore;
use ui::TerminalDisplay;
use ui::theme::Theme;

#[derive(Parser)]
#[command(name = "kochr", version, about = "Morse code listening trainer using the Koch method")]
struct Cli {
    #[arg(short, long, help = "Tone frequency in Hz")]
    frequency: Option<f64>,

    #[arg(short, long, help = "Character speed in words per minute")]
    char_wpm: Option<f64>,

    #[arg(short = 'w', long, help = "Effective (Farnsworth) speed in words per minute")]
    farnsworth_wpm: Option<f64>,

    #[arg(long, help = "Sample encoding (u8, i16)")]
    sample_format: Option<String>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(long, help = "Train without sound")]
    mute: bool,

    #[arg(long, value_name = "TEXT", help = "Play TEXT in Morse and exit")]
    play: Option<String>,

    #[arg(long, help = "Write the effective settings to the config file")]
    save_config: bool,

    #[arg(long, help = "Log level (error, warn, info, debug, trace)")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = JsonStore::default_dir();
    let log_path = logging::init_logging(cli.log_level.as_deref(), &data_dir)?;

    let mut config = Config::load().unwrap_or_else(|e| {
        error!("Could not load config: {e}; using defaults");
        Config::default()
    });
    if let Some(frequency) = cli.frequency {
        config.frequency_hz = frequency;
    }
    if let Some(wpm) = cli.char_wpm {
        config.char_wpm = wpm;
    }
    if let Some(wpm) = cli.farnsworth_wpm {
        config.farnsworth_wpm = wpm;
    }
    if let Some(format) = cli.sample_format {
        if SampleFormat::from_name(&format).is_none() {
            anyhow::bail!("Unknown sample format {format:?} (expected u8 or i16)");
        }
        config.sample_format = format;
    }
    config.validate();
    if cli.save_config {
        config.save()?;
    }

    let store = JsonStore::with_base_dir(data_dir)?;
    let mut app = App::new(config, store)?;
    if let Some(theme) = cli.theme.as_deref().and_then(Theme::load) {
        app = app.with_theme(theme);
    }

    let mut playback = App::open_playback(cli.mute)?;

    if let Some(text) = cli.play {
        return app.play_phrase(&text, playback.as_mut());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    let mut display = TerminalDisplay::new(terminal, app.theme.clone());

    let result = app.run_session(playback.as_mut(), &mut KeyInput, &mut display);

    let mut terminal = display.into_terminal();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!("Session failed: {err:?}");
        eprintln!("Error: {err:?}");
        eprintln!("See {} for details", log_path.display());
    }

    Ok(())
}
