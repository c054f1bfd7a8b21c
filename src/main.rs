use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::{mpsc, Arc},
    time::Duration,
};

use typemaster::{
    app::{provision_identity, App, AppParts, AppSettings},
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore},
    difficulty::Difficulty,
    identity::LocalIdentityProvider,
    logging,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    score_store::SqliteScoreStore,
    submit::ScoreSubmitter,
    text::{FixedTextProvider, StaticTextProvider, TextProvider},
};

const RUNNER_INTERVAL_MS: u64 = 100;

/// typing speed trainer with a local leaderboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type a sample text as fast and accurately as you can. Words per minute and accuracy update live, and finished runs land on a per-difficulty leaderboard."
)]
pub struct Cli {
    /// difficulty tier to start on (defaults to the configured one)
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// custom prompt to use instead of the built-in texts
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// number of leaderboard entries to show
    #[clap(short = 'n', long)]
    limit: Option<usize>,

    /// score database to use
    #[clap(long)]
    db: Option<PathBuf>,

    /// display name to play under (the stored id is kept)
    #[clap(long)]
    name: Option<String>,

    /// interval between live stat refreshes, in milliseconds
    #[clap(long = "tick-ms")]
    tick_ms: Option<u64>,
}

impl Cli {
    /// Overlay the flags that were given on top of the stored config
    fn apply_to(&self, mut cfg: Config) -> Config {
        if let Some(d) = self.difficulty {
            cfg.difficulty = d;
        }
        if let Some(n) = self.limit {
            cfg.leaderboard_limit = n;
        }
        if let Some(ms) = self.tick_ms {
            cfg.tick_interval_ms = ms;
        }
        cfg
    }

    fn text_provider(&self) -> Box<dyn TextProvider> {
        match &self.prompt {
            Some(prompt) if !prompt.trim().is_empty() => {
                Box::new(FixedTextProvider::new(prompt.trim()))
            }
            _ => Box::new(StaticTextProvider::new()),
        }
    }

    fn identity_provider(&self) -> LocalIdentityProvider {
        let provider = LocalIdentityProvider::new();
        match &self.name {
            Some(name) if !name.trim().is_empty() => provider.with_display_name(name.trim()),
            _ => provider,
        }
    }

    fn open_store(&self) -> Result<SqliteScoreStore, Box<dyn Error>> {
        let store = match &self.db {
            Some(path) => SqliteScoreStore::open(path)?,
            None => SqliteScoreStore::new()?,
        };
        Ok(store)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    logging::init(AppDirs::log_path().as_deref());

    let config_store = FileConfigStore::new();
    let config = cli.apply_to(config_store.load());
    log::info!("starting with {config:?}");

    // one connection reads the leaderboard, the other belongs to the submit worker
    let reader = cli.open_store()?;
    let writer = cli.open_store()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &cli, &config, reader, writer);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match result {
        Ok(difficulty) => {
            let cfg = Config {
                difficulty,
                ..config_store.load()
            };
            if let Err(e) = config_store.save(&cfg) {
                log::warn!("could not remember difficulty: {e}");
            }
            Ok(())
        }
        Err(e) => {
            log::error!("exiting on error: {e}");
            Err(e)
        }
    }
}

/// Drive the app until it asks to quit; returns the difficulty it ended on
fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    cli: &Cli,
    config: &Config,
    reader: SqliteScoreStore,
    writer: SqliteScoreStore,
) -> Result<Difficulty, Box<dyn Error>> {
    let (tx, rx) = mpsc::channel::<AppEvent>();
    let submitter = ScoreSubmitter::spawn(Box::new(writer), tx.clone());
    provision_identity(Box::new(cli.identity_provider()), tx.clone());

    let mut app = App::new(AppParts {
        texts: cli.text_provider(),
        scores: Box::new(reader),
        sink: Box::new(submitter),
        events: tx.clone(),
        clock: Arc::new(SystemClock),
        settings: AppSettings::from(config),
    });

    let events = CrosstermEventSource::new(tx, rx);
    let runner = Runner::new(
        events,
        FixedTicker::new(Duration::from_millis(RUNNER_INTERVAL_MS)),
    );

    while !app.should_quit {
        terminal.draw(|f| f.render_widget(&app, f.area()))?;
        let event = runner.step();
        app.handle_event(event);
    }

    Ok(app.difficulty)
}
