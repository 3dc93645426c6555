use std::path::{Path, PathBuf};

use audiobook_player_core::{
    BookDescriptor, PlaybackSession, PlayerCoreError, PositionMapper, SessionConfig, SessionEvent,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const TICK_MS: u64 = 1_000;

fn main() -> audiobook_player_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { book, position } => run_inspect(&book, position),
        Commands::Simulate {
            book,
            config,
            start_ms,
            sleep_minutes,
            end_of_chapter,
            max_seconds,
            frame_ms,
        } => {
            let config = load_config(config.as_deref())?;
            let timer = match (sleep_minutes, end_of_chapter) {
                (_, true) => TimerRequest::EndOfChapter,
                (Some(minutes), false) => TimerRequest::Minutes(minutes),
                (None, false) => TimerRequest::None,
            };
            run_simulate(&book, config, start_ms, timer, max_seconds, frame_ms)
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            let text = toml::to_string_pretty(&config)
                .map_err(|err| PlayerCoreError::from(format!("cannot render config: {err}")))?;
            println!("{text}");
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerRequest {
    None,
    Minutes(u32),
    EndOfChapter,
}

fn run_inspect(book: &Path, position: u64) -> audiobook_player_core::Result<()> {
    let book = load_book(book)?;
    let config = SessionConfig::default();
    let session = PlaybackSession::open_or_fallback(&book, config);
    let mut mapper: PositionMapper = session.mapper().clone();
    let stored = mapper.set_position(position);
    tracing::info!(requested = position, stored, "inspecting position");

    let chapter = mapper.current_chapter();
    println!("{}", serde_json::to_string_pretty(&chapter)?);
    Ok(())
}

fn run_simulate(
    book: &Path,
    config: SessionConfig,
    start_ms: u64,
    timer: TimerRequest,
    max_seconds: u64,
    frame_ms: u64,
) -> audiobook_player_core::Result<()> {
    let book = load_book(book)?;
    let mut session = PlaybackSession::open_or_fallback(&book, config);
    session.update_transport(start_ms, true);

    match timer {
        TimerRequest::Minutes(minutes) => session.set_sleep_timer(minutes),
        TimerRequest::EndOfChapter => session.set_sleep_timer_end_of_chapter(),
        TimerRequest::None => {}
    }

    let frame_ms = frame_ms.clamp(1, TICK_MS);
    tracing::info!(start_ms, ?timer, max_seconds, "starting simulated playback");

    for second in 0..max_seconds {
        // Audio engine and host clock both advance by one second of wall time.
        let mut events = session.advance_playhead(TICK_MS);
        events.extend(session.tick(TICK_MS));

        let mut frames = 0;
        while session.animator().is_active() && frames * frame_ms < TICK_MS {
            session.advance_animation(frame_ms);
            frames += 1;
        }

        for event in &events {
            log_event(second, event);
        }

        if events.contains(&SessionEvent::PauseRequested) {
            session.set_playing(false);
            break;
        }
        if session.position_ms() >= session.mapper().duration_ms() {
            tracing::info!(second, "reached end of book");
            break;
        }
    }

    println!("{}", serde_json::to_string_pretty(&session.view())?);
    Ok(())
}

fn log_event(second: u64, event: &SessionEvent) {
    match event {
        SessionEvent::ChapterChanged { from, to } => {
            tracing::info!(second, from, to, "chapter changed")
        }
        SessionEvent::TransitionStarted { from_progress } => {
            tracing::debug!(second, from_progress, "transition started")
        }
        SessionEvent::SleepTimerExpired => tracing::info!(second, "sleep timer expired"),
        SessionEvent::PauseRequested => tracing::info!(second, "pausing playback"),
        SessionEvent::WarningEntered => tracing::warn!(second, "sleep timer about to expire"),
        SessionEvent::WarningExited => tracing::info!(second, "sleep timer warning cleared"),
    }
}

fn load_book(path: &Path) -> audiobook_player_core::Result<BookDescriptor> {
    tracing::debug!(?path, "loading book description");
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn load_config(path: Option<&Path>) -> audiobook_player_core::Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };

    tracing::debug!(?path, "loading session config");
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|err| {
        PlayerCoreError::from(format!("invalid config `{}`: {err}", path.display()))
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Audiobook playback position and sleep timer harness",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the chapter a position falls into.
    Inspect {
        /// JSON book description with duration and chapters.
        #[arg(short, long)]
        book: PathBuf,
        /// Position in milliseconds; clamped to the book.
        #[arg(short, long)]
        position: u64,
    },
    /// Play a book in simulated time until the sleep timer or the book ends.
    Simulate {
        /// JSON book description with duration and chapters.
        #[arg(short, long)]
        book: PathBuf,
        /// Optional TOML session config.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Where playback starts, in milliseconds.
        #[arg(long, default_value_t = 0)]
        start_ms: u64,
        /// Countdown sleep timer in minutes.
        #[arg(long, conflicts_with = "end_of_chapter")]
        sleep_minutes: Option<u32>,
        /// Stop at the end of the current chapter.
        #[arg(long)]
        end_of_chapter: bool,
        /// Upper bound on simulated seconds.
        #[arg(long, default_value_t = 24 * 60 * 60)]
        max_seconds: u64,
        /// Frame interval used to drive the chapter transition.
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
    },
    /// Print the effective session config.
    Config {
        /// Optional TOML session config.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
