use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use services::{
    AppServices, CalendarReminder, ClassifierInput, Clock, ImageInput, ProgressSnapshot,
};
use speedread_core::model::DefuseOutcome;
use speedread_core::{Level, WordSets};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidLevel { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid level: {raw} (expected A, B or C)"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_level(raw: &str) -> Result<Level, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidLevel {
        raw: raw.to_owned(),
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  speedread [--db <sqlite_url> | --memory] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status [--level <A|B|C>]          show stage, retention and next review");
    eprintln!("  record <A|B|C>                    record a completed session now");
    eprintln!("  play <A|B|C> [--auto]             play a round over the built-in words");
    eprintln!("  reminder <A|B|C> [--out <file>]   write an .ics review reminder");
    eprintln!("  classify --text <text> [--image <file>] [--play <A|B|C> [--auto]]");
    eprintln!("                                    sort words into levels, optionally play one");
    eprintln!("  reset                             delete all progress");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:speedread.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SPEEDREAD_DB_URL, SPEEDREAD_AI_API_KEY, SPEEDREAD_AI_BASE_URL, SPEEDREAD_AI_MODEL");
    eprintln!("  RUST_LOG (default: warn)");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    Sqlite(String),
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status { level: Option<Level> },
    Record { level: Level },
    Play { level: Level, auto: bool },
    Reminder { level: Level, out: Option<PathBuf> },
    Classify {
        text: String,
        image: Option<PathBuf>,
        play: Option<Level>,
        auto: bool,
    },
    Reset,
    Help,
}

#[derive(Debug)]
struct Args {
    backend: Backend,
    command: Command,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>, env_db: Option<String>) -> Result<Self, ArgsError> {
        let mut backend =
            Backend::Sqlite(env_db.unwrap_or_else(|| "sqlite:speedread.sqlite3".into()));
        let mut name: Option<String> = None;
        let mut positional: Vec<String> = Vec::new();
        let mut level_flag: Option<Level> = None;
        let mut out: Option<PathBuf> = None;
        let mut text: Option<String> = None;
        let mut image: Option<PathBuf> = None;
        let mut play_level: Option<Level> = None;
        let mut auto = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    backend = Backend::Sqlite(value);
                }
                "--memory" => backend = Backend::Memory,
                "--level" => level_flag = Some(parse_level(&require_value(&mut args, "--level")?)?),
                "--out" => out = Some(PathBuf::from(require_value(&mut args, "--out")?)),
                "--text" => text = Some(require_value(&mut args, "--text")?),
                "--image" => image = Some(PathBuf::from(require_value(&mut args, "--image")?)),
                "--play" => play_level = Some(parse_level(&require_value(&mut args, "--play")?)?),
                "--auto" => auto = true,
                "--help" | "-h" => {
                    return Ok(Self {
                        backend,
                        command: Command::Help,
                    });
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if name.is_none() => name = Some(arg),
                _ => positional.push(arg),
            }
        }

        let level_arg = |what| -> Result<Level, ArgsError> {
            positional
                .first()
                .ok_or(ArgsError::MissingArgument { what })
                .and_then(|raw| parse_level(raw))
        };

        let command = match name.as_deref() {
            None => Command::Help,
            Some("status") => Command::Status { level: level_flag },
            Some("record") => Command::Record {
                level: level_arg("level")?,
            },
            Some("play") => Command::Play {
                level: level_arg("level")?,
                auto,
            },
            Some("reminder") => Command::Reminder {
                level: level_arg("level")?,
                out,
            },
            Some("classify") => Command::Classify {
                text: text.unwrap_or_default(),
                image,
                play: play_level,
                auto,
            },
            Some("reset") => Command::Reset,
            Some(other) => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };

        Ok(Self { backend, command })
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_owned();
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn image_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

fn print_snapshot(snapshot: &ProgressSnapshot) {
    let urgent = if snapshot.needs_urgent_review {
        "  急需溫習"
    } else {
        ""
    };
    println!(
        "等級 {}  stage {}  retention {:.0}%  {}{}",
        snapshot.level, snapshot.stage, snapshot.current.retention, snapshot.status, urgent
    );
}

async fn play(
    services: &AppServices,
    level: Level,
    words: &WordSets,
    auto: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let rounds = services.rounds();
    let mut round = rounds.start_round(level, words);
    round.start(rounds.now())?;

    {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        for index in 0..round.tiles().len() {
            if !auto {
                print!("{}  ", round.tiles()[index].word);
                io::stdout().flush()?;
                if lines.next().transpose()?.is_none() {
                    round.pause(rounds.now());
                    println!();
                    println!("round abandoned");
                    return Ok(());
                }
            }
            if let DefuseOutcome::Completed { .. } = round.defuse(index, rounds.now())? {
                break;
            }
        }
    }

    let outcome = rounds.finish(&round).await?;
    println!(
        "任務完成！用咗{}秒，獲得{}金幣！",
        outcome.elapsed_display(),
        outcome.coins
    );
    println!("stage {}: {}後溫習最有效！", outcome.stage, outcome.reminder_label);
    println!("🪙 金幣: {}", outcome.total_coins);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1), std::env::var("SPEEDREAD_DB_URL").ok())
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;

    if parsed.command == Command::Help {
        print_usage();
        return Ok(());
    }

    let clock = Clock::default_clock();
    let services = match &parsed.backend {
        Backend::Memory => AppServices::in_memory(clock)?,
        Backend::Sqlite(raw) => {
            let db_url = normalize_sqlite_url(raw);
            prepare_sqlite_file(&db_url)?;
            AppServices::new_sqlite(&db_url, clock).await?
        }
    };
    let progress = services.progress();

    match parsed.command {
        Command::Status { level } => {
            let all = progress.load().await;
            let now = progress.now();
            for record in all.iter().filter(|r| level.is_none_or(|l| r.level() == l)) {
                print_snapshot(&ProgressSnapshot::build(record, now));
            }
        }
        Command::Record { level } => {
            let all = progress.record_session_now(level).await?;
            print_snapshot(&ProgressSnapshot::build(all.get(level), progress.now()));
        }
        Command::Play { level, auto } => {
            play(&services, level, &WordSets::builtin(), auto).await?;
        }
        Command::Reminder { level, out } => {
            let all = progress.load().await;
            let reminder = CalendarReminder::new(level, all.get(level).stage(), progress.now());
            let path = out.unwrap_or_else(|| PathBuf::from(reminder.file_name()));
            std::fs::write(&path, reminder.to_ics())?;
            println!("{} -> {}", reminder.title(), path.display());
        }
        Command::Classify {
            text,
            image,
            play: play_level,
            auto,
        } => {
            let mut input = ClassifierInput::text(text);
            if let Some(path) = image {
                input = input.with_image(ImageInput {
                    bytes: std::fs::read(&path)?,
                    mime_type: image_mime_type(&path).to_owned(),
                });
            }
            let sets = services.classifier().classify(&input).await.map_err(|err| {
                tracing::warn!(error = %err, "classification failed");
                err.user_message()
            })?;
            for level in Level::ALL {
                println!("{level}: {}", sets.words(level).join(", "));
            }
            if let Some(level) = play_level {
                play(&services, level, &sets, auto).await?;
            }
        }
        Command::Reset => {
            progress.reset().await?;
            println!("progress reset");
        }
        Command::Help => print_usage(),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
