use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goro_notebook::models::{Config, DAILY_LIMIT};
use goro_notebook::server::{self, AppState};
use goro_notebook::session::{
    ConsoleNotifier, GenerationBackend, HttpBackend, LocalBackend, SelectOutcome, Session,
    SubmitOutcome,
};
use goro_notebook::storage::FileStore;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "goro-notebook")]
#[command(about = "Japanese mnemonics and illustrations for English vocabulary")]
struct CliArgs {
    /// Directory holding history and quota (overrides DATA_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on (overrides BIND_ADDR).
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Generate mnemonics for a word, then an image for the chosen one.
    Generate {
        word: String,
        /// Candidate number (1-3) to illustrate without asking.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
        pick: Option<u8>,
        /// Call the providers directly instead of the HTTP API.
        #[arg(long)]
        local: bool,
        /// API base URL (overrides API_BASE_URL).
        #[arg(long, value_name = "URL")]
        api: Option<String>,
    },
    /// Show saved generations and today's remaining quota.
    History,
    /// Delete all saved generations.
    ClearHistory {
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goro_notebook=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = CliArgs::parse();
    let mut config = Config::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    match run(args.command, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| config.bind_addr.clone());
            let state = AppState::from_config(&config)?;
            let listener = server::bind(&bind_addr).await?;
            info!("Starting goro-notebook API");
            server::serve(listener, state).await?;
        }
        Command::Generate {
            word,
            pick,
            local,
            api,
        } => {
            let backend: Box<dyn GenerationBackend> = if local {
                Box::new(LocalBackend::new(&AppState::from_config(&config)?))
            } else {
                Box::new(HttpBackend::new(
                    api.unwrap_or_else(|| config.api_base_url.clone()),
                ))
            };
            let mut session = open_session(&config, backend, false)?;
            generate(&mut session, &word, pick).await?;
        }
        Command::History => {
            let backend = Box::new(HttpBackend::new(&config.api_base_url));
            let session = open_session(&config, backend, false)?;
            print_history(&session);
        }
        Command::ClearHistory { yes } => {
            let mut session =
                open_session(&config, Box::new(HttpBackend::new(&config.api_base_url)), yes)?;
            if session.clear_history()? {
                println!("履歴を削除しました");
            }
        }
    }
    Ok(())
}

fn open_session(
    config: &Config,
    backend: Box<dyn GenerationBackend>,
    assume_yes: bool,
) -> Result<Session> {
    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("opening data dir {}", config.data_dir.display()))?;
    Ok(Session::load(
        Box::new(store),
        backend,
        Box::new(ConsoleNotifier::new(assume_yes)),
        config.plan_url.clone(),
    )?)
}

async fn generate(session: &mut Session, word: &str, pick: Option<u8>) -> Result<()> {
    println!("語呂を生成中…");
    match session.submit_word(word).await? {
        SubmitOutcome::Generated(_) => {}
        SubmitOutcome::Empty | SubmitOutcome::QuotaExhausted | SubmitOutcome::Failed(_) => {
            return Ok(())
        }
    }

    println!("語呂候補");
    for (i, c) in session.candidates().iter().enumerate() {
        println!("  {}. {}", i + 1, c.mnemonic);
        println!("     情景：{}", c.scene);
    }
    println!("本日の残り回数：{}/{}", session.remaining(), DAILY_LIMIT);

    let index = match pick {
        Some(n) => usize::from(n) - 1,
        None => match ask_choice(session.candidates().len())? {
            Some(index) => index,
            None => return Ok(()),
        },
    };
    if index >= session.candidates().len() {
        println!("候補 {} はありません", index + 1);
        return Ok(());
    }

    println!("画像を生成中…");
    if let SelectOutcome::Generated(url) = session.select_candidate(index).await? {
        println!("生成した画像: {}", image_summary(&url));
    }
    Ok(())
}

fn ask_choice(count: usize) -> Result<Option<usize>> {
    print!("この案で画像生成 (1-{}, Enter でスキップ): ", count);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=count).contains(n))
        .map(|n| n - 1))
}

fn print_history(session: &Session) {
    println!("本日の残り回数：{}/{}", session.remaining(), DAILY_LIMIT);
    if session.history().is_empty() {
        println!("履歴はありません");
        return;
    }
    for item in session.history() {
        println!(
            "[{}] {}: {}",
            item.created_at.format("%Y-%m-%d %H:%M"),
            item.word,
            item.mnemonic
        );
        println!("    情景：{}", item.scene);
        println!("    {}", image_summary(&item.image_url));
    }
}

/// Data URLs are too long for a terminal; show their size instead.
fn image_summary(url: &str) -> String {
    match url.strip_prefix("data:image/png;base64,") {
        Some(b64) => format!("inline PNG ({} base64 chars)", b64.len()),
        None => url.to_string(),
    }
}
