use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ytsum_core::{
    FsCache, OllamaConfig, OllamaSummarizer, Pipeline, ReqwestBackend, YoutubeTranscripts,
    default_cache_dir, extract_video_id,
    summarizer::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL},
};

use crate::output::{Clipboard, SystemClipboard, emit};

mod output;

#[derive(Parser)]
#[command(name = "ytsum")]
#[command(about = "Summarize a YouTube video in a few key points with a local Ollama model")]
#[command(
    after_help = "Both the transcript and the summary are cached, so repeated runs are instant."
)]
struct Cli {
    /// The link to the YouTube video to summarize
    link: String,

    /// The url of a running Ollama instance
    #[arg(long = "ollama_url", env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// The model name for the Ollama instance
    #[arg(long = "ollama_model", env = "OLLAMA_MODEL", default_value = DEFAULT_OLLAMA_MODEL)]
    ollama_model: String,

    /// Force to regenerate the summary instead of using the cache
    #[arg(short, long)]
    force: bool,

    /// Copy the summary to the clipboard at the end
    #[arg(short, long)]
    copy: bool,

    /// Preferred transcript languages, most preferred first
    #[arg(short, long = "lang", default_value = "en")]
    lang: Vec<String>,

    /// Cache directory for transcripts and summaries
    #[arg(long, env = "YTSUM_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
            |_| format!("ytsum={log_level},ytsum_core={log_level}"),
        )))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(spinner_style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish_step(spinner: ProgressBar, label: &str, cached: bool, started: Instant) {
    let detail = if cached {
        style("(cached)".to_string()).dim()
    } else {
        style(format!("[{}]", format_duration(started.elapsed()))).dim()
    };
    spinner.finish_and_clear();
    eprintln!("{} {} {}", style("✓").green().bold(), label, detail);
}

async fn run(cli: Cli) -> Result<()> {
    let video_id = extract_video_id(&cli.link)?;

    let cache_dir = cli.cache_dir.unwrap_or_else(default_cache_dir);
    let cache = FsCache::open(&cache_dir).await?;
    tracing::debug!(cache_dir = %cache.root().display(), "cache ready");

    let backend = Arc::new(ReqwestBackend::new());
    let transcripts = YoutubeTranscripts::new(backend.clone()).with_languages(cli.lang);
    let config = OllamaConfig::new(&cli.ollama_model).with_base_url(&cli.ollama_url);
    let summarizer = OllamaSummarizer::new(config, backend);
    let pipeline = Pipeline::new(Arc::new(cache), Arc::new(transcripts), Arc::new(summarizer));

    eprintln!(
        "\n{}  {}\n",
        style("ytsum").cyan().bold(),
        style(format!("Video {}", video_id)).dim()
    );

    // Step 1: Transcript (check cache)
    let started = Instant::now();
    let spinner = create_spinner("Fetching transcript...");
    let transcript = match pipeline.resolve_transcript(&video_id).await {
        Ok(transcript) => transcript,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    finish_step(spinner, "Transcript", transcript.cached, started);

    // Step 2: Summary (check cache, dropped first on --force)
    let started = Instant::now();
    let spinner = create_spinner(&format!("Summarizing with {}...", cli.ollama_model));
    let summary = match pipeline
        .resolve_summary(&video_id, &transcript.value, cli.force)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    finish_step(
        spinner,
        &format!("Summary ({})", cli.ollama_model),
        summary.cached,
        started,
    );
    eprintln!("{}", style("─".repeat(60)).dim());

    let mut stdout = std::io::stdout().lock();
    if !cli.copy {
        return emit(&summary.value, None, &mut stdout);
    }

    // The summary is printed even when the clipboard is unavailable
    match SystemClipboard::new() {
        Ok(mut clipboard) => emit(
            &summary.value,
            Some(&mut clipboard as &mut dyn Clipboard),
            &mut stdout,
        ),
        Err(e) => {
            emit(&summary.value, None, &mut stdout)?;
            Err(e)
        }
    }
}

#[tokio::main]
async fn main() {
    // Re-entry as the detached process that keeps the copied text alive
    #[cfg(target_os = "linux")]
    {
        if std::env::var_os(output::CLIPBOARD_SERVER_ENV).is_some() {
            let code = i32::from(output::serve_clipboard().is_err());
            std::process::exit(code);
        }
    }

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
