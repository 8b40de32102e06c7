use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Result, bail};
use log::{debug, info, warn};

mod cli;

use cli::{Cli, OutputFormat};
use ytingest::dispatch::Completion;
use ytingest::output::{self, Report};
use ytingest::store::{MemoryStore, TranscriptStore, VideoStore};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytingest.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytingest")
        .join("logs")
}

fn build_after_help() -> String {
    format!(
        "\nSUPPORTED URLS:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/v/ID\n  https://www.youtube.com/shorts/ID\n  <11-character video ID>\n\nConfig is read from: {}\nLogs are written to: {}",
        ytingest::config::config_path().display(),
        log_dir().join("ytingest.log").display()
    )
}

/// Bare 11-character IDs become watch URLs; everything else passes through
fn normalize_input(input: &str) -> String {
    let is_bare_id = input.len() == 11
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if is_bare_id {
        format!("https://www.youtube.com/watch?v={input}")
    } else {
        input.to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let mut config = ytingest::config::Config::load().unwrap_or_else(|e| {
        warn!("Ignoring unreadable config: {e}");
        Default::default()
    });

    // CLI flags take priority over config
    if let Some(ref lang) = cli.lang {
        config.preferred_language = lang.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.request_timeout_secs = timeout;
    }
    debug!("Effective config: {config:?}");

    if cli.verbose {
        let config_path = ytingest::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    let client = ytingest::youtube::build_client(&config)?;
    let scraper = Arc::new(ytingest::youtube::Scraper::new(client, &config));
    let store = Arc::new(MemoryStore::new());
    let service = ytingest::service::VideoService::new(store.clone(), store.clone(), scraper);

    // Collect URLs: from args or stdin
    let urls = if cli.urls.is_empty() {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    } else {
        cli.urls.clone()
    };

    if urls.iter().all(|u| u.trim().is_empty()) {
        bail!("no URL or video ID provided\n\nUsage: ytingest <URL>...\n       echo <URL> | ytingest");
    }

    let mut rendered = Vec::new();
    let mut rejected = Vec::new();

    for url_input in &urls {
        let url_input = url_input.trim();
        if url_input.is_empty() {
            continue;
        }

        let submission = match service.submit(&normalize_input(url_input), "cli").await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{url_input}: {e}");
                rejected.push(url_input.to_string());
                continue;
            }
        };

        if let Some(handle) = submission.handle {
            if handle.joined() {
                debug!("Joined in-flight processing: video_id={}", submission.video.id);
            }
            if let Completion::Aborted = handle.wait().await {
                warn!("Processing aborted: video_id={}", submission.video.id);
            }
        }

        let video = VideoStore::get_by_id(store.as_ref(), &submission.video.id).await?;
        let transcript = match (&video.transcript_id, cli.metadata_only) {
            (Some(id), false) => Some(TranscriptStore::get_by_id(store.as_ref(), id).await?),
            _ => None,
        };

        if cli.verbose {
            eprintln!("{}", output::render_header(&video));
            match &transcript {
                Some(t) => eprintln!("Language: {}\nSegments: {}", t.language, t.segments.len()),
                None if !cli.metadata_only => eprintln!("No transcript available"),
                None => {}
            }
        }

        let out = match cli.format {
            OutputFormat::Json => output::render_json(&Report {
                video: &video,
                transcript: transcript.as_ref(),
            })?,
            OutputFormat::Text if cli.metadata_only => output::render_header(&video),
            OutputFormat::Text => transcript.as_ref().map(output::render_text).unwrap_or_default(),
            OutputFormat::Srt => transcript.as_ref().map(output::render_srt).unwrap_or_default(),
        };
        rendered.push(out);
    }

    let rendered = rendered.join("\n");
    if let Some(ref path) = cli.output {
        std::fs::write(path, &rendered)?;
        if cli.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else if !rendered.is_empty() {
        println!("{rendered}");
    }

    if !rejected.is_empty() {
        bail!("could not resolve {} input(s): {}", rejected.len(), rejected.join(", "));
    }

    Ok(())
}
