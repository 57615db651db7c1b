//! CLI parsing and orchestration. Builds the provider from config and flags, runs one
//! subcommand, and maps errors to exit codes.

use crate::config;
use crate::formats::{
    render_chapter, render_dump, render_novel, render_search, write_output, FormatError,
    OutputFormat, RenderedChapter,
};
use crate::model::{ChapterRef, NovelDetail};
use crate::provider::{NovelProvider, PoliteClient, ProviderError, SkyNovelsProvider};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    NoContent(String),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Provider(_) | CliRunError::NoContent(_) => 2,
            CliRunError::Format(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "skynovels")]
#[command(about = "Search SkyNovels, show novel details, and extract chapter text")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, request_delay_secs, timeout_secs, main_url, api_base, chapter_endpoints, content_selectors) are read from ./skynovels.toml or the user config dir. CLI flags override config. Set RUST_LOG for finer log control."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format: text, json, markdown, or html.
    #[arg(long, global = true, default_value = "text", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Write output to this file instead of stdout (dump: default ./{slug}.{ext}).
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Suppress progress output (errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug logging and the full error chain on failure.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 0).
    #[arg(long, global = true)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Search novels by title.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Show a novel's details and chapter list, e.g. https://www.skynovels.net/novelas/123/slug
    Load { url: String },
    /// Print one chapter's content.
    Chapter { url: String },
    /// Fetch a novel and its chapters into a single document.
    Dump {
        url: String,
        /// Only chapters whose order is in this range (inclusive), e.g. 1-10.
        #[arg(long, value_parser = parse_chapter_range)]
        chapters: Option<(u32, u32)>,
    },
}

fn parse_chapter_range(s: &str) -> Result<(u32, u32), String> {
    let s = s.trim();
    let (from_str, to_str) = s.split_once('-').ok_or_else(|| {
        format!(
            "Invalid --chapters: expected 'from-to' (e.g. 1-10), got '{}'",
            s
        )
    })?;
    let from_str = from_str.trim();
    let to_str = to_str.trim();
    let from: u32 = from_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid start chapter number",
            from_str
        )
    })?;
    let to: u32 = to_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid end chapter number",
            to_str
        )
    })?;
    if from > to {
        return Err(format!(
            "Invalid --chapters: start ({}) must be <= end ({})",
            from, to
        ));
    }
    Ok((from, to))
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_lowercase().as_str() {
        "json" => Ok(OutputFormat::Json),
        "text" | "txt" => Ok(OutputFormat::Text),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        "html" => Ok(OutputFormat::Html),
        _ => Err(format!(
            "Invalid --format value: '{}'. Use text, json, markdown, or html.",
            s
        )),
    }
}

fn extension_for_format(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json => "json",
        OutputFormat::Text => "txt",
        OutputFormat::Markdown => "md",
        OutputFormat::Html => "html",
    }
}

/// Sanitize a title or slug to a safe filename: lowercase, replace spaces/special with `-`.
fn sanitize_title(title: &str) -> String {
    let mut s = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    while s.contains("--") {
        s = s.replace("--", "-");
    }
    s = s.trim_matches('-').to_string();
    if s.is_empty() {
        s = "novel".to_string();
    }
    s
}

fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Chapters whose order falls in `range` (all when None), in list order.
fn select_chapters(chapters: &[ChapterRef], range: Option<(u32, u32)>) -> Vec<ChapterRef> {
    chapters
        .iter()
        .filter(|c| range.map_or(true, |(from, to)| c.order >= from && c.order <= to))
        .cloned()
        .collect()
}

/// Print to stdout, or write to `output` when given.
fn emit(output: Option<&Path>, contents: &str, quiet: bool) -> Result<(), CliRunError> {
    match output {
        Some(path) => {
            validate_output_path(path)?;
            write_output(path, contents)?;
            if !quiet {
                eprintln!("Wrote {}", path.display());
            }
        }
        None => print!("{}", contents),
    }
    Ok(())
}

fn require_novel<P: NovelProvider>(provider: &P, url: &str) -> Result<NovelDetail, CliRunError> {
    provider.load(url)?.ok_or_else(|| {
        CliRunError::InvalidInput(format!(
            "No novel found at {}. Expected a URL like https://www.skynovels.net/novelas/123/slug",
            url
        ))
    })
}

fn dump<P: NovelProvider>(
    provider: &P,
    args: &Args,
    url: &str,
    range: Option<(u32, u32)>,
    output_dir: &Path,
) -> Result<(), CliRunError> {
    let detail = require_novel(provider, url)?;
    let selected = select_chapters(&detail.chapters, range);
    if selected.is_empty() {
        return Err(CliRunError::NoContent(format!(
            "No chapters to fetch for {} ({} listed).",
            detail.name,
            detail.chapters.len()
        )));
    }

    let output_path = match &args.output {
        Some(p) => p.clone(),
        None => {
            let base = sanitize_title(detail.slug.as_deref().unwrap_or(&detail.name));
            output_dir.join(format!("{}.{}", base, extension_for_format(args.format)))
        }
    };
    validate_output_path(&output_path)?;

    let progress = if args.quiet {
        indicatif::ProgressBar::hidden()
    } else {
        let bar = indicatif::ProgressBar::new(selected.len() as u64);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
        {
            bar.set_style(
                style
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
        }
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    };

    let total = selected.len();
    let mut rendered = Vec::with_capacity(total);
    let mut missing = 0usize;
    for (n, chapter) in selected.into_iter().enumerate() {
        progress.set_message(format!("Fetching chapter {}/{}", n + 1, total));
        let body = match provider.load_html(&chapter.url) {
            Ok(body) => body,
            Err(e) => {
                progress.suspend(|| {
                    tracing::warn!(chapter = %chapter.name, url = %chapter.url, error = %e, "fetch failed")
                });
                None
            }
        };
        if body.is_none() {
            missing += 1;
            progress.suspend(|| {
                tracing::warn!(chapter = %chapter.name, url = %chapter.url, "no content; using placeholder")
            });
        }
        rendered.push(RenderedChapter { chapter, body });
        progress.inc(1);
    }
    progress.finish_and_clear();

    let contents = render_dump(&detail, &rendered, args.format)?;
    write_output(&output_path, &contents)?;
    if !args.quiet {
        if missing > 0 {
            eprintln!("{} of {} chapters had no content.", missing, total);
        }
        eprintln!("Wrote {}", output_path.display());
    }
    Ok(())
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;

    const DEFAULT_DELAY_SECS: u64 = 0;
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    let delay_secs = args
        .delay
        .or_else(|| config.as_ref().and_then(|c| c.request_delay_secs))
        .unwrap_or(DEFAULT_DELAY_SECS);
    let timeout_secs = args
        .timeout
        .or_else(|| config.as_ref().and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.user_agent.clone()));
    let output_dir: PathBuf = config
        .as_ref()
        .and_then(|c| c.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let settings = config
        .as_ref()
        .map(|c| c.provider_settings())
        .unwrap_or_default();

    let mut builder = PoliteClient::builder()
        .delay_secs(delay_secs)
        .timeout_secs(timeout_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;
    let provider = SkyNovelsProvider::with_settings(client, settings);

    let output = args.output.as_deref();
    match &args.command {
        Command::Search { query } => {
            let query = query.join(" ");
            let results = provider.search(&query)?;
            if results.is_empty() && !args.quiet {
                eprintln!("No results for '{}'.", query);
            }
            emit(output, &render_search(&results, args.format)?, args.quiet)
        }
        Command::Load { url } => {
            let detail = require_novel(&provider, url)?;
            emit(output, &render_novel(&detail, args.format)?, args.quiet)
        }
        Command::Chapter { url } => {
            let html = provider.load_html(url)?.ok_or_else(|| {
                CliRunError::NoContent(format!(
                    "No server-rendered chapter content at {}.",
                    url
                ))
            })?;
            emit(output, &render_chapter(url, &html, args.format)?, args.quiet)
        }
        Command::Dump { url, chapters } => dump(&provider, args, url, *chapters, &output_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(order: u32) -> ChapterRef {
        ChapterRef {
            name: format!("Capítulo {}", order),
            url: format!("https://www.skynovels.net/novelas/1/x/{}/c", order),
            date_of_release: None,
            order,
        }
    }

    #[test]
    fn sanitize_title_cases() {
        assert_eq!(sanitize_title(""), "novel");
        assert_eq!(sanitize_title("La Torre!"), "la-torre");
        assert_eq!(sanitize_title("  --  a  --  b  --  "), "a-b");
        assert_eq!(sanitize_title("la-torre-del-mago"), "la-torre-del-mago");
    }

    #[test]
    fn parse_chapter_range_valid() {
        assert_eq!(parse_chapter_range("1-10").unwrap(), (1, 10));
        assert_eq!(parse_chapter_range("  3 - 7  ").unwrap(), (3, 7));
    }

    #[test]
    fn parse_chapter_range_rejects_bad_input() {
        assert!(parse_chapter_range("1").is_err());
        assert!(parse_chapter_range("a-b").is_err());
        assert!(parse_chapter_range("10-1").is_err());
    }

    #[test]
    fn parse_format_all() {
        assert_eq!(parse_format("json").unwrap(), OutputFormat::Json);
        assert_eq!(parse_format("TXT").unwrap(), OutputFormat::Text);
        assert_eq!(parse_format("md").unwrap(), OutputFormat::Markdown);
        assert_eq!(parse_format("html").unwrap(), OutputFormat::Html);
        assert!(parse_format("epub").is_err());
    }

    #[test]
    fn extension_for_format_each() {
        assert_eq!(extension_for_format(OutputFormat::Json), "json");
        assert_eq!(extension_for_format(OutputFormat::Text), "txt");
        assert_eq!(extension_for_format(OutputFormat::Markdown), "md");
        assert_eq!(extension_for_format(OutputFormat::Html), "html");
    }

    #[test]
    fn select_chapters_filters_by_order() {
        let chapters = vec![chapter(1), chapter(2), chapter(3), chapter(10)];
        let picked: Vec<u32> = select_chapters(&chapters, Some((2, 3)))
            .iter()
            .map(|c| c.order)
            .collect();
        assert_eq!(picked, vec![2, 3]);
        assert_eq!(select_chapters(&chapters, None).len(), 4);
    }

    #[test]
    fn args_parse_subcommands_and_global_flags() {
        let args = Args::try_parse_from([
            "skynovels", "search", "la", "torre", "--format", "json",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Search {
                query: vec!["la".to_string(), "torre".to_string()]
            }
        );
        assert_eq!(args.format, OutputFormat::Json);

        let args = Args::try_parse_from([
            "skynovels",
            "-q",
            "dump",
            "https://www.skynovels.net/novelas/1/x",
            "--chapters",
            "1-5",
        ])
        .unwrap();
        assert!(args.quiet);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(
            args.command,
            Command::Dump {
                url: "https://www.skynovels.net/novelas/1/x".to_string(),
                chapters: Some((1, 5)),
            }
        );
    }

    #[test]
    fn args_search_requires_query() {
        assert!(Args::try_parse_from(["skynovels", "search"]).is_err());
    }

    #[test]
    fn validate_output_path_parent_missing() {
        let path = PathBuf::from("/nonexistent_dir_skynovels_xyz/output.txt");
        match validate_output_path(&path) {
            Err(CliRunError::InvalidInput(msg)) => {
                assert!(msg.contains("parent directory does not exist"))
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        assert!(validate_output_path(&std::env::temp_dir().join("skynovels.txt")).is_ok());
    }

    /// Serves one novel; chapter pages come from a fixed table, failing for unknown URLs.
    struct StubProvider {
        detail: NovelDetail,
        pages: Vec<(String, Option<String>)>,
    }

    impl NovelProvider for StubProvider {
        fn name(&self) -> &str {
            "Stub"
        }
        fn main_url(&self) -> &str {
            "https://stub.example"
        }
        fn lang(&self) -> &str {
            "es"
        }
        fn search(&self, _query: &str) -> Result<Vec<crate::model::SearchResult>, ProviderError> {
            Ok(Vec::new())
        }
        fn load(&self, _url: &str) -> Result<Option<NovelDetail>, ProviderError> {
            Ok(Some(self.detail.clone()))
        }
        fn load_html(&self, url: &str) -> Result<Option<String>, ProviderError> {
            self.pages
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, body)| body.clone())
                .ok_or_else(|| ProviderError::HttpStatus {
                    status: 503,
                    url: url.to_string(),
                    context: None,
                })
        }
    }

    #[test]
    fn dump_keeps_going_when_a_chapter_fails() -> Result<(), Box<dyn std::error::Error>> {
        let provider = StubProvider {
            detail: NovelDetail {
                id: 1,
                name: "La Torre".to_string(),
                slug: Some("la-torre".to_string()),
                url: "https://www.skynovels.net/novelas/1/la-torre".to_string(),
                author: None,
                poster_url: None,
                synopsis: None,
                status: crate::model::NovelStatus::Unknown,
                status_label: None,
                tags: Vec::new(),
                rating: 0,
                chapters: vec![chapter(1), chapter(2), chapter(3)],
            },
            pages: vec![
                (chapter(1).url, Some("<p>Primero</p>".to_string())),
                (chapter(3).url, None),
            ],
        };
        let path = std::env::temp_dir().join("skynovels_test_dump.txt");
        let path_arg = path.to_string_lossy().to_string();
        let args = Args::try_parse_from([
            "skynovels",
            "-q",
            "-o",
            path_arg.as_str(),
            "dump",
            "https://www.skynovels.net/novelas/1/la-torre",
        ])?;
        dump(&provider, &args, &provider.detail.url, None, Path::new("."))?;
        let out = std::fs::read_to_string(&path)?;
        std::fs::remove_file(&path).ok();
        assert!(out.contains("Primero"));
        assert!(out.contains("--- Chapter 2: Capítulo 2 ---"));
        assert!(out.contains("--- Chapter 3: Capítulo 3 ---"));
        assert_eq!(out.matches("No server-rendered content").count(), 2);
        Ok(())
    }

    #[test]
    fn provider_error_is_transparent() {
        use std::error::Error;
        let err = CliRunError::Provider(ProviderError::InvalidSelector {
            selector: "[".into(),
            reason: "x".into(),
        });
        assert_eq!(err.to_string(), "Invalid selector \"[\": x");
        assert!(err.source().is_none());
    }

    #[test]
    fn cli_run_error_exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliRunError::Provider(ProviderError::InvalidSelector {
                selector: "[".into(),
                reason: "x".into()
            })
            .exit_code(),
            2
        );
        assert_eq!(CliRunError::NoContent("x".into()).exit_code(), 2);
        assert_eq!(CliRunError::Format(FormatError::EmptyTitle).exit_code(), 3);
    }
}
