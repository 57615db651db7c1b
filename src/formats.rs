//! Output formats for the CLI: JSON, plain text, Markdown, and HTML.
//! Renders search results, novel details, single chapters, and whole dumps.

use crate::model::{ChapterRef, NovelDetail, SearchResult};
use scraper::Html;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

/// Output format selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
    Markdown,
    Html,
}

/// Errors from the format writers.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Cannot write: novel title is empty.")]
    EmptyTitle,

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to format output: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("Failed to write output: {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One chapter of a dump: the list entry plus its extracted HTML, if any was found.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedChapter {
    #[serde(flatten)]
    pub chapter: ChapterRef,
    pub body: Option<String>,
}

const MISSING_BODY_HTML: &str = "<p>No server-rendered content was available for this chapter.</p>";

pub(crate) fn html_escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Strip HTML from chapter body to plain text, one line per paragraph.
pub(crate) fn body_to_plain_text(body: &str) -> String {
    let fragment = Html::parse_fragment(body);
    let root = fragment.root_element();
    let lines: Vec<String> = root
        .children()
        .filter_map(scraper::ElementRef::wrap)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if lines.is_empty() {
        root.text().collect::<String>().trim().to_string()
    } else {
        lines.join("\n\n")
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Render search results.
pub fn render_search(results: &[SearchResult], format: OutputFormat) -> Result<String, FormatError> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => return to_json(results),
        OutputFormat::Text => {
            for r in results {
                writeln!(out, "{}", r.name)?;
                writeln!(out, "  {}", r.url)?;
                write!(out, "  rating {}/1000", r.rating)?;
                if let Some(ref latest) = r.latest_chapter {
                    write!(out, " | {}", latest)?;
                }
                writeln!(out)?;
            }
        }
        OutputFormat::Markdown => {
            for r in results {
                write!(out, "- [{}]({}) - rating {}/1000", r.name, r.url, r.rating)?;
                if let Some(ref latest) = r.latest_chapter {
                    write!(out, ", {}", latest)?;
                }
                writeln!(out)?;
            }
        }
        OutputFormat::Html => {
            writeln!(out, "<ul>")?;
            for r in results {
                writeln!(
                    out,
                    r#"  <li><a href="{}">{}</a> <span class="rating">{}</span></li>"#,
                    html_escape_attr(&r.url),
                    html_escape_attr(&r.name),
                    r.rating
                )?;
            }
            writeln!(out, "</ul>")?;
        }
    }
    Ok(out)
}

/// Render a novel's metadata and chapter list.
pub fn render_novel(detail: &NovelDetail, format: OutputFormat) -> Result<String, FormatError> {
    if format == OutputFormat::Json {
        return to_json(detail);
    }
    let mut out = String::new();
    write_header(&mut out, detail, format)?;
    match format {
        OutputFormat::Html => {
            writeln!(out, "<ol>")?;
            for ch in &detail.chapters {
                writeln!(
                    out,
                    r#"  <li value="{}"><a href="{}">{}</a></li>"#,
                    ch.order,
                    html_escape_attr(&ch.url),
                    html_escape_attr(&ch.name)
                )?;
            }
            writeln!(out, "</ol>")?;
        }
        OutputFormat::Markdown => {
            writeln!(out, "## Chapters")?;
            writeln!(out)?;
            for ch in &detail.chapters {
                writeln!(out, "{}. [{}]({})", ch.order, ch.name, ch.url)?;
            }
        }
        _ => {
            writeln!(out, "Chapters ({}):", detail.chapters.len())?;
            for ch in &detail.chapters {
                write!(out, "  {:>4}  {}", ch.order, ch.name)?;
                if let Some(ref date) = ch.date_of_release {
                    write!(out, "  [{}]", date)?;
                }
                writeln!(out)?;
                writeln!(out, "        {}", ch.url)?;
            }
        }
    }
    Ok(out)
}

fn write_header(out: &mut String, detail: &NovelDetail, format: OutputFormat) -> Result<(), FormatError> {
    let author = detail.author.as_deref().unwrap_or("unknown");
    match format {
        OutputFormat::Html => {
            writeln!(out, "<header>")?;
            writeln!(out, "  <h1>{}</h1>", html_escape_attr(&detail.name))?;
            writeln!(out, r#"  <p class="author">{}</p>"#, html_escape_attr(author))?;
            if let Some(ref poster) = detail.poster_url {
                writeln!(out, r#"  <img src="{}" alt=""/>"#, html_escape_attr(poster))?;
            }
            if let Some(ref synopsis) = detail.synopsis {
                for para in synopsis.split("\n\n") {
                    writeln!(out, r#"  <p class="synopsis">{}</p>"#, html_escape_attr(para))?;
                }
            }
            writeln!(out, "</header>")?;
        }
        OutputFormat::Markdown => {
            writeln!(out, "# {}", detail.name)?;
            writeln!(out)?;
            writeln!(out, "By {}", author)?;
            writeln!(out)?;
            writeln!(
                out,
                "Status: {} | Rating: {}/1000",
                detail.status.as_str(),
                detail.rating
            )?;
            if !detail.tags.is_empty() {
                writeln!(out, "Tags: {}", detail.tags.join(", "))?;
            }
            writeln!(out)?;
            if let Some(ref synopsis) = detail.synopsis {
                writeln!(out, "{}", synopsis)?;
                writeln!(out)?;
            }
        }
        _ => {
            writeln!(out, "{}", detail.name)?;
            writeln!(out, "By {}", author)?;
            writeln!(out, "{}", detail.url)?;
            writeln!(
                out,
                "Status: {} ({})",
                detail.status.as_str(),
                detail.status_label.as_deref().unwrap_or("-")
            )?;
            writeln!(out, "Rating: {}/1000", detail.rating)?;
            if !detail.tags.is_empty() {
                writeln!(out, "Tags: {}", detail.tags.join(", "))?;
            }
            writeln!(out)?;
            if let Some(ref synopsis) = detail.synopsis {
                writeln!(out, "{}", synopsis)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

/// Render one chapter's extracted HTML.
pub fn render_chapter(url: &str, html: &str, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ChapterOut<'a> {
                url: &'a str,
                html: &'a str,
            }
            to_json(&ChapterOut { url, html })
        }
        OutputFormat::Html => Ok(format!("{}\n", html)),
        OutputFormat::Markdown => Ok(format!("{}\n", html2md::parse_html(html).trim())),
        OutputFormat::Text => Ok(format!("{}\n", body_to_plain_text(html))),
    }
}

/// Render a whole dump: header, then each chapter with its body (or a placeholder).
pub fn render_dump(
    detail: &NovelDetail,
    chapters: &[RenderedChapter],
    format: OutputFormat,
) -> Result<String, FormatError> {
    if detail.name.trim().is_empty() {
        return Err(FormatError::EmptyTitle);
    }
    if format == OutputFormat::Json {
        #[derive(Serialize)]
        struct DumpOut<'a> {
            novel: &'a NovelDetail,
            chapters: &'a [RenderedChapter],
        }
        return to_json(&DumpOut {
            novel: detail,
            chapters,
        });
    }

    let mut out = String::new();
    if format == OutputFormat::Html {
        writeln!(out, r#"<!DOCTYPE html>"#)?;
        writeln!(out, r#"<html lang="es">"#)?;
        writeln!(out, r#"<head>"#)?;
        writeln!(out, r#"  <meta charset="UTF-8"/>"#)?;
        writeln!(out, r#"  <title>{}</title>"#, html_escape_attr(&detail.name))?;
        writeln!(out, r#"</head>"#)?;
        writeln!(out, r#"<body>"#)?;
    }
    write_header(&mut out, detail, format)?;

    for rc in chapters {
        let body = rc.body.as_deref().unwrap_or(MISSING_BODY_HTML);
        match format {
            OutputFormat::Html => {
                writeln!(out, r#"  <section class="chapter">"#)?;
                writeln!(out, "    <h2>{}</h2>", html_escape_attr(&rc.chapter.name))?;
                writeln!(out, r#"    <div class="chapter-body">"#)?;
                writeln!(out, "{}", body)?;
                writeln!(out, r#"    </div>"#)?;
                writeln!(out, r#"  </section>"#)?;
            }
            OutputFormat::Markdown => {
                writeln!(out, "## {}", rc.chapter.name)?;
                writeln!(out)?;
                writeln!(out, "{}", html2md::parse_html(body).trim())?;
                writeln!(out)?;
            }
            _ => {
                writeln!(out)?;
                writeln!(out, "--- Chapter {}: {} ---", rc.chapter.order, rc.chapter.name)?;
                writeln!(out)?;
                writeln!(out, "{}", body_to_plain_text(body))?;
            }
        }
    }

    if format == OutputFormat::Html {
        writeln!(out, r#"</body>"#)?;
        writeln!(out, r#"</html>"#)?;
    }
    Ok(out)
}

/// Write rendered output to `path`.
pub fn write_output(path: &Path, contents: &str) -> Result<(), FormatError> {
    std::fs::write(path, contents).map_err(|e| FormatError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
