//! Extraction of the difficulty rating from a companion page.
//!
//! The page is searched in a fixed order, most specific first:
//!
//! 1. `<strong>`/`<b>` elements
//! 2. `<p>` elements
//! 3. the whole document text
//! 4. any paragraph sentence with "out of" and two numbers
//!
//! Steps 1 to 3 try every rating pattern against each text before moving on
//! to the next text.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use time::Date;
use tracing::{debug, info};

use connscore_types::{DEFAULT_MAX_SCORE, Record, format_date};

use crate::error::{Error, Result};

static RATING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)today's difficulty is (\d+(?:\.\d+)?) out of (\d+)",
        r"(?i)difficulty is (\d+(?:\.\d+)?) out of (\d+)",
        r"(?i)difficulty rating of (\d+(?:\.\d+)?) out of (\d+)",
        r"(?i)difficulty.*?(\d+(?:\.\d+)?).*?out of (\d+)",
        r"(\d+(?:\.\d+)?) out of 5\.",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("rating pattern is valid"))
    .collect()
});

static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:strong|b)\b[^>]*>(.*?)</(?:strong|b)\s*>").expect("emphasis regex")
});
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").expect("paragraph regex"));
static NON_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(?:script|style|noscript)\s*>|<!--.*?-->")
        .expect("non-text regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("space regex"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence regex"));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number regex"));

/// Turn `raw` into a validated record for `date`.
///
/// Fails with [`Error::Extraction`] when no rating is found and with
/// [`Error::Record`] when the rating found is out of range.
pub fn extract(raw: &str, date: Date) -> Result<Record> {
    if raw.trim().is_empty() {
        return Err(Error::Extraction {
            date,
            reason: "empty page".to_string(),
        });
    }

    let (rating, max_score) = find_rating(raw).ok_or_else(|| Error::Extraction {
        date,
        reason: if mentions_difficulty(raw) {
            "page mentions difficulty but no rating pattern matched".to_string()
        } else {
            "no rating pattern matched".to_string()
        },
    })?;

    Ok(Record::new(date, rating, max_score)?)
}

/// Search `raw` for a rating, returning `(rating, max_score)`.
pub fn find_rating(raw: &str) -> Option<(f64, u8)> {
    let emphasis = element_texts(&EMPHASIS, raw);
    if let Some(found) = search_texts(&emphasis, "emphasis") {
        return Some(found);
    }

    let paragraphs = element_texts(&PARAGRAPH, raw);
    if let Some(found) = search_texts(&paragraphs, "paragraph") {
        return Some(found);
    }

    let document = to_text(&NON_TEXT.replace_all(raw, " "));
    if let Some(found) = search_texts(std::slice::from_ref(&document), "document") {
        return Some(found);
    }

    search_sentences(&paragraphs)
}

/// Write `raw` to `debug_<date>.html` in `dir` for offline inspection.
pub fn save_debug_html(dir: &Path, date: Date, raw: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("debug_{}.html", format_date(date)));
    std::fs::write(&path, raw)?;
    info!("Saved page content to {}", path.display());
    Ok(path)
}

fn element_texts(element: &Regex, raw: &str) -> Vec<String> {
    element
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| to_text(m.as_str()))
        .filter(|t| !t.is_empty())
        .collect()
}

fn search_texts(texts: &[String], location: &str) -> Option<(f64, u8)> {
    for text in texts {
        for pattern in RATING_PATTERNS.iter() {
            let Some(captures) = pattern.captures(text) else {
                continue;
            };
            if let Some(found) = parse_captures(&captures) {
                info!("Found difficulty in {}: {}", location, &captures[0]);
                return Some(found);
            }
        }
    }
    None
}

fn search_sentences(paragraphs: &[String]) -> Option<(f64, u8)> {
    for paragraph in paragraphs {
        for sentence in SENTENCE_END.split(paragraph) {
            if !sentence.contains("out of") {
                continue;
            }
            let numbers: Vec<&str> = NUMBER.find_iter(sentence).map(|m| m.as_str()).collect();
            if numbers.len() < 2 {
                continue;
            }
            let rating = numbers[0].parse::<f64>().ok();
            let max_score = numbers[1]
                .parse::<f64>()
                .ok()
                .filter(|m| (1.0..=f64::from(u8::MAX)).contains(m))
                .map(|m| m.trunc() as u8);
            if let (Some(rating), Some(max_score)) = (rating, max_score) {
                info!("Found potential difficulty sentence: {}", sentence);
                return Some((rating, max_score));
            }
        }
    }
    None
}

fn parse_captures(captures: &Captures<'_>) -> Option<(f64, u8)> {
    let rating = captures.get(1)?.as_str().parse().ok()?;
    let max_score = match captures.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => DEFAULT_MAX_SCORE,
    };
    Some((rating, max_score))
}

fn mentions_difficulty(raw: &str) -> bool {
    let mut found = false;
    for paragraph in element_texts(&PARAGRAPH, raw) {
        if paragraph.to_lowercase().contains("difficulty") {
            debug!("Paragraph mentioning difficulty: {}", paragraph);
            found = true;
        }
    }
    found
}

/// Strip markup and decode the entities that show up around ratings.
fn to_text(html: &str) -> String {
    let stripped = TAG.replace_all(html, " ");
    let decoded = stripped
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace(['\u{2019}', '\u{2018}'], "'")
        .replace("&nbsp;", " ")
        .replace('\u{a0}', " ")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}
