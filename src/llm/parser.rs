//! Pulls a SQL statement and an explanation out of free-form generator text.
//!
//! The model is asked for `SQL: ...` / `EXPLANATION: ...` but answers in many
//! shapes. Extractors are tried in a fixed order and the first one that
//! yields non-empty SQL wins; within one extractor, matches are taken in
//! text order.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, error};

use crate::llm::models::GeneratedQuery;

pub const DEFAULT_EXPLANATION: &str = "This query will retrieve data from the database.";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Could not extract SQL from AI response")]
pub struct ParseError;

pub trait SqlExtractor: Sync {
    fn name(&self) -> &'static str;

    /// Raw captures in text order, before fence/backtick cleanup.
    fn captures<'t>(&self, text: &'t str) -> Vec<&'t str>;
}

static LABELLED_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)SQL:\s*```sql\s*(.*?)\s*```").unwrap());
static LABELLED_BACKTICK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SQL:\s*`([^`]+)`").unwrap());
static LABELLED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SQL:\s*([^\n]+)").unwrap());
static BARE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```sql\s*(.*?)\s*```").unwrap());

static FENCE_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^```sql\n?").unwrap());
static FENCE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n?```$").unwrap());
static EXPLANATION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)EXPLANATION:\s*").unwrap());

fn groups<'t>(regex: &Regex, text: &'t str) -> Vec<&'t str> {
    regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// `SQL:` followed by a ```sql fenced block.
pub struct LabelledFence;
/// `SQL:` followed by a single back-quoted span.
pub struct LabelledBacktick;
/// `SQL:` followed by the rest of its line.
pub struct LabelledLine;
/// A ```sql fenced block anywhere, no label.
pub struct BareFence;

impl SqlExtractor for LabelledFence {
    fn name(&self) -> &'static str {
        "labelled fenced block"
    }

    fn captures<'t>(&self, text: &'t str) -> Vec<&'t str> {
        groups(&LABELLED_FENCE, text)
    }
}

impl SqlExtractor for LabelledBacktick {
    fn name(&self) -> &'static str {
        "labelled backticks"
    }

    fn captures<'t>(&self, text: &'t str) -> Vec<&'t str> {
        groups(&LABELLED_BACKTICK, text)
    }
}

impl SqlExtractor for LabelledLine {
    fn name(&self) -> &'static str {
        "labelled line"
    }

    fn captures<'t>(&self, text: &'t str) -> Vec<&'t str> {
        groups(&LABELLED_LINE, text)
    }
}

impl SqlExtractor for BareFence {
    fn name(&self) -> &'static str {
        "bare fenced block"
    }

    fn captures<'t>(&self, text: &'t str) -> Vec<&'t str> {
        groups(&BARE_FENCE, text)
    }
}

pub static EXTRACTORS: [&dyn SqlExtractor; 4] =
    [&LabelledFence, &LabelledBacktick, &LabelledLine, &BareFence];

/// Strips leftover fence markers and wrapping backticks.
fn clean_sql(raw: &str) -> String {
    let sql = FENCE_OPEN.replace(raw.trim(), "");
    let sql = FENCE_CLOSE.replace(&sql, "");
    let sql = sql.strip_prefix('`').unwrap_or(&sql);
    let sql = sql.strip_suffix('`').unwrap_or(sql);
    sql.trim().to_string()
}

pub fn extract_sql(text: &str) -> Option<String> {
    EXTRACTORS.iter().find_map(|extractor| {
        let sql = extractor
            .captures(text)
            .into_iter()
            .map(clean_sql)
            .find(|sql| !sql.is_empty())?;
        debug!("Extracted SQL using {}", extractor.name());
        Some(sql)
    })
}

/// Text after `EXPLANATION:` up to a blank line, a line starting with `SQL:`,
/// or the end of the text.
pub fn extract_explanation(text: &str) -> Option<String> {
    let label = EXPLANATION_LABEL.find(text)?;
    let mut lines = text[label.end()..].split('\n');

    let mut collected = vec![lines.next().filter(|line| !line.is_empty())?];
    for line in lines {
        if line.is_empty() || line.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("SQL:")) {
            break;
        }
        collected.push(line);
    }

    let explanation = collected.join("\n").trim().to_string();
    (!explanation.is_empty()).then_some(explanation)
}

pub fn parse_response(text: &str) -> Result<GeneratedQuery, ParseError> {
    debug!("AI response: {}", text);

    let Some(sql) = extract_sql(text) else {
        error!("Could not extract SQL from response");
        return Err(ParseError);
    };

    let explanation = extract_explanation(text).unwrap_or_else(|| DEFAULT_EXPLANATION.to_string());

    Ok(GeneratedQuery {
        sql: Some(sql),
        explanation,
        is_fallback: false,
    })
}
