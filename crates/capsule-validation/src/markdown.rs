//! Minimal markdown scanning for tenant artifacts: headings, sections, ids.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static TASK_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bT-\d+\b").unwrap());

static JOB_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bjob:[A-Za-z0-9_-]+|\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
    )
    .unwrap()
});

/// Heading level and normalized title, if `line` is a heading.
fn heading(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 {
        return None;
    }
    let title = trimmed[level..]
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase();
    Some((level, title))
}

fn title_matches(title: &str, names: &[&str]) -> bool {
    names.iter().any(|n| title == *n || title.starts_with(&format!("{n} ")))
}

/// Whether any heading's title matches one of `names` (case-insensitive).
pub fn has_heading(content: &str, names: &[&str]) -> bool {
    content
        .lines()
        .filter_map(heading)
        .any(|(_, title)| title_matches(&title, names))
}

/// Body of the first section whose heading matches one of `names`, up to the
/// next heading of the same or a higher level.
pub fn section<'a>(content: &'a str, names: &[&str]) -> Option<&'a str> {
    let mut start: Option<(usize, usize)> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        match (start, heading(line)) {
            (None, Some((level, title))) if title_matches(&title, names) => {
                start = Some((level, offset));
            }
            (Some((level, body_start)), Some((next_level, _))) if next_level <= level => {
                return Some(&content[body_start..line_start]);
            }
            _ => {}
        }
    }
    start.map(|(_, body_start)| &content[body_start..])
}

/// Whether a section body has any real content.
pub fn has_content(body: &str) -> bool {
    body.lines().any(|line| {
        let text = line.trim().trim_start_matches(['-', '*', '+']).trim();
        let text = text.trim_start_matches("[ ]").trim_start_matches("[x]").trim();
        text.chars().any(char::is_alphanumeric)
    })
}

/// Task identifiers (`T-<n>`) mentioned in `text`.
pub fn task_ids(text: &str) -> BTreeSet<String> {
    TASK_ID_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Scheduled job identifiers (`job:<name>` or UUIDs) mentioned in `text`.
pub fn job_ids(text: &str) -> BTreeSet<String> {
    JOB_ID_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
