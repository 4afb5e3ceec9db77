use std::sync::OnceLock;

use regex::{Captures, Regex};

/// `"{authors}. {title}. {journal}. {year};{month}."`, or empty when no
/// author is known.
pub fn format_cite(authors: &str, title: &str, journal: &str, year: &str, month: &str) -> String {
    if authors.trim().is_empty() {
        return String::new();
    }
    format!("{authors}. {title}. {journal}. {year};{month}.")
}

/// `YYYY-MM` when both parts are known, `YYYY` with only a year, else empty.
pub fn format_pub_date(year: &str, month: &str) -> String {
    let year = year.trim();
    if year.is_empty() {
        return String::new();
    }
    let month = normalize_month(month);
    if month.is_empty() {
        year.to_string()
    } else {
        format!("{year}-{month}")
    }
}

/// Two-digit month for numeric or English (abbreviated) month names.
/// Anything unrecognised is returned trimmed.
pub fn normalize_month(month: &str) -> String {
    let month = month.trim();
    if month.is_empty() {
        return String::new();
    }
    if month.chars().all(|ch| ch.is_ascii_digit()) {
        return format!("{month:0>2}");
    }
    const NAMES: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = month.to_lowercase();
    NAMES
        .iter()
        .position(|name| lower.starts_with(name))
        .map(|idx| format!("{:02}", idx + 1))
        .unwrap_or_else(|| month.to_string())
}

pub fn join_authors<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Removes JATS markup (`<jats:p>`, `<jats:title>`, ...) from Crossref abstracts.
/// Block tags become word breaks; inline formatting tags vanish.
pub fn strip_jats(text: &str) -> String {
    static JATS: OnceLock<Regex> = OnceLock::new();
    let re = JATS.get_or_init(|| {
        Regex::new(r"</?jats:([A-Za-z-]+)[^>]*>").expect("valid JATS regex")
    });
    re.replace_all(text, |caps: &Captures| match &caps[1] {
        "italic" | "bold" | "sub" | "sup" | "sc" | "underline" | "monospace" => "",
        _ => " ",
    })
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

pub fn doi_link(doi: &str) -> String {
    format!("https://doi.org/{doi}")
}
