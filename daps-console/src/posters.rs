//! Poster asset search.
//!
//! Asset file names look like `The Matrix (1999).jpg` or
//! `Andor (2022) - Season 1.png`. The index folds case and common accents,
//! ignores punctuation, and treats a four-digit year in the query as a filter.

use std::{fmt, sync::OnceLock};

use byte_unit::{Byte, UnitType};
use regex::Regex;

use crate::api::PosterStats;

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\d{4})\)").unwrap())
}

fn trailing_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)\s*\(?((?:19|20)\d{2})\)?\s*$").unwrap())
}

fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Lowercase, accent-folded, punctuation-free, single-spaced text.
pub fn normalize(s: &str) -> String {
    let folded: String = s
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_char)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterEntry {
    /// File name as stored on the server.
    pub file: String,
    pub title: String,
    pub year: Option<u16>,
    norm: String,
}

impl PosterEntry {
    pub fn parse(file: &str) -> Self {
        let stem = match file.rsplit_once('.') {
            Some((stem, ext)) if ext.len() <= 4 && !ext.contains(' ') => stem,
            _ => file,
        };
        let (title, year) = match year_re().captures(stem) {
            Some(c) => {
                let whole = c.get(0).map_or(0..0, |m| m.range());
                (stem[..whole.start].trim().to_string(), c[1].parse().ok())
            }
            None => (stem.trim().to_string(), None),
        };
        PosterEntry {
            file: file.to_string(),
            norm: normalize(&title),
            title,
            year,
        }
    }
}

impl fmt::Display for PosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(y) => write!(f, "{} ({y})", self.title),
            None => f.write_str(&self.title),
        }
    }
}

/// Parsed search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub year: Option<u16>,
}

impl Query {
    pub fn parse(q: &str) -> Self {
        if let Some(c) = trailing_year_re().captures(q.trim())
            && !c[1].trim().is_empty()
        {
            return Query {
                text: normalize(&c[1]),
                year: c[2].parse().ok(),
            };
        }
        Query {
            text: normalize(q),
            year: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct PosterIndex {
    entries: Vec<PosterEntry>,
}

impl PosterIndex {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = files
            .into_iter()
            .map(|f| PosterEntry::parse(f.as_ref()))
            .collect();
        PosterIndex { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best matches first: exact title, then prefix, then word matches.
    pub fn search(&self, q: &str, limit: usize) -> Vec<&PosterEntry> {
        let query = Query::parse(q);
        if query.text.is_empty() {
            return Vec::new();
        }
        let words: Vec<&str> = query.text.split(' ').collect();
        let mut hits: Vec<(u8, &PosterEntry)> = self
            .entries
            .iter()
            .filter(|e| query.year.is_none() || e.year == query.year)
            .filter_map(|e| {
                let rank = if e.norm == query.text {
                    0
                } else if e.norm.starts_with(&query.text) {
                    1
                } else if words.iter().all(|w| e.norm.contains(w)) {
                    2
                } else {
                    return None;
                };
                Some((rank, e))
            })
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.file.cmp(&b.1.file)));
        hits.into_iter().take(limit).map(|(_, e)| e).collect()
    }
}

/// Human-readable size, binary units.
pub fn format_size(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{adjusted:.1}")
}

/// One-line summary of a location's poster stats.
pub fn stats_summary(location: &str, stats: &PosterStats) -> String {
    format!(
        "{location}: {} files, {}",
        stats.file_count,
        format_size(stats.size_bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> PosterIndex {
        PosterIndex::new([
            "The Matrix (1999).jpg",
            "The Matrix Reloaded (2003).jpg",
            "Matrix (1993).png",
            "Amélie (2001).jpg",
            "Andor (2022) - Season 1.png",
            "Collection - Star Wars.jpg",
        ])
    }

    #[test]
    fn test_parse_entry() {
        let e = PosterEntry::parse("Andor (2022) - Season 1.png");
        assert_eq!(e.title, "Andor");
        assert_eq!(e.year, Some(2022));
        let e = PosterEntry::parse("Collection - Star Wars.jpg");
        assert_eq!(e.year, None);
        assert_eq!(e.to_string(), "Collection - Star Wars");
    }

    #[test]
    fn test_ranking() {
        let idx = index();
        let hits: Vec<&str> = idx
            .search("the matrix", 10)
            .iter()
            .map(|e| e.file.as_str())
            .collect();
        assert_eq!(hits, ["The Matrix (1999).jpg", "The Matrix Reloaded (2003).jpg"]);
    }

    #[test]
    fn test_year_filter() {
        let idx = index();
        let hits = idx.search("matrix 1993", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file, "Matrix (1993).png");
        let hits = idx.search("Matrix (2003)", 10);
        assert_eq!(hits[0].title, "The Matrix Reloaded");
    }

    #[test]
    fn test_accents_and_case() {
        let idx = index();
        assert_eq!(idx.search("AMELIE", 10).len(), 1);
        assert_eq!(idx.search("star-wars", 10).len(), 1);
        assert!(idx.search("   ", 10).is_empty());
    }

    #[test]
    fn test_limit() {
        assert_eq!(index().search("matrix", 2).len(), 2);
    }

    #[test]
    fn test_size() {
        assert!(format_size(2048).ends_with("KiB"));
        let s = stats_summary(
            "/posters",
            &PosterStats {
                file_count: 3,
                size_bytes: 3 * 1024 * 1024,
                files: vec![],
            },
        );
        assert!(s.starts_with("/posters: 3 files, "));
        assert!(s.ends_with("MiB"));
    }
}
