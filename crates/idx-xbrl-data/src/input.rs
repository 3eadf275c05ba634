//! Ticker list loading.
//!
//! The input is a header-less CSV of `ticker,url` rows. Lines starting with
//! `#` are comments. Unusable rows are skipped with a warning rather than
//! failing the whole file.

use crate::error::Result;
use crate::model::TickerEntry;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

/// Longest directory name accepted as a ticker in the file-name fallback.
const MAX_TICKER_LEN: usize = 5;

/// Rows read from an input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedEntries {
    /// Usable entries, in file order
    pub entries: Vec<TickerEntry>,
    /// Rows that were skipped
    pub skipped: usize,
}

/// Read ticker entries from a CSV file.
pub fn load_ticker_entries(path: &Path) -> Result<LoadedEntries> {
    let loaded = read_ticker_entries(std::fs::File::open(path)?)?;
    info!(
        path = %path.display(),
        entries = loaded.entries.len(),
        skipped = loaded.skipped,
        "loaded ticker list"
    );
    Ok(loaded)
}

/// Read ticker entries from any CSV source.
pub fn read_ticker_entries<R: Read>(source: R) -> Result<LoadedEntries> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut loaded = LoadedEntries::default();
    for (index, record) in reader.records().enumerate() {
        let line = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(line, error = %e, "skipping unreadable row");
                loaded.skipped += 1;
                continue;
            }
        };

        if record.iter().all(str::is_empty) {
            continue;
        }
        match parse_row(&record) {
            Ok(entry) => loaded.entries.push(entry),
            Err(reason) => {
                warn!(line, row = ?record, "skipping row: {reason}");
                loaded.skipped += 1;
            }
        }
    }

    Ok(loaded)
}

fn parse_row(record: &csv::StringRecord) -> std::result::Result<TickerEntry, String> {
    let (Some(ticker), Some(url)) = (record.get(0), record.get(1)) else {
        return Err("expected ticker,url".to_string());
    };
    if ticker.eq_ignore_ascii_case("ticker") && url.eq_ignore_ascii_case("url") {
        return Err("header row".to_string());
    }

    let url = Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported URL scheme {}", url.scheme()));
    }

    let ticker = if ticker.is_empty() {
        ticker_from_url(&url).ok_or("no ticker and none in URL")?
    } else {
        ticker.to_string()
    };
    Ok(TickerEntry::new(ticker, url))
}

/// Guess a ticker from a report URL.
///
/// Prefers the last `/<segment>/<TICKER>/` run in the URL, scanning left to
/// right without reusing the slash that closed a previous run
/// (`/Portals/0/TW1/ADMR/instance.zip` gives `ADMR`, the host counts as a
/// segment). Falls back to the file stem, or to its parent directory when the
/// file is named `instance` and the parent looks like a ticker.
pub fn ticker_from_url(url: &Url) -> Option<String> {
    if let Some(ticker) = ticker_runs(url.as_str()).last() {
        return Some((*ticker).to_string());
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let file = segments.last().filter(|s| !s.is_empty())?;
    let stem = file.rsplit_once('.').map_or(*file, |(stem, _)| stem);
    if stem.eq_ignore_ascii_case("instance")
        && let Some(parent) = segments.len().checked_sub(2).map(|i| segments[i])
        && !parent.is_empty()
        && parent.len() <= MAX_TICKER_LEN
        && is_ticker_like(parent)
    {
        return Some(parent.to_string());
    }
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Every non-overlapping `/<any>/<[A-Z0-9]+>/` occurrence, in order.
fn ticker_runs(s: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut rest = s;
    while let Some(slash) = rest.find('/') {
        let after = &rest[slash + 1..];
        match after.split_once('/') {
            Some((first, tail)) if !first.is_empty() => match tail.split_once('/') {
                Some((second, remainder)) if is_ticker_like(second) => {
                    runs.push(second);
                    rest = remainder;
                }
                _ => rest = after,
            },
            _ => rest = after,
        }
    }
    runs
}

fn is_ticker_like(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_read_entries() {
        let csv = "\
# ticker list
BBCA, https://example.com/Portals/0/BBCA/instance.zip
tlkm,https://example.com/TLKM.zip
";
        let loaded = read_ticker_entries(csv.as_bytes()).unwrap();
        assert_eq!(loaded.skipped, 0);
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].ticker, "BBCA");
        assert_eq!(
            loaded.entries[0].url.as_str(),
            "https://example.com/Portals/0/BBCA/instance.zip"
        );
        assert_eq!(loaded.entries[1].ticker, "TLKM");
    }

    #[test]
    fn test_skips_bad_rows() {
        let csv = "\
ticker,url
ONLYTICKER
BAD,not a url
FTP,ftp://example.com/x.zip

ASII,https://example.com/ASII/instance.zip
";
        let loaded = read_ticker_entries(csv.as_bytes()).unwrap();
        assert_eq!(loaded.skipped, 4);
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entries[0].ticker, "ASII");
    }

    #[test]
    fn test_empty_ticker_uses_url() {
        let csv = ",https://idx.co.id/Portals/0/StaticData/TW1/ADMR/instance.zip\n";
        let loaded = read_ticker_entries(csv.as_bytes()).unwrap();
        assert_eq!(loaded.entries[0].ticker, "ADMR");
    }

    #[rstest]
    #[case("https://idx.co.id/Portals/0/StaticData/TW1/ADMR/instance.zip", Some("ADMR"))]
    #[case("https://example.com/files/BBCA/2023/report.zip", Some("BBCA"))]
    #[case("https://x.com/BBCA/report.zip", Some("BBCA"))]
    #[case("https://example.com/a/BBCA/b/c/TLKM/x.zip", Some("TLKM"))]
    #[case("https://example.com/a/BBCA/b/TLKM/x.zip", Some("BBCA"))]
    #[case("https://example.com/reports/bbca_2023.zip", Some("bbca_2023"))]
    #[case("https://example.com/ADMR/instance.zip", Some("ADMR"))]
    #[case("https://example.com/admr/instance.zip", Some("instance"))]
    #[case("https://example.com/", None)]
    fn test_ticker_from_url(#[case] url: &str, #[case] expected: Option<&str>) {
        let url = Url::parse(url).unwrap();
        assert_eq!(ticker_from_url(&url).as_deref(), expected);
    }
}
