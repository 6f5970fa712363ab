//! Normalization of panchanga page text into record fields
//!
//! The page renders grouped but unlabeled text, so every field here is found
//! by position: a fixed number of comma segments or line breaks and a fixed
//! literal suffix per field. Any upstream formatting change shows up as an
//! `UnexpectedFieldCount` error rather than a padded or truncated record.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::PanchangaError;
use crate::types::{PanchangaRecord, RawRegions, Region};

/// Samvastara, aayana, rutu, masa, paksha
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sams {
    pub samvastara: String,
    pub aayana: String,
    pub rutu: String,
    pub masa: String,
    pub paksha: String,
}

/// Vasara, nakshatra, yoga, karana
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dys {
    pub vasara: String,
    pub nakshatra: String,
    pub yoga: String,
    pub karana: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suns {
    pub sunrise: String,
    pub sunset: String,
}

static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*[^>]*>").unwrap());
static SUNRISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sunrise\s*(.+?)\s*Sunset").unwrap());
static SUNSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sunset\s*(.+?)(?:\s*Shraadha|\s*$)").unwrap());

/// Remove every occurrence of a literal suffix marker (e.g. " masa")
fn strip_marker(value: &str, marker: &str) -> String {
    value.replace(marker, "")
}

fn expect_count(region: Region, expected: usize, actual: usize) -> Result<(), PanchangaError> {
    if actual != expected {
        return Err(PanchangaError::UnexpectedFieldCount {
            region,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Parse "Samvastara, Aayana, X rutu, Y masa, Z paksha"
pub fn parse_sams(text: &str) -> Result<Sams, PanchangaError> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    expect_count(Region::Sams, 5, parts.len())?;

    Ok(Sams {
        samvastara: parts[0].to_string(),
        aayana: parts[1].to_string(),
        rutu: strip_marker(parts[2], " rutu"),
        masa: strip_marker(parts[3], " masa"),
        paksha: strip_marker(parts[4], " paksha"),
    })
}

/// Parse the tithi block; only the first comma segment is kept
pub fn parse_tithi(text: &str) -> Result<String, PanchangaError> {
    let first = text.split(',').next().unwrap_or_default().trim();
    if first.is_empty() {
        return Err(PanchangaError::UnexpectedFieldCount {
            region: Region::Tithi,
            expected: 1,
            actual: 0,
        });
    }
    Ok(strip_marker(first, " Tithi"))
}

/// Parse the dys block from its inner markup (lines separated by `<br>`)
pub fn parse_dys(markup: &str) -> Result<Dys, PanchangaError> {
    let text = BR_RE.replace_all(markup, "\n");
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    expect_count(Region::Dys, 4, lines.len())?;

    Ok(Dys {
        vasara: lines[0].to_string(),
        nakshatra: strip_marker(lines[1], " nakshatra"),
        yoga: strip_marker(lines[2], " yoga"),
        karana: strip_marker(lines[3], " karna"),
    })
}

/// Extract sunrise and sunset times. A missing marker yields an empty string.
pub fn parse_suns(text: &str) -> Suns {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };

    Suns {
        sunrise: capture(&*SUNRISE_RE),
        sunset: capture(&*SUNSET_RE),
    }
}

/// Normalize one day's raw fragments into a record keyed by `date`
pub fn build_record(date: &str, raw: &RawRegions) -> Result<PanchangaRecord, PanchangaError> {
    let sams = parse_sams(&raw.sams)?;
    let tithi = parse_tithi(&raw.tithi)?;
    let dys = parse_dys(&raw.dys_html)?;
    let suns = parse_suns(&raw.suns);

    Ok(PanchangaRecord {
        date: date.to_string(),
        samvastara: sams.samvastara,
        aayana: sams.aayana,
        rutu: sams.rutu,
        masa: sams.masa,
        paksha: sams.paksha,
        tithi,
        vasara: dys.vasara,
        nakshatra: dys.nakshatra,
        yoga: dys.yoga,
        karana: dys.karana,
        sunrise: suns.sunrise,
        sunset: suns.sunset,
    })
}
