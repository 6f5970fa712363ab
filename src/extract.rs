use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::csv_store::CsvStore;
use crate::error::PanchangaError;
use crate::parse::build_record;
use crate::session::PageSession;
use crate::types::{PanchangaRecord, RawRegions, Region};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub rows: usize,
}

pub fn parse_iso_date(date_str: &str) -> Result<NaiveDate, PanchangaError> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| PanchangaError::InvalidDate(date_str.to_string()))
}

/// Days from `start` (inclusive) to `end` (exclusive)
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |d| d.succ_opt()).take_while(move |d| *d < end)
}

/// Read the current day's regions from the session and normalize them
pub fn extract_day(session: &mut dyn PageSession, date: &str) -> Result<PanchangaRecord> {
    info!("date: {}", date);

    let raw = RawRegions {
        sams: session.region_text(Region::Sams)?,
        tithi: session.region_text(Region::Tithi)?,
        dys_html: session.region_html(Region::Dys)?,
        suns: session.region_text(Region::Suns)?,
    };

    let record =
        build_record(date, &raw).with_context(|| format!("Failed to parse page for {}", date))?;

    for (name, value) in record.columns().iter().skip(1) {
        info!("{}: {}", name, value);
    }

    Ok(record)
}

/// Scrape every day in `[start, end)` and append one row per day.
///
/// The first failure stops the run; rows appended before it stay in the file.
pub fn run_extract(
    session: &mut dyn PageSession,
    store: &CsvStore,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ExtractSummary> {
    let mut rows = 0;

    for date in date_range(start, end) {
        let date_str = date.format("%Y-%m-%d").to_string();
        session
            .set_date(date)
            .with_context(|| format!("Failed to load page for {}", date_str))?;
        let record = extract_day(session, &date_str)?;
        store.append(&record)?;
        rows += 1;
    }

    info!(rows, path = %store.path().display(), "extraction complete");
    Ok(ExtractSummary { rows })
}
