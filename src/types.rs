//! Panchanga record and page region types shared by the extractor and loader

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical column order of the CSV artifact
pub const COLUMNS: [&str; 13] = [
    "date",
    "samvastara",
    "aayana",
    "rutu",
    "masa",
    "paksha",
    "tithi",
    "vasara",
    "nakshatra",
    "yoga",
    "karana",
    "sunrise",
    "sunset",
];

/// Named region of the rendered panchanga page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Date input that selects the day shown
    Date,
    /// Samvastara, aayana, rutu, masa and paksha as one comma-separated block
    Sams,
    Tithi,
    /// Vasara, nakshatra, yoga and karana separated by `<br>`
    Dys,
    /// Sunrise and sunset text
    Suns,
    /// A data row of the CSV artifact (used only in error reports)
    CsvRow,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Date => "date",
            Region::Sams => "sams",
            Region::Tithi => "tithi",
            Region::Dys => "dys",
            Region::Suns => "suns",
            Region::CsvRow => "csv row",
        }
    }

    /// CSS selector of the region on the source page; `None` for blocks that
    /// are not part of the page
    pub fn selector(&self) -> Option<&'static str> {
        match self {
            Region::Date => Some(".mydate"),
            Region::Sams => Some(".sams"),
            Region::Tithi => Some(".thithi"),
            Region::Dys => Some(".dys"),
            Region::Suns => Some(".suns"),
            Region::CsvRow => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw fragments read from one day's page, before normalization
#[derive(Debug, Clone, Default)]
pub struct RawRegions {
    pub sams: String,
    pub tithi: String,
    /// Inner markup, not text: line breaks are still `<br>` tags
    pub dys_html: String,
    pub suns: String,
}

/// One calendar day of normalized panchanga data.
///
/// Field order is the CSV column order; serde writes the header from the
/// field names, so `sunrise` is always a literal column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanchangaRecord {
    pub date: String,
    pub samvastara: String,
    pub aayana: String,
    pub rutu: String,
    pub masa: String,
    pub paksha: String,
    pub tithi: String,
    pub vasara: String,
    pub nakshatra: String,
    pub yoga: String,
    pub karana: String,
    pub sunrise: String,
    pub sunset: String,
}

impl PanchangaRecord {
    /// Fields in canonical column order, paired with their column names
    pub fn columns(&self) -> [(&'static str, &str); 13] {
        [
            (COLUMNS[0], &self.date),
            (COLUMNS[1], &self.samvastara),
            (COLUMNS[2], &self.aayana),
            (COLUMNS[3], &self.rutu),
            (COLUMNS[4], &self.masa),
            (COLUMNS[5], &self.paksha),
            (COLUMNS[6], &self.tithi),
            (COLUMNS[7], &self.vasara),
            (COLUMNS[8], &self.nakshatra),
            (COLUMNS[9], &self.yoga),
            (COLUMNS[10], &self.karana),
            (COLUMNS[11], &self.sunrise),
            (COLUMNS[12], &self.sunset),
        ]
    }
}
