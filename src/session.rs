use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Node, Selector};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::error::PanchangaError;
use crate::types::Region;

/// A page showing one day of panchanga data at a time
pub trait PageSession {
    /// Rendered text of the region, with line breaks as `\n`
    fn region_text(&mut self, region: Region) -> Result<String>;
    /// Inner markup of the region
    fn region_html(&mut self, region: Region) -> Result<String>;
    /// Switch the page to the given day
    fn set_date(&mut self, date: NaiveDate) -> Result<()>;
}

/// A parsed copy of the panchanga page for a single day
pub struct PageDocument {
    html: Html,
}

impl PageDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    fn region(&self, region: Region) -> Result<ElementRef<'_>> {
        let css = region
            .selector()
            .ok_or(PanchangaError::RegionMissing { region })?;
        let selector =
            Selector::parse(css).map_err(|e| anyhow!("invalid selector {}: {:?}", css, e))?;
        self.html
            .select(&selector)
            .next()
            .ok_or_else(|| PanchangaError::RegionMissing { region }.into())
    }

    /// Value of the date input, i.e. the day the page claims to show
    pub fn shown_date(&self) -> Option<String> {
        let element = self.region(Region::Date).ok()?;
        element.value().attr("value").map(str::to_string)
    }

    pub fn region_text(&self, region: Region) -> Result<String> {
        Ok(inner_text(self.region(region)?))
    }

    pub fn region_html(&self, region: Region) -> Result<String> {
        Ok(self.region(region)?.inner_html())
    }
}

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "div", "dl", "dt", "dd", "fieldset", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "tr", "ul",
];

/// Approximate a browser's innerText: adjacent text runs are concatenated,
/// `<br>` and block boundaries become newlines, whitespace is collapsed
/// within each line.
fn inner_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            // Source newlines are layout only
            Node::Text(text) => out.push_str(&text.replace(['\n', '\r'], " ")),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(el) => {
                let block = BLOCK_ELEMENTS.contains(&el.name());
                if block {
                    out.push('\n');
                }
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Page session backed by plain HTTP fetches, one request per day.
///
/// The day is selected with a query parameter on the page URL. Fetched pages
/// are cached on disk and reused on later runs. A page whose date input shows
/// another day is rejected.
pub struct HttpPageSession {
    client: reqwest::blocking::Client,
    page_url: String,
    date_param: String,
    cache_dir: Option<PathBuf>,
    current: Option<PageDocument>,
}

impl HttpPageSession {
    pub fn new(
        page_url: &str,
        date_param: &str,
        user_agent: &str,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            page_url: page_url.to_string(),
            date_param: date_param.to_string(),
            cache_dir,
            current: None,
        })
    }

    fn day_url(&self, date: NaiveDate) -> String {
        let sep = if self.page_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            self.page_url,
            sep,
            self.date_param,
            date.format("%Y-%m-%d")
        )
    }

    fn cache_path(&self, date: NaiveDate) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let url = self.page_url.split('?').next().unwrap_or(&self.page_url);
        let host_path = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url)
            .trim_end_matches('/');
        Some(
            dir.join(host_path)
                .join(format!("{}.html", date.format("%Y-%m-%d"))),
        )
    }

    fn fetch_page(&self, date: NaiveDate) -> Result<String> {
        let cache_path = self.cache_path(date);

        if let Some(path) = cache_path.as_ref().filter(|p| p.exists()) {
            debug!(path = %path.display(), "using cached page");
            return fs::read_to_string(path)
                .with_context(|| format!("Failed to read cache: {:?}", path));
        }

        let url = self.day_url(date);
        debug!(%url, "fetching page");
        let text = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Failed to fetch: {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status from: {}", url))?
            .text()
            .with_context(|| format!("Failed to read response: {}", url))?;

        if let Some(path) = cache_path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &text)?;
        }

        Ok(text)
    }

    fn document(&self) -> Result<&PageDocument> {
        self.current
            .as_ref()
            .context("No page loaded; call set_date first")
    }
}

impl PageSession for HttpPageSession {
    fn region_text(&mut self, region: Region) -> Result<String> {
        self.document()?.region_text(region)
    }

    fn region_html(&mut self, region: Region) -> Result<String> {
        self.document()?.region_html(region)
    }

    fn set_date(&mut self, date: NaiveDate) -> Result<()> {
        let html = self.fetch_page(date)?;
        let document = PageDocument::parse(&html);

        let requested = date.format("%Y-%m-%d").to_string();
        if let Some(shown) = document.shown_date() {
            if shown != requested {
                self.current = None;
                return Err(PanchangaError::DateMismatch { requested, shown }.into());
            }
        }

        self.current = Some(document);
        Ok(())
    }
}
