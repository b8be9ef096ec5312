// src/fetch/table.rs

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use super::Transport;
use crate::error::{Result, ScrapeError};
use crate::month::Month;
use crate::registry::TableSource;
use crate::series::{IndicatorSeries, SeriesRow};

static HEADER_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr.firstTr").expect("header row selector should parse"));
static HEADER_CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th").expect("header cell selector should parse"));
static PAGE_COUNT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input#pagecount").expect("page count selector should parse"));
static DATA_CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("data cell selector should parse"));

/// Geometry and contents of the first page of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstPage {
    pub row_width: usize,
    pub page_count: usize,
    pub cells: Vec<String>,
}

/// Sums the `colspan` of every header cell (1 when absent, at least 1 otherwise).
pub fn measure_row_width(doc: &Html, url: &Url) -> Result<usize> {
    let row = doc
        .select(&HEADER_ROW)
        .next()
        .ok_or_else(|| ScrapeError::malformed(url, "header row `tr.firstTr` not found"))?;

    let mut width = 0;
    for th in row.select(&HEADER_CELL) {
        width += match th.value().attr("colspan") {
            Some(span) => span
                .trim()
                .parse::<usize>()
                .map_err(|_| {
                    ScrapeError::malformed(url, format!("colspan {:?} is not a number", span))
                })?
                .max(1),
            None => 1,
        };
    }

    if width == 0 {
        return Err(ScrapeError::malformed(url, "header row has no cells"));
    }
    Ok(width)
}

/// Reads the total page count from `input#pagecount`.
pub fn count_pages(doc: &Html, url: &Url) -> Result<usize> {
    let input = doc
        .select(&PAGE_COUNT)
        .next()
        .ok_or_else(|| ScrapeError::malformed(url, "page count input not found"))?;
    let value = input
        .value()
        .attr("value")
        .ok_or_else(|| ScrapeError::malformed(url, "page count input has no value"))?;
    value
        .trim()
        .parse()
        .map_err(|_| ScrapeError::malformed(url, format!("page count {:?} is not a number", value)))
}

/// Trimmed text of every `td`, in document order, flattened across rows.
pub fn cell_texts(doc: &Html) -> Vec<String> {
    doc.select(&DATA_CELL)
        .map(|td| td.text().collect::<String>().trim().to_string())
        .collect()
}

pub fn parse_first_page(html: &str, url: &Url) -> Result<FirstPage> {
    let doc = Html::parse_document(html);
    Ok(FirstPage {
        row_width: measure_row_width(&doc, url)?,
        page_count: count_pages(&doc, url)?,
        cells: cell_texts(&doc),
    })
}

/// Fetches one page and returns its flat cell texts. Row boundaries are not
/// preserved; re-chunk with the width measured from the first page.
pub async fn fetch_page<T: Transport + ?Sized>(
    transport: &T,
    url: &Url,
    encoding: &str,
) -> Result<Vec<String>> {
    let html = transport.get_text(url, encoding).await?;
    Ok(cell_texts(&Html::parse_document(&html)))
}

/// Splits `cells` into rows of `row_width` and keeps only `keep` positions,
/// in the order given.
///
/// A trailing partial row means the page does not match the measured geometry
/// and is reported as malformed rather than truncated.
pub fn chunk_and_filter(
    cells: &[String],
    row_width: usize,
    keep: &[usize],
    url: &Url,
) -> Result<Vec<Vec<String>>> {
    if row_width == 0 {
        return Err(ScrapeError::malformed(url, "row width is zero"));
    }
    if let Some(&bad) = keep.iter().find(|&&i| i >= row_width) {
        return Err(ScrapeError::malformed(
            url,
            format!("column {} is outside a row of width {}", bad, row_width),
        ));
    }
    if cells.len() % row_width != 0 {
        return Err(ScrapeError::malformed(
            url,
            format!(
                "{} cells do not divide into rows of {}",
                cells.len(),
                row_width
            ),
        ));
    }

    Ok(cells
        .chunks_exact(row_width)
        .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
        .collect())
}

/// `[date, value, ...]` → `(month, [value, ...])`.
pub fn normalize_row(row: &[String]) -> Result<SeriesRow> {
    let (date, values) = row
        .split_first()
        .ok_or_else(|| ScrapeError::value_parse("", "empty row"))?;
    let month = Month::from_cell_text(date)?;
    let values = values
        .iter()
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ScrapeError::value_parse(v.as_str(), "not a number"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((month, values))
}

fn page_url(base: &Url, page: usize) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("p", &page.to_string());
    url
}

/// Walks the pages of `source` newest to oldest.
///
/// Pagination stops after the last page, or as soon as a page's final row is
/// at or before `start`. Only that last row is compared, so a page whose rows
/// are out of order can stop the walk early or late. Rows before `start` are
/// still returned; trimming happens when the table is assembled.
#[instrument(level = "info", skip(transport, source), fields(url = %source.url))]
pub async fn crawl_indicator<T: Transport + ?Sized>(
    transport: &T,
    name: &str,
    source: &TableSource,
    start: Month,
) -> Result<IndicatorSeries> {
    let base = Url::parse(&source.url)
        .map_err(|e| ScrapeError::Config(format!("{}: bad url {:?}: {}", name, source.url, e)))?;
    let keep = source.keep_indices();
    let mut series = IndicatorSeries::new(name, source.column_names());

    let first_url = page_url(&base, 1);
    let html = transport.get_text(&first_url, &source.encoding).await?;
    let first = parse_first_page(&html, &first_url)?;
    info!(
        row_width = first.row_width,
        pages = first.page_count,
        "table geometry"
    );

    let mut pending = Some(first.cells);
    for page in 1..=first.page_count.max(1) {
        let url = page_url(&base, page);
        let cells = match pending.take() {
            Some(cells) => cells,
            None => fetch_page(transport, &url, &source.encoding).await?,
        };
        if cells.is_empty() {
            warn!(page, "page has no data cells; stopping");
            break;
        }

        let rows = chunk_and_filter(&cells, first.row_width, &keep, &url)?
            .iter()
            .map(|row| normalize_row(row))
            .collect::<Result<Vec<_>>>()?;
        let oldest = rows.last().map(|(month, _)| *month);
        trace!(page, rows = rows.len(), "parsed page");
        series.rows.extend(rows);

        if let Some(oldest) = oldest {
            debug!(page, oldest = %oldest, "page done");
            if oldest <= start {
                info!(page, oldest = %oldest, start = %start, "reached start month");
                break;
            }
        }
    }

    info!(rows = series.len(), "table crawl finished");
    Ok(series)
}
