// src/series.rs

use crate::month::Month;

/// One row of a series: the month and one value per value column.
/// `None` marks a value the source reported as missing.
pub type SeriesRow = (Month, Vec<Option<f64>>);

/// The table a fetcher produces for a single indicator.
///
/// Rows arrive in source order (the table source lists newest first) and may
/// contain the same month more than once when pages overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub name: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<SeriesRow>,
}

impl IndicatorSeries {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// A single-column series whose column is named after the indicator.
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), vec![name])
    }

    pub fn push(&mut self, month: Month, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push((month, values));
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn months(&self) -> impl Iterator<Item = Month> + '_ {
        self.rows.iter().map(|(m, _)| *m)
    }
}
