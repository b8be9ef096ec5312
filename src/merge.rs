// src/merge.rs

use std::collections::BTreeMap;
use tracing::warn;

use crate::month::Month;
use crate::series::IndicatorSeries;

/// Wide table keyed by month: one column per value column of every merged series.
///
/// Rows are kept in ascending month order. Every row holds exactly
/// `columns().len()` values; `None` marks a month the source lacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    columns: Vec<String>,
    rows: BTreeMap<Month, Vec<Option<f64>>>,
}

impl MergedTable {
    /// Indexes a series by month. If a month appears twice the first row wins,
    /// which for the table source is the one from the newer page.
    ///
    /// Rows are padded with `None` or cut to the series' column count.
    pub fn from_series(series: IndicatorSeries) -> Self {
        let width = series.columns.len();
        let mut rows = BTreeMap::new();
        for (month, mut values) in series.rows {
            if rows.contains_key(&month) {
                warn!(indicator = %series.name, month = %month, "duplicate month dropped");
                continue;
            }
            if values.len() != width {
                warn!(
                    indicator = %series.name,
                    month = %month,
                    got = values.len(),
                    width,
                    "row width does not match columns"
                );
                values.resize(width, None);
            }
            rows.insert(month, values);
        }
        Self {
            columns: series.columns,
            rows,
        }
    }

    /// Full outer join on month. Months found on only one side get `None` for
    /// the other side's columns.
    pub fn outer_join(mut self, other: IndicatorSeries) -> Self {
        let other = Self::from_series(other);
        let left_width = self.columns.len();
        let right_width = other.columns.len();

        for values in self.rows.values_mut() {
            values.resize(left_width + right_width, None);
        }
        for (month, right) in other.rows {
            let row = self
                .rows
                .entry(month)
                .or_insert_with(|| vec![None; left_width + right_width]);
            for (slot, value) in row[left_width..].iter_mut().zip(right) {
                *slot = value;
            }
        }

        self.columns.extend(other.columns);
        self
    }

    /// Folds `series` left to right with [`MergedTable::outer_join`].
    pub fn merge_all(series: impl IntoIterator<Item = IndicatorSeries>) -> Self {
        let mut iter = series.into_iter();
        match iter.next() {
            Some(first) => iter.fold(Self::from_series(first), Self::outer_join),
            None => Self::default(),
        }
    }

    /// Drops every month before `start`.
    pub fn retain_from(&mut self, start: Month) {
        self.rows = self.rows.split_off(&start);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, month: &Month) -> Option<&[Option<f64>]> {
        self.rows.get(month).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&Month, &[Option<f64>])> {
        self.rows.iter().map(|(m, v)| (m, v.as_slice()))
    }

    pub fn months(&self) -> impl Iterator<Item = &Month> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
