// src/month.rs

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fmt, str::FromStr};

use crate::error::{Result, ScrapeError};

/// Quarter letters used by the query source, mapped to the calendar months they cover.
pub const QUARTER_MONTHS: [(char, [u32; 3]); 4] = [
    ('A', [1, 2, 3]),
    ('B', [4, 5, 6]),
    ('C', [7, 8, 9]),
    ('D', [10, 11, 12]),
];

static NON_ASCII: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\x00-\x7F]").expect("non-ascii pattern should compile"));

/// A calendar month, rendered as zero-padded `"YYYY/MM"`.
///
/// Ordering is chronological, which matches the lexicographic order of the
/// rendered form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            ScrapeError::value_parse(format!("{}/{}", year, month), "not a calendar month")
        })?;
        if !(1000..=9999).contains(&date.year()) {
            return Err(ScrapeError::value_parse(
                date.year().to_string(),
                "year must have four digits",
            ));
        }
        Ok(Self {
            year: date.year(),
            month: date.month(),
        })
    }

    /// Caller guarantees `month` is in `1..=12` and `year` has four digits.
    pub(crate) const fn from_ym_unchecked(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Parses a table cell such as `"2017年01月份"`: every non-ASCII character is
    /// dropped, the first four remaining characters are the year and the rest the month.
    pub fn from_cell_text(raw: &str) -> Result<Self> {
        let ascii = NON_ASCII.replace_all(raw, "");
        let ascii = ascii.trim();
        if ascii.len() < 5 {
            return Err(ScrapeError::value_parse(raw, "too short for a year and month"));
        }
        let (year, month) = ascii.split_at(4);
        let month = month.trim_matches(|c: char| c == '/' || c == '-' || c.is_whitespace());
        Self::from_parts(raw, year, month)
    }

    /// Expands a query-source period code into the months it covers.
    ///
    /// `"201703"` is a single month; `"2020B"` is the second quarter and yields
    /// April, May and June.
    pub fn expand_period_code(code: &str) -> Result<Vec<Self>> {
        let code = code.trim();
        if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
            let (year, month) = code.split_at(4);
            return Ok(vec![Self::from_parts(code, year, month)?]);
        }

        let mut chars = code.chars();
        let quarter = chars.next_back();
        let year = chars.as_str();
        match quarter {
            Some(letter) if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) => {
                let months = QUARTER_MONTHS
                    .iter()
                    .find(|(q, _)| *q == letter)
                    .map(|(_, months)| months)
                    .ok_or_else(|| ScrapeError::value_parse(code, "unknown quarter letter"))?;
                let year: i32 = year
                    .parse()
                    .map_err(|_| ScrapeError::value_parse(code, "bad year"))?;
                months.iter().map(|&m| Self::new(year, m)).collect()
            }
            _ => Err(ScrapeError::value_parse(
                code,
                "expected YYYYMM or YYYY plus a quarter letter",
            )),
        }
    }

    fn from_parts(raw: &str, year: &str, month: &str) -> Result<Self> {
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(ScrapeError::value_parse(raw, "year must have four digits"));
        }
        if month.is_empty() || month.len() > 2 || !month.chars().all(|c| c.is_ascii_digit()) {
            return Err(ScrapeError::value_parse(raw, "month must have one or two digits"));
        }
        let year: i32 = year
            .parse()
            .map_err(|_| ScrapeError::value_parse(raw, "bad year"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| ScrapeError::value_parse(raw, "bad month"))?;
        Self::new(year, month)
    }

    /// `"YYYYMM"`, the form the query source expects for a start period.
    pub fn compact(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = ScrapeError;

    /// Accepts `"YYYY/MM"`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once('/') {
            Some((year, month)) => Self::from_parts(s, year, month),
            None => Err(ScrapeError::value_parse(s, "expected YYYY/MM")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Month {
        s.parse().unwrap()
    }

    #[test]
    fn cell_text_with_labels_normalizes() {
        assert_eq!(Month::from_cell_text("2017年01月份").unwrap(), m("2017/01"));
        assert_eq!(Month::from_cell_text(" 2019年12月 ").unwrap().to_string(), "2019/12");
    }

    #[test]
    fn single_digit_month_is_padded() {
        assert_eq!(Month::from_cell_text("2017年1月").unwrap().to_string(), "2017/01");
    }

    #[test]
    fn cell_text_rejects_garbage() {
        assert!(matches!(
            Month::from_cell_text("月份"),
            Err(ScrapeError::ValueParse { .. })
        ));
        assert!(Month::from_cell_text("2017年13月").is_err());
    }

    #[test]
    fn six_digit_code_is_one_month() {
        assert_eq!(Month::expand_period_code("201703").unwrap(), vec![m("2017/03")]);
    }

    #[test]
    fn quarter_code_expands_to_three_months() {
        let months: Vec<String> = Month::expand_period_code("2020B")
            .unwrap()
            .iter()
            .map(Month::to_string)
            .collect();
        assert_eq!(months, ["2020/04", "2020/05", "2020/06"]);

        let q4 = Month::expand_period_code("2019D").unwrap();
        assert_eq!(q4.last().unwrap().to_string(), "2019/12");
    }

    #[test]
    fn unknown_quarter_letter_fails() {
        assert!(Month::expand_period_code("2020E").is_err());
        assert!(Month::expand_period_code("20A").is_err());
    }

    #[test]
    fn ordering_matches_string_ordering() {
        let a = m("2016/12");
        let b = m("2017/01");
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
        assert_eq!(b.compact(), "201701");
    }
}
