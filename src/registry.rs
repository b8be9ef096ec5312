// src/registry.rs

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};
use url::Url;

use crate::error::{Result, ScrapeError};

pub const DEFAULT_QUERY_ENDPOINT: &str = "http://data.stats.gov.cn/easyquery.htm";

/// Whether a query-source indicator is published per month or per quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    Monthly,
    Quarterly,
}

impl Periodicity {
    /// Database code the query source uses for this periodicity.
    pub fn dbcode(self) -> &'static str {
        match self {
            Periodicity::Monthly => "hgyd",
            Periodicity::Quarterly => "hgjd",
        }
    }
}

/// Output column name → zero-based position inside one row of the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub position: usize,
}

/// A paginated HTML table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSource {
    pub url: String,
    /// Position of the date cell within a row.
    #[serde(default)]
    pub month_column: usize,
    pub columns: Vec<ColumnSpec>,
    /// Used when the response does not declare a charset.
    #[serde(default = "default_table_encoding")]
    pub encoding: String,
}

fn default_table_encoding() -> String {
    "gb2312".to_string()
}

impl TableSource {
    /// Positions to keep from each row, date first, then values in column order.
    pub fn keep_indices(&self) -> Vec<usize> {
        std::iter::once(self.month_column)
            .chain(self.columns.iter().map(|c| c.position))
            .collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// One indicator of the JSON query source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySource {
    pub code: String,
    pub periodicity: Periodicity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FetchStrategy {
    Table(TableSource),
    Query(QuerySource),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    #[serde(flatten)]
    pub strategy: FetchStrategy,
}

/// Display name → how to fetch it. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default = "default_query_endpoint")]
    pub query_endpoint: String,
    pub indicators: Vec<Indicator>,
}

fn default_query_endpoint() -> String {
    DEFAULT_QUERY_ENDPOINT.to_string()
}

impl Registry {
    pub fn new(query_endpoint: impl Into<String>, indicators: Vec<Indicator>) -> Result<Self> {
        let registry = Self {
            query_endpoint: query_endpoint.into(),
            indicators,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// The catalog the scraper ships with.
    pub fn builtin() -> Self {
        let monthly = |name: &str, code: &str| Indicator {
            name: name.to_string(),
            strategy: FetchStrategy::Query(QuerySource {
                code: code.to_string(),
                periodicity: Periodicity::Monthly,
            }),
        };

        let indicators = vec![
            Indicator {
                name: "企业商品价格指数".to_string(),
                strategy: FetchStrategy::Table(TableSource {
                    url: "http://data.eastmoney.com/cjsj/corporategoodspriceindex.aspx"
                        .to_string(),
                    month_column: 0,
                    columns: vec![ColumnSpec {
                        name: "企业商品价格指数(总指数)".to_string(),
                        position: 1,
                    }],
                    encoding: default_table_encoding(),
                }),
            },
            monthly("制造业采购经理指数(%)", "A0B0101"),
            monthly("非制造业商务活动指数(%)", "A0B0201"),
            monthly("工业生产者出厂价格指数(上年同月=100)", "A01080101"),
            monthly("工业增加值累计增长(%)", "A020102"),
            monthly("房地产投资累计值(亿元)", "A060101"),
            monthly("流通中现金(M0)供应量期末值(亿元)", "A0D0105"),
            monthly("货币(M1)供应量期末值(亿元)", "A0D0103"),
            monthly("货币和准货币(M2)供应量期末值(亿元)", "A0D0101"),
            Indicator {
                name: "GDP".to_string(),
                strategy: FetchStrategy::Query(QuerySource {
                    code: "A010201".to_string(),
                    periodicity: Periodicity::Quarterly,
                }),
            },
        ];

        Self {
            query_endpoint: default_query_endpoint(),
            indicators,
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let registry: Registry = serde_yaml::from_str(yaml)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|e| ScrapeError::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn resolve(&self, name: &str) -> Result<&Indicator> {
        self.indicators
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| ScrapeError::UnknownIndicator(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.indicators.iter().map(|i| i.name.as_str())
    }

    pub fn query_endpoint(&self) -> Result<Url> {
        Url::parse(&self.query_endpoint).map_err(|e| {
            ScrapeError::Config(format!("query endpoint {:?}: {}", self.query_endpoint, e))
        })
    }

    fn validate(&self) -> Result<()> {
        self.query_endpoint()?;

        let mut seen = HashSet::new();
        for indicator in &self.indicators {
            if !seen.insert(indicator.name.as_str()) {
                return Err(ScrapeError::Config(format!(
                    "duplicate indicator {:?}",
                    indicator.name
                )));
            }
            if let FetchStrategy::Table(table) = &indicator.strategy {
                Url::parse(&table.url).map_err(|e| {
                    ScrapeError::Config(format!("{}: bad url {:?}: {}", indicator.name, table.url, e))
                })?;
                if table.columns.is_empty() {
                    return Err(ScrapeError::Config(format!(
                        "{}: table source needs at least one value column",
                        indicator.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
