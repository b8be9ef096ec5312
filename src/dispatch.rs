// src/dispatch.rs

use futures::{stream, StreamExt, TryStreamExt};
use tracing::{info, instrument};

use crate::config::ScraperConfig;
use crate::error::Result;
use crate::fetch::{query, table, HttpTransport, Transport};
use crate::merge::MergedTable;
use crate::registry::{FetchStrategy, Indicator, Registry};
use crate::series::IndicatorSeries;

/// Routes indicator names to the right source and assembles the result table.
pub struct Scraper<T = HttpTransport> {
    registry: Registry,
    config: ScraperConfig,
    transport: T,
}

impl Scraper<HttpTransport> {
    pub fn new(registry: Registry, config: ScraperConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(registry, config, transport))
    }
}

impl<T: Transport> Scraper<T> {
    pub fn with_transport(registry: Registry, config: ScraperConfig, transport: T) -> Self {
        Self {
            registry,
            config,
            transport,
        }
    }

    /// Raw series for one indicator, before the start-month trim.
    pub async fn fetch_series(&self, name: &str) -> Result<IndicatorSeries> {
        let indicator = self.registry.resolve(name)?;
        self.fetch_resolved(indicator).await
    }

    async fn fetch_resolved(&self, indicator: &Indicator) -> Result<IndicatorSeries> {
        let start = self.config.start_month;
        match &indicator.strategy {
            FetchStrategy::Table(source) => {
                table::crawl_indicator(&self.transport, &indicator.name, source, start).await
            }
            FetchStrategy::Query(source) => {
                let endpoint = self.registry.query_endpoint()?;
                query::fetch_indicator(&self.transport, &endpoint, &indicator.name, source, start)
                    .await
            }
        }
    }

    /// One indicator as a table, months from the configured start onward.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_one(&self, name: &str) -> Result<MergedTable> {
        let mut table = MergedTable::from_series(self.fetch_series(name).await?);
        table.retain_from(self.config.start_month);
        Ok(table)
    }

    /// Several indicators outer-joined on month.
    ///
    /// Every name is resolved before any request goes out. Up to
    /// `config.concurrency` indicators are fetched at once; results are joined
    /// in request order. The first failure fails the whole call.
    #[instrument(level = "info", skip(self, names), fields(count = names.len()))]
    pub async fn fetch_many<S: AsRef<str>>(&self, names: &[S]) -> Result<MergedTable> {
        let indicators = names
            .iter()
            .map(|name| self.registry.resolve(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let series: Vec<IndicatorSeries> = stream::iter(indicators)
            .map(|indicator| self.fetch_resolved(indicator))
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        let mut table = MergedTable::merge_all(series);
        table.retain_from(self.config.start_month);
        info!(
            rows = table.len(),
            columns = table.columns().len(),
            "merged indicators"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::fetch::testing::FakeTransport;
    use crate::month::Month;
    use crate::registry::{
        ColumnSpec, Periodicity, QuerySource, TableSource, DEFAULT_QUERY_ENDPOINT,
    };
    use url::Url;

    const TABLE_URL: &str = "http://example.com/cgpi.aspx";

    fn registry() -> Registry {
        Registry::new(
            DEFAULT_QUERY_ENDPOINT,
            vec![
                Indicator {
                    name: "CGPI".to_string(),
                    strategy: FetchStrategy::Table(TableSource {
                        url: TABLE_URL.to_string(),
                        month_column: 0,
                        columns: vec![ColumnSpec {
                            name: "CGPI".to_string(),
                            position: 1,
                        }],
                        encoding: "gb2312".to_string(),
                    }),
                },
                Indicator {
                    name: "GDP".to_string(),
                    strategy: FetchStrategy::Query(QuerySource {
                        code: "A010201".to_string(),
                        periodicity: Periodicity::Quarterly,
                    }),
                },
            ],
        )
        .unwrap()
    }

    fn table_page(rows: &[(&str, &str)], pages: usize) -> String {
        let cells: String = rows
            .iter()
            .map(|(d, v)| format!("<tr><td>{}</td><td>{}</td><td>0</td></tr>", d, v))
            .collect();
        format!(
            r#"<table><tr class="firstTr"><th>月份</th><th colspan="2">总指数</th></tr>{}</table>
<input id="pagecount" value="{}">"#,
            cells, pages
        )
    }

    fn gdp_url(start: Month) -> Url {
        let source = QuerySource {
            code: "A010201".to_string(),
            periodicity: Periodicity::Quarterly,
        };
        query::build_query(&Url::parse(DEFAULT_QUERY_ENDPOINT).unwrap(), &source, start)
    }

    const GDP_BODY: &str = r#"{"returndata": {"datanodes": [
        {"data": {"data": 6.8, "hasdata": true},
         "wds": [{"valuecode": "A010201", "wdcode": "zb"}, {"valuecode": "2017B", "wdcode": "sj"}]},
        {"data": {"data": 6.9, "hasdata": true},
         "wds": [{"valuecode": "A010201", "wdcode": "zb"}, {"valuecode": "2017A", "wdcode": "sj"}]}
    ]}}"#;

    fn transport(start: Month) -> FakeTransport {
        FakeTransport::default()
            .with(
                format!("{}?p=1", TABLE_URL),
                table_page(&[("2017年06月份", "106.0"), ("2017年05月份", "105.0")], 3),
            )
            .with(
                format!("{}?p=2", TABLE_URL),
                table_page(&[("2017年04月份", "104.0"), ("2016年12月份", "96.0")], 3),
            )
            .with(format!("{}?p=3", TABLE_URL), table_page(&[], 3))
            .with(gdp_url(start).as_str(), GDP_BODY)
    }

    fn months(table: &MergedTable) -> Vec<String> {
        table.months().map(|m| m.to_string()).collect()
    }

    #[tokio::test]
    async fn fetch_one_trims_to_start_month() {
        let config = ScraperConfig::default();
        let start = config.start_month;
        let scraper = Scraper::with_transport(registry(), config, transport(start));

        let table = scraper.fetch_one("CGPI").await.unwrap();

        assert_eq!(months(&table), ["2017/04", "2017/05", "2017/06"]);
        assert_eq!(scraper.transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn fetch_many_outer_joins_sources() {
        let config = ScraperConfig::default().with_concurrency(2);
        let start = config.start_month;
        let scraper = Scraper::with_transport(registry(), config, transport(start));

        let table = scraper.fetch_many(&["CGPI", "GDP"]).await.unwrap();

        assert_eq!(table.columns(), ["CGPI", "GDP"]);
        assert_eq!(
            months(&table),
            ["2017/01", "2017/02", "2017/03", "2017/04", "2017/05", "2017/06"]
        );
        let jan: Month = "2017/01".parse().unwrap();
        let may: Month = "2017/05".parse().unwrap();
        assert_eq!(table.get(&jan).unwrap(), [None, Some(6.9)]);
        assert_eq!(table.get(&may).unwrap(), [Some(105.0), Some(6.8)]);
    }

    #[tokio::test]
    async fn unknown_indicator_fails_before_any_request() {
        let config = ScraperConfig::default();
        let start = config.start_month;
        let scraper = Scraper::with_transport(registry(), config, transport(start));

        let err = scraper.fetch_many(&["GDP", "CPI"]).await.unwrap_err();
        assert!(matches!(err, ScrapeError::UnknownIndicator(ref n) if n == "CPI"));
        assert!(scraper.transport.calls().is_empty());

        let err = scraper.fetch_one("CPI").await.unwrap_err();
        assert!(matches!(err, ScrapeError::UnknownIndicator(_)));
        assert!(scraper.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn one_failing_indicator_fails_request() {
        let config = ScraperConfig::default();
        let transport = FakeTransport::default().with(
            format!("{}?p=1", TABLE_URL),
            table_page(&[("2016年12月份", "96.0")], 1),
        );
        let scraper = Scraper::with_transport(registry(), config, transport);

        let err = scraper.fetch_many(&["CGPI", "GDP"]).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Transport { .. }));
    }

    #[tokio::test]
    async fn later_start_month_changes_query() {
        let start: Month = "2017/04".parse().unwrap();
        let config = ScraperConfig::default().with_start_month(start);
        let scraper = Scraper::with_transport(registry(), config, transport(start));

        let table = scraper.fetch_one("GDP").await.unwrap();
        assert_eq!(months(&table), ["2017/04", "2017/05", "2017/06"]);
        assert!(scraper.transport.calls()[0].contains("201704-"));
    }
}
