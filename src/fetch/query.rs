// src/fetch/query.rs

use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::{form_urlencoded, Url};

use super::Transport;
use crate::error::{Result, ScrapeError};
use crate::month::Month;
use crate::registry::QuerySource;
use crate::series::IndicatorSeries;

const TIME_DIMENSION: &str = "sj";

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub returndata: ReturnData,
}

#[derive(Debug, Deserialize)]
pub struct ReturnData {
    #[serde(default)]
    pub datanodes: Vec<DataNode>,
}

#[derive(Debug, Deserialize)]
pub struct DataNode {
    pub data: NodeData,
    #[serde(default)]
    pub wds: Vec<Dimension>,
}

#[derive(Debug, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub hasdata: bool,
    #[serde(default)]
    pub data: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Dimension {
    #[serde(default)]
    pub wdcode: Option<String>,
    pub valuecode: String,
}

impl DataNode {
    /// The period code of this node: the `sj` dimension, or the last one when
    /// dimensions are unlabelled.
    pub fn time_code(&self) -> Option<&str> {
        self.wds
            .iter()
            .find(|d| d.wdcode.as_deref() == Some(TIME_DIMENSION))
            .or_else(|| self.wds.last())
            .map(|d| d.valuecode.as_str())
    }

    pub fn value(&self) -> Option<f64> {
        if self.data.hasdata {
            self.data.data
        } else {
            None
        }
    }
}

/// Percent-encodes a parameter value the way the query source expects:
/// spaces as `%20`, and single quotes turned into double quotes.
fn encode_param(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace("%27", "%22")
}

/// Builds the query URL for one indicator from `start` onwards.
pub fn build_query(endpoint: &Url, source: &QuerySource, start: Month) -> Url {
    let dfwds = format!(
        "[{{'wdcode': 'zb', 'valuecode': '{}'}}, {{'wdcode': 'sj', 'valuecode': '{}-'}}]",
        source.code,
        start.compact()
    );
    let params = [
        ("m", "QueryData"),
        ("dbcode", source.periodicity.dbcode()),
        ("rowcode", "zb"),
        ("colcode", "sj"),
        ("wds", "[]"),
        ("dfwds", dfwds.as_str()),
    ];
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode_param(v)))
        .collect::<Vec<_>>()
        .join("&");

    let mut url = endpoint.clone();
    url.set_query(Some(query.as_str()));
    url
}

pub fn decode(body: &str, url: &Url) -> Result<QueryResponse> {
    serde_json::from_str(body).map_err(|source| ScrapeError::Decode {
        url: url.to_string(),
        source,
    })
}

/// One row per month; quarterly nodes are repeated across their three months
/// and nodes without data keep their month with a missing value.
pub fn extract_series(name: &str, parsed: &QueryResponse, url: &Url) -> Result<IndicatorSeries> {
    let mut series = IndicatorSeries::single(name);
    for node in &parsed.returndata.datanodes {
        let code = node
            .time_code()
            .ok_or_else(|| ScrapeError::malformed(url, "data node has no time dimension"))?;
        let value = node.value();
        for month in Month::expand_period_code(code)? {
            series.push(month, vec![value]);
        }
    }
    Ok(series)
}

#[instrument(level = "info", skip(transport, endpoint, source), fields(code = %source.code))]
pub async fn fetch_indicator<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &Url,
    name: &str,
    source: &QuerySource,
    start: Month,
) -> Result<IndicatorSeries> {
    let url = build_query(endpoint, source, start);
    debug!(%url, "query");
    let body = transport.get_text(&url, "utf-8").await?;
    let parsed = decode(&body, &url)?;
    let series = extract_series(name, &parsed, &url)?;
    info!(
        nodes = parsed.returndata.datanodes.len(),
        rows = series.len(),
        "query finished"
    );
    Ok(series)
}
