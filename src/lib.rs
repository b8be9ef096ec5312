pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod month;
pub mod output;
pub mod registry;
pub mod series;

pub use config::ScraperConfig;
pub use dispatch::Scraper;
pub use error::{Result, ScrapeError};
pub use merge::MergedTable;
pub use month::Month;
pub use registry::{FetchStrategy, Indicator, Registry};
pub use series::IndicatorSeries;
