//! Loading of files from urls.
//!
//! [`Dispatcher`] selects the parser by the url suffix and drives the load through a
//! [`DataSource`]. [`HttpDataSource`] is the data source used by the application: it fetches the
//! file with the [platform service](crate::platform) and parses it in memory.

use async_trait::async_trait;
use geojson::FeatureCollection;
use log::{debug, info, warn};
use maybe_sync::{MaybeSend, MaybeSync};

use crate::dataset::{Dataset, PointTable};
use crate::error::GeoviewError;
use crate::platform::PlatformService;

pub mod delimited;
mod format;
pub mod kml;
mod markup;

pub use format::{Delimiter, SourceFormat};
pub use markup::MarkupStrategy;

/// Source of parsed files.
///
/// Every call is a separate load attempt: implementations are not expected to cache the fetched
/// data between calls.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait DataSource: MaybeSend + MaybeSync {
    /// Loads a delimited text file and parses it with the given delimiter.
    async fn load_delimited(
        &self,
        url: &str,
        delimiter: Delimiter,
    ) -> Result<PointTable, GeoviewError>;

    /// Loads a markup file and decodes it with the given strategy.
    async fn load_markup(
        &self,
        url: &str,
        strategy: MarkupStrategy,
    ) -> Result<FeatureCollection, GeoviewError>;
}

/// Loads files over HTTP using the platform service of the current target.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpDataSource {}

impl HttpDataSource {
    /// Creates a new instance.
    pub fn new() -> Self {
        Self {}
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl DataSource for HttpDataSource {
    async fn load_delimited(
        &self,
        url: &str,
        delimiter: Delimiter,
    ) -> Result<PointTable, GeoviewError> {
        let bytes = crate::platform::instance().load_bytes_from_url(url).await?;
        delimited::parse(&bytes, delimiter)
    }

    async fn load_markup(
        &self,
        url: &str,
        strategy: MarkupStrategy,
    ) -> Result<FeatureCollection, GeoviewError> {
        let bytes = crate::platform::instance().load_bytes_from_url(url).await?;
        strategy.decode(&bytes)
    }
}

/// Selects the parser for a url and runs the load.
#[derive(Debug, Clone)]
pub struct Dispatcher<S> {
    source: S,
    strategies: Vec<MarkupStrategy>,
}

impl<S: DataSource> Dispatcher<S> {
    /// Creates a dispatcher that tries markup strategies in the [default
    /// order](MarkupStrategy::PRIORITY).
    pub fn new(source: S) -> Self {
        Self {
            source,
            strategies: MarkupStrategy::PRIORITY.to_vec(),
        }
    }

    /// Replaces the list of markup strategies to try.
    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = MarkupStrategy>) -> Self {
        self.strategies = strategies.into_iter().collect();
        self
    }

    /// Markup strategies in the order they are tried.
    pub fn strategies(&self) -> &[MarkupStrategy] {
        &self.strategies
    }

    /// Loads the file at the given url.
    ///
    /// The format is selected by the url suffix. Delimited files are loaded in one attempt. For
    /// markup files every strategy is tried in order until one succeeds; if all of them fail the
    /// error of the last one is returned inside [`GeoviewError::StrategiesExhausted`]. A file
    /// without records or features results in [`GeoviewError::EmptyResult`].
    pub async fn load_from_url(&self, url: &str) -> Result<Dataset, GeoviewError> {
        let Some(format) = SourceFormat::from_url(url) else {
            return Err(GeoviewError::UnrecognizedFormat(url.to_string()));
        };

        let dataset = match format {
            SourceFormat::Delimited(delimiter) => {
                debug!("Loading {url} as delimited text with {delimiter:?} delimiter");
                Dataset::Points(self.source.load_delimited(url, delimiter).await?)
            }
            SourceFormat::Kml => Dataset::Features(self.load_markup(url).await?),
        };

        if dataset.is_empty() {
            return Err(GeoviewError::EmptyResult);
        }

        info!("Loaded {} items from {url}", dataset.len());
        Ok(dataset)
    }

    async fn load_markup(&self, url: &str) -> Result<FeatureCollection, GeoviewError> {
        let mut last_error = None;
        for strategy in &self.strategies {
            debug!("Loading {url} with {strategy} markup strategy");
            match self.source.load_markup(url, *strategy).await {
                Ok(collection) => return Ok(collection),
                Err(error) => {
                    warn!("Markup strategy {strategy} failed to load {url}: {error}");
                    last_error = Some(error);
                }
            }
        }

        let last_error = last_error
            .unwrap_or_else(|| GeoviewError::Parse("no markup strategies configured".into()));
        Err(GeoviewError::StrategiesExhausted(Box::new(last_error)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use geojson::{Feature, Geometry, Value};

    use super::*;

    #[derive(Default)]
    struct MockSource {
        table: Option<PointTable>,
        markup: HashMap<MarkupStrategy, FeatureCollection>,
        delimited_calls: Mutex<Vec<(String, Delimiter)>>,
        markup_calls: Mutex<Vec<MarkupStrategy>>,
    }

    #[async_trait]
    impl DataSource for MockSource {
        async fn load_delimited(
            &self,
            url: &str,
            delimiter: Delimiter,
        ) -> Result<PointTable, GeoviewError> {
            self.delimited_calls
                .lock()
                .unwrap()
                .push((url.to_string(), delimiter));
            self.table
                .clone()
                .ok_or_else(|| GeoviewError::Parse("no table".into()))
        }

        async fn load_markup(
            &self,
            _url: &str,
            strategy: MarkupStrategy,
        ) -> Result<FeatureCollection, GeoviewError> {
            self.markup_calls.lock().unwrap().push(strategy);
            self.markup
                .get(&strategy)
                .cloned()
                .ok_or_else(|| GeoviewError::Parse(format!("{strategy} failed")))
        }
    }

    fn collection(count: usize) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: (0..count)
                .map(|i| Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![i as f64, 0.0]))),
                    id: None,
                    properties: None,
                    foreign_members: None,
                })
                .collect(),
            foreign_members: None,
        }
    }

    fn table() -> PointTable {
        PointTable::new(
            vec!["Longitude".into(), "Latitude".into()],
            vec![vec!["1".into(), "2".into()]],
        )
    }

    #[test]
    fn unrecognized_suffix_is_rejected_without_loading() {
        let dispatcher = Dispatcher::new(MockSource::default());
        let result = tokio_test::block_on(dispatcher.load_from_url("http://host/data.json"));
        assert_eq!(
            result,
            Err(GeoviewError::UnrecognizedFormat(
                "http://host/data.json".into()
            ))
        );
        assert!(dispatcher.source.delimited_calls.lock().unwrap().is_empty());
        assert!(dispatcher.source.markup_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn delimited_file_uses_delimiter_of_the_suffix() {
        let dispatcher = Dispatcher::new(MockSource {
            table: Some(table()),
            ..Default::default()
        });

        for (url, delimiter) in [
            ("http://host/a.csv", Delimiter::Comma),
            ("http://host/a.tsv", Delimiter::Tab),
            ("http://host/a.dsv", Delimiter::Pipe),
        ] {
            let dataset = tokio_test::block_on(dispatcher.load_from_url(url)).unwrap();
            assert_eq!(dataset, Dataset::Points(table()));
            assert_eq!(
                dispatcher.source.delimited_calls.lock().unwrap().pop(),
                Some((url.to_string(), delimiter))
            );
        }
    }

    #[test]
    fn delimited_failure_is_not_retried() {
        let dispatcher = Dispatcher::new(MockSource::default());
        let result = tokio_test::block_on(dispatcher.load_from_url("http://host/a.csv"));
        assert_matches!(result, Err(GeoviewError::Parse(_)));
        assert_eq!(dispatcher.source.delimited_calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn first_successful_strategy_wins() {
        let mut markup = HashMap::new();
        markup.insert(MarkupStrategy::GeoJson, collection(2));
        markup.insert(MarkupStrategy::Binary, collection(5));
        let dispatcher = Dispatcher::new(MockSource {
            markup,
            ..Default::default()
        });

        let dataset = tokio_test::block_on(dispatcher.load_from_url("http://host/a.kml")).unwrap();
        assert_eq!(dataset, Dataset::Features(collection(2)));
        assert_eq!(
            *dispatcher.source.markup_calls.lock().unwrap(),
            vec![MarkupStrategy::Raw, MarkupStrategy::GeoJson]
        );
    }

    #[test]
    fn all_strategies_failing() {
        let dispatcher = Dispatcher::new(MockSource::default());
        let result = tokio_test::block_on(dispatcher.load_from_url("http://host/a.kml"));
        assert_eq!(
            result,
            Err(GeoviewError::StrategiesExhausted(Box::new(
                GeoviewError::Parse("binary failed".into())
            )))
        );
        assert_eq!(
            *dispatcher.source.markup_calls.lock().unwrap(),
            MarkupStrategy::PRIORITY.to_vec()
        );
    }

    #[test]
    fn empty_success_stops_the_fallback() {
        let mut markup = HashMap::new();
        markup.insert(MarkupStrategy::Raw, collection(0));
        markup.insert(MarkupStrategy::GeoJson, collection(1));
        let dispatcher = Dispatcher::new(MockSource {
            markup,
            ..Default::default()
        });

        let result = tokio_test::block_on(dispatcher.load_from_url("http://host/a.kml"));
        assert_eq!(result, Err(GeoviewError::EmptyResult));
        assert_eq!(
            *dispatcher.source.markup_calls.lock().unwrap(),
            vec![MarkupStrategy::Raw]
        );
    }

    #[test]
    fn empty_table_is_an_empty_result() {
        let dispatcher = Dispatcher::new(MockSource {
            table: Some(PointTable::default()),
            ..Default::default()
        });
        let result = tokio_test::block_on(dispatcher.load_from_url("http://host/a.tsv"));
        assert_eq!(result, Err(GeoviewError::EmptyResult));
    }

    #[test]
    fn custom_strategy_order() {
        let mut markup = HashMap::new();
        markup.insert(MarkupStrategy::Raw, collection(1));
        markup.insert(MarkupStrategy::Binary, collection(3));
        let dispatcher = Dispatcher::new(MockSource {
            markup,
            ..Default::default()
        })
        .with_strategies([MarkupStrategy::Binary, MarkupStrategy::Raw]);

        assert_eq!(
            dispatcher.strategies(),
            [MarkupStrategy::Binary, MarkupStrategy::Raw]
        );
        let dataset = tokio_test::block_on(dispatcher.load_from_url("http://host/a.kml")).unwrap();
        assert_eq!(dataset.len(), 3);

        let dispatcher = dispatcher.with_strategies([]);
        assert_matches!(
            tokio_test::block_on(dispatcher.load_from_url("http://host/a.kml")),
            Err(GeoviewError::StrategiesExhausted(_))
        );
    }
}
