//! State of the viewer and its transitions.

use std::sync::Arc;

use log::{error, info};

use crate::dataset::{Dataset, LayerKind};
use crate::error::GeoviewError;
use crate::layer::{build_layers, LayerSpec};
use crate::loader::SourceFormat;
use crate::viewport::{derive_viewport, Viewport};

/// Identifies one submitted load. Issued by [`ViewerState::url_submitted`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    /// Sequence number of the submission. Later submissions have larger numbers.
    pub generation: u64,
    /// Submitted url.
    pub url: String,
}

/// Result of applying a completed load to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The dataset was replaced. `viewport_moved` is true if the viewport was moved to the new
    /// data.
    Applied {
        /// Whether the viewport was replaced.
        viewport_moved: bool,
    },
    /// A newer load was submitted after this one, the result was dropped.
    Stale,
}

/// What the status line of the form shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadStatus {
    /// Nothing to report.
    #[default]
    Idle,
    /// A load of the url is in progress.
    Loading(String),
    /// The last submission was rejected.
    Rejected(GeoviewError),
}

/// Everything the viewer shows.
///
/// The state is owned by the UI thread and changes only through its transition methods. The
/// layer kind is derived from the dataset, so the two can never disagree.
#[derive(Debug, Clone, Default)]
pub struct ViewerState {
    input_url: String,
    pending_url: Option<String>,
    dataset: Option<Arc<Dataset>>,
    viewport: Viewport,
    generation: u64,
    status: LoadStatus,
}

impl ViewerState {
    /// Creates a state with the given form content and viewport, e.g. restored from the previous
    /// session.
    pub fn restored(input_url: String, viewport: Viewport) -> Self {
        Self {
            input_url,
            viewport,
            ..Default::default()
        }
    }

    /// Text currently in the url field of the form.
    pub fn input_url(&self) -> &str {
        &self.input_url
    }

    /// Url of the last accepted submission.
    pub fn pending_url(&self) -> Option<&str> {
        self.pending_url.as_deref()
    }

    /// Live dataset.
    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    /// Kind of the layer the live dataset is rendered with.
    pub fn layer_kind(&self) -> LayerKind {
        self.dataset
            .as_ref()
            .map(|dataset| dataset.kind())
            .unwrap_or_default()
    }

    /// Current camera position.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Status of the last submission.
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Sets the text of the url field.
    pub fn set_input_url(&mut self, text: impl Into<String>) {
        self.input_url = text.into();
    }

    /// Submits the url from the form.
    ///
    /// Blank input is ignored and returns `Ok(None)`. A url with an unsupported suffix is rejected
    /// with [`GeoviewError::UnrecognizedFormat`], which is also kept as the status. Otherwise the
    /// url becomes pending and a ticket for the new load is returned.
    pub fn url_submitted(&mut self) -> Result<Option<LoadTicket>, GeoviewError> {
        let url = self.input_url.trim();
        if url.is_empty() {
            return Ok(None);
        }

        if SourceFormat::from_url(url).is_none() {
            let error = GeoviewError::UnrecognizedFormat(url.to_string());
            self.status = LoadStatus::Rejected(error.clone());
            return Err(error);
        }

        let url = url.to_string();
        self.generation += 1;
        self.pending_url = Some(url.clone());
        self.status = LoadStatus::Loading(url.clone());

        Ok(Some(LoadTicket {
            generation: self.generation,
            url,
        }))
    }

    /// Applies a successfully loaded dataset.
    ///
    /// Results of superseded submissions are dropped. Otherwise the dataset is replaced and the
    /// viewport is moved to the data if a position can be derived from it.
    pub fn load_succeeded(&mut self, ticket: &LoadTicket, dataset: Dataset) -> LoadOutcome {
        if self.is_stale(ticket) {
            info!("Dropping outdated result of loading {}", ticket.url);
            return LoadOutcome::Stale;
        }

        let viewport = derive_viewport(&dataset);
        if let Some(viewport) = viewport {
            self.viewport = viewport;
        }

        self.dataset = Some(Arc::new(dataset));
        self.finish_loading(ticket);

        LoadOutcome::Applied {
            viewport_moved: viewport.is_some(),
        }
    }

    /// Records a failed load. The live dataset and viewport stay as they were.
    pub fn load_failed(&mut self, ticket: &LoadTicket, error: &GeoviewError) {
        error!("Failed to load {}: {error}", ticket.url);
        if !self.is_stale(ticket) {
            self.finish_loading(ticket);
        }
    }

    /// Replaces the viewport after the user moved the map.
    pub fn viewport_changed(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Layers to draw for the live dataset.
    pub fn layers(&self) -> Vec<LayerSpec> {
        build_layers(self.dataset.as_ref())
    }

    /// Clears the loading status of the ticket. A rejection reported after the ticket was issued
    /// stays visible.
    fn finish_loading(&mut self, ticket: &LoadTicket) {
        if matches!(&self.status, LoadStatus::Loading(url) if *url == ticket.url) {
            self.status = LoadStatus::Idle;
        }
    }

    fn is_stale(&self, ticket: &LoadTicket) -> bool {
        ticket.generation < self.generation
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::dataset::PointTable;

    fn points(longitude: &str, latitude: &str) -> Dataset {
        Dataset::Points(PointTable::new(
            vec!["Longitude".into(), "Latitude".into()],
            vec![vec![longitude.into(), latitude.into()]],
        ))
    }

    fn submit(state: &mut ViewerState, url: &str) -> LoadTicket {
        state.set_input_url(url);
        state.url_submitted().unwrap().unwrap()
    }

    #[test]
    fn initial_state() {
        let state = ViewerState::default();
        assert_eq!(state.viewport(), Viewport::default());
        assert_eq!(state.layer_kind(), LayerKind::None);
        assert!(state.layers().is_empty());
        assert_eq!(state.status(), &LoadStatus::Idle);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut state = ViewerState::default();
        state.set_input_url("   ");
        assert_eq!(state.url_submitted(), Ok(None));
        assert_eq!(state.pending_url(), None);
    }

    #[test]
    fn unrecognized_format_is_reported() {
        let mut state = ViewerState::default();
        state.set_input_url("http://host/data.geojson");
        assert_matches!(
            state.url_submitted(),
            Err(GeoviewError::UnrecognizedFormat(_))
        );
        assert_matches!(
            state.status(),
            LoadStatus::Rejected(GeoviewError::UnrecognizedFormat(_))
        );
        assert_eq!(state.pending_url(), None);
    }

    #[test]
    fn successful_load_replaces_dataset_and_viewport() {
        let mut state = ViewerState::default();
        let ticket = submit(&mut state, "http://host/a.csv");
        assert_eq!(state.pending_url(), Some("http://host/a.csv"));
        assert_eq!(
            state.status(),
            &LoadStatus::Loading("http://host/a.csv".into())
        );

        let outcome = state.load_succeeded(&ticket, points("10.5", "20.25"));
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                viewport_moved: true
            }
        );
        assert_eq!(state.layer_kind(), LayerKind::PointSet);
        assert_eq!(state.viewport(), Viewport::centered_at(10.5, 20.25));
        assert_eq!(state.layers().len(), 1);
        assert_eq!(state.status(), &LoadStatus::Idle);
    }

    #[test]
    fn underivable_viewport_keeps_the_current_one() {
        let mut state = ViewerState::default();
        let moved = Viewport {
            longitude: 3.0,
            ..Default::default()
        };
        state.viewport_changed(moved);

        let ticket = submit(&mut state, "http://host/a.csv");
        let outcome = state.load_succeeded(&ticket, points("east", "north"));
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                viewport_moved: false
            }
        );
        assert_eq!(state.viewport(), moved);
        assert_eq!(state.layer_kind(), LayerKind::PointSet);
    }

    #[test]
    fn failure_preserves_prior_state() {
        let mut state = ViewerState::default();
        let ticket = submit(&mut state, "http://host/a.csv");
        state.load_succeeded(&ticket, points("1", "2"));
        let dataset = state.dataset().cloned();
        let viewport = state.viewport();

        let ticket = submit(&mut state, "http://host/b.kml");
        state.load_failed(&ticket, &GeoviewError::EmptyResult);

        assert_eq!(state.dataset().cloned(), dataset);
        assert_eq!(state.viewport(), viewport);
        assert_eq!(state.layer_kind(), LayerKind::PointSet);
        assert_eq!(state.status(), &LoadStatus::Idle);
    }

    #[test]
    fn rejection_outlives_load_in_flight() {
        let mut state = ViewerState::default();
        let ticket = submit(&mut state, "http://host/a.csv");
        state.set_input_url("http://host/b.txt");
        assert!(state.url_submitted().is_err());

        state.load_succeeded(&ticket, points("1", "2"));
        assert_eq!(state.layer_kind(), LayerKind::PointSet);
        assert_eq!(
            state.status(),
            &LoadStatus::Rejected(GeoviewError::UnrecognizedFormat(
                "http://host/b.txt".into()
            ))
        );

        let ticket = submit(&mut state, "http://host/c.kml");
        state.set_input_url("http://host/d.txt");
        assert!(state.url_submitted().is_err());
        state.load_failed(&ticket, &GeoviewError::EmptyResult);
        assert_matches!(state.status(), LoadStatus::Rejected(_));
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut state = ViewerState::default();
        let first = submit(&mut state, "http://host/slow.csv");
        let second = submit(&mut state, "http://host/fast.csv");
        assert!(second.generation > first.generation);

        state.load_succeeded(&second, points("5", "6"));
        assert_eq!(
            state.load_succeeded(&first, points("1", "2")),
            LoadOutcome::Stale
        );
        assert_eq!(state.viewport(), Viewport::centered_at(5.0, 6.0));
        assert_eq!(state.dataset().map(|d| d.as_ref()), Some(&points("5", "6")));
    }

    #[test]
    fn resubmission_is_idempotent() {
        let mut state = ViewerState::default();
        let ticket = submit(&mut state, "http://host/a.tsv");
        state.load_succeeded(&ticket, points("1", "2"));
        let layers = state.layers();
        let viewport = state.viewport();

        let ticket = submit(&mut state, "http://host/a.tsv");
        state.load_succeeded(&ticket, points("1", "2"));
        assert_eq!(state.layers(), layers);
        assert_eq!(state.viewport(), viewport);
    }

    #[test]
    fn restored_state_keeps_form_and_viewport() {
        let viewport = Viewport::centered_at(1.0, 1.0);
        let state = ViewerState::restored("http://host/a.kml".into(), viewport);
        assert_eq!(state.input_url(), "http://host/a.kml");
        assert_eq!(state.viewport(), viewport);
        assert_eq!(state.dataset(), None);
    }
}
