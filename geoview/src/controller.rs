//! Runs loads on the async runtime and delivers their results to the viewer state.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use log::debug;

use crate::async_runtime;
use crate::dataset::Dataset;
use crate::error::GeoviewError;
use crate::loader::{DataSource, Dispatcher};
use crate::messenger::{DummyMessenger, Messenger};
use crate::state::{LoadOutcome, LoadTicket, ViewerState};

type Completion = (LoadTicket, Result<Dataset, GeoviewError>);

/// Starts loads for submitted urls and applies their results.
///
/// Loads run concurrently on the async runtime. Their results are queued and applied to the
/// [`ViewerState`] only when [`LoadController::poll`] is called from the UI thread, so the state
/// always has a single writer. The messenger is notified when a result is queued, so that the UI
/// can wake up and poll.
pub struct LoadController<S> {
    dispatcher: Arc<Dispatcher<S>>,
    messenger: Arc<dyn Messenger>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl<S: DataSource + 'static> LoadController<S> {
    /// Creates a controller that loads files with the given dispatcher.
    pub fn new(dispatcher: Dispatcher<S>) -> Self {
        let (sender, receiver) = channel();
        Self {
            dispatcher: Arc::new(dispatcher),
            messenger: Arc::new(DummyMessenger),
            sender,
            receiver,
        }
    }

    /// Sets the messenger notified when a load completes.
    pub fn with_messenger(mut self, messenger: impl Messenger + 'static) -> Self {
        self.messenger = Arc::new(messenger);
        self
    }

    /// Submits the url from the form of the state and starts loading it.
    ///
    /// Returns the ticket of the started load, `None` if the input is blank, or the error if the
    /// url was rejected.
    pub fn submit(&self, state: &mut ViewerState) -> Result<Option<LoadTicket>, GeoviewError> {
        let ticket = state.url_submitted()?;
        if let Some(ticket) = &ticket {
            self.start(ticket.clone());
        }

        Ok(ticket)
    }

    /// Starts loading the url of the ticket in background.
    pub fn start(&self, ticket: LoadTicket) {
        debug!("Starting load #{} of {}", ticket.generation, ticket.url);

        let dispatcher = self.dispatcher.clone();
        let messenger = self.messenger.clone();
        let sender = self.sender.clone();
        async_runtime::spawn(async move {
            let result = dispatcher.load_from_url(&ticket.url).await;
            if sender.send((ticket, result)).is_ok() {
                messenger.request_redraw();
            }
        });
    }

    /// Applies all completed loads to the state in the order they completed. Returns the number
    /// of results that changed the state.
    pub fn poll(&self, state: &mut ViewerState) -> usize {
        let mut applied = 0;
        while let Ok((ticket, result)) = self.receiver.try_recv() {
            match result {
                Ok(dataset) => {
                    if let LoadOutcome::Applied { .. } = state.load_succeeded(&ticket, dataset) {
                        applied += 1;
                    }
                }
                Err(error) => state.load_failed(&ticket, &error),
            }
        }

        applied
    }
}
