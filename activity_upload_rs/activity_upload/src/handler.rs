//! Submit handler: select, post, show.
//!
//! One [`SubmitHandler`] lives for as long as the form it serves. Every call
//! to [`SubmitHandler::submit`] is an independent request; nothing orders the
//! responses, so the last one to resolve owns the status text. Callers that
//! want to serialize submissions set `block_while_in_flight`.

use std::cell::Cell;

use futures::future::LocalBoxFuture;
use tracing::{debug, error, info, warn};

use crate::config::{NoMatchPolicy, UploadConfig};
use crate::payload::UploadPayload;
use crate::response::{parse_status, StatusResponse};
use crate::select::{select, NamedFile};
use crate::UploadError;

/// Posts a payload and resolves to the raw response body.
pub trait Transport<F> {
    fn send(
        &self,
        endpoint: &str,
        payload: UploadPayload<F>,
    ) -> LocalBoxFuture<'static, Result<String, UploadError>>;
}

/// Where the user-facing status text goes.
pub trait StatusSink {
    fn show(&self, text: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerState {
    Idle,
    InFlight(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server answered and its message is now on screen.
    Displayed(StatusResponse),
    /// Request or decoding failed; the status text was left alone.
    Failed(UploadError),
    /// Nothing was sent: `NotFound` under the report policy (the not-found
    /// text is on screen), or `Busy` while another request is outstanding.
    Rejected(UploadError),
}

impl SubmitOutcome {
    pub fn is_displayed(&self) -> bool {
        matches!(self, SubmitOutcome::Displayed(_))
    }
}

struct InFlightGuard<'a>(&'a Cell<usize>);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a Cell<usize>) -> Self {
        counter.set(counter.get() + 1);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

pub struct SubmitHandler<T, S> {
    config: UploadConfig,
    transport: T,
    sink: S,
    in_flight: Cell<usize>,
}

impl<T, S: StatusSink> SubmitHandler<T, S> {
    pub fn new(config: UploadConfig, transport: T, sink: S) -> Self {
        Self {
            config,
            transport,
            sink,
            in_flight: Cell::new(0),
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    pub fn state(&self) -> HandlerState {
        match self.in_flight.get() {
            0 => HandlerState::Idle,
            n => HandlerState::InFlight(n),
        }
    }

    pub async fn submit<F>(&self, files: &[F]) -> SubmitOutcome
    where
        F: NamedFile + Clone,
        T: Transport<F>,
    {
        if self.config.block_while_in_flight && self.in_flight.get() > 0 {
            warn!(in_flight = self.in_flight.get(), "submit ignored: upload already in flight");
            return SubmitOutcome::Rejected(UploadError::Busy);
        }

        let target = self.config.target_filename.as_str();
        let selection = select(files, target);
        if !selection.is_found() && self.config.no_match == NoMatchPolicy::Report {
            let text = self.config.not_found_text();
            warn!(wanted = target, selected = files.len(), "no matching file; request skipped");
            self.sink.show(&text);
            return SubmitOutcome::Rejected(UploadError::NotFound {
                target: target.to_string(),
            });
        }

        let payload = UploadPayload::from_selection(selection, self.config.field_name.as_str());
        if payload.is_empty() {
            warn!(wanted = target, "no matching file; posting empty payload");
        }

        let _guard = InFlightGuard::enter(&self.in_flight);
        debug!(
            endpoint = %self.config.endpoint,
            entries = payload.len(),
            in_flight = self.in_flight.get(),
            "upload started"
        );
        let body = match self.transport.send(&self.config.endpoint, payload).await {
            Ok(body) => body,
            Err(err) => {
                error!(error = %err, "error uploading file");
                return SubmitOutcome::Failed(err);
            }
        };
        match parse_status(&body) {
            Ok(resp) => {
                info!("{}", resp.message);
                self.sink.show(&resp.message);
                SubmitOutcome::Displayed(resp)
            }
            Err(err) => {
                error!(error = %err, "error reading upload response");
                SubmitOutcome::Failed(err)
            }
        }
    }
}
