//! Telegram ingestion worker
//!
//! [`PollingLoop`] long-polls the Bot API and hands each update to the
//! [`UpdateDispatcher`], which answers commands itself and forwards photos and
//! documents to the [`IngestionPipeline`].

pub mod dispatcher;
pub mod pipeline;
pub mod poller;
pub mod replies;

pub use dispatcher::{classify, Event, UpdateDispatcher};
pub use pipeline::{DocumentEvent, IngestError, IngestionPipeline, MediaSource, Submitter};
pub use poller::{DeliveryCursor, PollerConfig, PollerHandle, PollerState, PollingLoop};
pub use replies::Reply;
