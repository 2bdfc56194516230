//! Streaming client for a remote test-case generation service.
//!
//! [`TestProvider`] issues generate and export requests over mutual TLS and
//! hands back a [`StreamQueue`] that fills while the response streams in.
//! Generated [`TestCase`]s carry a feedback handle; once every case has a
//! verdict and the stream is done, the results are posted back in one request.

pub mod case;
pub mod config;
pub mod error;
pub mod feedback;
pub mod logging;
pub mod provider;
pub mod queue;
pub mod request;
pub mod session;
pub mod transport;

pub use case::TestCase;
pub use config::{CredentialProvider, CredentialSource, PemPaths, ProviderConfig};
pub use error::{ConfigError, ProviderError, TransportError};
pub use feedback::{
    FeedbackHandle, FeedbackLedger, FeedbackRecord, FeedbackReport, FeedbackSink, Status, Verdict,
};
pub use provider::{ExportQueue, TestProvider, TestQueue};
pub use queue::StreamQueue;
pub use session::{RequestKind, SessionDescriptor};
pub use transport::{HttpTransport, ScriptedTransport, Transport};

pub use ecfeed_params as params;
pub use ecfeed_protocol as protocol;
