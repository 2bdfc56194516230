//! Request orchestration: build a session, stream it on a worker thread,
//! and feed the decoded results into a [`StreamQueue`].

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};

use ecfeed_params::{
    CartesianParams, GeneratorParams, NWiseParams, PairwiseParams, RandomParams, StaticParams,
};
use ecfeed_protocol::{
    decode_message, decode_method_header, materialize, InfoMessage, LineSplitter, MethodHeader,
    MethodInfo, ProtocolMessage,
};
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn, Span};

use crate::case::TestCase;
use crate::config::{CredentialProvider, ProviderConfig};
use crate::error::ProviderError;
use crate::feedback::{FeedbackLedger, FeedbackReport, FeedbackSink};
use crate::queue::StreamQueue;
use crate::request::{feedback_body, feedback_url, request_url};
use crate::session::{RequestKind, SessionDescriptor};
use crate::transport::{HttpTransport, Transport};

/// Queue of generated test cases.
pub type TestQueue = StreamQueue<TestCase>;

/// Queue of exported lines.
pub type ExportQueue = StreamQueue<String>;

/// Client for one model on the generation service.
///
/// Every `generate*`/`export*` call returns its queue immediately and streams
/// on a background thread. Requests from one provider run one at a time.
pub struct TestProvider {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    in_flight: Arc<Mutex<()>>,
}

impl TestProvider {
    /// Connect over HTTPS using the configured credentials.
    ///
    /// A keystore configuration needs `credentials` to produce PEM files.
    pub fn new(
        config: ProviderConfig,
        credentials: Option<&dyn CredentialProvider>,
    ) -> Result<Self, ProviderError> {
        config.validate()?;
        let pem = config.resolve_credentials(credentials)?;
        let transport =
            HttpTransport::new(&pem, config.connect_timeout(), config.request_timeout())?;
        info!(
            model = %config.model,
            address = %config.generator_address,
            "Test provider ready"
        );
        Self::with_transport(config, Arc::new(transport))
    }

    /// Use an existing transport instead of building an HTTPS client.
    pub fn with_transport(
        config: ProviderConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ProviderError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            in_flight: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn generator_address(&self) -> &str {
        &self.config.generator_address
    }

    fn session<P: GeneratorParams>(
        &self,
        method: &str,
        params: &P,
        kind: RequestKind,
    ) -> Arc<SessionDescriptor> {
        let request = params.to_request();
        Arc::new(SessionDescriptor {
            model: request
                .common
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            method: method.to_string(),
            kind,
            request,
            generator_address: self.config.generator_address.clone(),
            client_id: self.config.client_id.clone(),
        })
    }

    fn spawn<F>(&self, job: F) -> Result<(), ProviderError>
    where
        F: FnOnce() + Send + 'static,
    {
        let in_flight = Arc::clone(&self.in_flight);
        let span = Span::current();
        std::thread::Builder::new()
            .name("ecfeed-stream".to_string())
            .spawn(move || {
                let _enter = span.enter();
                let _serialized = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                job();
            })
            .map_err(ProviderError::Spawn)?;
        Ok(())
    }

    // ── Generate ─────────────────────────────────────────────────────

    /// Stream test cases for `method`.
    #[instrument(name = "ecfeed.generate", skip(self, params))]
    pub fn generate<P: GeneratorParams>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<Arc<TestQueue>, ProviderError> {
        let session = self.session(method, params, RequestKind::Generate);
        let sink = Arc::new(FeedbackPoster {
            transport: Arc::clone(&self.transport),
        });
        let ledger = Arc::new(FeedbackLedger::new(Arc::clone(&session), sink));
        let queue = Arc::new(TestQueue::with_ledger(ledger));

        let url = request_url(&session);
        debug!(%url, feedback = session.feedback_enabled(), "Generate request");

        let transport = Arc::clone(&self.transport);
        let worker_queue = Arc::clone(&queue);
        self.spawn(move || run_generate(transport.as_ref(), &url, &worker_queue))?;
        Ok(queue)
    }

    pub fn generate_nwise(
        &self,
        method: &str,
        params: &NWiseParams,
    ) -> Result<Arc<TestQueue>, ProviderError> {
        self.generate(method, params)
    }

    pub fn generate_pairwise(
        &self,
        method: &str,
        params: &PairwiseParams,
    ) -> Result<Arc<TestQueue>, ProviderError> {
        self.generate(method, params)
    }

    pub fn generate_random(
        &self,
        method: &str,
        params: &RandomParams,
    ) -> Result<Arc<TestQueue>, ProviderError> {
        self.generate(method, params)
    }

    pub fn generate_cartesian(
        &self,
        method: &str,
        params: &CartesianParams,
    ) -> Result<Arc<TestQueue>, ProviderError> {
        self.generate(method, params)
    }

    pub fn generate_static(
        &self,
        method: &str,
        params: &StaticParams,
    ) -> Result<Arc<TestQueue>, ProviderError> {
        self.generate(method, params)
    }

    // ── Export ───────────────────────────────────────────────────────

    /// Stream formatted export lines for `method`.
    #[instrument(name = "ecfeed.export", skip(self, params))]
    pub fn export<P: GeneratorParams>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<Arc<ExportQueue>, ProviderError> {
        let session = self.session(method, params, RequestKind::Export);
        let queue = Arc::new(ExportQueue::new());

        let url = request_url(&session);
        debug!(%url, template = ?session.template(), "Export request");

        let transport = Arc::clone(&self.transport);
        let worker_queue = Arc::clone(&queue);
        self.spawn(move || run_export(transport.as_ref(), &url, &worker_queue))?;
        Ok(queue)
    }

    pub fn export_nwise(
        &self,
        method: &str,
        params: &NWiseParams,
    ) -> Result<Arc<ExportQueue>, ProviderError> {
        self.export(method, params)
    }

    pub fn export_pairwise(
        &self,
        method: &str,
        params: &PairwiseParams,
    ) -> Result<Arc<ExportQueue>, ProviderError> {
        self.export(method, params)
    }

    pub fn export_random(
        &self,
        method: &str,
        params: &RandomParams,
    ) -> Result<Arc<ExportQueue>, ProviderError> {
        self.export(method, params)
    }

    pub fn export_cartesian(
        &self,
        method: &str,
        params: &CartesianParams,
    ) -> Result<Arc<ExportQueue>, ProviderError> {
        self.export(method, params)
    }

    pub fn export_static(
        &self,
        method: &str,
        params: &StaticParams,
    ) -> Result<Arc<ExportQueue>, ProviderError> {
        self.export(method, params)
    }

    // ── Introspection ────────────────────────────────────────────────

    /// Parameter metadata of `method`, learned from an empty random request.
    ///
    /// Empty if the server never announced the method.
    pub fn method_info(&self, method: &str) -> Result<MethodInfo, ProviderError> {
        let queue = self.generate(method, &RandomParams::default().length(0))?;
        let info = queue.await_method_metadata();
        if info.is_none() {
            warn!(
                method,
                failure = queue.failure().as_deref().unwrap_or("none"),
                "Stream ended without method info"
            );
        }
        Ok(info.unwrap_or_default())
    }

    pub fn argument_names(&self, method: &str) -> Result<Vec<String>, ProviderError> {
        Ok(self.method_info(method)?.arg_names)
    }

    pub fn argument_types(&self, method: &str) -> Result<Vec<String>, ProviderError> {
        Ok(self.method_info(method)?.arg_types)
    }
}

// ── Stream workers ───────────────────────────────────────────────────

/// Feed a transport body through `handle_line`, then finish the queue.
fn pump<T, F>(transport: &dyn Transport, url: &str, queue: &StreamQueue<T>, mut handle_line: F)
where
    F: FnMut(String) -> ControlFlow<()>,
{
    let mut splitter = LineSplitter::new();
    let mut aborted = false;

    let result = transport.stream(url, &mut |chunk: &[u8]| {
        for line in splitter.push(chunk) {
            if handle_line(line).is_break() {
                aborted = true;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    });

    match result {
        Ok(()) if !aborted => {
            if let Some(line) = splitter.finish() {
                let _ = handle_line(line);
            }
        }
        Ok(()) => {}
        Err(e) => {
            error!("Stream failed: {e}");
            queue.set_failure(e.to_string());
        }
    }

    queue.finish();
}

fn run_generate(transport: &dyn Transport, url: &str, queue: &TestQueue) {
    let mut stream = GenerateStream {
        queue,
        method: None,
    };
    pump(transport, url, queue, |line| stream.handle_line(&line));
    debug!(produced = queue.len(), "Generate stream finished");
}

fn run_export(transport: &dyn Transport, url: &str, queue: &ExportQueue) {
    pump(transport, url, queue, |line| {
        if let Some(message) = export_error(&line) {
            error!("Export failed: {message}");
            queue.set_failure(message);
            return ControlFlow::Break(());
        }
        queue.push(line);
        ControlFlow::Continue(())
    });
}

/// Message of an export line that is a single-key `error` object.
fn export_error(line: &str) -> Option<String> {
    if !line.trim_start().starts_with('{') {
        return None;
    }
    let object: Map<String, Value> = serde_json::from_str(line).ok()?;
    if object.len() != 1 {
        return None;
    }
    object.get("error").map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Parsing state of one generate stream.
struct GenerateStream<'a> {
    queue: &'a TestQueue,
    /// Set once from the first method header.
    method: Option<MethodInfo>,
}

impl GenerateStream<'_> {
    fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        if line.trim().is_empty() {
            return ControlFlow::Continue(());
        }

        let message = match decode_message(line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Skipping line: {e}");
                return ControlFlow::Continue(());
            }
        };

        match message {
            ProtocolMessage::Info(InfoMessage::Alive) => {}
            ProtocolMessage::Info(InfoMessage::Header(text)) => self.on_header(text),
            ProtocolMessage::TestCase(payload) => self.on_test_case(&payload),
            ProtocolMessage::Error(message) => {
                error!("Generation failed: {message}");
                self.queue.set_failure(message);
                return ControlFlow::Break(());
            }
            ProtocolMessage::Status(status) => debug!(%status, "Status message"),
            ProtocolMessage::Other { tag, .. } => debug!(%tag, "Ignoring message"),
        }
        ControlFlow::Continue(())
    }

    fn on_header(&mut self, text: String) {
        if self.method.is_some() {
            debug!("Ignoring repeated method info");
            return;
        }

        let header = decode_method_header(&text).unwrap_or_else(|e| {
            warn!("Cannot parse method info: {e}");
            MethodHeader {
                signature: text,
                test_session_id: None,
                timestamp: None,
                method: MethodInfo::default(),
            }
        });
        debug!(
            method = %header.method.name,
            session = header.test_session_id.as_deref().unwrap_or(""),
            "Method info received"
        );

        self.method = Some(header.method.clone());
        self.queue.set_method_metadata(header);
    }

    fn on_test_case(&mut self, payload: &Value) {
        let Some(method) = &self.method else {
            warn!("Test case received before method info; dropping it");
            return;
        };
        let Some(ledger) = self.queue.ledger() else {
            return;
        };

        let arguments = materialize(payload, method);
        let handle = ledger.register(payload.to_string());
        self.queue.push(TestCase::new(arguments, handle));
    }
}

// ── Feedback ─────────────────────────────────────────────────────────

struct FeedbackPoster {
    transport: Arc<dyn Transport>,
}

impl FeedbackSink for FeedbackPoster {
    fn submit(&self, report: FeedbackReport) {
        post_feedback(self.transport.as_ref(), &report);
    }
}

#[instrument(name = "ecfeed.feedback", skip_all, fields(cases = report.records.len()))]
fn post_feedback(transport: &dyn Transport, report: &FeedbackReport) {
    let Some(session_id) = report
        .header
        .as_ref()
        .and_then(|h| h.test_session_id.as_deref())
    else {
        warn!("No test session id; feedback not sent");
        return;
    };

    let url = feedback_url(&report.session, session_id);
    let body = feedback_body(report).to_string();

    let response = match transport.post(&url, &body) {
        Ok(response) => response,
        Err(e) => {
            error!("Feedback request failed: {e}");
            return;
        }
    };

    for line in response.lines().filter(|l| !l.trim().is_empty()) {
        match decode_message(line) {
            Ok(ProtocolMessage::Status(status)) if status == "END_DATA" => {
                info!("Feedback accepted");
            }
            Ok(ProtocolMessage::Error(message)) => {
                error!("Feedback rejected: {message}");
                return;
            }
            Ok(other) => debug!(?other, "Feedback response"),
            Err(e) => warn!("Unreadable feedback response: {e}"),
        }
    }
}
