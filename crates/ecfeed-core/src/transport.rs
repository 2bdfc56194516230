//! HTTP transport to the generation service.
//!
//! [`Transport`] is the seam between the request orchestrator and the
//! network. [`HttpTransport`] talks HTTPS with a client certificate;
//! [`ScriptedTransport`] replays canned bodies for tests.

use std::collections::VecDeque;
use std::io::Read;
use std::ops::ControlFlow;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::config::PemPaths;
use crate::error::TransportError;

const READ_BUFFER: usize = 8 * 1024;

pub trait Transport: Send + Sync {
    /// GET `url` and feed the body to `on_chunk` as it arrives.
    ///
    /// Returning `ControlFlow::Break` from the callback aborts the transfer;
    /// that is not an error.
    fn stream(
        &self,
        url: &str,
        on_chunk: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> Result<(), TransportError>;

    /// POST a JSON body and return the response text.
    fn post(&self, url: &str, body: &str) -> Result<String, TransportError>;
}

/// HTTPS transport authenticated with a PEM client certificate.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(
        pem: &PemPaths,
        connect_timeout: Option<Duration>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let read = |path: &std::path::Path| {
            std::fs::read(path).map_err(|source| TransportError::Credential {
                path: path.to_path_buf(),
                source,
            })
        };

        let mut identity_pem = read(pem.cert.as_path())?;
        identity_pem.push(b'\n');
        identity_pem.extend(read(pem.key.as_path())?);
        let identity = reqwest::Identity::from_pem(&identity_pem).map_err(TransportError::Client)?;

        let mut builder = Client::builder().use_rustls_tls().identity(identity);
        for certificate in
            reqwest::Certificate::from_pem_bundle(&read(pem.ca.as_path())?).map_err(TransportError::Client)?
        {
            builder = builder.add_root_certificate(certificate);
        }
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        // The blocking client otherwise applies a 30s total timeout.
        builder = builder.timeout(request_timeout);

        let client = builder.build().map_err(TransportError::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn stream(
        &self,
        url: &str,
        on_chunk: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> Result<(), TransportError> {
        debug!(url, "GET");
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut buffer = vec![0u8; READ_BUFFER];
        loop {
            let n = response.read(&mut buffer).map_err(TransportError::Body)?;
            if n == 0 {
                break;
            }
            if on_chunk(&buffer[..n]).is_break() {
                debug!(url, "Transfer aborted by the stream handler");
                break;
            }
        }
        Ok(())
    }

    fn post(&self, url: &str, body: &str) -> Result<String, TransportError> {
        debug!(url, bytes = body.len(), "POST");
        let request_err = |source| TransportError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(request_err)
    }
}

// ── Scripted transport ───────────────────────────────────────────────

#[derive(Debug)]
enum ScriptedBody {
    Chunks(Vec<Vec<u8>>),
    Fail(String),
}

/// In-memory transport replaying scripted response bodies in order.
///
/// Every GET consumes the next scripted body; POST answers with the next
/// scripted reply, or `{"status":"END_DATA"}` when none is left. Requests are
/// recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    bodies: Mutex<VecDeque<ScriptedBody>>,
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, String)>>,
    delivered: Mutex<usize>,
}

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a body delivered one line per chunk, newlines included.
    pub fn add_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let chunks = lines
            .into_iter()
            .map(|line| format!("{}\n", line.as_ref()).into_bytes())
            .collect();
        self.add_chunks(chunks);
    }

    /// Script a body delivered exactly as the given chunks.
    pub fn add_chunks(&self, chunks: Vec<Vec<u8>>) {
        locked(&self.bodies).push_back(ScriptedBody::Chunks(chunks));
    }

    /// Script a GET that fails before any byte arrives.
    pub fn add_failure(&self, message: impl Into<String>) {
        locked(&self.bodies).push_back(ScriptedBody::Fail(message.into()));
    }

    pub fn add_reply(&self, body: impl Into<String>) {
        locked(&self.replies).push_back(body.into());
    }

    /// URLs of every GET issued so far.
    pub fn requests(&self) -> Vec<String> {
        locked(&self.requests).clone()
    }

    /// `(url, body)` of every POST issued so far.
    pub fn posts(&self) -> Vec<(String, String)> {
        locked(&self.posts).clone()
    }

    /// Chunks handed to stream callbacks so far.
    pub fn delivered(&self) -> usize {
        *locked(&self.delivered)
    }
}

impl Transport for ScriptedTransport {
    fn stream(
        &self,
        url: &str,
        on_chunk: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> Result<(), TransportError> {
        locked(&self.requests).push(url.to_string());

        let body = locked(&self.bodies).pop_front();
        match body {
            None => Err(TransportError::Connection(format!(
                "no scripted response for {url}"
            ))),
            Some(ScriptedBody::Fail(message)) => Err(TransportError::Connection(message)),
            Some(ScriptedBody::Chunks(chunks)) => {
                for chunk in chunks {
                    *locked(&self.delivered) += 1;
                    if on_chunk(&chunk).is_break() {
                        break;
                    }
                }
                Ok(())
            }
        }
    }

    fn post(&self, url: &str, body: &str) -> Result<String, TransportError> {
        locked(&self.posts).push((url.to_string(), body.to_string()));
        Ok(locked(&self.replies)
            .pop_front()
            .unwrap_or_else(|| r#"{"status":"END_DATA"}"#.to_string()))
    }
}
