use ecfeed_params::{GenerationRequest, TemplateType};

/// Whether the server streams formatted export lines or the test-case protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Export,
    Generate,
}

/// Everything one request needs, fixed when the request is built.
///
/// Shared read-only between the caller, the stream worker and the feedback
/// ledger. State learned while streaming lives in the queue and the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDescriptor {
    pub model: String,
    pub method: String,
    pub kind: RequestKind,
    pub request: GenerationRequest,
    pub generator_address: String,
    pub client_id: String,
}

impl SessionDescriptor {
    /// `requestType` URL parameter.
    ///
    /// A RAW export asks for the plain data stream.
    pub fn request_type(&self) -> &'static str {
        match (self.kind, self.template()) {
            (RequestKind::Export, Some(TemplateType::Raw)) | (RequestKind::Generate, _) => {
                "requestData"
            }
            (RequestKind::Export, _) => "requestExport",
        }
    }

    /// Template requested from the server, if any.
    pub fn template(&self) -> Option<TemplateType> {
        match self.kind {
            RequestKind::Export => Some(self.request.common.template.unwrap_or_default()),
            RequestKind::Generate => None,
        }
    }

    /// Template sent on the wire. RAW is expressed by the request type instead.
    pub fn wire_template(&self) -> Option<TemplateType> {
        self.template().filter(|t| *t != TemplateType::Raw)
    }

    pub fn feedback_enabled(&self) -> bool {
        self.kind == RequestKind::Generate && self.request.common.feedback
    }

    pub fn label(&self) -> Option<&str> {
        self.request.common.label.as_deref()
    }
}
