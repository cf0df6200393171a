//! Scripted completion driver for testing.

use async_trait::async_trait;
use fabula_core::{GenerateRequest, GenerateResponse, Role};
use fabula_error::{FabulaResult, ModelsError, ModelsErrorKind};
use fabula_interface::CompletionDriver;
use fabula_narrative::PromptTemplates;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Which pipeline stage sent a request, judged by its system message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Analysis,
    Extraction,
    Review,
    Prose,
}

/// A single scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    Error(ModelsErrorKind),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Completion driver that replays a script per request kind and records
/// every request it receives.
///
/// Scripts are kept per kind so that analysis and extraction, which run
/// concurrently, stay deterministic.
pub struct MockDriver {
    scripts: Mutex<HashMap<RequestKind, VecDeque<MockResponse>>>,
    requests: Mutex<Vec<(RequestKind, GenerateRequest)>>,
    cancel_on_prose: Option<(usize, CancellationToken)>,
    templates: PromptTemplates,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            cancel_on_prose: None,
            templates: PromptTemplates::default(),
        }
    }

    pub fn script(self, kind: RequestKind, responses: Vec<MockResponse>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .extend(responses);
        self
    }

    pub fn analysis(self, responses: Vec<MockResponse>) -> Self {
        self.script(RequestKind::Analysis, responses)
    }

    pub fn extraction(self, responses: Vec<MockResponse>) -> Self {
        self.script(RequestKind::Extraction, responses)
    }

    pub fn review(self, responses: Vec<MockResponse>) -> Self {
        self.script(RequestKind::Review, responses)
    }

    pub fn prose(self, responses: Vec<MockResponse>) -> Self {
        self.script(RequestKind::Prose, responses)
    }

    /// Cancel `token` when the `n`th prose request arrives, and never answer
    /// that request.
    pub fn cancel_on_prose(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_on_prose = Some((n, token));
        self
    }

    /// Every recorded request of one kind, in arrival order.
    pub fn requests(&self, kind: RequestKind) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// The user prompt of every recorded request of one kind.
    pub fn prompts(&self, kind: RequestKind) -> Vec<String> {
        self.requests(kind)
            .iter()
            .filter_map(|r| r.last_user_message().map(str::to_string))
            .collect()
    }

    pub fn call_count(&self, kind: RequestKind) -> usize {
        self.requests(kind).len()
    }

    fn classify(&self, req: &GenerateRequest) -> RequestKind {
        let system = req
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        if system == self.templates.analysis_system() {
            RequestKind::Analysis
        } else if system == self.templates.extraction_system() {
            RequestKind::Extraction
        } else if system == self.templates.review_system() {
            RequestKind::Review
        } else {
            RequestKind::Prose
        }
    }
}

#[async_trait]
impl CompletionDriver for MockDriver {
    async fn generate(&self, req: &GenerateRequest) -> FabulaResult<GenerateResponse> {
        let kind = self.classify(req);
        let seen = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((kind, req.clone()));
            requests.iter().filter(|(k, _)| *k == kind).count()
        };

        if kind == RequestKind::Prose {
            if let Some((n, token)) = &self.cancel_on_prose {
                if seen == *n {
                    token.cancel();
                    std::future::pending::<()>().await;
                }
            }
        }

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(MockResponse::Text(text)) => Ok(GenerateResponse::text(text)),
            Some(MockResponse::Error(kind)) => Err(ModelsError::new(kind).into()),
            None => Err(ModelsError::new(ModelsErrorKind::InvalidRequest(format!(
                "mock script for {:?} exhausted",
                kind
            )))
            .into()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
