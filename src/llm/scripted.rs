//! Scripted `LanguageModel` for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;

use super::{Completion, CompletionRequest, LanguageModel, TextStream, Usage};
use crate::error::{Result, ServiceError};

pub(crate) enum Script {
    Reply(String),
    /// Stream items; `Err` entries become provider errors
    Stream(Vec<std::result::Result<String, String>>),
    Fail(String),
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Script + Send + Sync>;

pub(crate) struct ScriptedModel {
    respond: Responder,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new(respond: impl Fn(&CompletionRequest) -> Script + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Script::Reply(text.clone()))
    }

    pub(crate) fn failing() -> Self {
        Self::new(|_| Script::Fail("scripted failure".to_string()))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().last().cloned()
    }

    fn next(&self, request: &CompletionRequest) -> Script {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        (self.respond)(request)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let text = match self.next(request) {
            Script::Reply(text) => text,
            Script::Stream(parts) => parts.into_iter().filter_map(|p| p.ok()).collect(),
            Script::Fail(message) => return Err(ServiceError::Provider(message)),
        };
        Ok(Completion {
            text,
            model: self.model_name().to_string(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
            },
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<TextStream> {
        let parts = match self.next(request) {
            Script::Reply(text) => vec![Ok(text)],
            Script::Stream(parts) => parts,
            Script::Fail(message) => return Err(ServiceError::Provider(message)),
        };
        let items = parts
            .into_iter()
            .map(|p| p.map_err(ServiceError::Provider));
        Ok(futures::stream::iter(items).boxed())
    }
}
