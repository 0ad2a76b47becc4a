#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Semaphore, mpsc};

use autobrowse::{
    AutoGrowBuilder, Container, Event, KeyValueStore, MemoryStore, PageRequest, Transport,
    Viewport, items_at,
};

/// A mock transport that replays scripted responses in order and records
/// every request it sees.
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Value, String>>>,
    requests: Mutex<Vec<PageRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockTransport {
    /// Create a mock answering each request with the next page.
    pub fn with_pages(pages: Vec<Value>) -> Self {
        Self::with_responses(pages.into_iter().map(Ok).collect())
    }

    /// Create a mock from a sequence of responses; `Err` entries fail the request.
    pub fn with_responses(responses: Vec<Result<Value, String>>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Create a mock whose responses are held back until the returned
    /// semaphore receives a permit per response.
    pub fn gated(pages: Vec<Value>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut mock = Self::with_pages(pages);
        mock.gate = Some(gate.clone());
        (mock, gate)
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &str, request: PageRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request);

        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!(
                "MockTransport: no response scripted for {}",
                request.endpoint(url)
            )),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Viewport whose scroll offset the test moves by hand.
pub struct ManualViewport {
    top: AtomicU64,
    height: u64,
}

impl ManualViewport {
    pub fn new(height: u64) -> Self {
        Self {
            top: AtomicU64::new(0),
            height,
        }
    }
}

impl Viewport for ManualViewport {
    fn scroll_top(&self) -> u64 {
        self.top.load(Ordering::SeqCst)
    }

    fn height(&self) -> u64 {
        self.height
    }

    fn set_scroll_top(&self, top: u64) {
        self.top.store(top, Ordering::SeqCst);
    }
}

/// Records what went through the renderer and the completion callback.
#[derive(Clone, Default)]
pub struct Recorder {
    pub rendered: Arc<Mutex<Vec<Value>>>,
    pub completed: Arc<Mutex<Vec<Value>>>,
}

impl Recorder {
    pub fn rendered(&self) -> Vec<Value> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<Value> {
        self.completed.lock().unwrap().clone()
    }

    /// Wire the recorder into a builder as renderer and `on_complete` callback.
    pub fn install(&self, builder: AutoGrowBuilder) -> AutoGrowBuilder {
        let rendered = self.rendered.clone();
        let completed = self.completed.clone();
        builder
            .renderer(move |page: &Value| -> Result<String> {
                rendered.lock().unwrap().push(page.clone());
                Ok(format!("<ul>{}</ul>", page["items"]))
            })
            .on_complete(move |page: &mut Value| {
                completed.lock().unwrap().push(page.clone());
            })
    }
}

/// A page carrying `items` items whose names start at `first`.
pub fn page(first: usize, items: usize) -> Value {
    let items: Vec<Value> = (first..first + items)
        .map(|i| json!({ "name": format!("item-{}", i) }))
        .collect();
    json!({ "items": items })
}

/// Builder wired to the mocks, counting items at `/items`.
pub fn builder(
    url: &str,
    transport: Arc<MockTransport>,
    container: Arc<dyn Container>,
    viewport: Arc<dyn Viewport>,
) -> AutoGrowBuilder {
    autobrowse::AutoGrow::builder(url)
        .transport(transport)
        .container(container)
        .viewport(viewport)
        .items_returned(items_at("/items"))
}

/// Store holding a previous session's state for `url`.
pub async fn seeded_store(url: &str, pages: Vec<Value>, offset: u64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set("autogrowStorageKey", &json!(url)).await.unwrap();
    store.set("autogrowStorage", &Value::Array(pages)).await.unwrap();
    store.set("autogrowOffset", &json!(offset)).await.unwrap();
    store.set("autogrowScrollTop", &json!(0)).await.unwrap();
    store
}

/// Wait for the first event matching `pred`, discarding the others.
pub async fn wait_for(
    events: &mut mpsc::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Event {
    loop {
        let event = events.recv().await.expect("event stream closed");
        if pred(&event) {
            return event;
        }
    }
}
