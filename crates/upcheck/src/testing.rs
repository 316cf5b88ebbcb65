//! Testing utilities: a scriptable transport, a hand-driven timer and a
//! listener that records what it receives.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};

use crate::events::{ListenerHandle, ListenerRegistry};
use crate::timer::{Timer, TimerCallback};
use crate::transport::{ServerResponse, Transport, WebRequest};

struct PendingRequest {
    request: WebRequest,
    responder: oneshot::Sender<ServerResponse>,
}

/// Mock transport for testing
///
/// By default every request is held until the test answers it with
/// [`MockTransport::respond_next`]. A transport built with
/// [`MockTransport::with_response`] answers immediately instead.
#[derive(Default)]
pub struct MockTransport {
    auto_response: Mutex<Option<ServerResponse>>,
    pending: Mutex<VecDeque<PendingRequest>>,
    requests: Mutex<Vec<WebRequest>>,
    arrived: Notify,
}

impl MockTransport {
    /// Create a transport that holds requests until answered
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that answers every request with `response`
    pub fn with_response(response: ServerResponse) -> Self {
        let transport = Self::default();
        *transport.auto_response.lock() = Some(response);
        transport
    }

    /// Change the immediate response, `None` to hold requests again
    pub fn set_response(&self, response: Option<ServerResponse>) {
        *self.auto_response.lock() = response;
    }

    /// URLs of every request received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.url().to_string())
            .collect()
    }

    /// Number of requests waiting for an answer
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Wait until a request is pending and return its URL without answering
    pub async fn wait_for_request(&self) -> String {
        loop {
            let notified = self.arrived.notified();
            let front = self
                .pending
                .lock()
                .front()
                .map(|pending| pending.request.url().to_string());
            if let Some(url) = front {
                return url;
            }
            notified.await;
        }
    }

    /// Wait for the oldest pending request, answer it and return its URL
    pub async fn respond_next(&self, response: ServerResponse) -> String {
        loop {
            let notified = self.arrived.notified();
            let next = self.pending.lock().pop_front();
            if let Some(pending) = next {
                let url = pending.request.url().to_string();
                let _ = pending.responder.send(response);
                return url;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: WebRequest) -> ServerResponse {
        self.requests.lock().push(request.clone());

        let auto_response = self.auto_response.lock().clone();
        if let Some(response) = auto_response {
            return response;
        }

        let (responder, rx) = oneshot::channel();
        self.pending
            .lock()
            .push_back(PendingRequest { request, responder });
        self.arrived.notify_one();

        rx.await
            .unwrap_or_else(|_| ServerResponse::failed("request abandoned"))
    }
}

/// Timer that only fires when the test says so
#[derive(Default)]
pub struct ManualTimer {
    scheduled: Mutex<Vec<(Duration, TimerCallback)>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays of every timer not yet fired, in scheduling order
    pub fn pending(&self) -> Vec<Duration> {
        self.scheduled.lock().iter().map(|(d, _)| *d).collect()
    }

    /// Fire every scheduled timer, regardless of delay.
    ///
    /// Timers scheduled by the callbacks themselves stay queued.
    pub fn fire_all(&self) -> usize {
        let due: Vec<_> = self.scheduled.lock().drain(..).collect();
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }

    /// Fire only timers scheduled with a zero delay
    pub fn fire_immediate(&self) -> usize {
        let due: Vec<_> = {
            let mut scheduled = self.scheduled.lock();
            let (due, rest) = scheduled.drain(..).partition(|(d, _)| d.is_zero());
            *scheduled = rest;
            due
        };
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }
}

impl Timer for ManualTimer {
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) {
        self.scheduled.lock().push((delay, callback));
    }

    fn cancel_all(&self) {
        self.scheduled.lock().clear();
    }
}

/// Listener that records every URL it is handed
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    calls: Arc<Mutex<Vec<String>>>,
    handle: Option<ListenerHandle>,
}

impl RecordingListener {
    /// Register a new recorder with `registry`
    pub fn attach(registry: &ListenerRegistry) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let handle = registry.add(move |url| sink.lock().push(url.to_string()));
        Self {
            calls,
            handle: Some(handle),
        }
    }

    pub fn handle(&self) -> Option<ListenerHandle> {
        self.handle
    }

    /// URLs received so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_mock_transport_auto_response() {
        let transport = MockTransport::with_response(ServerResponse::ok(200, "{}"));
        let response = transport
            .get(WebRequest::new("https://example.com/").unwrap())
            .await;
        assert_eq!(response.response_text, "{}");
        assert_eq!(transport.requests(), vec!["https://example.com/".to_string()]);
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_transport_deferred_response() {
        let transport = Arc::new(MockTransport::new());

        let client = transport.clone();
        let request = tokio::spawn(async move {
            client
                .get(WebRequest::new("https://example.com/a").unwrap())
                .await
        });

        let url = transport
            .respond_next(ServerResponse::ok(404, "missing"))
            .await;
        assert_eq!(url, "https://example.com/a");

        let response = request.await.unwrap();
        assert_eq!(response.response_status, 404);
    }

    #[test]
    fn test_manual_timer() {
        let timer = ManualTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for secs in [0, 60] {
            let fired = fired.clone();
            timer.schedule_once(
                Duration::from_secs(secs),
                Box::new(move || {
                    fired.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        assert_eq!(timer.fire_immediate(), 1);
        assert_eq!(timer.pending(), vec![Duration::from_secs(60)]);
        assert_eq!(timer.fire_all(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(timer.pending().is_empty());

        timer.schedule_once(Duration::from_secs(5), Box::new(|| {}));
        timer.cancel_all();
        assert_eq!(timer.fire_all(), 0);
    }

    #[test]
    fn test_recording_listener() {
        let registry = ListenerRegistry::new();
        let listener = RecordingListener::attach(&registry);
        registry.emit("https://foo.bar/");
        assert_eq!(listener.calls(), vec!["https://foo.bar/".to_string()]);
        assert!(registry.remove(listener.handle().unwrap()));
    }
}
