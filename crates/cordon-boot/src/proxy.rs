//! Caller-side stubs and callee-side adapters over a message port.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::channel::MessagePort;
use crate::error::{BootError, BootResult};

type EventHandler = Box<dyn Fn(Value) + Send + Sync>;
type MethodHandler = Box<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// Turns a message port into either a caller-side stub (consumer) or a
/// callee-side adapter (provider).
///
/// A consumer proxy serializes `call(method, args)` into wire messages
/// and resolves the matching return; `on(event, handler)` fires for
/// events the remote provider emits. A provider proxy inverts the call
/// direction: methods registered locally are invoked by remote callers.
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<ProxyInner>,
}

struct ProxyInner {
    port: Arc<dyn MessagePort>,
    definition: Value,
    is_provider: bool,
    next_call: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
    event_handlers: Mutex<HashMap<String, Vec<EventHandler>>>,
    methods: Mutex<HashMap<String, MethodHandler>>,
}

impl Proxy {
    /// Build a proxy over `port`. `is_provider` selects the call
    /// direction.
    pub fn new(port: Arc<dyn MessagePort>, definition: Value, is_provider: bool) -> Self {
        let inner = Arc::new(ProxyInner {
            definition,
            is_provider,
            next_call: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            event_handlers: Mutex::new(HashMap::new()),
            methods: Mutex::new(HashMap::new()),
            port,
        });

        if let Some(incoming) = inner.port.take_incoming() {
            let dispatch_inner = Arc::clone(&inner);
            tokio::spawn(async move {
                Self::dispatch_loop(dispatch_inner, incoming).await;
            });
        }

        Self { inner }
    }

    /// The API definition this proxy was built with.
    #[must_use]
    pub fn definition(&self) -> &Value {
        &self.inner.definition
    }

    /// Whether this proxy runs in provider mode.
    #[must_use]
    pub fn is_provider(&self) -> bool {
        self.inner.is_provider
    }

    /// Whether two handles refer to the same underlying proxy.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Invoke a remote method and await its return value.
    ///
    /// # Errors
    ///
    /// Fails on a provider-mode proxy, or when the remote end goes away
    /// before answering.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> BootResult<Value> {
        if self.inner.is_provider {
            return Err(BootError::ProviderMode);
        }

        let id = self.inner.next_call.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.inner.pending.lock() {
            pending.insert(id, tx);
        }

        self.inner.port.post(json!({
            "type": "call",
            "id": id,
            "method": method,
            "args": args,
        }));

        rx.await.map_err(|_| BootError::ChannelClosed)
    }

    /// Subscribe to an event the remote provider emits.
    pub fn on(&self, event: &str, handler: impl Fn(Value) + Send + Sync + 'static) {
        if let Ok(mut handlers) = self.inner.event_handlers.lock() {
            handlers
                .entry(event.to_string())
                .or_default()
                .push(Box::new(handler));
        }
    }

    /// Provider mode: expose a local method to remote callers.
    pub fn register(&self, method: &str, f: impl Fn(Vec<Value>) -> Value + Send + Sync + 'static) {
        if let Ok(mut methods) = self.inner.methods.lock() {
            methods.insert(method.to_string(), Box::new(f));
        }
    }

    /// Provider mode: emit an event to remote consumers.
    pub fn emit(&self, event: &str, payload: Value) {
        self.inner.port.post(json!({
            "type": "event",
            "event": event,
            "data": payload,
        }));
    }

    async fn dispatch_loop(inner: Arc<ProxyInner>, mut incoming: mpsc::UnboundedReceiver<Value>) {
        while let Some(message) = incoming.recv().await {
            inner.dispatch(&message);
        }
    }
}

impl ProxyInner {
    fn dispatch(&self, message: &Value) {
        match message.get("type").and_then(Value::as_str) {
            Some("return") if !self.is_provider => {
                let Some(id) = message.get("id").and_then(Value::as_u64) else {
                    return;
                };
                let waiter = self.pending.lock().ok().and_then(|mut p| p.remove(&id));
                if let Some(waiter) = waiter {
                    let _ = waiter.send(message.get("data").cloned().unwrap_or(Value::Null));
                }
            },
            Some("event") if !self.is_provider => {
                let Some(event) = message.get("event").and_then(Value::as_str) else {
                    return;
                };
                let payload = message.get("data").cloned().unwrap_or(Value::Null);
                if let Ok(handlers) = self.event_handlers.lock() {
                    for handler in handlers.get(event).into_iter().flatten() {
                        handler(payload.clone());
                    }
                }
            },
            Some("call") if self.is_provider => {
                let Some(method) = message.get("method").and_then(Value::as_str) else {
                    return;
                };
                let args = message
                    .get("args")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let result = self
                    .methods
                    .lock()
                    .ok()
                    .and_then(|methods| methods.get(method).map(|f| f(args)));
                match result {
                    Some(data) => {
                        self.port.post(json!({
                            "type": "return",
                            "id": message.get("id").cloned().unwrap_or(Value::Null),
                            "data": data,
                        }));
                    },
                    None => {
                        debug!(method, "Call to unregistered provider method ignored");
                    },
                }
            },
            _ => {
                debug!("Unroutable proxy message ignored");
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::pipe;

    #[tokio::test]
    async fn consumer_call_reaches_provider_and_returns() {
        let (consumer_end, provider_end) = pipe();
        let consumer = Proxy::new(Arc::new(consumer_end), Value::Null, false);
        let provider = Proxy::new(Arc::new(provider_end), Value::Null, true);

        provider.register("echo", |args| args.into_iter().next().unwrap_or(Value::Null));

        let result = consumer.call("echo", vec![json!("hello")]).await.unwrap();
        assert_eq!(result, json!("hello"));
    }

    #[tokio::test]
    async fn concurrent_calls_resolve_independently() {
        let (consumer_end, provider_end) = pipe();
        let consumer = Proxy::new(Arc::new(consumer_end), Value::Null, false);
        let provider = Proxy::new(Arc::new(provider_end), Value::Null, true);

        provider.register("id", |args| args.into_iter().next().unwrap_or(Value::Null));

        let (a, b) = tokio::join!(
            consumer.call("id", vec![json!(1)]),
            consumer.call("id", vec![json!(2)]),
        );
        assert_eq!(a.unwrap(), json!(1));
        assert_eq!(b.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn provider_events_fire_consumer_handlers() {
        let (consumer_end, provider_end) = pipe();
        let consumer = Proxy::new(Arc::new(consumer_end), Value::Null, false);
        let provider = Proxy::new(Arc::new(provider_end), Value::Null, true);

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        consumer.on("change", move |payload| {
            let _ = seen_tx.send(payload);
        });

        provider.emit("change", json!({"key": "k"}));
        assert_eq!(seen_rx.recv().await.unwrap(), json!({"key": "k"}));
    }

    #[tokio::test]
    async fn call_on_provider_mode_fails() {
        let (end, _other) = pipe();
        let provider = Proxy::new(Arc::new(end), Value::Null, true);
        assert!(matches!(
            provider.call("x", Vec::new()).await,
            Err(BootError::ProviderMode)
        ));
    }

    #[tokio::test]
    async fn call_without_remote_never_resolves() {
        let (consumer_end, provider_end) = pipe();
        let consumer = Proxy::new(Arc::new(consumer_end), Value::Null, false);
        drop(provider_end);

        // The pipe peer is gone; the pending call can never resolve.
        let pending = consumer.call("x", Vec::new());
        let result = tokio::time::timeout(std::time::Duration::from_millis(50), pending).await;
        assert!(result.is_err());
    }
}
