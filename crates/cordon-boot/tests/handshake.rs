//! End-to-end handshake: create, reply, capability surface, ready,
//! script import.

use std::sync::{Arc, Mutex};

use cordon_boot::{
    BootPhase, Bootstrap, CapabilityBinding, EnvelopeSender, HostContext, ScriptImporter,
    StaticApiRegistry,
};
use cordon_core::{ControlEnvelope, ControlRequest, Flow};
use serde_json::{json, Value};

#[derive(Default)]
struct RecordingSender {
    posted: Arc<Mutex<Vec<ControlEnvelope>>>,
}

impl EnvelopeSender for RecordingSender {
    fn post(&self, envelope: &ControlEnvelope) -> cordon_boot::BootResult<()> {
        self.posted.lock().unwrap().push(envelope.clone());
        Ok(())
    }

    fn post_to_origin(
        &self,
        envelope: &ControlEnvelope,
        _origin: &str,
    ) -> cordon_boot::BootResult<()> {
        self.posted.lock().unwrap().push(envelope.clone());
        Ok(())
    }
}

struct RecordingImporter {
    urls: Arc<Mutex<Vec<String>>>,
}

impl ScriptImporter for RecordingImporter {
    fn import(&mut self, url: &str) -> cordon_boot::BootResult<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

struct FallbackHost {
    urls: Arc<Mutex<Vec<String>>>,
}

impl HostContext for FallbackHost {
    fn take_native_importer(&mut self) -> Option<Box<dyn ScriptImporter>> {
        None
    }

    fn fallback_importer(&mut self) -> Box<dyn ScriptImporter> {
        Box::new(RecordingImporter {
            urls: Arc::clone(&self.urls),
        })
    }
}

struct Harness {
    bootstrap: Bootstrap,
    posted: Arc<Mutex<Vec<ControlEnvelope>>>,
    imported: Arc<Mutex<Vec<String>>>,
}

fn harness(registry: StaticApiRegistry) -> Harness {
    let sender = RecordingSender::default();
    let posted = Arc::clone(&sender.posted);
    let imported = Arc::new(Mutex::new(Vec::new()));
    let host = FallbackHost {
        urls: Arc::clone(&imported),
    };
    Harness {
        bootstrap: Bootstrap::new(Box::new(sender), Arc::new(registry), Box::new(host)),
        posted,
        imported,
    }
}

fn requests(posted: &Arc<Mutex<Vec<ControlEnvelope>>>) -> Vec<ControlRequest> {
    posted
        .lock()
        .unwrap()
        .iter()
        .filter_map(|env| env.request)
        .collect()
}

fn reply(id: &str, manifest: Value, config: Value) -> ControlEnvelope {
    serde_json::from_value(json!({
        "sourceFlow": "control",
        "id": id,
        "manifest": manifest,
        "config": config,
    }))
    .unwrap()
}

#[tokio::test]
async fn full_handshake_round() {
    let registry = StaticApiRegistry::new().with_api("storage", json!({"get": {}, "set": {}}));
    let mut h = harness(registry);

    // First proxy request kicks off the handshake.
    let _default = h.bootstrap.get_proxy(None);
    assert_eq!(h.bootstrap.phase(), BootPhase::AwaitingId);
    assert_eq!(requests(&h.posted), vec![ControlRequest::Create]);

    h.bootstrap.handle_inbound(reply(
        "X",
        json!({"app": {"script": "a.js"}, "permissions": ["storage"]}),
        json!({}),
    ));

    assert_eq!(h.bootstrap.phase(), BootPhase::Running);
    assert_eq!(h.bootstrap.id().unwrap().as_str(), "X");

    // Capability surface: the permission plus the always-present core.
    let exports = h.bootstrap.exports().unwrap();
    assert!(matches!(
        exports.binding("storage"),
        Some(CapabilityBinding::Consumer { .. })
    ));
    assert!(h.bootstrap.core().is_some());

    // Exactly one ready, after exactly one create.
    assert_eq!(
        requests(&h.posted),
        vec![ControlRequest::Create, ControlRequest::Ready]
    );

    // Bare manifest ids leave the script path untouched.
    assert_eq!(*h.imported.lock().unwrap(), vec!["a.js".to_string()]);
}

#[tokio::test]
async fn duplicate_reply_is_ignored() {
    let registry = StaticApiRegistry::new().with_api("storage", json!({}));
    let mut h = harness(registry);
    let _default = h.bootstrap.get_proxy(None);

    let manifest = json!({"app": {"script": "a.js"}, "permissions": ["storage"]});
    h.bootstrap.handle_inbound(reply("X", manifest.clone(), json!({})));
    h.bootstrap.handle_inbound(reply("Y", manifest, json!({})));

    // Identity unchanged, no second ready, scripts imported once.
    assert_eq!(h.bootstrap.id().unwrap().as_str(), "X");
    assert_eq!(
        requests(&h.posted),
        vec![ControlRequest::Create, ControlRequest::Ready]
    );
    assert_eq!(h.imported.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn scripts_resolve_against_the_assigned_id() {
    let mut h = harness(StaticApiRegistry::new());
    let _default = h.bootstrap.get_proxy(None);

    h.bootstrap.handle_inbound(reply(
        "https://apps.example/calc/manifest.json",
        json!({"app": {"script": ["lib.js", "https://cdn.example/vendor.js"]}}),
        json!({}),
    ));

    assert_eq!(
        *h.imported.lock().unwrap(),
        vec![
            "https://apps.example/calc/lib.js".to_string(),
            "https://cdn.example/vendor.js".to_string(),
        ]
    );
}

#[tokio::test]
async fn channels_memoize_and_proxies_share_them() {
    let mut h = harness(StaticApiRegistry::new());

    let a = h.bootstrap.get_channel(Some(Flow::new("a")));
    let a_again = h.bootstrap.get_channel(Some(Flow::new("a")));
    let default = h.bootstrap.get_channel(None);

    assert!(Arc::ptr_eq(&a, &a_again));
    assert!(!Arc::ptr_eq(&a, &default));
    assert_eq!(default.flow().as_str(), "default");

    // Repeated channel requests never re-send create.
    assert_eq!(requests(&h.posted), vec![ControlRequest::Create]);
}

#[tokio::test]
async fn dependency_clash_announces_without_rebinding() {
    let registry = StaticApiRegistry::new().with_api("helper", json!({}));
    let mut h = harness(registry);
    let _default = h.bootstrap.get_proxy(None);

    h.bootstrap.handle_inbound(reply(
        "X",
        json!({
            "permissions": ["helper"],
            "dependencies": {"helper": "helper/manifest.json"}
        }),
        json!({}),
    ));

    // The permission binding wins; the dep request still went out.
    assert!(matches!(
        h.bootstrap.exports().unwrap().binding("helper"),
        Some(CapabilityBinding::Consumer { .. })
    ));
    let deps: Vec<String> = h
        .posted
        .lock()
        .unwrap()
        .iter()
        .filter_map(|env| env.dep.clone())
        .collect();
    assert_eq!(deps, vec!["helper".to_string()]);
}

#[tokio::test]
async fn reply_config_reaches_the_table() {
    let mut h = harness(StaticApiRegistry::new());
    let _default = h.bootstrap.get_proxy(None);

    h.bootstrap.handle_inbound(reply("X", json!({}), json!({"debug": true})));

    assert!(h.bootstrap.config().debug());
    h.bootstrap.debug("after handshake");
    let last = h.posted.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.request, Some(ControlRequest::Debug));
    assert_eq!(last.msg, Some(json!("after handshake")));
}
