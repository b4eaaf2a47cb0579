//! Integration tests for the attachment lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use patchrome_core::{ParamChannel, ProcessorDescriptor};
use patchrome_engine::{
    AudioEngine, AudioParam, BufferSource, EngineError, MediaElement, NodeHandle, NodeOption,
    Primitive, RenderEngine, SourceId,
};
use patchrome_graph::{GraphDescription, GraphEdge, GraphNode, NodeType, ParamValue};
use patchrome_session::{
    EngineConfig, PlaybackEnforcer, RenderEngineFactory, Session, SessionError, Settings,
    SettingsChange,
};

fn element(id: u64, samples: Vec<f32>) -> Arc<MediaElement> {
    Arc::new(MediaElement::with_signal(SourceId::new(id), BufferSource::mono(samples)))
}

fn render(engine: &mut RenderEngine, frames: usize) -> Vec<f32> {
    let mut left = vec![0.0; frames];
    let mut right = vec![0.0; frames];
    engine.render(&mut left, &mut right);
    left
}

fn ramp(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i % 100) as f32 / 100.0).collect()
}

/// `input → r (reverb) → output` with the input at `speed`.
fn reverb_settings(mix: f64, speed: f64) -> Settings {
    Settings::new(
        GraphDescription::default()
            .with_node(GraphNode::new("input", NodeType::Input).with_param("speed", speed))
            .with_node(GraphNode::new("r", NodeType::Reverb).with_param("mix", mix))
            .with_node(GraphNode::new("output", NodeType::Output))
            .with_edge(GraphEdge::new("input", "r"))
            .with_edge(GraphEdge::new("r", "output")),
    )
}

fn session(settings: Settings) -> Session<RenderEngineFactory> {
    Session::new(EngineConfig::default(), RenderEngineFactory, settings)
}

#[test]
fn engaged_passthrough_is_transparent() {
    let mut session = session(Settings::default());
    let id = SourceId::new(1);
    session.engage(element(1, ramp(512))).unwrap();
    // A second engage is a no-op
    session.engage(element(1, ramp(512))).unwrap();
    assert_eq!(session.attachment_count(), 1);

    let out = render(session.engine_mut(id).unwrap(), 512);
    assert_eq!(out, ramp(512));
}

#[test]
fn parameter_changes_update_in_place() {
    let mut session = session(reverb_settings(10.0, 1.0));
    let id = SourceId::new(1);
    session.engage(element(1, ramp(256))).unwrap();
    let topology = session.graph(id).unwrap().topology();
    let nodes = session.engine_mut(id).unwrap().node_count();

    let change = session.apply_settings(reverb_settings(60.0, 1.0));
    assert!(matches!(change, SettingsChange::Params(ref c) if c.len() == 1));
    assert_eq!(session.graph(id).unwrap().topology(), topology);
    assert_eq!(session.engine_mut(id).unwrap().node_count(), nodes);
    assert_eq!(
        session.graph(id).unwrap().unit("r").unwrap().params()["mix"],
        ParamValue::from(60.0)
    );
}

#[test]
fn topology_changes_rebuild_from_the_same_source() {
    let mut session = session(Settings::default());
    let id = SourceId::new(1);
    session.engage(element(1, ramp(256))).unwrap();
    let source = session.graph(id).unwrap().source();
    let baseline = session.engine_mut(id).unwrap().node_count();

    assert_eq!(
        session.apply_settings(reverb_settings(0.0, 1.0)),
        SettingsChange::Rebuild
    );
    assert_eq!(session.graph(id).unwrap().source(), source);
    assert!(session.engine_mut(id).unwrap().node_count() > baseline);

    session.apply_settings(Settings::default());
    assert_eq!(session.engine_mut(id).unwrap().node_count(), baseline);
    let out = render(session.engine_mut(id).unwrap(), 256);
    assert_eq!(out, ramp(256));
}

#[test]
fn disabling_bypasses_and_resets_the_rate() {
    let mut session = session(reverb_settings(100.0, 1.5));
    let id = SourceId::new(1);
    let media = element(1, ramp(256));
    session.engage(Arc::clone(&media)).unwrap();
    assert_eq!(media.playback().playback_rate(), 1.5);
    assert!(!media.playback().preserves_pitch());

    let change = session.apply_settings(reverb_settings(100.0, 1.5).with_enabled(false));
    assert_eq!(change, SettingsChange::Rebuild);
    assert!(session.graph(id).unwrap().is_bypassed());
    assert_eq!(media.playback().playback_rate(), 1.0);
    assert!(media.playback().preserves_pitch());

    // Disabled: a request goes through until the next poll
    assert_eq!(session.governor().request_rate(media.playback(), 2.0), 2.0);
    session.poll();
    assert_eq!(media.playback().playback_rate(), 1.0);

    let out = render(session.engine_mut(id).unwrap(), 256);
    assert_eq!(out, ramp(256));
}

#[test]
fn disabled_engage_and_poll_force_normal_speed() {
    let mut session = session(reverb_settings(0.0, 1.5).with_enabled(false));
    let media = element(3, ramp(64));
    media.playback().set_playback_rate(1.5);
    media.playback().set_preserves_pitch(false);

    session.engage(Arc::clone(&media)).unwrap();
    assert_eq!(media.playback().playback_rate(), 1.0);
    assert!(media.playback().preserves_pitch());

    media.playback().set_playback_rate(0.75);
    assert_eq!(session.poll().enforced, 1);
    assert_eq!(media.playback().playback_rate(), 1.0);
}

#[test]
fn poll_restores_a_reset_rate() {
    let mut session = session(reverb_settings(0.0, 0.8));
    let media = element(1, ramp(64));
    session.engage(Arc::clone(&media)).unwrap();

    media.playback().set_playback_rate(1.0);
    media.playback().set_preserves_pitch(true);
    let report = session.poll();
    assert_eq!(report.enforced, 1);
    assert_eq!(media.playback().playback_rate(), 0.8);
    assert!(!media.playback().preserves_pitch());

    // Enabled: outside requests are overridden
    assert_eq!(session.governor().request_rate(media.playback(), 3.0), 0.8);
}

#[test]
fn discard_forgets_the_element() {
    let mut session = session(Settings::default());
    let id = SourceId::new(4);
    session.engage(element(4, ramp(64))).unwrap();
    session.discard(id).unwrap();
    assert!(!session.is_attached(id));
    assert!(matches!(session.discard(id), Err(SessionError::UnknownSource(_))));
}

/// Delegates to a [`RenderEngine`] but refuses to wrap media while `fail`
/// is set.
struct Flaky {
    inner: RenderEngine,
    fail: Arc<AtomicBool>,
}

impl AudioEngine for Flaky {
    fn sample_rate(&self) -> f32 {
        self.inner.sample_rate()
    }
    fn destination(&self) -> NodeHandle {
        self.inner.destination()
    }
    fn create(&mut self, primitive: Primitive) -> Result<NodeHandle, EngineError> {
        self.inner.create(primitive)
    }
    fn create_media_source(&mut self, element: &MediaElement) -> Result<NodeHandle, EngineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::SourceAlreadyCaptured(element.id()));
        }
        self.inner.create_media_source(element)
    }
    fn connect(
        &mut self,
        from: NodeHandle,
        output: usize,
        to: NodeHandle,
        input: usize,
    ) -> Result<(), EngineError> {
        self.inner.connect(from, output, to, input)
    }
    fn disconnect(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.inner.disconnect(node)
    }
    fn disconnect_from(&mut self, node: NodeHandle, to: NodeHandle) -> Result<(), EngineError> {
        self.inner.disconnect_from(node, to)
    }
    fn set_param(
        &mut self,
        node: NodeHandle,
        param: AudioParam,
        value: f32,
    ) -> Result<(), EngineError> {
        self.inner.set_param(node, param, value)
    }
    fn set_option(&mut self, node: NodeHandle, option: NodeOption) -> Result<(), EngineError> {
        self.inner.set_option(node, option)
    }
    fn set_curve(&mut self, node: NodeHandle, curve: Vec<f32>) -> Result<(), EngineError> {
        self.inner.set_curve(node, curve)
    }
    fn start(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.inner.start(node)
    }
    fn stop(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.inner.stop(node)
    }
    fn release(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.inner.release(node)
    }
    fn register_processor(&mut self, descriptor: &'static ProcessorDescriptor) {
        self.inner.register_processor(descriptor);
    }
    fn is_registered(&self, name: &str) -> bool {
        self.inner.is_registered(name)
    }
    fn param_channel(&self, node: NodeHandle) -> Option<ParamChannel> {
        self.inner.param_channel(node)
    }
}

#[test]
fn failed_engage_is_retried_by_poll() {
    let fail = Arc::new(AtomicBool::new(true));
    let factory = {
        let fail = Arc::clone(&fail);
        move |config: &EngineConfig| Flaky {
            inner: RenderEngine::new(config.sample_rate),
            fail: Arc::clone(&fail),
        }
    };
    let mut session = Session::new(EngineConfig::default(), factory, Settings::default());
    let id = SourceId::new(9);

    let err = session.engage(element(9, ramp(64))).unwrap_err();
    assert!(matches!(err, SessionError::Engage { .. }));
    assert_eq!(session.unprocessed(), [id]);
    assert_eq!(session.poll().recovered, 0);
    assert_eq!(session.unprocessed(), [id]);

    fail.store(false, Ordering::SeqCst);
    assert_eq!(session.poll().recovered, 1);
    assert!(session.is_attached(id));
    assert!(session.unprocessed().is_empty());
    assert!(session.graph(id).is_some());
}

#[test]
fn captured_element_cannot_be_engaged_twice_across_sessions() {
    let media = element(2, ramp(64));
    let mut first = session(Settings::default());
    let mut second = session(Settings::default());
    first.engage(Arc::clone(&media)).unwrap();
    assert!(second.engage(media).is_err());
    assert_eq!(second.unprocessed(), [SourceId::new(2)]);
}

/// Engine with a caller-owned half-gain stage in front of the destination.
fn caller_engine() -> (RenderEngine, NodeHandle) {
    let mut engine = RenderEngine::new(48000.0);
    let stage = engine.create(Primitive::Gain { gain: 0.5 }).unwrap();
    engine.connect(stage, 0, engine.destination(), 0).unwrap();
    (engine, stage)
}

#[test]
fn deferred_attachment_builds_on_finalize_and_replays_rebuilds() {
    let mut session = session(Settings::default());
    let id = SourceId::new(5);
    let (engine, stage) = caller_engine();
    let deferred = session.reserve(element(5, ramp(512)), engine).unwrap();
    assert!(session.graph(id).is_none());

    session.finalize(deferred, stage).unwrap();
    let out = render(session.engine_mut(id).unwrap(), 256);
    let expected: Vec<f32> = ramp(256).iter().map(|s| s * 0.5).collect();
    assert_eq!(out, expected);

    // Topology change: owed, not applied
    session.apply_settings(reverb_settings(0.0, 1.0));
    assert!(session.is_pending(id));
    assert!(session.graph(id).unwrap().unit("r").is_none());

    let report = session.poll();
    assert_eq!(report.rebuilt, 1);
    assert!(!session.is_pending(id));
    assert!(session.graph(id).unwrap().unit("r").is_some());
    assert_eq!(session.graph(id).unwrap().destination(), stage);
}

#[test]
fn reserving_again_replaces_the_attachment() {
    let mut session = session(Settings::default());
    let id = SourceId::new(6);
    let (engine, stage) = caller_engine();
    let first = session.reserve(element(6, ramp(64)), engine).unwrap();
    session.finalize(first, stage).unwrap();

    let (engine, _) = caller_engine();
    let second = session.reserve(element(6, ramp(64)), engine).unwrap();
    assert_eq!(session.attachment_count(), 1);
    assert!(session.graph(id).is_none());
    assert_eq!(second.element, id);
}

#[test]
fn enforcer_polls_until_dropped() {
    let shared = Arc::new(Mutex::new(session(reverb_settings(0.0, 1.25))));
    let media = element(1, ramp(64));
    shared.lock().engage(Arc::clone(&media)).unwrap();
    media.playback().set_playback_rate(1.0);

    let enforcer = PlaybackEnforcer::spawn(Arc::clone(&shared), Duration::from_millis(5));
    assert!(enforcer.is_running());
    let deadline = Instant::now() + Duration::from_secs(5);
    while media.playback().playback_rate() != 1.25 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(media.playback().playback_rate(), 1.25);
    drop(enforcer);

    media.playback().set_playback_rate(1.0);
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(media.playback().playback_rate(), 1.0);
}

#[test]
fn enforcer_uses_the_configured_interval() {
    let config = EngineConfig {
        poll_interval_ms: 5,
        ..EngineConfig::default()
    };
    let session = Session::new(config, RenderEngineFactory, reverb_settings(0.0, 0.5));
    let shared = Arc::new(Mutex::new(session));
    let media = element(7, ramp(64));
    shared.lock().engage(Arc::clone(&media)).unwrap();
    media.playback().set_playback_rate(1.0);

    let enforcer = PlaybackEnforcer::for_config(Arc::clone(&shared));
    let deadline = Instant::now() + Duration::from_secs(5);
    while media.playback().playback_rate() != 0.5 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(media.playback().playback_rate(), 0.5);
    drop(enforcer);
}
