//! The attachment and rebuild lifecycle.
//!
//! A [`Session`] owns one engine per media element, the graph built in it,
//! and the current [`Settings`]. Settings changes are applied in place when
//! only parameters moved and by teardown plus rebuild otherwise; the source
//! node of each element is created once and reused across rebuilds.

use std::sync::Arc;

use patchrome_engine::{AudioEngine, MediaElement, NodeHandle, RenderEngine, SourceId};
use patchrome_graph::{LiveGraph, build, register_processors, update};

use crate::config::EngineConfig;
use crate::error::SessionError;
use crate::playback::PlaybackGovernor;
use crate::registry::{Attachment, AttachmentKind, Registry};
use crate::settings::{Settings, SettingsChange};

/// Creates the engine each engaged element gets.
pub trait EngineFactory: Send {
    /// Engine type produced.
    type Engine: AudioEngine;

    /// A fresh engine for `config`.
    fn create_engine(&mut self, config: &EngineConfig) -> Self::Engine;
}

impl<E, F> EngineFactory for F
where
    E: AudioEngine,
    F: FnMut(&EngineConfig) -> E + Send,
{
    type Engine = E;

    fn create_engine(&mut self, config: &EngineConfig) -> E {
        self(config)
    }
}

/// Builds [`RenderEngine`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderEngineFactory;

impl EngineFactory for RenderEngineFactory {
    type Engine = RenderEngine;

    fn create_engine(&mut self, config: &EngineConfig) -> RenderEngine {
        RenderEngine::with_max_delay(config.sample_rate, config.max_delay_seconds)
    }
}

/// What one [`Session::poll`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Elements whose rate and pitch flag were re-applied.
    pub enforced: usize,
    /// Previously failed elements attached on this poll.
    pub recovered: usize,
    /// Deferred attachments rebuilt.
    pub rebuilt: usize,
}

/// Every attachment plus the settings they are built from.
pub struct Session<F: EngineFactory> {
    pub(crate) config: EngineConfig,
    pub(crate) factory: F,
    pub(crate) governor: PlaybackGovernor,
    pub(crate) registry: Registry<F::Engine>,
}

impl<F: EngineFactory> Session<F> {
    /// Creates a session with no attachments.
    pub fn new(config: EngineConfig, factory: F, settings: Settings) -> Self {
        Self {
            config,
            factory,
            governor: PlaybackGovernor::new(settings),
            registry: Registry::default(),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current settings.
    pub fn settings(&self) -> Arc<Settings> {
        self.governor.settings()
    }

    /// The rate authority; clone it to hand to property overrides.
    pub fn governor(&self) -> &PlaybackGovernor {
        &self.governor
    }

    /// Whether `id` is attached.
    pub fn is_attached(&self, id: SourceId) -> bool {
        self.registry.contains(id)
    }

    /// Number of attachments.
    pub fn attachment_count(&self) -> usize {
        self.registry.len()
    }

    /// Elements that failed to attach and will be retried.
    pub fn unprocessed(&self) -> Vec<SourceId> {
        self.registry.unprocessed().collect()
    }

    /// The graph built for `id`.
    pub fn graph(&self, id: SourceId) -> Option<&LiveGraph> {
        self.registry.get(id)?.graph.as_ref()
    }

    /// The engine `id` is attached to.
    pub fn engine_mut(&mut self, id: SourceId) -> Option<&mut F::Engine> {
        self.registry.get_mut(id).map(|a| &mut a.engine)
    }

    /// Attaches an element: fresh engine, registered processors, source node
    /// and a graph built from the current settings.
    ///
    /// Engaging an attached element is a no-op. If the engine cannot wrap
    /// the element it is remembered and retried by [`poll`](Self::poll).
    pub fn engage(&mut self, element: Arc<MediaElement>) -> Result<(), SessionError> {
        let id = element.id();
        if self.registry.contains(id) {
            tracing::debug!(element = %id, "session: already engaged");
            return Ok(());
        }

        let mut engine = self.factory.create_engine(&self.config);
        register_processors(&mut engine);
        let source = match engine.create_media_source(&element) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(element = %id, %err, "session: engage failed, leaving unprocessed");
                self.registry.mark_unprocessed(element);
                return Err(SessionError::engage(id, err));
            }
        };

        let settings = self.governor.settings();
        let destination = engine.destination();
        let graph = build(
            &mut engine,
            source,
            &settings.audio_graph,
            destination,
            settings.enabled,
        );
        self.governor.enforce(element.playback());
        tracing::info!(element = %id, units = graph.len(), "session: engaged");
        self.registry.insert(Attachment {
            element,
            engine,
            source,
            graph: Some(graph),
            kind: AttachmentKind::Engaged,
        });
        Ok(())
    }

    /// Publishes new settings and brings every attachment up to date.
    ///
    /// Parameter-only changes are applied in place. Anything that changes
    /// the topology or the global switch rebuilds engaged attachments now
    /// and marks deferred ones for the next poll.
    pub fn apply_settings(&mut self, settings: Settings) -> SettingsChange {
        let previous = self.governor.settings();
        let change = SettingsChange::between(&previous, &settings);
        self.governor.store(settings);

        match &change {
            SettingsChange::Unchanged => {}
            SettingsChange::Params(changes) => {
                for attachment in self.registry.iter_mut() {
                    if let Some(graph) = attachment.graph.as_mut() {
                        update(
                            graph,
                            &mut attachment.engine,
                            changes,
                            Some(attachment.element.playback()),
                        );
                    }
                }
            }
            SettingsChange::Rebuild => {
                let current = self.governor.settings();
                let mut rebuilt = 0;
                for attachment in self.registry.iter_mut() {
                    match attachment.kind {
                        AttachmentKind::Engaged => {
                            let destination = attachment.engine.destination();
                            rebuild(attachment, &current, destination);
                            rebuilt += 1;
                        }
                        AttachmentKind::Deferred { destination, .. } => {
                            attachment.kind = AttachmentKind::Deferred {
                                destination,
                                pending: true,
                            };
                        }
                    }
                }
                tracing::info!(rebuilt, "session: topology changed, graphs rebuilt");
            }
        }

        for attachment in self.registry.iter() {
            self.governor.enforce(attachment.element.playback());
        }
        change
    }

    /// Tears down the element's graph, disconnects its source and forgets
    /// it.
    pub fn discard(&mut self, id: SourceId) -> Result<(), SessionError> {
        let Some(mut attachment) = self.registry.remove(id) else {
            return Err(SessionError::UnknownSource(id));
        };
        if let Some(graph) = attachment.graph.take() {
            graph.teardown(&mut attachment.engine);
        } else if let Err(err) = attachment.engine.disconnect(attachment.source) {
            tracing::debug!(element = %id, %err, "session: source already disconnected");
        }
        self.governor.relinquish(attachment.element.playback());
        tracing::info!(element = %id, "session: discarded");
        Ok(())
    }

    /// Periodic maintenance: re-applies rate and pitch flags, retries failed
    /// engages, and runs owed deferred rebuilds.
    pub fn poll(&mut self) -> PollReport {
        let mut report = PollReport::default();

        for attachment in self.registry.iter() {
            self.governor.enforce(attachment.element.playback());
            report.enforced += 1;
        }

        for element in self.registry.take_unprocessed() {
            let id = element.id();
            match self.engage(element) {
                Ok(()) => report.recovered += 1,
                Err(err) => tracing::debug!(element = %id, %err, "session: retry failed"),
            }
        }

        let settings = self.governor.settings();
        for attachment in self.registry.iter_mut() {
            if let AttachmentKind::Deferred {
                destination: Some(destination),
                pending: true,
            } = attachment.kind
            {
                rebuild(attachment, &settings, destination);
                attachment.kind = AttachmentKind::Deferred {
                    destination: Some(destination),
                    pending: false,
                };
                report.rebuilt += 1;
            }
        }
        report
    }
}

/// Tears down the attachment's graph, then builds `settings` from the same
/// source into `destination`.
pub(crate) fn rebuild<E: AudioEngine>(
    attachment: &mut Attachment<E>,
    settings: &Settings,
    destination: NodeHandle,
) {
    if let Some(old) = attachment.graph.take() {
        old.teardown(&mut attachment.engine);
    }
    let graph = build(
        &mut attachment.engine,
        attachment.source,
        &settings.audio_graph,
        destination,
        settings.enabled,
    );
    tracing::debug!(element = %attachment.element.id(), units = graph.len(), "session: rebuilt");
    attachment.graph = Some(graph);
}
