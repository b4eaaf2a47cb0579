//! Attachments whose destination is chosen by the caller.
//!
//! Some hosts create the source node themselves and connect it later. The
//! session wraps the element at [`reserve`](Session::reserve) time but only
//! builds when the caller connects through [`finalize`](Session::finalize).
//! Rebuilds owed to a topology change are replayed at the next poll against
//! the last destination the caller used.

use std::sync::Arc;

use patchrome_engine::{AudioEngine, MediaElement, NodeHandle, SourceId};
use patchrome_graph::register_processors;

use crate::error::SessionError;
use crate::registry::{Attachment, AttachmentKind};
use crate::session::{EngineFactory, Session, rebuild};

/// Stand-in the caller holds until it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredSource {
    /// The wrapped element.
    pub element: SourceId,
    /// Its source node in the caller's engine.
    pub source: NodeHandle,
}

impl<F: EngineFactory> Session<F> {
    /// Wraps `element` in the caller's `engine` without building a graph.
    ///
    /// Any previous attachment of the same element is discarded first.
    pub fn reserve(
        &mut self,
        element: Arc<MediaElement>,
        mut engine: F::Engine,
    ) -> Result<DeferredSource, SessionError> {
        let id = element.id();
        if self.registry.contains(id) {
            self.discard(id)?;
        }
        register_processors(&mut engine);
        let source = engine
            .create_media_source(&element)
            .map_err(|err| SessionError::engage(id, err))?;
        tracing::debug!(element = %id, %source, "session: source reserved");
        self.registry.insert(Attachment {
            element,
            engine,
            source,
            graph: None,
            kind: AttachmentKind::Deferred {
                destination: None,
                pending: false,
            },
        });
        Ok(DeferredSource {
            element: id,
            source,
        })
    }

    /// Builds the current graph from `source` into `destination`, replacing
    /// any graph built earlier.
    pub fn finalize(
        &mut self,
        source: DeferredSource,
        destination: NodeHandle,
    ) -> Result<(), SessionError> {
        let settings = self.governor.settings();
        let attachment = self
            .registry
            .get_mut(source.element)
            .ok_or(SessionError::UnknownSource(source.element))?;
        rebuild(attachment, &settings, destination);
        attachment.kind = AttachmentKind::Deferred {
            destination: Some(destination),
            pending: false,
        };
        self.governor.enforce(attachment.element.playback());
        tracing::debug!(element = %source.element, %destination, "session: deferred graph built");
        Ok(())
    }

    /// Whether a deferred attachment owes a rebuild.
    pub fn is_pending(&self, id: SourceId) -> bool {
        matches!(
            self.registry.get(id).map(|a| a.kind),
            Some(AttachmentKind::Deferred { pending: true, .. })
        )
    }
}
