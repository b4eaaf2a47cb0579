//! Per-element attachment records.

use std::collections::BTreeMap;
use std::sync::Arc;

use patchrome_engine::{MediaElement, NodeHandle, SourceId};
use patchrome_graph::LiveGraph;

/// How an attachment gets its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// The session built into the engine's own destination.
    Engaged,
    /// The caller supplies the destination through
    /// [`Session::finalize`](crate::Session::finalize).
    Deferred {
        /// Last destination finalized into.
        destination: Option<NodeHandle>,
        /// A rebuild is owed at the next poll.
        pending: bool,
    },
}

/// One media element wrapped by one engine.
#[derive(Debug)]
pub struct Attachment<E> {
    /// The element.
    pub element: Arc<MediaElement>,
    /// Engine the element was wrapped by.
    pub engine: E,
    /// The element's source node; created once, reused by every rebuild.
    pub source: NodeHandle,
    /// Current graph, if built.
    pub graph: Option<LiveGraph>,
    /// Destination policy.
    pub kind: AttachmentKind,
}

/// Attachments and unprocessed elements, keyed by element id.
#[derive(Debug)]
pub struct Registry<E> {
    attached: BTreeMap<SourceId, Attachment<E>>,
    unprocessed: BTreeMap<SourceId, Arc<MediaElement>>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            attached: BTreeMap::new(),
            unprocessed: BTreeMap::new(),
        }
    }
}

impl<E> Registry<E> {
    /// Records an attachment, clearing any unprocessed entry for it.
    pub fn insert(&mut self, attachment: Attachment<E>) {
        let id = attachment.element.id();
        self.unprocessed.remove(&id);
        self.attached.insert(id, attachment);
    }

    /// Looks up an attachment.
    pub fn get(&self, id: SourceId) -> Option<&Attachment<E>> {
        self.attached.get(&id)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, id: SourceId) -> Option<&mut Attachment<E>> {
        self.attached.get_mut(&id)
    }

    /// Removes an attachment and any unprocessed entry.
    pub fn remove(&mut self, id: SourceId) -> Option<Attachment<E>> {
        self.unprocessed.remove(&id);
        self.attached.remove(&id)
    }

    /// Whether the element is attached.
    pub fn contains(&self, id: SourceId) -> bool {
        self.attached.contains_key(&id)
    }

    /// Attachments in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Attachment<E>> {
        self.attached.values()
    }

    /// Mutable attachments in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attachment<E>> {
        self.attached.values_mut()
    }

    /// Number of attachments.
    pub fn len(&self) -> usize {
        self.attached.len()
    }

    /// Whether nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    /// Remembers an element that could not be attached.
    pub fn mark_unprocessed(&mut self, element: Arc<MediaElement>) {
        self.unprocessed.insert(element.id(), element);
    }

    /// Elements waiting for a retry.
    pub fn unprocessed(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.unprocessed.keys().copied()
    }

    /// Drains the retry list.
    pub fn take_unprocessed(&mut self) -> Vec<Arc<MediaElement>> {
        std::mem::take(&mut self.unprocessed).into_values().collect()
    }
}
