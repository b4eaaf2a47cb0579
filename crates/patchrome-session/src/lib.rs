//! Patchrome Session - the attachment lifecycle around effect graphs
//!
//! A [`Session`] attaches media elements to engines, builds each one's graph
//! from the current [`Settings`], and keeps them in step as settings change:
//! parameter-only changes are applied in place, topology or enable-switch
//! changes tear down and rebuild from the same source node.
//!
//! # Key Types
//!
//! - [`Session`] - engage, apply settings, discard, poll
//! - [`PlaybackGovernor`] - the only write path for playback rates
//! - [`PlaybackEnforcer`] - background thread running [`Session::poll`]
//! - [`DeferredSource`] - attachments whose destination the caller picks
//! - [`EngineConfig`] - TOML engine configuration
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use patchrome_engine::{BufferSource, MediaElement, SourceId};
//! use patchrome_session::{EngineConfig, RenderEngineFactory, Session, Settings};
//!
//! let mut session = Session::new(EngineConfig::default(), RenderEngineFactory, Settings::default());
//! let element = Arc::new(MediaElement::with_signal(SourceId::new(1), BufferSource::mono(vec![0.0; 64])));
//! session.engage(element).unwrap();
//! assert!(session.is_attached(SourceId::new(1)));
//! ```

pub mod config;
pub mod deferred;
pub mod enforcer;
pub mod error;
pub mod playback;
pub mod registry;
pub mod session;
pub mod settings;

pub use config::EngineConfig;
pub use deferred::DeferredSource;
pub use enforcer::{PlaybackEnforcer, SharedSession};
pub use error::{ConfigError, SessionError};
pub use playback::PlaybackGovernor;
pub use registry::{Attachment, AttachmentKind, Registry};
pub use session::{EngineFactory, PollReport, RenderEngineFactory, Session};
pub use settings::{Settings, SettingsChange};
