//! The single write path for media playback rates.
//!
//! Hosts reset playback rate and pitch preservation on their own (seeking,
//! source changes), and page code may try to set them too. Every write goes
//! through [`PlaybackGovernor`], which makes the graph's input node the
//! source of truth while processing is enabled.

use std::sync::Arc;

use arc_swap::ArcSwap;
use patchrome_engine::PlaybackControl;
use patchrome_graph::apply_speed;

use crate::settings::Settings;

/// Lock-free view of the current settings plus the rate policy.
///
/// Cloning is cheap; every clone sees the same settings.
#[derive(Debug, Clone)]
pub struct PlaybackGovernor {
    settings: Arc<ArcSwap<Settings>>,
}

impl PlaybackGovernor {
    /// Starts from `settings`.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    /// Current settings.
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    /// Publishes new settings.
    pub fn store(&self, settings: Settings) {
        self.settings.store(Arc::new(settings));
    }

    /// Handles a rate write from outside the session; returns the rate the
    /// element ends up playing at.
    ///
    /// While enabled the request is overridden by the input node's speed.
    /// While disabled any finite positive request goes through unchanged
    /// until the next [`enforce`](Self::enforce) puts normal speed back.
    pub fn request_rate(&self, element: &dyn PlaybackControl, requested: f32) -> f32 {
        let settings = self.settings.load();
        if settings.enabled {
            let speed = settings.input_speed();
            apply_speed(element, speed);
            if requested != speed {
                tracing::debug!(requested, speed, "session: rate request overridden");
            }
            speed
        } else {
            if requested.is_finite() && requested > 0.0 {
                element.set_playback_rate(requested);
            }
            element.playback_rate()
        }
    }

    /// Re-applies the input node's speed and pitch flag while enabled, and
    /// normal speed with pitch preservation while disabled.
    pub fn enforce(&self, element: &dyn PlaybackControl) {
        let settings = self.settings.load();
        if settings.enabled {
            apply_speed(element, settings.input_speed());
        } else {
            self.relinquish(element);
        }
    }

    /// Hands the element back to the host at normal speed.
    pub fn relinquish(&self, element: &dyn PlaybackControl) {
        element.set_playback_rate(1.0);
        element.set_preserves_pitch(true);
    }
}
