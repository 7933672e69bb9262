// SPDX-License-Identifier: MIT OR Apache-2.0
//! Platform capabilities: pointer lock and camera orbit control.

use thiserror::Error;

/// Reasons a pointer lock request can fail
#[derive(Debug, Error)]
pub enum PointerLockError {
    /// The host has no pointer lock support
    #[error("Pointer lock is not available")]
    Unavailable,

    /// The host refused the request
    #[error("Pointer lock refused: {0}")]
    Refused(String),
}

/// Host services the interaction core needs
pub trait PlatformHooks {
    /// Ask the host to capture the pointer
    fn request_pointer_lock(&mut self) -> Result<(), PointerLockError>;

    /// Release a captured pointer
    fn exit_pointer_lock(&mut self);

    /// Enable or disable the camera orbit control
    fn set_orbit_enabled(&mut self, enabled: bool);
}

/// Platform without a pointer or camera control
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessPlatform;

impl PlatformHooks for HeadlessPlatform {
    fn request_pointer_lock(&mut self) -> Result<(), PointerLockError> {
        Err(PointerLockError::Unavailable)
    }

    fn exit_pointer_lock(&mut self) {}

    fn set_orbit_enabled(&mut self, _enabled: bool) {}
}

/// Tracks whether the pointer lock is currently held.
///
/// Release is idempotent: calling it on every exit path is always safe.
#[derive(Debug, Default)]
pub struct PointerLockGuard {
    held: bool,
}

impl PointerLockGuard {
    /// Create a guard that holds nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the lock. A refusal is logged and the guard stays empty.
    pub fn acquire(&mut self, platform: &mut dyn PlatformHooks) -> bool {
        if self.held {
            return true;
        }
        match platform.request_pointer_lock() {
            Ok(()) => self.held = true,
            Err(e) => tracing::warn!("Continuing without pointer lock: {}", e),
        }
        self.held
    }

    /// Release the lock if held
    pub fn release(&mut self, platform: &mut dyn PlatformHooks) {
        if self.held {
            platform.exit_pointer_lock();
            self.held = false;
        }
    }

    /// Forget the lock after the host revoked it
    pub fn mark_lost(&mut self) {
        self.held = false;
    }

    /// Whether the lock is held
    pub fn is_held(&self) -> bool {
        self.held
    }
}
