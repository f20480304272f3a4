use crate::math::{Mat4, Transform3};
use crate::runtime::{
    DeviceIndex, DeviceProperty, Eye, HmdRuntime, PropertySample, TrackingResult,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Shared handle to the one logical runtime connection. Every consumer keeps
/// a clone and the session lives until the last clone drops.
pub type SessionHandle = Arc<Mutex<VrSession>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApplicationType {
    Other,
    #[default]
    Scene,
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingUniverse {
    Seated,
    #[default]
    Standing,
    Raw,
}

pub const DEFAULT_ACTION_SET: &str = "/actions/default";

// Live session shared across the process; consumers re-acquire the same
// instance while any handle is alive.
static LIVE_SESSION: Lazy<Mutex<Weak<Mutex<VrSession>>>> =
    Lazy::new(|| Mutex::new(Weak::new()));

/// Device session: owns the runtime connection, its initialization state,
/// the per-frame pose samples, and the action-set table.
pub struct VrSession {
    runtime: Box<dyn HmdRuntime>,
    initialized: bool,
    application_type: ApplicationType,
    tracking_universe: TrackingUniverse,
    default_action_set: String,
    action_sets: HashMap<String, bool>,
    hmd_transform: Transform3,
    eye_to_head: [Transform3; 2],
    play_area: Option<[[f32; 3]; 4]>,
    render_size: (u32, u32),
}

impl VrSession {
    pub fn new(runtime: Box<dyn HmdRuntime>) -> Self {
        Self {
            runtime,
            initialized: false,
            application_type: ApplicationType::default(),
            tracking_universe: TrackingUniverse::default(),
            default_action_set: DEFAULT_ACTION_SET.to_string(),
            action_sets: HashMap::new(),
            hmd_transform: Transform3::IDENTITY,
            eye_to_head: [Transform3::IDENTITY; 2],
            play_area: None,
            render_size: (0, 0),
        }
    }

    /// Returns the live shared session, or builds one from `runtime_factory`
    /// when no consumer currently holds a handle.
    pub fn acquire<F>(runtime_factory: F) -> SessionHandle
    where
        F: FnOnce() -> Box<dyn HmdRuntime>,
    {
        let mut slot = LIVE_SESSION
            .lock()
            .expect("live session slot mutex should not poison");
        if let Some(existing) = slot.upgrade() {
            return existing;
        }
        let session = Arc::new(Mutex::new(VrSession::new(runtime_factory())));
        *slot = Arc::downgrade(&session);
        session
    }

    /// Starts the runtime connection. Safe to call while already initialized;
    /// the live connection is left alone and `true` is returned.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return true;
        }

        match self.runtime.initialize(self.application_type) {
            Ok(()) => {
                self.initialized = true;
                self.render_size = self.runtime.recommended_render_target_size();
                // Samples from any previous session epoch are stale now.
                self.hmd_transform = Transform3::IDENTITY;
                self.eye_to_head = [Transform3::IDENTITY; 2];
                self.play_area = self.runtime.play_area();
                log::info!(
                    "[session] {} initialized, render target {}x{}",
                    self.runtime.label(),
                    self.render_size.0,
                    self.render_size.1
                );
                true
            }
            Err(err) => {
                log::warn!("[session] runtime initialization failed: {err}");
                false
            }
        }
    }

    /// Tears the runtime connection down. No-op when not initialized.
    pub fn cleanup(&mut self) {
        if !self.initialized {
            return;
        }
        self.runtime.shutdown();
        self.initialized = false;
        self.render_size = (0, 0);
        self.hmd_transform = Transform3::IDENTITY;
        self.eye_to_head = [Transform3::IDENTITY; 2];
        self.play_area = None;
        log::info!("[session] runtime shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Refreshes device poses. Called once per rendered frame by the host's
    /// render thread; no-op while uninitialized.
    pub fn process(&mut self) {
        if !self.initialized {
            return;
        }
        let sample = self.runtime.sample_poses(self.tracking_universe);
        self.hmd_transform = sample.hmd;
        self.eye_to_head = sample.eye_to_head;
    }

    pub fn recommended_render_target_size(&self) -> (u32, u32) {
        self.render_size
    }

    /// Most recent sampled HMD pose; identity until the first `process`.
    pub fn hmd_transform(&self) -> Transform3 {
        self.hmd_transform
    }

    /// Eye-to-head offset with its translation scaled by `world_scale`.
    pub fn eye_to_head_transform(&self, eye: Eye, world_scale: f32) -> Transform3 {
        self.eye_to_head[eye.index()].scaled_translation(world_scale)
    }

    /// Device-space corners of the play boundary, `None` when the runtime has
    /// no boundary configured or the session is uninitialized.
    pub fn play_area(&self) -> Option<[[f32; 3]; 4]> {
        self.play_area
    }

    pub fn projection_matrix(&self, eye: Eye, z_near: f64, z_far: f64) -> Mat4 {
        self.runtime.projection_matrix(eye, z_near, z_far)
    }

    pub fn application_type(&self) -> ApplicationType {
        self.application_type
    }

    /// Takes effect on the next initialize; a live session is not
    /// reconfigured.
    pub fn set_application_type(&mut self, application_type: ApplicationType) {
        self.application_type = application_type;
    }

    pub fn tracking_universe(&self) -> TrackingUniverse {
        self.tracking_universe
    }

    pub fn set_tracking_universe(&mut self, universe: TrackingUniverse) {
        self.tracking_universe = universe;
    }

    pub fn default_action_set(&self) -> &str {
        &self.default_action_set
    }

    pub fn set_default_action_set(&mut self, name: impl Into<String>) {
        self.default_action_set = name.into();
    }

    /// Registers an action set by name. Registering the same name again is a
    /// no-op that keeps the existing active flag.
    pub fn register_action_set(&mut self, name: impl Into<String>) {
        self.action_sets.entry(name.into()).or_insert(false);
    }

    /// Activates the named set, registering it first if it was unknown.
    /// Other sets keep their state; deactivation policy belongs to the
    /// runtime binding.
    pub fn set_active_action_set(&mut self, name: impl Into<String>) {
        *self.action_sets.entry(name.into()).or_insert(false) = true;
    }

    pub fn toggle_action_set_active(&mut self, name: &str, active: bool) {
        if let Some(flag) = self.action_sets.get_mut(name) {
            *flag = active;
        } else {
            log::debug!("[session] toggling unknown action set {name:?}, registering it");
            self.action_sets.insert(name.to_string(), active);
        }
    }

    /// Unknown names report inactive rather than erroring; action-set names
    /// are script-supplied and may be speculative.
    pub fn is_action_set_active(&self, name: &str) -> bool {
        self.action_sets.get(name).copied().unwrap_or(false)
    }

    pub fn device_battery_percentage(&self, device: DeviceIndex) -> PropertySample<f32> {
        let sample = self
            .runtime
            .device_float_property(device, DeviceProperty::BatteryPercentage);
        if let Some(error) = sample.error {
            log::warn!(
                "[session] battery percentage query failed for device {device}: {} ({})",
                error.code,
                error.name
            );
        }
        sample
    }

    pub fn is_device_charging(&self, device: DeviceIndex) -> PropertySample<bool> {
        let sample = self
            .runtime
            .device_bool_property(device, DeviceProperty::IsCharging);
        if let Some(error) = sample.error {
            log::warn!(
                "[session] charging state query failed for device {device}: {} ({})",
                error.code,
                error.name
            );
        }
        sample
    }

    pub fn device_tracking_result(&self, device: DeviceIndex) -> TrackingResult {
        if !self.initialized {
            return TrackingResult::Uninitialized;
        }
        self.runtime.device_tracking_result(device)
    }
}
