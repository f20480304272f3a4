use crate::math::{Mat4, Transform3};
use crate::session::{ApplicationType, TrackingUniverse};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index of a tracked device as reported by the runtime. Device 0 is the HMD.
pub type DeviceIndex = u32;

pub const HMD_DEVICE_INDEX: DeviceIndex = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }

    /// View index to eye, the way the host hands views out: 0 is left,
    /// anything else is right.
    pub fn from_view(view: usize) -> Self {
        if view == 0 { Eye::Left } else { Eye::Right }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime initialization failed: {0}")]
    Init(String),
    #[error("no HMD runtime available")]
    Unavailable,
}

/// Error reported by a per-device property query, carrying the runtime's
/// numeric code and its human-readable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyError {
    pub code: i32,
    pub name: &'static str,
}

/// A property value together with an optional in-band error.
///
/// The wrapped SDK always hands a value back even when the query failed; the
/// error kind rides along so callers can tell a reliable reading from a
/// meaningless one without parsing logs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertySample<T> {
    pub value: T,
    pub error: Option<PropertyError>,
}

impl<T> PropertySample<T> {
    pub fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    pub fn unreliable(value: T, error: PropertyError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    pub fn is_reliable(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProperty {
    BatteryPercentage,
    IsCharging,
}

/// Per-device tracking quality as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingResult {
    #[default]
    Uninitialized,
    Ok,
    ExcessiveMotion,
    InsufficientFeatures,
    OutOfRange,
}

/// One frame's worth of tracking data.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseSample {
    pub hmd: Transform3,
    pub eye_to_head: [Transform3; 2],
}

/// Narrow boundary to the external HMD runtime SDK.
///
/// The session owns exactly one implementation and treats it as an opaque
/// black box: connection lifecycle, per-frame pose queries, projection
/// matrices, the play boundary, and per-device property reads.
pub trait HmdRuntime: Send {
    fn label(&self) -> &'static str;

    fn initialize(&mut self, application_type: ApplicationType) -> Result<(), RuntimeError>;

    fn shutdown(&mut self);

    /// Recommended per-eye render target size. Only meaningful after a
    /// successful initialize.
    fn recommended_render_target_size(&self) -> (u32, u32);

    /// Samples the current HMD pose and eye-to-head offsets in the given
    /// tracking universe. Called once per rendered frame.
    fn sample_poses(&mut self, universe: TrackingUniverse) -> PoseSample;

    /// Row-major projection matrix for one eye and the given clip planes.
    fn projection_matrix(&self, eye: Eye, z_near: f64, z_far: f64) -> Mat4;

    /// Device-space corners of the configured play boundary, or `None` when
    /// the runtime has no boundary set up.
    fn play_area(&self) -> Option<[[f32; 3]; 4]>;

    fn device_float_property(
        &self,
        device: DeviceIndex,
        property: DeviceProperty,
    ) -> PropertySample<f32>;

    fn device_bool_property(
        &self,
        device: DeviceIndex,
        property: DeviceProperty,
    ) -> PropertySample<bool>;

    fn device_tracking_result(&self, device: DeviceIndex) -> TrackingResult;
}

/// Deterministic in-process runtime double.
///
/// Stands in for real hardware in tests and headless hosts: poses, play
/// area, battery state, and failure modes are all scriptable.
pub struct SimulatedHmd {
    available: bool,
    running: bool,
    render_size: (u32, u32),
    hmd_pose: Transform3,
    eye_to_head: [Transform3; 2],
    play_area: Option<[[f32; 3]; 4]>,
    battery_percentage: f32,
    charging: bool,
    property_error: Option<PropertyError>,
    tracking: TrackingResult,
    pose_samples: u64,
}

impl SimulatedHmd {
    pub fn new() -> Self {
        Self {
            available: true,
            running: false,
            render_size: (1440, 1600),
            hmd_pose: Transform3::IDENTITY,
            eye_to_head: [
                Transform3::from_origin([-0.032, 0.0, 0.0]),
                Transform3::from_origin([0.032, 0.0, 0.0]),
            ],
            play_area: None,
            battery_percentage: 0.85,
            charging: false,
            property_error: None,
            tracking: TrackingResult::Ok,
            pose_samples: 0,
        }
    }

    /// Makes every subsequent initialize fail, as if no HMD were connected.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn set_hmd_pose(&mut self, pose: Transform3) {
        self.hmd_pose = pose;
    }

    pub fn set_eye_to_head(&mut self, left: Transform3, right: Transform3) {
        self.eye_to_head = [left, right];
    }

    pub fn set_play_area(&mut self, corners: Option<[[f32; 3]; 4]>) {
        self.play_area = corners;
    }

    pub fn set_battery(&mut self, percentage: f32, charging: bool) {
        self.battery_percentage = percentage;
        self.charging = charging;
    }

    /// Makes property queries report this error alongside their value.
    pub fn set_property_error(&mut self, error: Option<PropertyError>) {
        self.property_error = error;
    }

    pub fn set_tracking_result(&mut self, result: TrackingResult) {
        self.tracking = result;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pose_samples(&self) -> u64 {
        self.pose_samples
    }
}

impl Default for SimulatedHmd {
    fn default() -> Self {
        Self::new()
    }
}

impl HmdRuntime for SimulatedHmd {
    fn label(&self) -> &'static str {
        "Simulated HMD"
    }

    fn initialize(&mut self, application_type: ApplicationType) -> Result<(), RuntimeError> {
        if !self.available {
            return Err(RuntimeError::Unavailable);
        }
        log::debug!("[runtime] simulated HMD starting as {application_type:?}");
        self.running = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running = false;
    }

    fn recommended_render_target_size(&self) -> (u32, u32) {
        self.render_size
    }

    fn sample_poses(&mut self, _universe: TrackingUniverse) -> PoseSample {
        self.pose_samples += 1;
        PoseSample {
            hmd: self.hmd_pose,
            eye_to_head: self.eye_to_head,
        }
    }

    fn projection_matrix(&self, eye: Eye, z_near: f64, z_far: f64) -> Mat4 {
        // Symmetric 90-degree frustum with a small per-eye skew so the two
        // eyes produce distinguishable matrices.
        let focal = 1.0;
        let zn = z_near as f32;
        let zf = z_far as f32;
        let depth = (zf + zn) / (zn - zf);
        let offset = (2.0 * zf * zn) / (zn - zf);
        let skew = match eye {
            Eye::Left => -0.05,
            Eye::Right => 0.05,
        };
        [
            [focal, 0.0, skew, 0.0],
            [0.0, focal, 0.0, 0.0],
            [0.0, 0.0, depth, offset],
            [0.0, 0.0, -1.0, 0.0],
        ]
    }

    fn play_area(&self) -> Option<[[f32; 3]; 4]> {
        self.play_area
    }

    fn device_float_property(
        &self,
        _device: DeviceIndex,
        property: DeviceProperty,
    ) -> PropertySample<f32> {
        let value = match property {
            DeviceProperty::BatteryPercentage => self.battery_percentage,
            DeviceProperty::IsCharging => 0.0,
        };
        match self.property_error {
            Some(error) => PropertySample::unreliable(value, error),
            None => PropertySample::ok(value),
        }
    }

    fn device_bool_property(
        &self,
        _device: DeviceIndex,
        property: DeviceProperty,
    ) -> PropertySample<bool> {
        let value = match property {
            DeviceProperty::IsCharging => self.charging,
            DeviceProperty::BatteryPercentage => false,
        };
        match self.property_error {
            Some(error) => PropertySample::unreliable(value, error),
            None => PropertySample::ok(value),
        }
    }

    fn device_tracking_result(&self, _device: DeviceIndex) -> TrackingResult {
        if self.running {
            self.tracking
        } else {
            TrackingResult::Uninitialized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_runtime_refuses_to_start() {
        let mut runtime = SimulatedHmd::new();
        runtime.set_available(false);
        assert!(runtime.initialize(ApplicationType::Scene).is_err());
        assert!(!runtime.is_running());
    }

    #[test]
    fn property_error_rides_along_with_the_value() {
        let mut runtime = SimulatedHmd::new();
        runtime.set_battery(0.42, true);
        let sample = runtime.device_float_property(HMD_DEVICE_INDEX, DeviceProperty::BatteryPercentage);
        assert!(sample.is_reliable());
        assert_eq!(sample.value, 0.42);

        runtime.set_property_error(Some(PropertyError {
            code: 2,
            name: "TrackedProp_WrongDataType",
        }));
        let sample = runtime.device_bool_property(HMD_DEVICE_INDEX, DeviceProperty::IsCharging);
        assert!(sample.value);
        assert!(!sample.is_reliable());
        assert_eq!(sample.error.map(|e| e.code), Some(2));
    }

    #[test]
    fn projection_matrices_differ_per_eye() {
        let runtime = SimulatedHmd::new();
        let left = runtime.projection_matrix(Eye::Left, 0.1, 100.0);
        let right = runtime.projection_matrix(Eye::Right, 0.1, 100.0);
        assert_ne!(left, right);
        assert_eq!(left[3][2], -1.0);
    }
}
