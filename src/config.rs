use crate::runtime::{DeviceIndex, PropertySample};
use crate::server::ServerHandle;
use crate::session::{ApplicationType, SessionHandle, TrackingUniverse};

/// Script-facing configuration surface over the device session.
///
/// Everything here is a pass-through except `play_area`, which is the one
/// place outside the adapter that applies reference-frame math: boundary
/// corners only mean anything in the host's tracking space.
pub struct OpenVrConfig {
    session: SessionHandle,
    server: ServerHandle,
}

impl OpenVrConfig {
    pub fn new(session: SessionHandle, server: ServerHandle) -> Self {
        Self { session, server }
    }

    pub fn application_type(&self) -> ApplicationType {
        self.session().application_type()
    }

    pub fn set_application_type(&self, application_type: ApplicationType) {
        self.session().set_application_type(application_type);
    }

    pub fn tracking_universe(&self) -> TrackingUniverse {
        self.session().tracking_universe()
    }

    pub fn set_tracking_universe(&self, universe: TrackingUniverse) {
        self.session().set_tracking_universe(universe);
    }

    pub fn default_action_set(&self) -> String {
        self.session().default_action_set().to_string()
    }

    pub fn set_default_action_set(&self, name: &str) {
        self.session().set_default_action_set(name);
    }

    pub fn register_action_set(&self, name: &str) {
        self.session().register_action_set(name);
    }

    pub fn set_active_action_set(&self, name: &str) {
        self.session().set_active_action_set(name);
    }

    pub fn toggle_action_set_active(&self, name: &str, active: bool) {
        self.session().toggle_action_set_active(name, active);
    }

    pub fn is_action_set_active(&self, name: &str) -> bool {
        self.session().is_action_set_active(name)
    }

    pub fn play_area_available(&self) -> bool {
        self.session().play_area().is_some()
    }

    /// Play-boundary corners in world space: each device-space corner is
    /// taken through the reference-frame inverse and scaled by world scale.
    /// Empty when no boundary is configured.
    pub fn play_area(&self) -> Vec<[f32; 3]> {
        let Some(corners) = self.session().play_area() else {
            return Vec::new();
        };

        let (reference_frame, world_scale) = {
            let server = self.server.lock().expect("xr server mutex should not poison");
            (server.reference_frame(), server.world_scale() as f32)
        };

        corners
            .iter()
            .map(|corner| {
                let local = reference_frame.xform_inv(*corner);
                [
                    local[0] * world_scale,
                    local[1] * world_scale,
                    local[2] * world_scale,
                ]
            })
            .collect()
    }

    pub fn device_battery_percentage(&self, device: DeviceIndex) -> PropertySample<f32> {
        self.session().device_battery_percentage(device)
    }

    pub fn is_device_charging(&self, device: DeviceIndex) -> PropertySample<bool> {
        self.session().is_device_charging(device)
    }

    fn session(&self) -> std::sync::MutexGuard<'_, crate::session::VrSession> {
        self.session.lock().expect("session mutex should not poison")
    }
}
