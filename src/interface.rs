use crate::math::{Rect2, Transform3, flatten_column_major};
use crate::runtime::{Eye, HMD_DEVICE_INDEX, TrackingResult};
use crate::server::{
    Capabilities, InterfaceId, RenderTargetId, ServerHandle, TrackingStatus, XrInterface,
};
use crate::session::SessionHandle;
use crate::submit::{NativeTextureHandle, NullSubmitter, TextureBounds, ViewSubmitter};

/// XR interface adapter bridging the device session into the host contract.
///
/// Uninitialized until `initialize` succeeds; while uninitialized every
/// per-frame query returns its safe default. On success the adapter claims
/// the server's primary slot and releases it again on uninitialize, but only
/// if no other interface has taken it since.
pub struct OpenVrInterface {
    id: InterfaceId,
    session: SessionHandle,
    server: Option<ServerHandle>,
    width: u32,
    height: u32,
    submitter: Box<dyn ViewSubmitter>,
}

impl OpenVrInterface {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            id: InterfaceId::next(),
            session,
            server: None,
            width: 0,
            height: 0,
            submitter: Box::new(NullSubmitter::new()),
        }
    }

    pub fn with_submitter(session: SessionHandle, submitter: Box<dyn ViewSubmitter>) -> Self {
        let mut interface = Self::new(session);
        interface.submitter = submitter;
        interface
    }

    /// Binds the host server this adapter reports to. Required before
    /// `initialize` can succeed.
    pub fn bind_server(&mut self, server: ServerHandle) {
        {
            let mut guard = server.lock().expect("xr server mutex should not poison");
            guard.register_interface(Self::NAME, self.id);
        }
        self.server = Some(server);
    }

    pub fn interface_id(&self) -> InterfaceId {
        self.id
    }

    const NAME: &'static str = "OpenVR";

    fn session_initialized(&self) -> bool {
        self.session
            .lock()
            .expect("session mutex should not poison")
            .is_initialized()
    }

    /// Reference frame and world scale from the bound server, or `None`
    /// while no server is bound or the session is down.
    fn frame_context(&self) -> Option<(Transform3, f64)> {
        let server = self.server.as_ref()?;
        if !self.session_initialized() {
            return None;
        }
        let guard = server.lock().expect("xr server mutex should not poison");
        Some((guard.reference_frame(), guard.world_scale()))
    }
}

impl XrInterface for OpenVrInterface {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::STEREO | Capabilities::EXTERNAL
    }

    fn is_initialized(&self) -> bool {
        self.session_initialized()
    }

    fn initialize(&mut self) -> bool {
        let Some(server) = self.server.clone() else {
            log::warn!("[interface] cannot initialize without a bound XR server");
            return false;
        };

        let initialized = {
            let mut session = self.session.lock().expect("session mutex should not poison");
            if session.initialize() {
                let (width, height) = session.recommended_render_target_size();
                self.width = width;
                self.height = height;
                true
            } else {
                false
            }
        };

        if initialized {
            let mut guard = server.lock().expect("xr server mutex should not poison");
            guard.set_primary_interface(self.id, Self::NAME);
        }

        initialized
    }

    fn uninitialize(&mut self) {
        {
            let mut session = self.session.lock().expect("session mutex should not poison");
            session.cleanup();
        }

        if let Some(server) = &self.server {
            let mut guard = server.lock().expect("xr server mutex should not poison");
            if guard.clear_primary_interface(self.id) {
                log::info!("[interface] released primary XR interface slot");
            }
        }
    }

    fn tracking_status(&self) -> TrackingStatus {
        let session = self.session.lock().expect("session mutex should not poison");
        match session.device_tracking_result(HMD_DEVICE_INDEX) {
            TrackingResult::Ok => TrackingStatus::Normal,
            TrackingResult::ExcessiveMotion => TrackingStatus::ExcessiveMotion,
            TrackingResult::InsufficientFeatures => TrackingStatus::InsufficientFeatures,
            TrackingResult::OutOfRange => TrackingStatus::NotTracking,
            TrackingResult::Uninitialized => TrackingStatus::Unknown,
        }
    }

    fn render_target_size(&mut self) -> [u32; 2] {
        if self.session_initialized() {
            [self.width, self.height]
        } else {
            [0, 0]
        }
    }

    fn view_count(&mut self) -> usize {
        2
    }

    fn camera_transform(&mut self) -> Transform3 {
        let Some((reference_frame, _)) = self.frame_context() else {
            return Transform3::IDENTITY;
        };
        let session = self.session.lock().expect("session mutex should not poison");
        reference_frame * session.hmd_transform()
    }

    fn transform_for_view(&mut self, view: usize, camera_transform: &Transform3) -> Transform3 {
        let Some((reference_frame, world_scale)) = self.frame_context() else {
            return Transform3::IDENTITY;
        };
        let session = self.session.lock().expect("session mutex should not poison");
        let eye = Eye::from_view(view);
        // Recomposed from scratch rather than reusing the camera argument's
        // cached pose, so per-eye queries stay correct out of order.
        let eye_offset = session.eye_to_head_transform(eye, world_scale as f32);
        *camera_transform * reference_frame * session.hmd_transform() * eye_offset
    }

    fn projection_for_view(
        &mut self,
        view: usize,
        _aspect: f64,
        z_near: f64,
        z_far: f64,
    ) -> Vec<f64> {
        let session = self.session.lock().expect("session mutex should not poison");
        if !session.is_initialized() {
            return Vec::new();
        }
        let matrix = session.projection_matrix(Eye::from_view(view), z_near, z_far);
        flatten_column_major(&matrix)
    }

    fn commit_views(&mut self, render_target: RenderTargetId, screen_rect: Rect2) {
        if !self.session_initialized() {
            return;
        }

        let texture = NativeTextureHandle(render_target.0);
        for eye in [Eye::Left, Eye::Right] {
            if let Err(err) = self.submitter.submit(eye, texture, TextureBounds::FULL) {
                log::warn!("[interface] {} submission failed: {err}", self.submitter.label());
            }
        }

        if screen_rect.has_area() {
            let source = mirror_source_rect([self.width, self.height], screen_rect);
            self.submitter.mirror(texture, source, screen_rect);
        }
    }

    fn process(&mut self) {
        let mut session = self.session.lock().expect("session mutex should not poison");
        session.process();
    }
}

impl Drop for OpenVrInterface {
    fn drop(&mut self) {
        // The host should have uninitialized us already; force the
        // transition if it has not.
        if self.session_initialized() {
            self.uninitialize();
        }
    }
}

/// Aspect-preserving normalized source rectangle for mirroring the render
/// target into `screen_rect`: crops whichever source dimension overflows the
/// screen's aspect ratio.
pub fn mirror_source_rect(render_size: [u32; 2], screen_rect: Rect2) -> Rect2 {
    let full = Rect2::new(0.0, 0.0, 1.0, 1.0);
    if !screen_rect.has_area() || render_size[0] == 0 || render_size[1] == 0 {
        return full;
    }

    let render_aspect = render_size[0] as f32 / render_size[1] as f32;
    let screen_aspect = screen_rect.size[0] / screen_rect.size[1];
    if screen_aspect >= render_aspect {
        let height = render_aspect / screen_aspect;
        Rect2::new(0.0, 0.5 * (1.0 - height), 1.0, height)
    } else {
        let width = screen_aspect / render_aspect;
        Rect2::new(0.5 * (1.0 - width), 0.0, width, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::SimulatedHmd;
    use crate::server::XrServer;
    use crate::session::VrSession;
    use std::sync::{Arc, Mutex};

    fn session_with(runtime: SimulatedHmd) -> SessionHandle {
        Arc::new(Mutex::new(VrSession::new(Box::new(runtime))))
    }

    fn bound_interface(runtime: SimulatedHmd) -> (OpenVrInterface, ServerHandle) {
        let server = XrServer::handle();
        let mut interface = OpenVrInterface::new(session_with(runtime));
        interface.bind_server(server.clone());
        (interface, server)
    }

    #[test]
    fn uninitialized_interface_returns_safe_defaults() {
        let (mut interface, _server) = bound_interface(SimulatedHmd::new());

        assert_eq!(interface.render_target_size(), [0, 0]);
        assert_eq!(interface.camera_transform(), Transform3::IDENTITY);
        assert!(interface.projection_for_view(0, 1.0, 0.1, 100.0).is_empty());
        assert_eq!(interface.view_count(), 2);
        assert_eq!(interface.tracking_status(), TrackingStatus::Unknown);
    }

    #[test]
    fn initialize_requires_a_bound_server() {
        let mut interface = OpenVrInterface::new(session_with(SimulatedHmd::new()));
        assert!(!interface.initialize());
        assert!(!interface.is_initialized());
    }

    #[test]
    fn initialize_claims_primary_and_records_render_size() {
        let (mut interface, server) = bound_interface(SimulatedHmd::new());
        assert!(interface.initialize());
        assert!(interface.is_initialized());
        assert_eq!(interface.render_target_size(), [1440, 1600]);
        assert_eq!(
            server.lock().unwrap().primary_interface(),
            Some(interface.interface_id())
        );
    }

    #[test]
    fn camera_transform_equals_raw_pose_under_identity_frame() {
        let pose = Transform3::rotation_y(0.4) * Transform3::from_origin([0.1, 1.7, -0.2]);
        let mut runtime = SimulatedHmd::new();
        runtime.set_hmd_pose(pose);

        let (mut interface, _server) = bound_interface(runtime);
        assert!(interface.initialize());
        interface.process();

        assert!(interface.camera_transform().approx_eq(&pose, 1e-6));
    }

    #[test]
    fn transform_for_view_composes_camera_reference_pose_and_eye_offset() {
        let pose = Transform3::rotation_y(-0.3) * Transform3::from_origin([0.0, 1.6, 0.5]);
        let reference = Transform3::rotation_y(0.8) * Transform3::from_origin([2.0, 0.0, -1.0]);
        let mut runtime = SimulatedHmd::new();
        runtime.set_hmd_pose(pose);

        let (mut interface, server) = bound_interface(runtime);
        {
            let mut guard = server.lock().unwrap();
            guard.set_reference_frame(reference);
            guard.set_world_scale(3.0);
        }
        assert!(interface.initialize());
        interface.process();

        let camera = interface.camera_transform();
        for view in [0usize, 1] {
            let eye_offset = {
                let session = interface.session.lock().unwrap();
                session.eye_to_head_transform(Eye::from_view(view), 3.0)
            };
            let expected = camera * reference * pose * eye_offset;
            let actual = interface.transform_for_view(view, &camera);
            assert!(actual.approx_eq(&expected, 1e-4));
        }
    }

    #[test]
    fn world_scale_changes_only_the_eye_translation() {
        let (mut interface, server) = bound_interface(SimulatedHmd::new());
        assert!(interface.initialize());
        interface.process();

        let camera = interface.camera_transform();
        let at_one = interface.transform_for_view(1, &camera);
        server.lock().unwrap().set_world_scale(10.0);
        let at_ten = interface.transform_for_view(1, &camera);

        assert_eq!(at_one.basis, at_ten.basis);
        assert!((at_ten.origin[0] - 0.32).abs() < 1e-5);
        assert!((at_one.origin[0] - 0.032).abs() < 1e-5);
    }

    #[test]
    fn projection_flattens_sixteen_values_column_major() {
        let (mut interface, _server) = bound_interface(SimulatedHmd::new());
        assert!(interface.initialize());

        let flat = interface.projection_for_view(0, 1.0, 0.1, 100.0);
        assert_eq!(flat.len(), 16);

        let matrix = {
            let session = interface.session.lock().unwrap();
            session.projection_matrix(Eye::Left, 0.1, 100.0)
        };
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(flat[i * 4 + j], matrix[j][i] as f64);
            }
        }
    }

    #[test]
    fn mirror_source_rect_crops_the_overflowing_dimension() {
        // Wide screen over a tall render target: crop vertically.
        let source = mirror_source_rect([1000, 1000], Rect2::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(source.size[0], 1.0);
        assert!((source.size[1] - 0.5).abs() < 1e-6);
        assert!((source.position[1] - 0.25).abs() < 1e-6);

        // Tall screen: crop horizontally.
        let source = mirror_source_rect([1000, 1000], Rect2::new(0.0, 0.0, 100.0, 200.0));
        assert_eq!(source.size[1], 1.0);
        assert!((source.size[0] - 0.5).abs() < 1e-6);

        // Degenerate inputs fall back to the full rect.
        let source = mirror_source_rect([0, 0], Rect2::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(source, Rect2::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn commit_views_is_gated_on_initialization() {
        let submitter = NullSubmitter::new();
        let session = session_with(SimulatedHmd::new());
        let server = XrServer::handle();
        let mut interface = OpenVrInterface::with_submitter(session, Box::new(submitter));
        interface.bind_server(server);

        // Not initialized: nothing reaches the submitter, nothing panics.
        interface.commit_views(RenderTargetId(1), Rect2::new(0.0, 0.0, 1280.0, 720.0));
        assert!(interface.initialize());
        interface.commit_views(RenderTargetId(1), Rect2::new(0.0, 0.0, 1280.0, 720.0));
    }

    #[test]
    fn drop_from_active_releases_the_primary_slot() {
        let server = XrServer::handle();
        let session = session_with(SimulatedHmd::new());
        let id = {
            let mut interface = OpenVrInterface::new(session.clone());
            interface.bind_server(server.clone());
            assert!(interface.initialize());
            interface.interface_id()
        };
        assert_ne!(server.lock().unwrap().primary_interface(), Some(id));
        assert!(!session.lock().unwrap().is_initialized());
    }
}
