use crate::math::{Rect2, Transform3};
use bitflags::bitflags;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Shared handle to the host's XR server state.
pub type ServerHandle = Arc<Mutex<XrServer>>;

bitflags! {
    /// Capability flags an interface reports to the host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        /// Renders one view per eye.
        const STEREO = 1 << 0;
        /// Output goes to an external device rather than the main screen.
        const EXTERNAL = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingStatus {
    Normal,
    ExcessiveMotion,
    InsufficientFeatures,
    NotTracking,
    #[default]
    Unknown,
}

/// Opaque handle to a host render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetId(pub u64);

/// Process-unique identity for one interface instance. The primary slot is
/// tracked by identity, not by name, so two instances of the same interface
/// cannot clear each other's registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceId(u64);

impl InterfaceId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The host engine's pluggable XR interface contract.
///
/// One implementation at a time may hold the server's primary slot; the host
/// drives `process` once per frame before querying any transforms.
pub trait XrInterface: Send {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    fn is_initialized(&self) -> bool;

    fn initialize(&mut self) -> bool;

    fn uninitialize(&mut self);

    fn tracking_status(&self) -> TrackingStatus;

    /// Requested render target size; queried right before rendering.
    fn render_target_size(&mut self) -> [u32; 2];

    fn view_count(&mut self) -> usize;

    /// Center (head) transform in the host's tracking space.
    fn camera_transform(&mut self) -> Transform3;

    fn transform_for_view(&mut self, view: usize, camera_transform: &Transform3) -> Transform3;

    /// Projection matrix for one view, flattened column-major into 16 values.
    /// Empty while uninitialized.
    fn projection_for_view(&mut self, view: usize, aspect: f64, z_near: f64, z_far: f64)
    -> Vec<f64>;

    /// Post-render hook: hand the rendered target to the HMD compositor.
    fn commit_views(&mut self, render_target: RenderTargetId, screen_rect: Rect2);

    /// Called once per frame by the render thread before any transform or
    /// projection query.
    fn process(&mut self);

    /// Generic notification hook from the host scene.
    fn notification(&mut self, _what: i64) {}
}

/// Host-side XR state the bridge consumes: world scale, reference frame, the
/// primary-interface slot, and a registry of interface names.
pub struct XrServer {
    world_scale: f64,
    reference_frame: Transform3,
    primary: Option<InterfaceId>,
    interfaces: HashMap<&'static str, InterfaceId>,
}

impl XrServer {
    pub fn new() -> Self {
        Self {
            world_scale: 1.0,
            reference_frame: Transform3::IDENTITY,
            primary: None,
            interfaces: HashMap::new(),
        }
    }

    pub fn handle() -> ServerHandle {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn world_scale(&self) -> f64 {
        self.world_scale
    }

    pub fn set_world_scale(&mut self, scale: f64) {
        if scale > 0.0 {
            self.world_scale = scale;
        } else {
            log::warn!("[server] ignoring non-positive world scale {scale}");
        }
    }

    pub fn reference_frame(&self) -> Transform3 {
        self.reference_frame
    }

    pub fn set_reference_frame(&mut self, frame: Transform3) {
        self.reference_frame = frame;
    }

    pub fn register_interface(&mut self, name: &'static str, id: InterfaceId) {
        self.interfaces.insert(name, id);
    }

    pub fn find_interface(&self, name: &str) -> Option<InterfaceId> {
        self.interfaces.get(name).copied()
    }

    pub fn set_primary_interface(&mut self, id: InterfaceId, name: &'static str) {
        self.interfaces.insert(name, id);
        self.primary = Some(id);
        log::info!("[server] {name} is now the primary XR interface");
    }

    pub fn primary_interface(&self) -> Option<InterfaceId> {
        self.primary
    }

    /// Clears the primary slot only while `id` still holds it; another
    /// interface's registration survives.
    pub fn clear_primary_interface(&mut self, id: InterfaceId) -> bool {
        if self.primary == Some(id) {
            self.primary = None;
            true
        } else {
            false
        }
    }
}

impl Default for XrServer {
    fn default() -> Self {
        Self::new()
    }
}
