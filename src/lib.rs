//! Bridges an OpenVR-style HMD runtime into a host engine's pluggable XR
//! interface: a shared device session over the runtime connection, a stereo
//! frame-lifecycle adapter, and a script-facing configuration surface
//! (action sets, play area, device battery state).

pub mod config;
pub mod interface;
pub mod math;
pub mod registry;
pub mod runtime;
pub mod server;
pub mod session;
pub mod submit;

pub use config::OpenVrConfig;
pub use interface::OpenVrInterface;
pub use registry::{ClassRegistry, register_types};
pub use runtime::{HmdRuntime, PropertySample, SimulatedHmd};
pub use server::{Capabilities, TrackingStatus, XrInterface, XrServer};
pub use session::{ApplicationType, SessionHandle, TrackingUniverse, VrSession};
pub use submit::{NullSubmitter, ViewSubmitter};
