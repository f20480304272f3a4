use crate::math::Rect2;
use crate::runtime::Eye;
use thiserror::Error;

/// Graphics-API texture handle as the compositor backend understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTextureHandle(pub u64);

/// Normalized texture sub-rectangle submitted to the compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureBounds {
    pub u_min: f32,
    pub v_min: f32,
    pub u_max: f32,
    pub v_max: f32,
}

impl TextureBounds {
    pub const FULL: Self = Self {
        u_min: 0.0,
        v_min: 0.0,
        u_max: 1.0,
        v_max: 1.0,
    };

    pub fn is_valid(&self) -> bool {
        self.u_min < self.u_max && self.v_min < self.v_max
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("compositor rejected {eye:?} view: {reason}")]
    Rejected { eye: Eye, reason: String },
}

/// Backend strategy for getting rendered views to the HMD compositor.
///
/// Texture interop is graphics-API specific (Vulkan, GL, ...), so the
/// adapter only composes bounds and delegates here.
pub trait ViewSubmitter: Send {
    fn label(&self) -> &'static str;

    /// Submits one eye's texture region to the compositor.
    fn submit(
        &mut self,
        eye: Eye,
        texture: NativeTextureHandle,
        bounds: TextureBounds,
    ) -> Result<(), SubmitError>;

    /// Optional mirror blit of the render target to the host screen.
    fn mirror(&mut self, _texture: NativeTextureHandle, _source: Rect2, _target: Rect2) {}
}

/// Submitter that validates and records submissions without a compositor.
/// Used by tests and headless hosts.
pub struct NullSubmitter {
    submissions: Vec<(Eye, NativeTextureHandle, TextureBounds)>,
    mirror_blits: Vec<(NativeTextureHandle, Rect2, Rect2)>,
}

impl NullSubmitter {
    pub fn new() -> Self {
        Self {
            submissions: Vec::new(),
            mirror_blits: Vec::new(),
        }
    }

    pub fn submissions(&self) -> &[(Eye, NativeTextureHandle, TextureBounds)] {
        &self.submissions
    }

    pub fn mirror_blits(&self) -> &[(NativeTextureHandle, Rect2, Rect2)] {
        &self.mirror_blits
    }
}

impl Default for NullSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewSubmitter for NullSubmitter {
    fn label(&self) -> &'static str {
        "Null Submitter"
    }

    fn submit(
        &mut self,
        eye: Eye,
        texture: NativeTextureHandle,
        bounds: TextureBounds,
    ) -> Result<(), SubmitError> {
        if !bounds.is_valid() {
            return Err(SubmitError::Rejected {
                eye,
                reason: format!("degenerate bounds {bounds:?}"),
            });
        }
        self.submissions.push((eye, texture, bounds));
        Ok(())
    }

    fn mirror(&mut self, texture: NativeTextureHandle, source: Rect2, target: Rect2) {
        self.mirror_blits.push((texture, source, target));
    }
}
