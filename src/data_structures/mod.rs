//! Engine data structures: the scene container and animation state.
//!
//! - `scene` holds the opaque root container the orchestrator draws each frame
//! - `animation` holds clips, transforms, mixers and the per-frame animation driver

pub mod animation;
pub mod scene;
