//! Render pipelines owned by the GPU surface.

pub mod lines;
