//! Scene root container.
//!
//! The orchestrator never looks inside the scene. It creates an empty one,
//! hands it to callers for insertion, and passes it to the GPU surface each
//! frame. Drawing is up to the nodes themselves.

use std::{cell::RefCell, fmt::Debug, rc::Rc};

use cgmath::Matrix4;

use crate::pipelines::lines::LineVertex;

/// Anything that can live in the scene.
pub trait SceneNode {
    /// Short type label used in logs.
    fn kind(&self) -> &'static str;

    /// Record draw commands for this node. Nodes without GPU resources draw nothing.
    fn draw(&self, _render_pass: &mut wgpu::RenderPass<'_>, _view_proj: &Matrix4<f32>) {}

    /// Append unlit line segments, two vertices each, drawn over the scene.
    fn debug_lines(&self, _out: &mut Vec<LineVertex>) {}
}

// Lets one node be both in the scene and the target of an animation mixer.
impl<T: SceneNode + ?Sized> SceneNode for Rc<RefCell<T>> {
    fn kind(&self) -> &'static str {
        self.borrow().kind()
    }

    fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, view_proj: &Matrix4<f32>) {
        self.borrow().draw(render_pass, view_proj);
    }

    fn debug_lines(&self, out: &mut Vec<LineVertex>) {
        self.borrow().debug_lines(out);
    }
}

impl Debug for dyn SceneNode + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    children: Vec<Box<dyn SceneNode>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Box<dyn SceneNode>) {
        log::debug!("scene: adding {}", node.kind());
        self.children.push(node);
    }

    pub fn children(&self) -> &[Box<dyn SceneNode>] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Line segments of every node, in insertion order.
    pub fn debug_lines(&self) -> Vec<LineVertex> {
        let mut out = Vec::new();
        for node in &self.children {
            node.debug_lines(&mut out);
        }
        out
    }
}

/// Orientation gizmo: three axis lines of equal length from the origin
/// (x red, y green, z blue).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesHelper {
    pub size: f32,
}

impl AxesHelper {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

}

impl SceneNode for AxesHelper {
    fn kind(&self) -> &'static str {
        "AxesHelper"
    }

    fn debug_lines(&self, out: &mut Vec<LineVertex>) {
        let s = self.size;
        for (end, colour) in [
            ([s, 0.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, s, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, s], [0.0, 0.0, 1.0]),
        ] {
            out.push(LineVertex::new([0.0; 3], colour));
            out.push(LineVertex::new(end, colour));
        }
    }
}
