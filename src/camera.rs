//! Perspective camera and the controller seam that binds overlay input to it.
//!
//! The camera is owned by the orchestrator. Its aspect ratio always follows
//! the render surface; callers never set it directly.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Projection parameters. `aspect` is derived from surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fovy: Rad<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            fovy: fovy.into(),
            aspect: width as f32 / height as f32,
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub(crate) projection: Projection,
}

impl Camera {
    pub fn new(position: Point3<f32>, target: Point3<f32>, projection: Projection) -> Self {
        Self {
            position,
            target,
            up: Vector3::unit_y(),
            projection,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.projection.aspect
    }

    /// Read-only: the aspect ratio is owned by the render surface.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn calc_view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.calc_view()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Other,
}

/// Input as captured by the overlay layer, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(PointerButton),
    PointerUp(PointerButton),
    PointerMoved { x: f64, y: f64 },
    /// Positive values zoom in.
    Wheel(f32),
}

/// Turns captured input into camera transform updates.
pub trait CameraController {
    /// Returns `true` when the camera was changed.
    fn handle_input(&mut self, camera: &mut Camera, event: &InputEvent) -> bool;
}

/// Orbits around `camera.target` while the primary button is held and
/// dollies toward it on wheel input.
#[derive(Debug, Clone)]
pub struct OrbitController {
    rotate_speed: f32,
    zoom_speed: f32,
    min_distance: f32,
    max_distance: f32,
    dragging: bool,
    last_pointer: Option<(f64, f64)>,
}

impl OrbitController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            min_distance: 0.01,
            max_distance: f32::MAX,
            dragging: false,
            last_pointer: None,
        }
    }

    pub fn with_distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    fn rotate(&self, camera: &mut Camera, dx: f32, dy: f32) {
        let offset = camera.position - camera.target;
        let radius = offset.magnitude();
        if radius == 0.0 {
            return;
        }
        let mut yaw = offset.x.atan2(offset.z);
        let mut pitch = (offset.y / radius).clamp(-1.0, 1.0).asin();
        yaw -= dx * self.rotate_speed;
        // keep clear of the poles so `up` stays valid
        let limit = std::f32::consts::FRAC_PI_2 - 0.001;
        pitch = (pitch + dy * self.rotate_speed).clamp(-limit, limit);
        let offset = Vector3::new(
            radius * pitch.cos() * yaw.sin(),
            radius * pitch.sin(),
            radius * pitch.cos() * yaw.cos(),
        );
        camera.position = camera.target + offset;
    }

    fn zoom(&self, camera: &mut Camera, amount: f32) {
        let offset = camera.position - camera.target;
        let radius = offset.magnitude();
        if radius == 0.0 {
            return;
        }
        let scale = (1.0 - amount * self.zoom_speed).max(0.01);
        let new_radius = (radius * scale).clamp(self.min_distance, self.max_distance);
        camera.position = camera.target + offset.normalize() * new_radius;
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(0.005, 0.1)
    }
}

impl CameraController for OrbitController {
    fn handle_input(&mut self, camera: &mut Camera, event: &InputEvent) -> bool {
        match *event {
            InputEvent::PointerDown(PointerButton::Primary) => {
                self.dragging = true;
                false
            }
            InputEvent::PointerUp(PointerButton::Primary) => {
                self.dragging = false;
                false
            }
            InputEvent::PointerDown(_) | InputEvent::PointerUp(_) => false,
            InputEvent::PointerMoved { x, y } => {
                let previous = self.last_pointer.replace((x, y));
                match previous {
                    Some((px, py)) if self.dragging => {
                        self.rotate(camera, (x - px) as f32, (y - py) as f32);
                        true
                    }
                    _ => false,
                }
            }
            InputEvent::Wheel(amount) => {
                self.zoom(camera, amount);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, EuclideanSpace};

    use super::*;

    fn camera() -> Camera {
        let projection = Projection::new(800, 600, Deg(20.0), 0.1, 5000.0);
        Camera::new(Point3::new(0.0, 0.0, 3.0), Point3::origin(), projection)
    }

    #[test]
    fn aspect_follows_resize() {
        let mut camera = camera();
        assert!((camera.aspect() - 800.0 / 600.0).abs() < f32::EPSILON);
        camera.projection.resize(300, 600);
        assert!((camera.aspect() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn moving_without_drag_keeps_the_camera() {
        let mut camera = camera();
        let before = camera.position;
        let mut controller = OrbitController::default();
        assert!(!controller.handle_input(&mut camera, &InputEvent::PointerMoved { x: 0.0, y: 0.0 }));
        assert!(!controller.handle_input(&mut camera, &InputEvent::PointerMoved { x: 50.0, y: 0.0 }));
        assert_eq!(camera.position, before);
    }

    #[test]
    fn dragging_orbits_at_constant_distance() {
        let mut camera = camera();
        let mut controller = OrbitController::default();
        controller.handle_input(&mut camera, &InputEvent::PointerMoved { x: 0.0, y: 0.0 });
        controller.handle_input(&mut camera, &InputEvent::PointerDown(PointerButton::Primary));
        assert!(controller.handle_input(&mut camera, &InputEvent::PointerMoved { x: 100.0, y: 20.0 }));
        let distance = (camera.position - camera.target).magnitude();
        assert!((distance - 3.0).abs() < 1e-4);
        assert!(camera.position.x.abs() > 1e-3);
    }

    #[test]
    fn wheel_dollies_toward_target() {
        let mut camera = camera();
        let mut controller = OrbitController::default();
        controller.handle_input(&mut camera, &InputEvent::Wheel(1.0));
        assert!(camera.position.z < 3.0);
        assert!(camera.position.z > 0.0);
    }
}
