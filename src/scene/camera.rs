//! Free-look camera: view/projection derivation and navigation input.

use std::f32::consts::PI;

use cgmath::{
    perspective, InnerSpace, Matrix4, Point3, Rad, Vector3, Vector4,
};
use winit::event::MouseScrollDelta;
use winit::keyboard::{KeyCode, ModifiersState};

use crate::scene::transform::{Spatial, Transform};
use crate::scene::ComponentKind;

/// Fixed world up axis used for the view matrix and for panning.
pub const WORLD_UP: Vector3<f32> = Vector3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};

const KEYBOARD_MOVE_SPEED: f32 = 20.0;
const MOUSE_MOVE_SPEED: f32 = 3.0;
const SCROLL_MOVE_SPEED: f32 = 20.0;

/// The free-look camera.
///
/// Yaw and pitch are the single source of truth for the forward vector: the
/// `look_at` constructor converts the requested direction into yaw/pitch
/// (`yaw = atan2(z, x)`, `pitch = asin(y)`) and re-derives forward from them,
/// so construction and rotation share one update path. Pitch is clamped to
/// `[-pi/2, pi/2]` on every rotation.
///
/// The projection matrix is only recomputed by [`Camera::update_projection`];
/// call it whenever the viewport aspect ratio or the field of view changes.
#[derive(Clone, Debug)]
pub struct Camera {
    transform: Transform,
    yaw: f32,
    pitch: f32,
    fov_radians: f32,
    near: f32,
    far: f32,
    forward: Vector3<f32>,
    right: Vector3<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl Camera {
    pub fn new(
        position: Vector3<f32>,
        look_at: Vector3<f32>,
        fov_radians: f32,
        near: f32,
        far: f32,
        aspect_ratio: f32,
    ) -> Self {
        let mut camera = Self {
            transform: Transform::new(position),
            yaw: -(PI * 0.5),
            pitch: 0.0,
            fov_radians,
            near,
            far,
            forward: Vector3::new(0.0, 0.0, -1.0),
            right: Vector3::new(1.0, 0.0, 0.0),
            view: Matrix4::from_scale(1.0),
            projection: Matrix4::from_scale(1.0),
        };
        camera.init(position, look_at, aspect_ratio);
        camera
    }

    /// Restores the default pose: position (0, 2.5, 10) looking down -Z,
    /// 45 degree field of view, near 0.1, far 100.
    pub fn reset(&mut self, aspect_ratio: f32) {
        let position = Vector3::new(0.0, 2.5, 10.0);
        self.fov_radians = PI * 0.25;
        self.near = 0.1;
        self.far = 100.0;
        self.init(position, Vector3::new(0.0, 0.0, 0.0), aspect_ratio);
    }

    fn init(&mut self, position: Vector3<f32>, look_at: Vector3<f32>, aspect_ratio: f32) {
        self.transform.move_to(position);

        let direction = (look_at - position).normalize();
        self.yaw = direction.z.atan2(direction.x);
        self.pitch = direction.y.asin();

        self.update_projection(aspect_ratio);
        self.update_rotation();
    }

    pub fn kind(&self) -> ComponentKind {
        ComponentKind::Camera
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.position()
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        WORLD_UP
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn fov(&self) -> f32 {
        self.fov_radians
    }

    /// Sets the field of view. The projection is not refreshed until
    /// [`Camera::update_projection`] runs with the current aspect ratio.
    pub fn set_fov(&mut self, fov_radians: f32) {
        self.fov_radians = fov_radians;
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    /// The view matrix; with `remove_translation` the translation column is
    /// zeroed so the result only reflects orientation. Skybox rendering uses
    /// this to keep the box infinitely distant.
    pub fn view(&self, remove_translation: bool) -> Matrix4<f32> {
        if remove_translation {
            let mut view = self.view;
            view.w = Vector4::new(0.0, 0.0, 0.0, view.w.w);
            view
        } else {
            self.view
        }
    }

    /// `projection * view * model`, optionally with the view translation
    /// stripped.
    pub fn mvp(&self, model: Matrix4<f32>, remove_translation: bool) -> Matrix4<f32> {
        self.projection * self.view(remove_translation) * model
    }

    /// Recomputes the projection from the viewport aspect ratio and the
    /// stored field of view and clip distances. Not automatic; call on
    /// resize and FOV changes.
    pub fn update_projection(&mut self, aspect_ratio: f32) {
        self.projection = perspective(Rad(self.fov_radians), aspect_ratio, self.near, self.far);
    }

    /// Mirrors the pitch around the horizon (used by reflection passes).
    pub fn invert_pitch(&mut self) {
        let pitch = -self.pitch;
        let yaw = self.yaw;
        self.rotate_to(Vector3::new(pitch, yaw, 0.0));
    }

    /// WASD navigation scaled by the frame delta time. Returns whether the
    /// key was handled.
    pub fn input_keyboard(&mut self, key: KeyCode, delta_time: f32) -> bool {
        let move_amount = delta_time * KEYBOARD_MOVE_SPEED;
        let side = self.forward.cross(WORLD_UP).normalize();

        let move_vector = match key {
            KeyCode::KeyW => self.forward * move_amount,
            KeyCode::KeyA => side * -move_amount,
            KeyCode::KeyS => self.forward * -move_amount,
            KeyCode::KeyD => side * move_amount,
            _ => return false,
        };

        self.move_by(move_vector);
        true
    }

    /// Mouse-drag navigation. A plain drag rotates (yaw/pitch), shift-drag
    /// pans along the right axis and world up, ctrl-drag dollies along the
    /// forward axis.
    pub fn input_mouse_move(
        &mut self,
        delta: (f64, f64),
        modifiers: ModifiersState,
        delta_time: f32,
    ) {
        let move_modifier = (
            delta.0 as f32 * delta_time * MOUSE_MOVE_SPEED,
            delta.1 as f32 * delta_time * MOUSE_MOVE_SPEED,
        );

        if modifiers.shift_key() {
            let side = self.forward.cross(WORLD_UP).normalize();
            self.move_by(side * -move_modifier.0);
            self.move_by(Vector3::new(0.0, move_modifier.1, 0.0));
        } else if modifiers.control_key() {
            self.move_by(self.forward * -move_modifier.1);
        } else {
            self.rotate_by(Vector3::new(
                -(move_modifier.1 * 0.01),
                move_modifier.0 * 0.01,
                0.0,
            ));
        }
    }

    /// Wheel navigation: shift moves vertically, ctrl laterally, a plain
    /// scroll dollies forward/backward. Only the sign of the delta matters.
    pub fn input_mouse_scroll(
        &mut self,
        delta: MouseScrollDelta,
        modifiers: ModifiersState,
        delta_time: f32,
    ) {
        let wheel = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32,
        };
        let move_modifier =
            (if wheel.is_sign_negative() { -1.0 } else { 1.0 }) * delta_time * SCROLL_MOVE_SPEED;

        let move_vector = if modifiers.shift_key() {
            Vector3::new(0.0, move_modifier, 0.0)
        } else if modifiers.control_key() {
            self.forward.cross(WORLD_UP).normalize() * move_modifier
        } else {
            self.forward * move_modifier
        };

        self.move_by(move_vector);
    }

    fn update_position(&mut self) {
        let position = self.transform.position();
        let center = position + self.forward;
        self.view = Matrix4::look_at_rh(
            Point3::new(position.x, position.y, position.z),
            Point3::new(center.x, center.y, center.z),
            WORLD_UP,
        );
    }

    fn update_rotation(&mut self) {
        self.pitch = self.pitch.clamp(-(PI * 0.5), PI * 0.5);
        self.transform
            .rotate_to(Vector3::new(self.pitch, self.yaw, 0.0));

        self.forward = Vector3::new(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.sin(),
        )
        .normalize();
        self.right = self.forward.cross(WORLD_UP).normalize();

        self.update_position();
    }
}

impl Spatial for Camera {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn move_by(&mut self, amount: Vector3<f32>) {
        self.transform.move_by(amount);
        self.update_position();
    }

    fn move_to(&mut self, position: Vector3<f32>) {
        self.transform.move_to(position);
        self.update_position();
    }

    /// `x` is the pitch delta, `y` the yaw delta; `z` is ignored.
    fn rotate_by(&mut self, amount_radians: Vector3<f32>) {
        self.pitch += amount_radians.x;
        self.yaw += amount_radians.y;
        self.update_rotation();
    }

    fn rotate_to(&mut self, rotation_radians: Vector3<f32>) {
        self.pitch = rotation_radians.x;
        self.yaw = rotation_radians.y;
        self.update_rotation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_camera() -> Camera {
        Camera::new(
            Vector3::new(0.0, 2.5, 10.0),
            Vector3::new(0.0, 2.5, 0.0),
            PI * 0.25,
            0.1,
            100.0,
            16.0 / 9.0,
        )
    }

    #[test]
    fn look_at_constructor_reproduces_the_requested_direction() {
        let camera = test_camera();
        let forward = camera.forward();
        assert_relative_eq!(forward.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(forward.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(forward.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn pitch_stays_clamped_for_all_delta_sequences() {
        let mut camera = test_camera();
        for i in 0..100 {
            let delta = if i % 3 == 0 { 0.4 } else { -0.9 };
            camera.rotate_by(Vector3::new(delta, 0.1, 0.0));
            assert!(camera.pitch() >= -(PI * 0.5));
            assert!(camera.pitch() <= PI * 0.5);
        }
    }

    #[test]
    fn translation_stripped_mvp_ignores_position_but_not_rotation() {
        let mut camera = test_camera();
        let model = Matrix4::from_scale(1.0);

        let before = camera.mvp(model, true);
        camera.move_by(Vector3::new(5.0, -3.0, 12.0));
        let after_move = camera.mvp(model, true);
        for col in 0..4 {
            for row in 0..4 {
                assert_relative_eq!(before[col][row], after_move[col][row], epsilon = 1e-5);
            }
        }

        camera.rotate_by(Vector3::new(0.0, 0.5, 0.0));
        let after_rotate = camera.mvp(model, true);
        let mut changed = false;
        for col in 0..4 {
            for row in 0..4 {
                if (after_move[col][row] - after_rotate[col][row]).abs() > 1e-4 {
                    changed = true;
                }
            }
        }
        assert!(changed, "rotation must still affect the stripped MVP");
    }

    #[test]
    fn keyboard_w_moves_along_forward_scaled_by_delta_time() {
        let mut camera = test_camera();
        let start = camera.position();
        let forward = camera.forward();
        let dt = 1.0 / 60.0;

        assert!(camera.input_keyboard(KeyCode::KeyW, dt));

        let moved = camera.position() - start;
        let expected = forward * (dt * 20.0);
        assert_relative_eq!(moved.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(moved.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(moved.z, expected.z, epsilon = 1e-5);
        assert_relative_eq!(moved.magnitude(), dt * 20.0, epsilon = 1e-5);
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut camera = test_camera();
        let start = camera.position();
        assert!(!camera.input_keyboard(KeyCode::KeyQ, 1.0 / 60.0));
        assert_eq!(camera.position(), start);
    }

    #[test]
    fn plain_scroll_dollies_along_forward() {
        let mut camera = test_camera();
        let start = camera.position();
        let forward = camera.forward();
        camera.input_mouse_scroll(
            MouseScrollDelta::LineDelta(0.0, 1.0),
            ModifiersState::empty(),
            1.0 / 60.0,
        );
        let moved = camera.position() - start;
        assert!(moved.dot(forward) > 0.0);
    }

    #[test]
    fn invert_pitch_mirrors_around_the_horizon() {
        let mut camera = test_camera();
        camera.rotate_by(Vector3::new(0.3, 0.0, 0.0));
        let pitch = camera.pitch();
        camera.invert_pitch();
        assert_relative_eq!(camera.pitch(), -pitch, epsilon = 1e-6);
    }
}
