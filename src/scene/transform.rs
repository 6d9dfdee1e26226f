//! Position/rotation/scale state and world-matrix composition.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU32, Ordering};

use cgmath::{Matrix4, Rad, SquareMatrix, Vector3};

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// Spatial state of a scene entity.
///
/// The world matrix is the product `translation * rotation * scale`, with the
/// rotation composed from per-axis rotations as `Z * Y * X`. Each mutator
/// recomputes only the matrix derived from the vector it touched, then the
/// combined matrix. Rotation components are wrapped back into `(-2pi, 2pi)`
/// on every rotation so repeated relative rotations never accumulate
/// unboundedly.
#[derive(Clone, Debug)]
pub struct Transform {
    id: u32,
    position: Vector3<f32>,
    rotation: Vector3<f32>,
    scale: Vector3<f32>,
    translation_matrix: Matrix4<f32>,
    rotation_matrix: Matrix4<f32>,
    scale_matrix: Matrix4<f32>,
    matrix: Matrix4<f32>,
    pub auto_rotate: bool,
    pub auto_rotation: Vector3<f32>,
}

impl Transform {
    pub fn new(position: Vector3<f32>) -> Self {
        let mut transform = Self {
            // Ids are process-unique and never reused.
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            position,
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            translation_matrix: Matrix4::identity(),
            rotation_matrix: Matrix4::identity(),
            scale_matrix: Matrix4::identity(),
            matrix: Matrix4::identity(),
            auto_rotate: false,
            auto_rotation: Vector3::new(0.0, 0.0, 0.0),
        };
        transform.update_translation();
        transform.update_rotation();
        transform.update_scale();
        transform
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    /// The combined world matrix.
    pub fn matrix(&self) -> Matrix4<f32> {
        self.matrix
    }

    pub fn move_by(&mut self, amount: Vector3<f32>) {
        self.position += amount;
        self.update_translation();
    }

    pub fn move_to(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.update_translation();
    }

    pub fn rotate_by(&mut self, amount_radians: Vector3<f32>) {
        self.rotation += amount_radians;
        self.update_rotation();
    }

    pub fn rotate_to(&mut self, rotation_radians: Vector3<f32>) {
        self.rotation = rotation_radians;
        self.update_rotation();
    }

    pub fn scale_by(&mut self, amount: Vector3<f32>) {
        self.scale += amount;
        self.update_scale();
    }

    pub fn scale_to(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
        self.update_scale();
    }

    fn update_matrix(&mut self) {
        self.matrix = self.translation_matrix * self.rotation_matrix * self.scale_matrix;
    }

    fn update_rotation(&mut self) {
        // Wrap into (-2pi, 2pi) after every mutation.
        self.rotation.x %= TAU;
        self.rotation.y %= TAU;
        self.rotation.z %= TAU;

        let rotate_x = Matrix4::from_angle_x(Rad(self.rotation.x));
        let rotate_y = Matrix4::from_angle_y(Rad(self.rotation.y));
        let rotate_z = Matrix4::from_angle_z(Rad(self.rotation.z));

        self.rotation_matrix = rotate_z * rotate_y * rotate_x;

        self.update_matrix();
    }

    fn update_scale(&mut self) {
        self.scale_matrix =
            Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
        self.update_matrix();
    }

    fn update_translation(&mut self) {
        self.translation_matrix = Matrix4::from_translation(self.position);
        self.update_matrix();
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, 0.0))
    }
}

/// Shared transform capability.
///
/// The default implementations delegate to the embedded [`Transform`], which
/// is what meshes and lights use unchanged. The camera overrides the move and
/// rotate entry points to additionally refresh its derived view basis.
pub trait Spatial {
    fn transform(&self) -> &Transform;
    fn transform_mut(&mut self) -> &mut Transform;

    fn move_by(&mut self, amount: Vector3<f32>) {
        self.transform_mut().move_by(amount);
    }

    fn move_to(&mut self, position: Vector3<f32>) {
        self.transform_mut().move_to(position);
    }

    fn rotate_by(&mut self, amount_radians: Vector3<f32>) {
        self.transform_mut().rotate_by(amount_radians);
    }

    fn rotate_to(&mut self, rotation_radians: Vector3<f32>) {
        self.transform_mut().rotate_to(rotation_radians);
    }

    fn scale_by(&mut self, amount: Vector3<f32>) {
        self.transform_mut().scale_by(amount);
    }

    fn scale_to(&mut self, scale: Vector3<f32>) {
        self.transform_mut().scale_to(scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    fn expected_matrix(
        position: Vector3<f32>,
        rotation: Vector3<f32>,
        scale: Vector3<f32>,
    ) -> Matrix4<f32> {
        let rotation_matrix = Matrix4::from_angle_z(Rad(rotation.z))
            * Matrix4::from_angle_y(Rad(rotation.y))
            * Matrix4::from_angle_x(Rad(rotation.x));
        Matrix4::from_translation(position)
            * rotation_matrix
            * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = Transform::default();
        let b = Transform::default();
        assert!(b.id() > a.id());
    }

    #[test]
    fn world_matrix_matches_final_state_regardless_of_interleaving() {
        let mut transform = Transform::default();
        transform.move_by(Vector3::new(1.0, 0.0, 0.0));
        transform.rotate_by(Vector3::new(0.3, 0.0, 0.0));
        transform.scale_by(Vector3::new(0.5, 0.5, 0.5));
        transform.move_by(Vector3::new(0.0, 2.0, -1.0));
        transform.rotate_by(Vector3::new(0.0, -0.7, 0.2));
        transform.move_to(Vector3::new(4.0, 4.0, 4.0));

        let expected =
            expected_matrix(transform.position(), transform.rotation(), transform.scale());
        let actual = transform.matrix();
        for col in 0..4 {
            for row in 0..4 {
                assert_relative_eq!(actual[col][row], expected[col][row], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn rotation_stays_wrapped_after_every_call() {
        let mut transform = Transform::default();
        for _ in 0..50 {
            transform.rotate_by(Vector3::new(TAU + 0.1, 0.0, 0.0));
            assert!(transform.rotation().x.abs() < TAU);
        }
    }

    #[test]
    fn negative_rotation_wraps_too() {
        let mut transform = Transform::default();
        for _ in 0..50 {
            transform.rotate_by(Vector3::new(0.0, -(TAU + 0.25), 0.0));
            assert!(transform.rotation().y > -TAU);
            assert!(transform.rotation().y < TAU);
        }
    }

    #[test]
    fn rotate_to_replaces_state() {
        let mut transform = Transform::default();
        transform.rotate_by(Vector3::new(1.0, 1.0, 1.0));
        transform.rotate_to(Vector3::new(0.0, PI, 0.0));
        assert_relative_eq!(transform.rotation().y, PI);
        assert_relative_eq!(transform.rotation().x, 0.0);
    }
}
