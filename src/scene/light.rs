//! Light sources and their shadow-pass matrices.

use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use cgmath::{ortho, perspective, InnerSpace, Matrix4, Point3, Rad, Vector3, Vector4};

use crate::render::device::GraphicsDevice;
use crate::scene::geometry;
use crate::scene::material::Material;
use crate::scene::mesh::Mesh;
use crate::scene::transform::{Spatial, Transform};
use crate::scene::{ComponentKind, MAX_TEXTURES};

/// Far clip distance of the shadow projections; the omni-directional depth
/// shader divides fragment distances by the same constant.
pub const SHADOW_FAR_PLANE: f32 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Directional = 0,
    Point = 1,
    Spot = 2,
}

/// Distance falloff coefficients.
#[derive(Clone, Copy, Debug)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

/// A light source.
///
/// Each active light contributes one packed record to the per-draw lighting
/// block and provides the view/projection pair used when rendering depth
/// from its point of view. Point lights produce six cube-face views.
pub struct LightSource {
    transform: Transform,
    kind: LightKind,
    active: bool,
    pub material: Material,
    pub attenuation: Attenuation,
    pub direction: Vector3<f32>,
    cone_inner_angle: f32,
    cone_outer_angle: f32,
    projection: Matrix4<f32>,
    icon: Option<Mesh>,
}

impl LightSource {
    pub fn new(kind: LightKind) -> Self {
        let mut material = Material::default();
        material.ambient = Vector3::new(0.2, 0.2, 0.2);
        material.diffuse = Vector4::new(0.9, 0.9, 0.9, 1.0);

        let (position, direction, attenuation, inner, outer) = match kind {
            LightKind::Directional => (
                Vector3::new(10.0, 50.0, 100.0),
                Vector3::new(-0.1, -0.5, -1.0).normalize(),
                Attenuation {
                    constant: 0.0,
                    linear: 0.0,
                    quadratic: 0.0,
                },
                0.0,
                0.0,
            ),
            LightKind::Point => (
                Vector3::new(0.0, 5.0, 0.0),
                Vector3::new(0.0, -1.0, 0.0),
                Attenuation::default(),
                0.0,
                0.0,
            ),
            LightKind::Spot => (
                Vector3::new(0.0, 5.0, 0.0),
                Vector3::new(0.0, -1.0, 0.0),
                Attenuation::default(),
                12.5f32.to_radians(),
                17.5f32.to_radians(),
            ),
        };

        let projection = match kind {
            LightKind::Directional => ortho(-25.0, 25.0, -25.0, 25.0, 1.0, SHADOW_FAR_PLANE),
            LightKind::Point | LightKind::Spot => {
                perspective(Rad(FRAC_PI_2), 1.0, 0.5, SHADOW_FAR_PLANE)
            }
        };

        Self {
            transform: Transform::new(position),
            kind,
            active: true,
            material,
            attenuation,
            direction,
            cone_inner_angle: inner,
            cone_outer_angle: outer,
            projection,
            icon: None,
        }
    }

    /// Attaches a small colored cube so the light can be visualized in the
    /// scene like any other renderable.
    pub fn with_icon(mut self, device: Rc<dyn GraphicsDevice>) -> Self {
        let mut icon = Mesh::from_shape(
            device,
            ComponentKind::LightSource,
            "LightIcon",
            geometry::cube(0.25),
        );
        icon.material.diffuse = self.material.diffuse;
        icon.move_to(self.transform.position());
        self.icon = Some(icon);
        self
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn cone_angles(&self) -> (f32, f32) {
        (self.cone_inner_angle, self.cone_outer_angle)
    }

    pub fn set_cone_angles(&mut self, inner_radians: f32, outer_radians: f32) {
        self.cone_inner_angle = inner_radians;
        self.cone_outer_angle = outer_radians;
    }

    pub fn icon(&self) -> Option<&Mesh> {
        self.icon.as_ref()
    }

    /// Drops the icon and its GPU buffers (graphics teardown keeps the
    /// light itself alive).
    pub fn clear_icon(&mut self) {
        self.icon = None;
    }

    /// Keeps the icon mesh at the light's position.
    pub fn sync_icon(&mut self) {
        let position = self.transform.position();
        if let Some(icon) = self.icon.as_mut() {
            icon.move_to(position);
        }
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    /// View matrix for a depth pass. `face` selects one of the six cube
    /// faces for point lights (fixed +X,-X,+Y,-Y,+Z,-Z order) and is
    /// ignored otherwise.
    pub fn view(&self, face: usize) -> Matrix4<f32> {
        let position = self.transform.position();
        let eye = Point3::new(position.x, position.y, position.z);

        let (direction, up) = match self.kind {
            LightKind::Point => {
                const FACES: [([f32; 3], [f32; 3]); MAX_TEXTURES] = [
                    ([1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
                    ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
                    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
                    ([0.0, -1.0, 0.0], [0.0, 0.0, -1.0]),
                    ([0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
                    ([0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
                ];
                let (direction, up) = FACES[face.min(MAX_TEXTURES - 1)];
                (Vector3::from(direction), Vector3::from(up))
            }
            _ => (self.direction, Vector3::new(0.0, 1.0, 0.0)),
        };

        let center = position + direction;
        Matrix4::look_at_rh(eye, Point3::new(center.x, center.y, center.z), up)
    }

    pub fn mvp(&self, model: Matrix4<f32>) -> Matrix4<f32> {
        self.projection * self.view(0) * model
    }
}

impl Spatial for LightSource {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn presets_start_active() {
        assert!(LightSource::new(LightKind::Directional).is_active());
        assert!(LightSource::new(LightKind::Point).is_active());
        assert!(LightSource::new(LightKind::Spot).is_active());
    }

    #[test]
    fn spot_presets_have_a_valid_cone() {
        let light = LightSource::new(LightKind::Spot);
        let (inner, outer) = light.cone_angles();
        assert!(inner > 0.1);
        assert!(outer > inner);
    }

    #[test]
    fn point_lights_produce_six_distinct_views() {
        let light = LightSource::new(LightKind::Point);
        for a in 0..MAX_TEXTURES {
            for b in (a + 1)..MAX_TEXTURES {
                assert_ne!(light.view(a), light.view(b));
            }
        }
    }

    #[test]
    fn directional_view_ignores_the_face_index() {
        let light = LightSource::new(LightKind::Directional);
        let first = light.view(0);
        let other = light.view(3);
        for col in 0..4 {
            for row in 0..4 {
                assert_relative_eq!(first[col][row], other[col][row]);
            }
        }
    }
}
