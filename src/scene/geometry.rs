//! Primitive geometry generators.
//!
//! Raw arrays for a unit cube, a lat/long sphere and a 2D quad. Used for
//! bounding volumes, light source icons, skyboxes and HUD overlays.

use std::f32::consts::PI;

/// Flat position/normal/index arrays, ready for mesh construction.
pub struct Shape {
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
    pub texture_coords: Vec<f32>,
    pub indices: Vec<u32>,
}

/// A cube spanning `[-scale, scale]` on every axis.
pub fn cube(scale: f32) -> Shape {
    let s = scale;
    #[rustfmt::skip]
    let corners: [[f32; 3]; 8] = [
        [-s, -s, -s], [ s, -s, -s], [ s,  s, -s], [-s,  s, -s],
        [-s, -s,  s], [ s, -s,  s], [ s,  s,  s], [-s,  s,  s],
    ];

    let mut vertices = Vec::with_capacity(8 * 3);
    let mut normals = Vec::with_capacity(8 * 3);
    for corner in corners {
        vertices.extend_from_slice(&corner);
        // Corner normals: good enough for debug geometry and icons.
        let len = (corner[0] * corner[0] + corner[1] * corner[1] + corner[2] * corner[2]).sqrt();
        normals.extend_from_slice(&[corner[0] / len, corner[1] / len, corner[2] / len]);
    }

    #[rustfmt::skip]
    let indices = vec![
        0, 1, 2, 2, 3, 0, // back
        4, 6, 5, 6, 4, 7, // front
        4, 0, 3, 3, 7, 4, // left
        1, 5, 6, 6, 2, 1, // right
        3, 2, 6, 6, 7, 3, // top
        4, 5, 1, 1, 0, 4, // bottom
    ];

    Shape {
        vertices,
        normals,
        texture_coords: Vec::new(),
        indices,
    }
}

/// A lat/long sphere of the given radius.
pub fn sphere(radius: f32, rings: u32, sectors: u32) -> Shape {
    let mut vertices = Vec::new();
    let mut normals = Vec::new();
    let mut texture_coords = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let phi = PI * ring as f32 / rings as f32;
        for sector in 0..=sectors {
            let theta = 2.0 * PI * sector as f32 / sectors as f32;

            let x = phi.sin() * theta.cos();
            let y = phi.cos();
            let z = phi.sin() * theta.sin();

            vertices.extend_from_slice(&[x * radius, y * radius, z * radius]);
            normals.extend_from_slice(&[x, y, z]);
            texture_coords.extend_from_slice(&[
                sector as f32 / sectors as f32,
                ring as f32 / rings as f32,
            ]);
        }
    }

    let stride = sectors + 1;
    for ring in 0..rings {
        for sector in 0..sectors {
            let a = ring * stride + sector;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    Shape {
        vertices,
        normals,
        texture_coords,
        indices,
    }
}

/// A quad in the XY plane spanning `[-1, 1]`, facing +Z. HUD overlays are
/// placed by scaling and translating the quad's transform.
pub fn quad() -> Shape {
    #[rustfmt::skip]
    let vertices = vec![
        -1.0, -1.0, 0.0,
         1.0, -1.0, 0.0,
         1.0,  1.0, 0.0,
        -1.0,  1.0, 0.0,
    ];
    #[rustfmt::skip]
    let texture_coords = vec![
        0.0, 1.0,
        1.0, 1.0,
        1.0, 0.0,
        0.0, 0.0,
    ];
    let normals = vec![
        0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    ];

    Shape {
        vertices,
        normals,
        texture_coords,
        indices: vec![0, 1, 2, 2, 3, 0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_eight_corners_and_twelve_triangles() {
        let shape = cube(1.0);
        assert_eq!(shape.vertices.len(), 8 * 3);
        assert_eq!(shape.indices.len(), 36);
        assert!(shape.indices.iter().all(|&i| i < 8));
    }

    #[test]
    fn sphere_vertices_sit_on_the_radius() {
        let shape = sphere(2.0, 8, 8);
        for vertex in shape.vertices.chunks(3) {
            let len = (vertex[0] * vertex[0] + vertex[1] * vertex[1] + vertex[2] * vertex[2]).sqrt();
            assert!((len - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn quad_is_two_triangles_with_texture_coords() {
        let shape = quad();
        assert_eq!(shape.indices.len(), 6);
        assert_eq!(shape.texture_coords.len(), 8);
    }
}
