//! GPU geometry buffer lifecycle.

use std::rc::Rc;

use crate::render::device::GraphicsDevice;

/// One GPU buffer object wrapping either an index array or a float array.
/// The object is created on construction and released on drop; an id of 0
/// marks a buffer the device failed to allocate.
pub struct GeometryBuffer {
    device: Rc<dyn GraphicsDevice>,
    id: u32,
    len: usize,
}

impl GeometryBuffer {
    pub fn from_indices(device: Rc<dyn GraphicsDevice>, indices: &[u32]) -> Self {
        let id = device.create_index_buffer(indices);
        Self {
            device,
            id,
            len: indices.len(),
        }
    }

    pub fn from_floats(device: Rc<dyn GraphicsDevice>, data: &[f32]) -> Self {
        let id = device.create_array_buffer(data);
        Self {
            device,
            id,
            len: data.len(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_ok(&self) -> bool {
        self.id > 0
    }

    /// Element count of the source array.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        if self.id > 0 {
            self.device.delete_buffer(self.id);
        }
    }
}

impl std::fmt::Debug for GeometryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("id", &self.id)
            .field("len", &self.len)
            .finish()
    }
}
