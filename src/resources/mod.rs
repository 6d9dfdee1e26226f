/**
 * This module contains the file import boundaries: model files, image files
 * and shader source text. The engine core only consumes the decoded results
 * (flat arrays, RGBA pixels, source strings); the parsing itself stays here.
 */
pub mod image;
pub mod model;
pub mod shader_sources;
