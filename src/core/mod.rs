//! Core analysis building blocks: the immutable parameter set and the
//! pipeline stages (retrieval, masking, compositing, indices, statistics).
//! These are internal primitives consumed by the high-level `api` module.
pub mod params;
pub mod pipeline;
