//! Per-frame building blocks, leaves first: pixel -> classifier -> mask ->
//! morphology -> blob detector.

pub mod blob;
pub mod blob_detector;
pub mod classifier;
pub mod mask;
pub mod morphology;
pub mod pixel;
