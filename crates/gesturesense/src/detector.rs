//! The seam between the control loop and the landmark model.

use crate::{hand::Hand, image::Image};

/// Finds hands in camera frames.
///
/// Landmark coordinates of the returned [`Hand`]s are normalized by the size of `image`.
pub trait HandDetector {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Hand>>;
}

impl<D: HandDetector + ?Sized> HandDetector for Box<D> {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Hand>> {
        (**self).detect(image)
    }
}
