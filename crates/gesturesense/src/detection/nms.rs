//! Non-Maximum Suppression and Averaging.
//!
//! SSD networks produce many overlapping detections for a single palm. [`NonMaxSuppression`]
//! reduces every cluster of overlapping detections to one, either by keeping only the most
//! confident detection ([`SuppressionMode::Remove`]) or by averaging the cluster weighted by
//! confidence ([`SuppressionMode::Average`], the default, which jitters less between frames).

use itertools::Itertools;

use crate::{num::TotalF32, rect::Rect};

use super::{Detection, Keypoint};

/// A non-maximum suppression algorithm.
pub struct NonMaxSuppression {
    iou_thresh: f32,
    mode: SuppressionMode,
}

impl NonMaxSuppression {
    /// The default intersection-over-union threshold used to determine if two detections overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    /// Creates a new non-maximum suppressor using [`SuppressionMode::Average`].
    pub fn new() -> Self {
        Self {
            iou_thresh: Self::DEFAULT_IOU_THRESH,
            mode: SuppressionMode::Average,
        }
    }

    /// Sets the intersection-over-union threshold to consider two detections as overlapping.
    pub fn set_iou_thresh(&mut self, iou_thresh: f32) {
        self.iou_thresh = iou_thresh;
    }

    pub fn set_mode(&mut self, mode: SuppressionMode) {
        self.mode = mode;
    }

    /// Replaces the contents of `detections` with the suppressed detections.
    ///
    /// The result is ordered by descending confidence of each cluster's seed.
    pub fn process(&mut self, detections: &mut Vec<Detection>) {
        // Ascending, so that `pop` yields the most confident detection first.
        detections.sort_unstable_by_key(|det| TotalF32(det.confidence));

        let mut out = Vec::with_capacity(detections.len());
        while let Some(seed) = detections.pop() {
            let seed_rect = seed.bounding_rect();
            let iou_thresh = self.iou_thresh;
            let overlaps = |other: &Detection| seed_rect.iou(&other.bounding_rect()) >= iou_thresh;

            match self.mode {
                SuppressionMode::Remove => {
                    detections.retain(|other| !overlaps(other));
                    out.push(seed);
                }
                SuppressionMode::Average => {
                    let (cluster, rest): (Vec<_>, Vec<_>) =
                        detections.drain(..).partition(|other| overlaps(other));
                    *detections = rest;
                    out.push(average(&seed, &cluster));
                }
            }
        }

        *detections = out;
    }
}

impl Default for NonMaxSuppression {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the confidence-weighted average of `seed` and `others`.
///
/// The result keeps the confidence of `seed`.
fn average(seed: &Detection, others: &[Detection]) -> Detection {
    let mut keypoints = vec![Keypoint::new(0.0, 0.0); seed.keypoints.len()];
    let (mut x, mut y, mut w, mut h, mut angle) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut divisor = 0.0;

    for det in std::iter::once(seed).chain(others) {
        let factor = det.confidence;
        divisor += factor;
        for (acc, kp) in keypoints.iter_mut().zip_eq(&det.keypoints) {
            acc.x += kp.x * factor;
            acc.y += kp.y * factor;
        }
        let rect = det.bounding_rect();
        x += rect.x_center() * factor;
        y += rect.y_center() * factor;
        w += rect.width() * factor;
        h += rect.height() * factor;
        angle += det.angle * factor;
    }

    for kp in &mut keypoints {
        kp.x /= divisor;
        kp.y /= divisor;
    }

    let mut avg = Detection::with_keypoints(
        seed.confidence,
        Rect::from_center(x / divisor, y / divisor, w / divisor, h / divisor),
        keypoints,
    );
    avg.set_angle(angle / divisor);
    avg
}

/// Describes how [`NonMaxSuppression`] deals with overlapping detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionMode {
    /// Remove overlapping detections, only retain the detection with highest confidence score.
    Remove,

    /// Compute a confidence-weighted average of overlapping detections.
    Average,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_suppresses_non_maximum() {
        let mut nms = NonMaxSuppression::new();
        nms.set_mode(SuppressionMode::Remove);

        let rect = Rect::from_center(0.0, 0.0, 1.0, 1.0);
        let mut detections = vec![
            Detection::new(0.55, rect.scale(1.5)),
            Detection::new(0.6, rect),
        ];
        nms.process(&mut detections);
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        assert_eq!(d.confidence(), 0.6);
        assert_eq!(d.bounding_rect(), rect);
    }

    #[test]
    fn nms_ignores_nonoverlapping() {
        let mut nms = NonMaxSuppression::new();
        nms.set_mode(SuppressionMode::Remove);

        let mut detections = vec![
            Detection::new(1.0, Rect::from_center(0.0, 0.0, 1.0, 1.0)),
            Detection::new(0.9, Rect::from_center(5.0, 0.0, 1.0, 1.0)),
        ];
        nms.process(&mut detections);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].confidence(), 1.0);
    }

    #[test]
    fn nma_averages_detections() {
        let mut nms = NonMaxSuppression::new();
        nms.set_iou_thresh(0.0);

        let rect = Rect::from_center(-1.0, 3.0, 1.0, 1.0);
        let mut a = Detection::with_keypoints(1.0, rect, vec![Keypoint::new(0.0, 0.0)]);
        a.set_angle(0.3);
        let b = Detection::with_keypoints(0.5, rect.scale(4.0), vec![Keypoint::new(3.0, -3.0)]);
        let mut detections = vec![a, b];
        nms.process(&mut detections);
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        let rect = d.bounding_rect();
        assert_eq!(d.confidence(), 1.0);
        assert_eq!(rect.x_center(), -1.0);
        assert_eq!(rect.y_center(), 3.0);
        assert_eq!(rect.width(), 2.0);
        assert_eq!(rect.height(), 2.0);
        assert_eq!(d.keypoints()[0].x(), 1.0);
        assert_eq!(d.keypoints()[0].y(), -1.0);
        assert!((d.angle() - 0.2).abs() < 1e-6);
    }
}
