//! Multi-hand tracking.
//!
//! [`HandTracker`] combines the palm detector and the landmark network:
//!
//! - Every tracked hand has a rotated region of interest (RoI). Each frame, the landmark network
//!   runs on every RoI. The RoI then follows the bounding box of the new landmarks, rotated by the
//!   estimated hand angle. Hands whose presence confidence drops below the tracking threshold are
//!   dropped.
//! - While fewer than [`TrackerOptions::max_hands`] hands are tracked, palm detection runs on the
//!   full frame. Palms that don't overlap an already tracked hand seed new RoIs, which are
//!   estimated right away.

use std::path::Path;

use crate::{
    detection::{Detection, PalmDetector},
    detector::HandDetector,
    hand::Hand,
    image::{AspectRatio, Image},
    landmark::{HandLandmarker, LandmarkResult},
    rect::{Rect, RotatedRect},
    timer::Timer,
};

/// Palm boxes only cover the palm. Seed RoIs are moved this far (relative to the palm height)
/// towards the fingers.
const PALM_SHIFT: f32 = 0.5;
/// Seed RoIs are squares this many times larger than the palm box's longer side.
const PALM_SCALE: f32 = 2.6;

/// Tuning parameters of a [`HandTracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerOptions {
    /// Maximum number of hands to track at once.
    pub max_hands: usize,
    /// Minimum palm detection confidence to start tracking a hand.
    pub detection_confidence: f32,
    /// Minimum hand presence confidence to keep tracking a hand.
    pub tracking_confidence: f32,
    /// Padding added to each side of the landmark bounding box, relative to its size.
    pub roi_padding: f32,
    /// New hands whose RoI overlaps a tracked RoI by more than this IoU are discarded.
    pub overlap_iou: f32,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            max_hands: 2,
            detection_confidence: 0.5,
            tracking_confidence: 0.5,
            roi_padding: 0.3,
            overlap_iou: 0.5,
        }
    }
}

/// Detects and tracks up to [`TrackerOptions::max_hands`] hands.
pub struct HandTracker {
    palm: PalmDetector,
    landmarker: HandLandmarker,
    options: TrackerOptions,
    rois: Vec<RotatedRect>,
}

impl HandTracker {
    /// Loads the palm detection and hand landmark models from ONNX files.
    pub fn load(
        palm_model: impl AsRef<Path>,
        landmark_model: impl AsRef<Path>,
        options: TrackerOptions,
    ) -> anyhow::Result<Self> {
        let palm = PalmDetector::load(palm_model)?;
        let landmarker = HandLandmarker::load(landmark_model)?;
        Ok(Self::new(palm, landmarker, options))
    }

    pub fn new(
        mut palm: PalmDetector,
        landmarker: HandLandmarker,
        options: TrackerOptions,
    ) -> Self {
        palm.set_threshold(options.detection_confidence);
        Self {
            palm,
            landmarker,
            options,
            rois: Vec::new(),
        }
    }

    /// Returns the profiling timers of the palm detector and the landmark network.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        self.palm.timers().chain(self.landmarker.timers())
    }

    fn aspect(&self) -> AspectRatio {
        self.landmarker.input_aspect().unwrap_or(AspectRatio::SQUARE)
    }

    /// Estimates landmarks in `roi` and computes the RoI for the next frame.
    ///
    /// Returns [`None`] if the hand was lost.
    fn track(
        &self,
        image: &Image,
        roi: RotatedRect,
    ) -> anyhow::Result<Option<(LandmarkResult, RotatedRect)>> {
        let result = self.landmarker.estimate(image, roi)?;
        if result.presence() < self.options.tracking_confidence {
            log::trace!(
                "hand presence {:.2} below {} -> lost",
                result.presence(),
                self.options.tracking_confidence,
            );
            return Ok(None);
        }

        let points = result.positions().iter().map(|&[x, y, _]| [x, y]);
        let Some(next) = RotatedRect::bounding(result.rotation_radians(), points) else {
            return Ok(None);
        };
        let next = next
            .grow_rel(self.options.roi_padding)
            .grow_to_fit_aspect(self.aspect());
        Ok(Some((result, next)))
    }
}

impl HandDetector for HandTracker {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Hand>> {
        let (w, h) = (image.width(), image.height());
        let to_hand =
            |result: &LandmarkResult| Hand::new(result.normalized(w, h), result.handedness());

        let mut hands = Vec::new();
        let mut rois = Vec::new();
        for roi in std::mem::take(&mut self.rois) {
            if let Some((result, next)) = self.track(image, roi)? {
                hands.push(to_hand(&result));
                rois.push(next);
            }
        }

        if rois.len() < self.options.max_hands {
            let aspect = self.aspect();
            let seeds = self
                .palm
                .detect(image)?
                .iter()
                .map(|det| palm_roi(det, aspect))
                .collect::<Vec<_>>();

            for seed in seeds {
                if rois.len() >= self.options.max_hands {
                    break;
                }
                if overlaps_any(&rois, &seed, self.options.overlap_iou) {
                    continue;
                }
                let Some((result, next)) = self.track(image, seed)? else {
                    continue;
                };
                if overlaps_any(&rois, &next, self.options.overlap_iou) {
                    continue;
                }

                log::debug!("tracking new {} hand", result.handedness());
                hands.push(to_hand(&result));
                rois.push(next);
            }
        }

        self.rois = rois;
        Ok(hands)
    }
}

/// Computes the landmark RoI enclosing the whole hand from a palm detection.
fn palm_roi(det: &Detection, aspect: AspectRatio) -> RotatedRect {
    let palm = det.bounding_rect();
    let rotated = RotatedRect::new(palm, det.angle());
    let [xc, yc] = rotated.transform_out([
        palm.width() * 0.5,
        palm.height() * (0.5 - PALM_SHIFT),
    ]);
    let size = palm.width().max(palm.height()) * PALM_SCALE;
    RotatedRect::new(Rect::from_center(xc, yc, size, size), det.angle())
        .grow_to_fit_aspect(aspect)
}

fn overlaps_any(rois: &[RotatedRect], candidate: &RotatedRect, max_iou: f32) -> bool {
    let candidate = bounding_rect(candidate);
    rois.iter().any(|roi| bounding_rect(roi).iou(&candidate) > max_iou)
}

fn bounding_rect(roi: &RotatedRect) -> Rect {
    Rect::bounding(roi.rotated_corners()).unwrap_or(*roi.rect())
}
