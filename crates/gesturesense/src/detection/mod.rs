//! Palm detection.
//!
//! Hands are hard to detect directly, so the first stage of the hand pipeline detects palms with
//! an SSD network. Every [`Detection`] carries 7 palm keypoints ([`PalmKeypoint`]) that are used
//! to estimate the hand's rotation and to seed a region of interest for landmark estimation.

pub mod nms;
pub mod ssd;

use std::path::Path;

use nalgebra::{Point2, Rotation2, Vector2};

use crate::{
    image::{AspectRatio, Image, Resolution},
    nn::{Cnn, CnnInputShape, ColorMapper, Outputs},
    num::sigmoid,
    rect::Rect,
    timer::Timer,
};

use self::{
    nms::NonMaxSuppression,
    ssd::{Anchor, AnchorParams, Anchors, LayerInfo},
};

/// Number of box parameters per anchor: box center and size, followed by 7 keypoints.
const BOX_PARAMS: usize = 18;

/// A keypoint of a palm [`Detection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalmKeypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

/// A detected palm.
///
/// Coordinates are in the pixel space of the image passed to [`PalmDetector::detect`].
#[derive(Debug, Clone)]
pub struct Detection {
    confidence: f32,
    angle: f32,
    rect: Rect,
    keypoints: Vec<Keypoint>,
}

impl Detection {
    pub fn new(confidence: f32, rect: Rect) -> Self {
        Self::with_keypoints(confidence, rect, Vec::new())
    }

    pub fn with_keypoints(confidence: f32, rect: Rect, keypoints: Vec<Keypoint>) -> Self {
        Self {
            confidence,
            angle: 0.0,
            rect,
            keypoints,
        }
    }

    /// Returns the detection confidence, between 0.0 and 1.0.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the clockwise rotation of the palm, in radians.
    ///
    /// An angle of 0 means that the fingers point up.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
    }

    /// Returns the axis-aligned bounding rectangle of the palm.
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Returns a palm keypoint, if the detection has keypoints.
    pub fn keypoint(&self, kp: PalmKeypoint) -> Option<Keypoint> {
        self.keypoints.get(kp as usize).copied()
    }

    /// Computes the palm angle from the wrist and middle finger keypoints.
    fn compute_angle(&self) -> Option<f32> {
        let finger = self.keypoint(PalmKeypoint::MiddleFingerMcp)?;
        let wrist = self.keypoint(PalmKeypoint::Wrist)?;
        let rel = Point2::new(wrist.x, wrist.y) - Point2::new(finger.x, finger.y);
        Some(Rotation2::rotation_between(&Vector2::y(), &rel).angle())
    }

    /// Maps the detection from network input coordinates to image coordinates.
    ///
    /// `rect` is the region of the image that was fed to the network.
    fn map_to_image(&mut self, rect: Rect, input_res: Resolution) {
        let scale = rect.width() / input_res.width() as f32;
        let [xc, yc] = self.rect.center();
        self.rect = Rect::from_center(
            xc * scale + rect.x(),
            yc * scale + rect.y(),
            self.rect.width() * scale,
            self.rect.height() * scale,
        );
        for kp in &mut self.keypoints {
            kp.x = kp.x * scale + rect.x();
            kp.y = kp.y * scale + rect.y();
        }
    }
}

/// A 2D keypoint produced as part of a [`Detection`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    x: f32,
    y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}

/// Detects palms using the MediaPipe palm detection network.
pub struct PalmDetector {
    cnn: Cnn,
    anchors: Anchors,
    nms: NonMaxSuppression,
    thresh: f32,
    detections: Vec<Detection>,
    t_infer: Timer,
    t_extract: Timer,
    t_nms: Timer,
}

impl PalmDetector {
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    /// Loads the palm detection network from an ONNX file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let cnn = Cnn::load(path, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        Ok(Self::new(cnn))
    }

    pub fn new(cnn: Cnn) -> Self {
        Self {
            cnn,
            anchors: Anchors::calculate(&AnchorParams {
                layers: &[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)],
            }),
            nms: NonMaxSuppression::new(),
            thresh: Self::DEFAULT_THRESHOLD,
            detections: Vec::new(),
            t_infer: Timer::new("palm infer"),
            t_extract: Timer::new("palm extract"),
            t_nms: Timer::new("palm nms"),
        }
    }

    /// Sets the minimum confidence of reported detections.
    pub fn set_threshold(&mut self, thresh: f32) {
        self.thresh = thresh;
    }

    /// Detects palms in `image`.
    pub fn detect(&mut self, image: &Image) -> anyhow::Result<&[Detection]> {
        let input_res = self.cnn.input_resolution();

        // Feed an oversized region matching the network's aspect ratio, the image gets
        // letterboxed with black bars.
        let aspect = input_res.aspect_ratio().unwrap_or(AspectRatio::SQUARE);
        let full = Rect::from_top_left(0.0, 0.0, image.width() as f32, image.height() as f32);
        let rect = full.grow_to_fit_aspect(aspect);
        let outputs = self
            .t_infer
            .time(|| self.cnn.estimate(image, rect.into()))?;

        self.detections.clear();
        self.t_extract.time(|| {
            extract_outputs(
                &self.anchors,
                input_res,
                &outputs,
                self.thresh,
                &mut self.detections,
            )
        })?;

        self.t_nms.time(|| self.nms.process(&mut self.detections));

        for det in &mut self.detections {
            det.map_to_image(rect, input_res);
        }

        Ok(self.detections.as_slice())
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_infer, &self.t_extract, &self.t_nms].into_iter()
    }
}

fn extract_outputs(
    anchors: &Anchors,
    input_res: Resolution,
    outputs: &Outputs,
    thresh: f32,
    detections: &mut Vec<Detection>,
) -> anyhow::Result<()> {
    let num_anchors = anchors.anchor_count();
    let boxes = outputs.get(0)?;
    let confidences = outputs.get(1)?;

    if boxes.shape() != [1, num_anchors, BOX_PARAMS] || confidences.shape() != [1, num_anchors, 1]
    {
        anyhow::bail!(
            "unexpected palm detection output shapes {:?} and {:?}",
            boxes.shape(),
            confidences.shape(),
        );
    }

    for (index, (&raw, box_params)) in confidences
        .as_slice()
        .iter()
        .zip(boxes.as_slice().chunks_exact(BOX_PARAMS))
        .enumerate()
    {
        let conf = sigmoid(raw);
        if conf < thresh {
            continue;
        }

        detections.push(extract_detection(
            &anchors[index],
            input_res,
            box_params,
            conf,
        ));
    }

    Ok(())
}

fn extract_detection(
    anchor: &Anchor,
    input_res: Resolution,
    box_params: &[f32],
    confidence: f32,
) -> Detection {
    let x_offset = anchor.x_center() * input_res.width() as f32;
    let y_offset = anchor.y_center() * input_res.height() as f32;

    let rect = Rect::from_center(
        box_params[0] + x_offset,
        box_params[1] + y_offset,
        box_params[2],
        box_params[3],
    );
    let keypoints = box_params[4..]
        .chunks_exact(2)
        .map(|xy| Keypoint::new(xy[0] + x_offset, xy[1] + y_offset))
        .collect();

    let mut det = Detection::with_keypoints(confidence, rect, keypoints);
    if let Some(angle) = det.compute_angle() {
        det.set_angle(angle);
    }
    det
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use approx::assert_relative_eq;

    use crate::nn::Tensor;

    use super::*;

    fn anchors() -> Anchors {
        Anchors::calculate(&AnchorParams {
            layers: &[LayerInfo::new(1, 2, 2)],
        })
    }

    #[test]
    fn extract_thresholds_and_offsets() {
        let res = Resolution::new(100, 100);
        let mut boxes = vec![0.0; 4 * BOX_PARAMS];
        // Second anchor is centered at (75, 25). Wrist below, middle finger above.
        let params = &mut boxes[BOX_PARAMS..2 * BOX_PARAMS];
        params[..4].copy_from_slice(&[1.0, 2.0, 20.0, 10.0]);
        params[4..6].copy_from_slice(&[0.0, 10.0]);
        params[8..10].copy_from_slice(&[0.0, -10.0]);
        let outputs = Outputs::from_tensors(vec![
            Tensor::from_vec(vec![1, 4, BOX_PARAMS], boxes),
            Tensor::from_vec(vec![1, 4, 1], vec![-5.0, 5.0, -5.0, -5.0]),
        ]);

        let mut detections = Vec::new();
        extract_outputs(&anchors(), res, &outputs, 0.5, &mut detections).unwrap();
        assert_eq!(detections.len(), 1);

        let det = &detections[0];
        assert_eq!(det.bounding_rect().center(), [76.0, 27.0]);
        assert_eq!(det.bounding_rect().width(), 20.0);
        assert_eq!(
            det.keypoint(PalmKeypoint::Wrist),
            Some(Keypoint::new(75.0, 35.0))
        );
        assert_relative_eq!(det.angle(), 0.0, epsilon = 1e-6);
        assert!(det.confidence() > 0.99);
    }

    #[test]
    fn upside_down_palm() {
        let mut det = Detection::with_keypoints(
            1.0,
            Rect::from_center(0.0, 0.0, 1.0, 1.0),
            vec![
                Keypoint::new(0.0, -10.0),
                Keypoint::new(0.0, 0.0),
                Keypoint::new(0.0, 10.0),
            ],
        );
        det.set_angle(det.compute_angle().unwrap());
        assert_relative_eq!(det.angle().abs(), PI, epsilon = 1e-5);
    }

    #[test]
    fn rejects_unexpected_shapes() {
        let outputs = Outputs::from_tensors(vec![
            Tensor::from_vec(vec![1, 1, BOX_PARAMS], vec![0.0; BOX_PARAMS]),
            Tensor::from_vec(vec![1, 1, 1], vec![0.0]),
        ]);
        let mut detections = Vec::new();
        let res = Resolution::new(100, 100);
        assert!(extract_outputs(&anchors(), res, &outputs, 0.5, &mut detections).is_err());
    }

    #[test]
    fn map_letterboxed_detection() {
        // A 200x100 image letterboxed into a 100x100 network input.
        let mut det = Detection::with_keypoints(
            1.0,
            Rect::from_center(50.0, 50.0, 10.0, 10.0),
            vec![Keypoint::new(50.0, 25.0)],
        );
        let rect = Rect::from_center(100.0, 50.0, 200.0, 200.0);
        det.map_to_image(rect, Resolution::new(100, 100));
        assert_eq!(det.bounding_rect().center(), [100.0, 50.0]);
        assert_eq!(det.bounding_rect().width(), 20.0);
        assert_eq!(det.keypoints()[0], Keypoint::new(100.0, 0.0));
    }
}
