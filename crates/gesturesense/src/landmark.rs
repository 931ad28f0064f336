//! Hand landmark estimation.

use std::path::Path;

use nalgebra::{Point2, Rotation2, Vector2};

use crate::{
    hand::{Handedness, Landmark, LandmarkIdx, NUM_LANDMARKS},
    image::Image,
    nn::{Cnn, CnnInputShape, ColorMapper, Outputs},
    rect::RotatedRect,
    timer::Timer,
};

/// Landmarks estimated by [`HandLandmarker`].
///
/// Positions are in pixel coordinates of the full image.
#[derive(Debug, Clone)]
pub struct LandmarkResult {
    positions: [[f32; 3]; NUM_LANDMARKS],
    presence: f32,
    raw_handedness: f32,
}

impl LandmarkResult {
    pub fn position(&self, idx: LandmarkIdx) -> [f32; 3] {
        self.positions[idx as usize]
    }

    pub fn positions(&self) -> &[[f32; 3]; NUM_LANDMARKS] {
        &self.positions
    }

    /// Returns the network's confidence that a hand is present in the region, from 0.0 to 1.0.
    pub fn presence(&self) -> f32 {
        self.presence
    }

    /// Returns the estimated handedness of the user's hand.
    ///
    /// The raw score is above 0.5 for a right hand as seen in an unmirrored camera image. Frames
    /// are mirrored before detection, so a high score means the user's *left* hand.
    ///
    /// This is only meaningful when [`presence`][Self::presence] is high enough.
    pub fn handedness(&self) -> Handedness {
        if self.raw_handedness > 0.5 {
            Handedness::Left
        } else {
            Handedness::Right
        }
    }

    /// Computes the clockwise rotation of the hand compared to an upright position.
    ///
    /// A rotation of 0° means that the fingers point up.
    pub fn rotation_radians(&self) -> f32 {
        let [x, y, _] = self.position(LandmarkIdx::MiddleFingerMcp);
        let finger = Point2::new(x, y);
        let [x, y, _] = self.position(LandmarkIdx::Wrist);
        let wrist = Point2::new(x, y);

        Rotation2::rotation_between(&Vector2::y(), &(wrist - finger)).angle()
    }

    /// Converts the landmarks to their normalized representation on an image of `width x height`.
    pub fn normalized(&self, width: u32, height: u32) -> [Landmark; NUM_LANDMARKS] {
        let (w, h) = (width as f32, height as f32);
        self.positions.map(|[x, y, z]| Landmark::new(x / w, y / h, z / w))
    }
}

/// Runs the MediaPipe hand landmark network on regions of an image.
pub struct HandLandmarker {
    cnn: Cnn,
    t_infer: Timer,
    t_extract: Timer,
}

impl HandLandmarker {
    /// Loads the hand landmark network from an ONNX file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let cnn = Cnn::load(path, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        Ok(Self::new(cnn))
    }

    pub fn new(cnn: Cnn) -> Self {
        Self {
            cnn,
            t_infer: Timer::new("landmark infer"),
            t_extract: Timer::new("landmark extract"),
        }
    }

    /// Returns the aspect ratio the network expects its input region to have.
    pub fn input_aspect(&self) -> Option<crate::image::AspectRatio> {
        self.cnn.input_resolution().aspect_ratio()
    }

    /// Estimates hand landmarks in the region `roi` of `image`.
    ///
    /// `roi` should already match [`input_aspect`][Self::input_aspect], otherwise the hand gets
    /// stretched.
    pub fn estimate(&self, image: &Image, roi: RotatedRect) -> anyhow::Result<LandmarkResult> {
        let outputs = self.t_infer.time(|| self.cnn.estimate(image, roi))?;
        let input_res = self.cnn.input_resolution();
        let mut result = self.t_extract.time(|| extract(&outputs))?;

        // Network coordinates -> RoI coordinates -> image coordinates.
        let scale_x = roi.rect().width() / input_res.width() as f32;
        let scale_y = roi.rect().height() / input_res.height() as f32;
        for [x, y, z] in &mut result.positions {
            [*x, *y] = roi.transform_out([*x * scale_x, *y * scale_y]);
            *z *= scale_x;
        }

        Ok(result)
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_infer, &self.t_extract].into_iter()
    }
}

/// Extracts the screen landmarks, presence and handedness outputs.
///
/// The fourth output (world landmarks in meters) is not used.
fn extract(outputs: &Outputs) -> anyhow::Result<LandmarkResult> {
    let screen_landmarks = outputs.get(0)?;
    let presence = outputs.get(1)?;
    let handedness = outputs.get(2)?;

    if screen_landmarks.shape() != [1, NUM_LANDMARKS * 3]
        || presence.shape() != [1, 1]
        || handedness.shape() != [1, 1]
    {
        anyhow::bail!(
            "unexpected hand landmark output shapes {:?}, {:?}, {:?}",
            screen_landmarks.shape(),
            presence.shape(),
            handedness.shape(),
        );
    }

    let mut positions = [[0.0; 3]; NUM_LANDMARKS];
    for (out, xyz) in positions
        .iter_mut()
        .zip(screen_landmarks.as_slice().chunks_exact(3))
    {
        out.copy_from_slice(xyz);
    }

    Ok(LandmarkResult {
        positions,
        presence: presence.as_slice()[0],
        raw_handedness: handedness.as_slice()[0],
    })
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use crate::nn::Tensor;

    use super::*;

    fn outputs(presence: f32, handedness: f32) -> Outputs {
        let coords = (0..NUM_LANDMARKS * 3).map(|i| i as f32).collect();
        Outputs::from_tensors(vec![
            Tensor::from_vec(vec![1, NUM_LANDMARKS * 3], coords),
            Tensor::from_vec(vec![1, 1], vec![presence]),
            Tensor::from_vec(vec![1, 1], vec![handedness]),
            Tensor::from_vec(vec![1, NUM_LANDMARKS * 3], vec![0.0; NUM_LANDMARKS * 3]),
        ])
    }

    #[test]
    fn extracts_outputs() {
        let result = extract(&outputs(0.9, 0.8)).unwrap();
        assert_eq!(result.presence(), 0.9);
        assert_eq!(result.position(LandmarkIdx::Wrist), [0.0, 1.0, 2.0]);
        assert_eq!(result.position(LandmarkIdx::PinkyTip), [60.0, 61.0, 62.0]);
    }

    #[test]
    fn handedness_of_mirrored_input() {
        // A high score is a right hand in camera view, i.e. the user's left hand once mirrored.
        let result = extract(&outputs(0.9, 0.8)).unwrap();
        assert_eq!(result.handedness(), Handedness::Left);

        let result = extract(&outputs(0.9, 0.2)).unwrap();
        assert_eq!(result.handedness(), Handedness::Right);

        let result = extract(&outputs(0.9, 0.5)).unwrap();
        assert_eq!(result.handedness(), Handedness::Right);
    }

    #[test]
    fn rejects_truncated_outputs() {
        let outputs = Outputs::from_tensors(vec![Tensor::from_vec(vec![1, 3], vec![0.0; 3])]);
        assert!(extract(&outputs).is_err());
    }

    #[test]
    fn rotation() {
        let mut result = extract(&outputs(1.0, 1.0)).unwrap();
        result.positions[LandmarkIdx::Wrist as usize] = [10.0, 20.0, 0.0];
        result.positions[LandmarkIdx::MiddleFingerMcp as usize] = [10.0, 0.0, 0.0];
        assert_relative_eq!(result.rotation_radians(), 0.0);

        // Fingers pointing to the right.
        result.positions[LandmarkIdx::MiddleFingerMcp as usize] = [30.0, 20.0, 0.0];
        assert_relative_eq!(result.rotation_radians(), FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn normalizes_by_frame_size() {
        let result = extract(&outputs(1.0, 1.0)).unwrap();
        let lms = result.normalized(100, 50);
        assert_eq!(lms[0], Landmark::new(0.0, 0.02, 0.02));
    }
}
