//! Hand landmarks as reported by a [`HandDetector`][crate::detector::HandDetector].

use std::fmt;

use crate::{
    geometry::{Dimensions, ScreenPoint},
    image::{draw, Color, Image},
};

/// Number of landmarks estimated for every hand.
pub const NUM_LANDMARKS: usize = 21;

/// Names for the hand pose landmarks, in the order the landmark network outputs them.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the knuckles near the palm of the hand.
/// - **IP**/**PIP**: (Proximal) interphalangeal joint, the joint above the MCP.
/// - **DIP**: Distal interphalangeal joint, the highest joint of a finger.
/// - **Tip**: placed on the tip of the finger.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Pairs of landmarks that are connected by bones, used for drawing the hand skeleton.
pub const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Palm:
        (Wrist, ThumbCmc),
        (Wrist, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

/// Which hand a detection belongs to, as seen in the (mirrored) camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single hand landmark.
///
/// `x` and `y` are normalized to `[0, 1]` by the frame width and height. `z` is the depth
/// relative to the wrist, on roughly the same scale as `x`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Converts the normalized position to pixel coordinates on a surface of size `dims`.
    pub fn to_pixels(&self, dims: Dimensions) -> ScreenPoint {
        ScreenPoint::from_normalized(self.x, self.y, dims)
    }
}

/// One detected hand: all 21 landmarks and the handedness label.
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    landmarks: [Landmark; NUM_LANDMARKS],
    handedness: Handedness,
}

impl Hand {
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS], handedness: Handedness) -> Self {
        Self {
            landmarks,
            handedness,
        }
    }

    #[inline]
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    #[inline]
    pub fn landmark(&self, idx: LandmarkIdx) -> Landmark {
        self.landmarks[idx as usize]
    }

    /// Draws the hand skeleton and a handedness label onto `image`.
    ///
    /// The landmarks are scaled by the size of `image`, which should be the frame they were
    /// detected in.
    pub fn draw(&self, image: &mut Image) {
        let dims = image.resolution();

        for (a, b) in CONNECTIVITY {
            let a = self.landmark(*a).to_pixels(dims);
            let b = self.landmark(*b).to_pixels(dims);
            draw::line(image, a.x, a.y, b.x, b.y)
                .color(Color::WHITE)
                .stroke_width(2);
        }
        for lm in &self.landmarks {
            let p = lm.to_pixels(dims);
            draw::marker(image, p.x, p.y).color(Color::RED);
        }

        let wrist = self.landmark(LandmarkIdx::Wrist).to_pixels(dims);
        draw::text(image, wrist.x, wrist.y + 10, self.handedness.as_str())
            .align_top()
            .color(Color::YELLOW);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handedness_labels() {
        assert_eq!(Handedness::Left.to_string(), "Left");
        assert_eq!(Handedness::Right.to_string(), "Right");
    }

    #[test]
    fn landmark_order() {
        assert_eq!(LandmarkIdx::ThumbTip as usize, 4);
        assert_eq!(LandmarkIdx::IndexFingerPip as usize, 6);
        assert_eq!(LandmarkIdx::IndexFingerTip as usize, 8);
        assert_eq!(LandmarkIdx::RingFingerMcp as usize, 13);
        assert_eq!(LandmarkIdx::PinkyTip as usize, NUM_LANDMARKS - 1);
    }

    #[test]
    fn draw_stays_in_bounds() {
        let mut landmarks = [Landmark::new(0.5, 0.5, 0.0); NUM_LANDMARKS];
        landmarks[LandmarkIdx::ThumbTip as usize] = Landmark::new(1.2, -0.3, 0.0);
        let hand = Hand::new(landmarks, Handedness::Left);

        let mut image = Image::new(32, 32);
        hand.draw(&mut image);
        assert_eq!(image.get(16, 16), Color::RED);
    }
}
