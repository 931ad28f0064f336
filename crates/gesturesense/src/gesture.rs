//! Gesture classification.
//!
//! A [`Hand`] is classified purely on the geometry of a single frame:
//!
//! - The **left** hand steers the pointer. Its index finger tip is mapped onto the screen and
//!   produces an [`Action::MovePointer`] every frame.
//! - The **right** hand issues commands by touching the thumb tip to another landmark:
//!   - index finger tip: [`Gesture::ScrollUp`]
//!   - index finger PIP (only if the tip isn't touched): [`Gesture::ScrollDown`]
//!   - ring finger MCP: [`Gesture::Click`]
//!   - pinky tip: [`Gesture::Minimize`]
//!
//! The right hand checks are not mutually exclusive, so a single frame can produce several
//! actions. Every command gesture has its own cooldown ([`GestureClassifier`]), so holding a touch
//! repeats the command at a bounded rate.

use std::time::{Duration, Instant};

use crate::{
    geometry::{distance, Dimensions, ScreenPoint},
    hand::{Hand, Handedness, LandmarkIdx},
};

/// A discrete desktop action produced from one hand in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move the pointer to absolute screen coordinates.
    MovePointer(ScreenPoint),
    ScrollUp,
    ScrollDown,
    /// Left click at the current pointer position.
    Click,
    /// Minimize the focused window.
    MinimizeWindow,
}

const NUM_GESTURES: usize = 4;

/// A touch between the right thumb and another landmark, before debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    ScrollUp,
    ScrollDown,
    Click,
    Minimize,
}

impl Gesture {
    pub const ALL: [Gesture; NUM_GESTURES] = [
        Gesture::ScrollUp,
        Gesture::ScrollDown,
        Gesture::Click,
        Gesture::Minimize,
    ];

    /// Returns the [`Action`] this gesture triggers.
    pub fn action(self) -> Action {
        match self {
            Gesture::ScrollUp => Action::ScrollUp,
            Gesture::ScrollDown => Action::ScrollDown,
            Gesture::Click => Action::Click,
            Gesture::Minimize => Action::MinimizeWindow,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Distances and timings that control gesture recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureThresholds {
    /// Two landmarks touch if their distance on the frame is below this many pixels.
    pub touch_distance: f32,
    pub scroll_cooldown: Duration,
    pub click_cooldown: Duration,
    pub minimize_cooldown: Duration,
    /// Scroll amount passed to the executor per scroll action.
    pub scroll_step: i32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            touch_distance: 30.0,
            scroll_cooldown: Duration::from_millis(50),
            click_cooldown: Duration::from_millis(500),
            minimize_cooldown: Duration::from_millis(500),
            scroll_step: 40,
        }
    }
}

impl GestureThresholds {
    /// Returns whether a distance in pixels counts as a touch.
    ///
    /// The comparison is strict: a distance equal to [`touch_distance`] is not a touch.
    ///
    /// [`touch_distance`]: GestureThresholds::touch_distance
    #[inline]
    pub fn is_touching(&self, distance: f32) -> bool {
        distance < self.touch_distance
    }

    /// Returns the minimum time between two firings of `gesture`.
    pub fn cooldown(&self, gesture: Gesture) -> Duration {
        match gesture {
            Gesture::ScrollUp | Gesture::ScrollDown => self.scroll_cooldown,
            Gesture::Click => self.click_cooldown,
            Gesture::Minimize => self.minimize_cooldown,
        }
    }

    /// Recognizes the command gestures of a right hand.
    ///
    /// Landmarks are converted to pixel coordinates on a frame of size `frame` before measuring
    /// distances; the `z` coordinate is ignored. Left hands never produce gestures.
    ///
    /// The result is ordered like [`Gesture::ALL`].
    pub fn recognize(&self, hand: &Hand, frame: Dimensions) -> Vec<Gesture> {
        if hand.handedness() != Handedness::Right {
            return Vec::new();
        }

        let px = |idx| hand.landmark(idx).to_pixels(frame);
        let thumb = px(LandmarkIdx::ThumbTip);
        let touches = |idx| self.is_touching(distance(thumb, px(idx)));

        let mut gestures = Vec::new();
        if touches(LandmarkIdx::IndexFingerTip) {
            gestures.push(Gesture::ScrollUp);
        } else if touches(LandmarkIdx::IndexFingerPip) {
            gestures.push(Gesture::ScrollDown);
        }
        if touches(LandmarkIdx::RingFingerMcp) {
            gestures.push(Gesture::Click);
        }
        if touches(LandmarkIdx::PinkyTip) {
            gestures.push(Gesture::Minimize);
        }
        gestures
    }
}

/// Turns hands into [`Action`]s and debounces repeated gestures.
///
/// The only state kept across frames is the time each gesture last fired.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    thresholds: GestureThresholds,
    last_fired: [Option<Instant>; NUM_GESTURES],
}

impl GestureClassifier {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            thresholds,
            last_fired: [None; NUM_GESTURES],
        }
    }

    #[inline]
    pub fn thresholds(&self) -> &GestureThresholds {
        &self.thresholds
    }

    /// Classifies one hand detected in a frame of size `frame`.
    ///
    /// Pointer positions are scaled to `screen`. `now` is used for debouncing and must not go
    /// backwards between calls.
    pub fn classify(
        &mut self,
        hand: &Hand,
        frame: Dimensions,
        screen: Dimensions,
        now: Instant,
    ) -> Vec<Action> {
        match hand.handedness() {
            Handedness::Left => {
                let tip = hand.landmark(LandmarkIdx::IndexFingerTip);
                vec![Action::MovePointer(tip.to_pixels(screen))]
            }
            Handedness::Right => self
                .thresholds
                .recognize(hand, frame)
                .into_iter()
                .filter(|&gesture| self.fire(gesture, now))
                .map(Gesture::action)
                .collect(),
        }
    }

    /// Records `gesture` as fired at `now`, unless it is still cooling down.
    fn fire(&mut self, gesture: Gesture, now: Instant) -> bool {
        let slot = &mut self.last_fired[gesture.index()];
        let ready = match *slot {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.thresholds.cooldown(gesture),
        };
        if ready {
            *slot = Some(now);
        } else {
            log::trace!("{gesture:?} is cooling down");
        }
        ready
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(GestureThresholds::default())
    }
}
