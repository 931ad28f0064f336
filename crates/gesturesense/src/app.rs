//! The per-frame control loop, independent of the camera and the preview window.

use std::time::Instant;

use crate::{
    detector::HandDetector,
    executor::ActionExecutor,
    geometry::Dimensions,
    gesture::{Action, GestureClassifier, GestureThresholds},
    image::Image,
};

/// Turns camera frames into desktop input.
///
/// Every frame is mirrored, searched for hands, and each hand is classified. The resulting actions
/// are executed in order, and the frame is annotated for display.
pub struct ControlLoop<D, E> {
    detector: D,
    executor: E,
    classifier: GestureClassifier,
    screen: Dimensions,
}

impl<D: HandDetector, E: ActionExecutor> ControlLoop<D, E> {
    /// Creates a control loop.
    ///
    /// The screen size is queried from `executor` once, here.
    pub fn new(detector: D, executor: E, thresholds: GestureThresholds) -> anyhow::Result<Self> {
        let screen = executor.screen_size()?;
        log::info!("pointer moves on a {screen} screen");
        Ok(Self {
            detector,
            executor,
            classifier: GestureClassifier::new(thresholds),
            screen,
        })
    }

    #[inline]
    pub fn screen(&self) -> Dimensions {
        self.screen
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Processes one camera frame taken at `now`.
    ///
    /// `frame` is mirrored in place and the detected hands are drawn onto it. Returns the actions
    /// that were executed. Executor errors abort the frame and are returned.
    pub fn process_frame(&mut self, frame: &mut Image, now: Instant) -> anyhow::Result<Vec<Action>> {
        frame.flip_horizontal_in_place();
        let dims = frame.resolution();

        let hands = self.detector.detect(frame)?;
        let mut executed = Vec::new();
        for hand in &hands {
            for action in self.classifier.classify(hand, dims, self.screen, now) {
                self.executor.execute(action)?;
                executed.push(action);
            }
        }

        for hand in &hands {
            hand.draw(frame);
        }

        Ok(executed)
    }
}
