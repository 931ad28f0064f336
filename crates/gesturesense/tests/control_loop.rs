use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use anyhow::bail;
use gesturesense::{
    app::ControlLoop,
    detector::HandDetector,
    executor::ActionExecutor,
    geometry::{Dimensions, ScreenPoint},
    gesture::{Action, GestureThresholds},
    hand::{Hand, Handedness, Landmark, LandmarkIdx, NUM_LANDMARKS},
    image::{Color, Image},
};

/// Returns a scripted list of hands for each frame and remembers what it was shown.
#[derive(Default)]
struct ScriptedDetector {
    frames: VecDeque<Vec<Hand>>,
    top_right: Vec<Color>,
}

impl HandDetector for ScriptedDetector {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Hand>> {
        self.top_right.push(image.get(image.width() - 1, 0));
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}

#[derive(Debug, PartialEq)]
enum Call {
    Move(i32, i32),
    Scroll(i32),
    Click,
    Minimize,
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
    fail: bool,
}

impl ActionExecutor for Recorder {
    fn move_pointer(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        self.calls.push(Call::Move(x, y));
        Ok(())
    }

    fn scroll(&mut self, step: i32) -> anyhow::Result<()> {
        self.calls.push(Call::Scroll(step));
        Ok(())
    }

    fn click(&mut self) -> anyhow::Result<()> {
        if self.fail {
            bail!("input injection denied");
        }
        self.calls.push(Call::Click);
        Ok(())
    }

    fn minimize_window(&mut self) -> anyhow::Result<()> {
        self.calls.push(Call::Minimize);
        Ok(())
    }

    fn screen_size(&self) -> anyhow::Result<Dimensions> {
        Ok(Dimensions::RES_1080P)
    }
}

fn pointing_left_hand(x: f32, y: f32) -> Hand {
    let mut lms = [Landmark::new(0.0, 0.0, 0.0); NUM_LANDMARKS];
    lms[LandmarkIdx::IndexFingerTip as usize] = Landmark::new(x, y, 0.0);
    Hand::new(lms, Handedness::Left)
}

fn clicking_right_hand() -> Hand {
    let mut lms = [Landmark::new(0.0, 0.0, 0.0); NUM_LANDMARKS];
    lms[LandmarkIdx::ThumbTip as usize] = Landmark::new(0.5, 0.5, 0.0);
    lms[LandmarkIdx::RingFingerMcp as usize] = Landmark::new(0.5, 0.5, 0.0);
    Hand::new(lms, Handedness::Right)
}

fn control_loop(
    frames: Vec<Vec<Hand>>,
    executor: Recorder,
) -> ControlLoop<ScriptedDetector, Recorder> {
    let detector = ScriptedDetector {
        frames: frames.into(),
        ..Default::default()
    };
    ControlLoop::new(detector, executor, GestureThresholds::default()).unwrap()
}

#[test]
fn queries_screen_once() {
    let control = control_loop(Vec::new(), Recorder::default());
    assert_eq!(control.screen(), Dimensions::RES_1080P);
}

#[test]
fn frames_are_mirrored_before_detection() {
    let mut control = control_loop(Vec::new(), Recorder::default());
    let mut frame = Image::new(8, 4);
    frame.set(0, 0, Color::GREEN);

    let actions = control.process_frame(&mut frame, Instant::now()).unwrap();
    assert!(actions.is_empty());
    assert_eq!(control.detector().top_right, [Color::GREEN]);
    assert!(control.executor().calls.is_empty());
}

#[test]
fn both_hands_in_one_frame() {
    let mut control = control_loop(
        vec![vec![pointing_left_hand(0.5, 0.5), clicking_right_hand()]],
        Recorder::default(),
    );
    let mut frame = Image::new(320, 240);

    let actions = control.process_frame(&mut frame, Instant::now()).unwrap();
    assert_eq!(
        actions,
        [Action::MovePointer(ScreenPoint::new(960, 540)), Action::Click]
    );
    assert_eq!(control.executor().calls, [Call::Move(960, 540), Call::Click]);
}

#[test]
fn hands_are_drawn_onto_the_frame() {
    let mut control = control_loop(
        vec![vec![pointing_left_hand(0.5, 0.5)]],
        Recorder::default(),
    );
    let mut frame = Image::new(320, 240);

    control.process_frame(&mut frame, Instant::now()).unwrap();
    assert_eq!(frame.get(160, 120), Color::RED);
}

#[test]
fn click_cooldown_spans_frames() {
    let frames = vec![vec![clicking_right_hand()]; 3];
    let mut control = control_loop(frames, Recorder::default());
    let mut frame = Image::new(320, 240);
    let t0 = Instant::now();

    for ms in [0, 200, 500] {
        control
            .process_frame(&mut frame, t0 + Duration::from_millis(ms))
            .unwrap();
    }
    assert_eq!(control.executor().calls, [Call::Click, Call::Click]);
}

#[test]
fn executor_errors_abort_the_frame() {
    let executor = Recorder {
        fail: true,
        ..Default::default()
    };
    let mut control = control_loop(vec![vec![clicking_right_hand()]], executor);
    let mut frame = Image::new(320, 240);

    let err = control
        .process_frame(&mut frame, Instant::now())
        .unwrap_err();
    assert!(err.to_string().contains("denied"));
}
