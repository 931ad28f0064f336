use std::time::{Duration, Instant};

use approx::assert_relative_eq;

use gesturesense::{
    geometry::{distance, Dimensions, ScreenPoint},
    gesture::{Action, GestureClassifier},
    hand::{Hand, Handedness, Landmark, LandmarkIdx, NUM_LANDMARKS},
};

const FRAME: Dimensions = Dimensions::new(320, 240);
const SCREEN: Dimensions = Dimensions::RES_1080P;

/// A hand whose thumb tip is at `thumb` and every other landmark is in the top left corner.
fn hand(handedness: Handedness, thumb: (f32, f32), others: &[(LandmarkIdx, f32, f32)]) -> Hand {
    let mut lms = [Landmark::new(0.0, 0.0, 0.0); NUM_LANDMARKS];
    lms[LandmarkIdx::ThumbTip as usize] = Landmark::new(thumb.0, thumb.1, 0.0);
    for &(idx, x, y) in others {
        lms[idx as usize] = Landmark::new(x, y, 0.0);
    }
    Hand::new(lms, handedness)
}

fn classify_once(hand: &Hand) -> Vec<Action> {
    GestureClassifier::default().classify(hand, FRAME, SCREEN, Instant::now())
}

#[test]
fn left_index_tip_moves_pointer() {
    let hand = hand(
        Handedness::Left,
        (0.1, 0.1),
        &[(LandmarkIdx::IndexFingerTip, 0.5, 0.5)],
    );
    assert_eq!(
        classify_once(&hand),
        [Action::MovePointer(ScreenPoint::new(960, 540))]
    );
}

#[test]
fn left_hand_never_issues_commands() {
    // Every right hand gesture geometry at once.
    let hand = hand(
        Handedness::Left,
        (0.5, 0.5),
        &[
            (LandmarkIdx::IndexFingerTip, 0.5, 0.5),
            (LandmarkIdx::IndexFingerPip, 0.5, 0.5),
            (LandmarkIdx::RingFingerMcp, 0.5, 0.5),
            (LandmarkIdx::PinkyTip, 0.5, 0.5),
        ],
    );
    let actions = classify_once(&hand);
    assert_eq!(actions.len(), 1);
    assert!(matches!(actions[0], Action::MovePointer(_)));
}

#[test]
fn right_hand_never_moves_pointer() {
    let hand = hand(
        Handedness::Right,
        (0.5, 0.5),
        &[
            (LandmarkIdx::IndexFingerTip, 0.5, 0.5),
            (LandmarkIdx::RingFingerMcp, 0.5, 0.5),
            (LandmarkIdx::PinkyTip, 0.5, 0.5),
        ],
    );
    let actions = classify_once(&hand);
    assert!(!actions.is_empty());
    assert!(actions.iter().all(|a| !matches!(a, Action::MovePointer(_))));
}

#[test]
fn coinciding_thumb_and_index_tip_scrolls_up_only() {
    let hand = hand(
        Handedness::Right,
        (0.5, 0.5),
        &[
            (LandmarkIdx::IndexFingerTip, 0.5, 0.5),
            (LandmarkIdx::IndexFingerPip, 0.5, 0.5),
        ],
    );
    assert_eq!(classify_once(&hand), [Action::ScrollUp]);
}

#[test]
fn open_hand_does_nothing() {
    let hand = hand(
        Handedness::Right,
        (0.5, 0.5),
        &[
            (LandmarkIdx::IndexFingerTip, 0.5, 0.0),
            (LandmarkIdx::IndexFingerPip, 0.5, 0.2),
            (LandmarkIdx::RingFingerMcp, 0.9, 0.5),
            (LandmarkIdx::PinkyTip, 0.1, 0.9),
        ],
    );
    assert!(classify_once(&hand).is_empty());
}

#[test]
fn touch_boundary() {
    // Thumb at (80, 120), index tip exactly 30 px to the right.
    let hand_at = |x: f32| {
        hand(
            Handedness::Right,
            (0.25, 0.5),
            &[(LandmarkIdx::IndexFingerTip, x, 0.5)],
        )
    };
    assert!(classify_once(&hand_at(0.34375)).is_empty());

    // One pixel closer.
    assert_eq!(classify_once(&hand_at(0.340625)), [Action::ScrollUp]);

    // 25 px right and 15 px down, about 29.15 px away.
    let diagonal = hand(
        Handedness::Right,
        (0.25, 0.5),
        &[(LandmarkIdx::IndexFingerTip, 0.328125, 0.5625)],
    );
    let thumb = diagonal.landmark(LandmarkIdx::ThumbTip).to_pixels(FRAME);
    let index = diagonal.landmark(LandmarkIdx::IndexFingerTip).to_pixels(FRAME);
    assert_eq!(thumb, ScreenPoint::new(80, 120));
    assert_eq!(index, ScreenPoint::new(105, 135));
    assert_relative_eq!(distance(thumb, index), 850.0f32.sqrt());
    assert_eq!(classify_once(&diagonal), [Action::ScrollUp]);
}

#[test]
fn scroll_and_click_in_same_frame() {
    let hand = hand(
        Handedness::Right,
        (0.5, 0.5),
        &[
            (LandmarkIdx::IndexFingerPip, 0.5, 0.5),
            (LandmarkIdx::RingFingerMcp, 0.5, 0.5),
        ],
    );
    assert_eq!(classify_once(&hand), [Action::ScrollDown, Action::Click]);
}

#[test]
fn all_commands_in_order() {
    let hand = hand(
        Handedness::Right,
        (0.5, 0.5),
        &[
            (LandmarkIdx::IndexFingerTip, 0.5, 0.5),
            (LandmarkIdx::RingFingerMcp, 0.5, 0.5),
            (LandmarkIdx::PinkyTip, 0.5, 0.5),
        ],
    );
    assert_eq!(
        classify_once(&hand),
        [Action::ScrollUp, Action::Click, Action::MinimizeWindow]
    );
}

#[test]
fn sustained_touch_is_debounced() {
    let mut classifier = GestureClassifier::default();
    let hand = hand(
        Handedness::Right,
        (0.5, 0.5),
        &[(LandmarkIdx::PinkyTip, 0.5, 0.5)],
    );

    let t0 = Instant::now();
    let fired = (0..30)
        .map(|frame| t0 + Duration::from_millis(frame * 33))
        .filter(|&now| !classifier.classify(&hand, FRAME, SCREEN, now).is_empty())
        .count();
    // ~1 s of frames, 500 ms cooldown: t = 0, 528 ms.
    assert_eq!(fired, 2);
}

#[test]
fn distance_is_symmetric() {
    let a = ScreenPoint::new(3, -7);
    let b = ScreenPoint::new(-12, 40);
    assert_eq!(distance(a, b), distance(b, a));
    assert_eq!(distance(a, a), 0.0);
}
