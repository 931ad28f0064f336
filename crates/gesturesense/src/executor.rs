//! Injection of desktop input events.

use anyhow::anyhow;
use enigo::{Axis, Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

use crate::{
    geometry::{Dimensions, ScreenPoint},
    gesture::Action,
};

/// Scroll amount used by executors that aren't configured otherwise.
pub const DEFAULT_SCROLL_STEP: i32 = 40;

/// Performs [`Action`]s on the desktop.
pub trait ActionExecutor {
    /// Moves the pointer to absolute screen coordinates.
    fn move_pointer(&mut self, x: i32, y: i32) -> anyhow::Result<()>;

    /// Scrolls vertically. Positive values scroll up.
    fn scroll(&mut self, step: i32) -> anyhow::Result<()>;

    /// Left-clicks at the current pointer position.
    fn click(&mut self) -> anyhow::Result<()>;

    /// Minimizes the focused window via the window menu shortcut (Alt+Space, then N).
    fn minimize_window(&mut self) -> anyhow::Result<()>;

    /// Returns the size of the screen the pointer moves on.
    fn screen_size(&self) -> anyhow::Result<Dimensions>;

    /// The amount passed to [`ActionExecutor::scroll`] for scroll actions.
    fn scroll_step(&self) -> i32 {
        DEFAULT_SCROLL_STEP
    }

    /// Dispatches `action` to exactly one of the other methods.
    fn execute(&mut self, action: Action) -> anyhow::Result<()> {
        match action {
            Action::MovePointer(ScreenPoint { x, y }) => self.move_pointer(x, y),
            Action::ScrollUp => {
                log::info!("scrolling up");
                let step = self.scroll_step();
                self.scroll(step)
            }
            Action::ScrollDown => {
                log::info!("scrolling down");
                let step = self.scroll_step();
                self.scroll(-step)
            }
            Action::Click => {
                log::info!("click");
                self.click()
            }
            Action::MinimizeWindow => {
                log::info!("minimizing window");
                self.minimize_window()
            }
        }
    }
}

/// Injects real input events through [`enigo`].
pub struct EnigoExecutor {
    enigo: Enigo,
    scroll_step: i32,
}

impl EnigoExecutor {
    pub fn new(scroll_step: i32) -> anyhow::Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow!("failed to connect to the input system: {e:?}"))?;
        Ok(Self { enigo, scroll_step })
    }
}

impl ActionExecutor for EnigoExecutor {
    fn move_pointer(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| anyhow!("failed to move pointer to ({x}, {y}): {e:?}"))
    }

    fn scroll(&mut self, step: i32) -> anyhow::Result<()> {
        // enigo scrolls down for positive lengths.
        self.enigo
            .scroll(-step, Axis::Vertical)
            .map_err(|e| anyhow!("failed to scroll by {step}: {e:?}"))
    }

    fn click(&mut self) -> anyhow::Result<()> {
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| anyhow!("failed to click: {e:?}"))
    }

    fn minimize_window(&mut self) -> anyhow::Result<()> {
        let mut keys = || -> enigo::InputResult<()> {
            self.enigo.key(Key::Alt, Direction::Press)?;
            let space = self.enigo.key(Key::Space, Direction::Click);
            self.enigo.key(Key::Alt, Direction::Release)?;
            space?;
            self.enigo.key(Key::Unicode('n'), Direction::Click)
        };
        keys().map_err(|e| anyhow!("failed to send minimize shortcut: {e:?}"))
    }

    fn screen_size(&self) -> anyhow::Result<Dimensions> {
        let (w, h) = self
            .enigo
            .main_display()
            .map_err(|e| anyhow!("failed to query display size: {e:?}"))?;
        let (Ok(w), Ok(h)) = (u32::try_from(w), u32::try_from(h)) else {
            anyhow::bail!("display reported an invalid size of {w}x{h}");
        };
        Ok(Dimensions::new(w, h))
    }

    fn scroll_step(&self) -> i32 {
        self.scroll_step
    }
}

/// Logs every action without touching the desktop.
pub struct DryRunExecutor {
    screen: Dimensions,
    scroll_step: i32,
}

impl DryRunExecutor {
    pub fn new(screen: Dimensions, scroll_step: i32) -> Self {
        Self {
            screen,
            scroll_step,
        }
    }
}

impl ActionExecutor for DryRunExecutor {
    fn move_pointer(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        log::trace!("dry run: move pointer to ({x}, {y})");
        Ok(())
    }

    fn scroll(&mut self, step: i32) -> anyhow::Result<()> {
        log::debug!("dry run: scroll by {step}");
        Ok(())
    }

    fn click(&mut self) -> anyhow::Result<()> {
        log::debug!("dry run: click");
        Ok(())
    }

    fn minimize_window(&mut self) -> anyhow::Result<()> {
        log::debug!("dry run: minimize window");
        Ok(())
    }

    fn screen_size(&self) -> anyhow::Result<Dimensions> {
        Ok(self.screen)
    }

    fn scroll_step(&self) -> i32 {
        self.scroll_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Move(i32, i32),
        Scroll(i32),
        Click,
        Minimize,
    }

    #[derive(Default)]
    struct Recorder(Vec<Call>);

    impl ActionExecutor for Recorder {
        fn move_pointer(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
            self.0.push(Call::Move(x, y));
            Ok(())
        }

        fn scroll(&mut self, step: i32) -> anyhow::Result<()> {
            self.0.push(Call::Scroll(step));
            Ok(())
        }

        fn click(&mut self) -> anyhow::Result<()> {
            self.0.push(Call::Click);
            Ok(())
        }

        fn minimize_window(&mut self) -> anyhow::Result<()> {
            self.0.push(Call::Minimize);
            Ok(())
        }

        fn screen_size(&self) -> anyhow::Result<Dimensions> {
            Ok(Dimensions::RES_1080P)
        }
    }

    #[test]
    fn each_action_is_one_call() {
        let mut rec = Recorder::default();
        for action in [
            Action::MovePointer(ScreenPoint::new(10, 20)),
            Action::ScrollUp,
            Action::ScrollDown,
            Action::Click,
            Action::MinimizeWindow,
        ] {
            rec.execute(action).unwrap();
        }
        assert_eq!(
            rec.0,
            [
                Call::Move(10, 20),
                Call::Scroll(DEFAULT_SCROLL_STEP),
                Call::Scroll(-DEFAULT_SCROLL_STEP),
                Call::Click,
                Call::Minimize,
            ]
        );
    }

    #[test]
    fn dry_run_reports_configured_screen() {
        let mut dry = DryRunExecutor::new(Dimensions::new(800, 600), 7);
        assert_eq!(dry.screen_size().unwrap(), Dimensions::new(800, 600));
        assert_eq!(dry.scroll_step(), 7);
        dry.execute(Action::Click).unwrap();
    }
}
