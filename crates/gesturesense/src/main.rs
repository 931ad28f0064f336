use std::time::Instant;

use gesturesense::{
    app::ControlLoop,
    config::Config,
    executor::{ActionExecutor, DryRunExecutor, EnigoExecutor},
    gui::{self, GuiOptions},
    timer::FpsCounter,
    tracking::HandTracker,
    video::webcam::{Webcam, WebcamOptions},
};

const WINDOW_TITLE: &str = "GestureSense";

fn main() -> anyhow::Result<()> {
    gesturesense::init_logger!();

    let config = Config::from_env()?;
    log::debug!("{config:?}");

    let options = GuiOptions {
        fullscreen: config.fullscreen,
    };
    gui::run(options, move || run(config));
}

fn run(config: Config) -> anyhow::Result<()> {
    let scroll_step = config.thresholds.scroll_step;
    if config.dry_run {
        log::info!("dry run: actions are logged, not performed");
        let executor = DryRunExecutor::new(config.resolution, scroll_step);
        run_with(config, executor)
    } else {
        let executor = EnigoExecutor::new(scroll_step)?;
        run_with(config, executor)
    }
}

fn run_with<E: ActionExecutor>(config: Config, executor: E) -> anyhow::Result<()> {
    let tracker = HandTracker::load(
        &config.palm_model,
        &config.landmark_model,
        config.tracker.clone(),
    )?;
    let mut control = ControlLoop::new(tracker, executor, config.thresholds.clone())?;

    let mut webcam = Webcam::open(WebcamOptions::default().resolution(config.resolution))?;

    let mut fps = FpsCounter::new("control loop");
    loop {
        match webcam.read() {
            Ok(mut frame) => {
                control.process_frame(&mut frame, Instant::now())?;
                gui::show_image(WINDOW_TITLE, &frame);
            }
            Err(e) => log::debug!("skipping frame: {e:#}"),
        }

        fps.tick_with(webcam.timers().chain(control.detector().timers()));

        if gui::exit_requested() {
            log::info!("exit requested");
            return Ok(());
        }
    }
}
