//! The preview window.
//!
//! winit requires the event loop to run on the main thread, so [`run`] takes over the main thread
//! and runs the application on a second one. The application sends frames to the window with
//! [`show_image`] and polls [`exit_requested`] to find out when the user wants to quit.

mod renderer;

use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    process,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock, PoisonError,
    },
};

use winit::{
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy},
    window::WindowId,
};

use crate::{
    image::{Image, Resolution},
    termination::Termination,
};

use self::renderer::{Gpu, Renderer};

/// Pressing this key in a preview window requests exit.
const EXIT_KEY: VirtualKeyCode = VirtualKeyCode::X;

/// Options for the windows opened by [`show_image`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GuiOptions {
    /// Open windows as borderless fullscreen windows.
    pub fullscreen: bool,
}

struct Gui {
    gpu: Rc<Gpu>,
    options: GuiOptions,
    windows: HashMap<String, Renderer>,
    win_id_to_key: HashMap<WindowId, String>,
}

impl Gui {
    fn new(gpu: Gpu, options: GuiOptions) -> Self {
        Self {
            gpu: Rc::new(gpu),
            options,
            windows: HashMap::new(),
            win_id_to_key: HashMap::new(),
        }
    }

    fn renderer_mut(&mut self, win: WindowId) -> Option<&mut Renderer> {
        let key = self.win_id_to_key.get(&win)?;
        self.windows.get_mut(key)
    }

    fn run(mut self, event_loop: EventLoop<Msg>) -> ! {
        event_loop.run(move |event, target, flow| {
            *flow = ControlFlow::Wait;
            match event {
                Event::UserEvent(Msg::Image { key, res, data }) => {
                    if !self.windows.contains_key(&key) {
                        log::debug!("creating window for image '{key}' at {res}");

                        let fullscreen = self.options.fullscreen;
                        match Renderer::open(target, self.gpu.clone(), &key, res, fullscreen) {
                            Ok(renderer) => {
                                self.win_id_to_key.insert(renderer.window().id(), key.clone());
                                self.windows.insert(key.clone(), renderer);
                            }
                            Err(e) => {
                                log::error!("failed to open window '{key}': {e:#}");
                                request_exit();
                                return;
                            }
                        }
                    }

                    if let Some(renderer) = self.windows.get_mut(&key) {
                        renderer.update_texture(res, &data);
                        renderer.window().request_redraw();
                    }
                }
                Event::RedrawRequested(window) => {
                    if let Some(renderer) = self.renderer_mut(window) {
                        if let Err(e) = renderer.redraw() {
                            log::error!("failed to redraw window: {e:#}");
                        }
                    }
                }
                Event::WindowEvent { window_id, event } => match event {
                    WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                        if let Some(renderer) = self.renderer_mut(window_id) {
                            renderer.resize();
                        }
                    }
                    WindowEvent::CloseRequested => {
                        log::info!("window closed, exiting");
                        request_exit();
                    }
                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                state: ElementState::Pressed,
                                virtual_keycode: Some(EXIT_KEY),
                                ..
                            },
                        ..
                    } => {
                        log::info!("exit key pressed, exiting");
                        request_exit();
                    }
                    _ => {}
                },
                _ => {}
            }
        });
    }
}

#[derive(Debug)]
enum Msg {
    Image {
        key: String,
        res: Resolution,
        data: Vec<u8>,
    },
}

static PROXY: OnceLock<Mutex<EventLoopProxy<Msg>>> = OnceLock::new();
static EXIT_REQUESTED: AtomicBool = AtomicBool::new(false);

fn send(msg: Msg) {
    let Some(proxy) = PROXY.get() else {
        log::warn!("GUI is not running, dropping frame");
        return;
    };
    // The event loop only closes when the process is about to exit.
    let _ = proxy
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .send_event(msg);
}

fn request_exit() {
    EXIT_REQUESTED.store(true, Ordering::Relaxed);
}

/// Returns whether the user asked to quit, either by pressing `x` in a preview window or by
/// closing it.
pub fn exit_requested() -> bool {
    EXIT_REQUESTED.load(Ordering::Relaxed)
}

/// Runs `cb` on a background thread while the GUI event loop runs on the calling thread.
///
/// The process exits once `cb` returns. Must be called from the main thread.
pub fn run<F, R>(options: GuiOptions, cb: F) -> !
where
    F: FnOnce() -> R + Send + 'static,
    R: Termination + Send,
{
    let event_loop = EventLoopBuilder::with_user_event().build();
    if PROXY.set(Mutex::new(event_loop.create_proxy())).is_err() {
        log::error!("GUI is already running");
        process::exit(1);
    }

    let gpu = match pollster::block_on(Gpu::open()) {
        Ok(gpu) => gpu,
        Err(e) => {
            log::error!("failed to open GPU: {e:#}");
            process::exit(1);
        }
    };

    std::thread::spawn(move || {
        let result = catch_unwind(AssertUnwindSafe(cb));
        match result {
            Ok(r) => {
                if r.is_success() {
                    process::exit(0);
                } else {
                    r.report();
                    process::exit(1);
                }
            }
            Err(_payload) => {
                // The panic hook has already printed the message. Exit with 101 like libstd.
                process::exit(101);
            }
        }
    });

    Gui::new(gpu, options).run(event_loop);
}

/// Displays an image in the window titled `key`, opening it on first use.
pub fn show_image(key: impl Into<String>, image: &Image) {
    // Image data is RGBA8 internally so that no conversion before GPU upload is needed.
    send(Msg::Image {
        key: key.into(),
        res: image.resolution(),
        data: image.data().to_vec(),
    });
}
