//! The camera that watches the user's hands.
//!
//! Any V4L2 capture device offering MJPG or JPEG frames at discrete sizes and frame rates works.

use std::{cmp::Reverse, env};

use anyhow::{bail, Context};
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, Pixelformat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::{
    image::{Image, Resolution},
    num::TotalF32,
    timer::Timer,
};

const ENV_VAR_WEBCAM_NAME: &str = "GESTURESENSE_WEBCAM_NAME";

/// Which camera to open and at what size.
#[derive(Debug, Default, Clone)]
pub struct WebcamOptions {
    name: Option<String>,
    resolution: Option<Resolution>,
}

impl WebcamOptions {
    /// Only opens the device whose V4L2 card name is `name`.
    #[inline]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Asks for frames of at least `resolution`.
    ///
    /// Cameras that cannot deliver that much are opened at their largest size instead.
    #[inline]
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }
}

/// A frame size together with one of the frame intervals offered for it.
#[derive(Debug, Clone, Copy)]
struct CaptureMode {
    resolution: Resolution,
    interval: Fract,
}

impl CaptureMode {
    fn area(&self) -> u64 {
        u64::from(self.resolution.width()) * u64::from(self.resolution.height())
    }

    fn fps(&self) -> TotalF32 {
        TotalF32(1.0 / self.interval.as_f32())
    }
}

/// Picks the smallest mode covering `wanted`, at its highest frame rate.
///
/// Without `wanted`, or when no mode covers it, the largest mode is picked.
fn pick_mode(modes: &[CaptureMode], wanted: Option<Resolution>) -> Option<CaptureMode> {
    let covering = wanted.and_then(|wanted| {
        modes
            .iter()
            .filter(|mode| mode.resolution.covers(wanted))
            .min_by_key(|mode| (mode.area(), Reverse(mode.fps())))
    });
    covering
        .or_else(|| modes.iter().max_by_key(|mode| (mode.area(), mode.fps())))
        .copied()
}

/// Lists the discrete MJPG/JPEG capture modes of `device`.
fn capture_modes(device: &Device) -> anyhow::Result<(Pixelformat, Vec<CaptureMode>)> {
    let mut pixelformat = None;
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let format = format?.pixelformat();
        if format == Pixelformat::MJPG || format == Pixelformat::JPEG {
            pixelformat = Some(format);
            break;
        }
    }
    let Some(pixelformat) = pixelformat else {
        bail!("device does not offer MJPG or JPEG frames");
    };

    let FrameSizes::Discrete(sizes) = device.frame_sizes(pixelformat)? else {
        bail!("only discrete frame sizes are supported");
    };
    let mut modes = Vec::new();
    for size in sizes {
        let resolution = Resolution::new(size.width(), size.height());
        let intervals = match device.frame_intervals(pixelformat, size.width(), size.height())? {
            FrameIntervals::Discrete(intervals) => intervals,
            _ => bail!("only discrete frame rates are supported ({resolution})"),
        };
        modes.extend(intervals.into_iter().map(|interval| CaptureMode {
            resolution,
            interval: *interval.fract(),
        }));
    }
    Ok((pixelformat, modes))
}

/// An open webcam streaming decoded frames.
///
/// Dropping it releases the device.
pub struct Webcam {
    stream: ReadStream,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the first capture device that can stream MJPG frames.
    ///
    /// `GESTURESENSE_WEBCAM_NAME` restricts the search to one device unless `options` already
    /// names one. Camera start-up can take a few hundred milliseconds.
    pub fn open(options: WebcamOptions) -> anyhow::Result<Self> {
        let env_name = env::var(ENV_VAR_WEBCAM_NAME).ok();
        let name = options.name.as_deref().or(env_name.as_deref());
        if let Some(name) = name {
            log::debug!("looking for webcam '{name}'");
        }

        let devices = linuxvideo::list().context("failed to enumerate video devices")?;
        for device in devices {
            let device = match device {
                Ok(device) => device,
                Err(e) => {
                    log::warn!("skipping video device: {e}");
                    continue;
                }
            };
            match Self::try_open(device, name, options.resolution) {
                Ok(Some(webcam)) => return Ok(webcam),
                Ok(None) => {}
                Err(e) => log::debug!("{e:#}"),
            }
        }

        match name {
            Some(name) => bail!("no usable webcam named '{name}' found"),
            None => bail!("no usable webcam found"),
        }
    }

    /// Returns `Ok(None)` for devices that are not capture devices or do not match `name`.
    fn try_open(
        device: Device,
        name: Option<&str>,
        wanted: Option<Resolution>,
    ) -> anyhow::Result<Option<Self>> {
        let caps = device.capabilities()?;
        let card = caps.card();
        if name.map_or(false, |name| name != card) {
            return Ok(None);
        }
        if !caps
            .device_capabilities()
            .contains(CapabilityFlags::VIDEO_CAPTURE)
        {
            log::debug!("'{card}' is not a capture device");
            return Ok(None);
        }

        let (pixelformat, modes) =
            capture_modes(&device).with_context(|| format!("cannot stream from '{card}'"))?;
        let Some(mode) = pick_mode(&modes, wanted) else {
            bail!("'{card}' reports no capture modes");
        };

        let res = mode.resolution;
        let capture =
            device.video_capture(PixFormat::new(res.width(), res.height(), pixelformat))?;
        let actual = capture.set_frame_interval(mode.interval)?;
        let format = capture.format();
        log::info!(
            "opened webcam '{card}' at {}x{}, {:.1} fps",
            format.width(),
            format.height(),
            1.0 / actual.as_f32(),
        );

        Ok(Some(Self {
            stream: capture.into_stream(2)?,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        }))
    }

    /// Waits for the next frame and decodes it.
    ///
    /// Corrupted frames are reported as errors; the stream stays usable.
    pub fn read(&mut self) -> anyhow::Result<Image> {
        let t_decode = &self.t_decode;
        let waiting = self.t_dequeue.start();
        let frame = self.stream.dequeue(|jpeg| {
            drop(waiting);
            Ok(t_decode.time(|| Image::decode_jpeg(&jpeg)))
        })?;
        frame.context("webcam delivered a corrupted frame")
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_dequeue, &self.t_decode].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(w: u32, h: u32, fps: u32) -> CaptureMode {
        CaptureMode {
            resolution: Resolution::new(w, h),
            interval: Fract::new(1, fps),
        }
    }

    fn picked(modes: &[CaptureMode], wanted: Option<Resolution>) -> (Resolution, u32) {
        let mode = pick_mode(modes, wanted).unwrap();
        (mode.resolution, mode.fps().0.round() as u32)
    }

    #[test]
    fn smallest_covering_mode() {
        let modes = [
            mode(1920, 1080, 15),
            mode(640, 480, 30),
            mode(1280, 720, 10),
            mode(1280, 720, 30),
        ];
        assert_eq!(
            picked(&modes, Some(Resolution::RES_720P)),
            (Resolution::RES_720P, 30)
        );
        assert_eq!(
            picked(&modes, Some(Resolution::new(320, 240))),
            (Resolution::new(640, 480), 30)
        );
    }

    #[test]
    fn falls_back_to_largest_mode() {
        let modes = [mode(640, 480, 30), mode(800, 600, 5), mode(800, 600, 20)];
        assert_eq!(
            picked(&modes, Some(Resolution::RES_720P)),
            (Resolution::new(800, 600), 20)
        );
        assert_eq!(picked(&modes, None), (Resolution::new(800, 600), 20));
    }

    #[test]
    fn no_modes() {
        assert!(pick_mode(&[], Some(Resolution::RES_720P)).is_none());
        assert!(pick_mode(&[], None).is_none());
    }
}
