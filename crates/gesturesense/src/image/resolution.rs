//! Frame, screen and network input sizes.

use std::{fmt, str::FromStr};

use anyhow::Context;

/// A `width x height` size in pixels.
///
/// Both the `Debug` and `Display` output look like `1280x720`, which is also the syntax accepted
/// by [`str::parse`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    pub const RES_1080P: Self = Self::new(1920, 1080);
    pub const RES_720P: Self = Self::new(1280, 720);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `None` for empty resolutions.
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::new(self.width, self.height)
    }

    /// Returns whether `self` is at least as wide and as high as `other`.
    pub fn covers(&self, other: Resolution) -> bool {
        self.width >= other.width && self.height >= other.height
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Resolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .with_context(|| format!("resolution '{s}' is not of the form WIDTHxHEIGHT"))?;
        let parse = |part: &str, what: &str| {
            part.trim()
                .parse::<u32>()
                .with_context(|| format!("invalid {what} in resolution '{s}'"))
        };
        let res = Self::new(parse(w, "width")?, parse(h, "height")?);
        if res.aspect_ratio().is_none() {
            anyhow::bail!("resolution '{s}' must not be empty");
        }
        Ok(res)
    }
}

/// Width divided by height of a nonempty resolution.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct AspectRatio(f32);

impl AspectRatio {
    /// The input shape of both hand networks.
    pub const SQUARE: Self = Self(1.0);

    /// Returns `None` if `width` or `height` is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width != 0 && height != 0).then(|| Self(width as f32 / height as f32))
    }

    #[inline]
    pub fn as_f32(&self) -> f32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio() {
        assert_eq!(AspectRatio::new(192, 192), Some(AspectRatio::SQUARE));
        assert_eq!(Resolution::new(320, 240).aspect_ratio().unwrap().as_f32(), 4.0 / 3.0);
        assert_eq!(AspectRatio::new(0, 720), None);
        assert_eq!(Resolution::new(1280, 0).aspect_ratio(), None);
    }

    #[test]
    fn covers() {
        assert!(Resolution::RES_1080P.covers(Resolution::RES_720P));
        assert!(Resolution::RES_720P.covers(Resolution::RES_720P));
        assert!(!Resolution::new(1280, 600).covers(Resolution::RES_720P));
        assert!(!Resolution::RES_720P.covers(Resolution::RES_1080P));
    }

    #[test]
    fn parse_resolution() {
        assert_eq!("1280x720".parse::<Resolution>().unwrap(), Resolution::RES_720P);
        assert_eq!(
            "640 x 480".parse::<Resolution>().unwrap(),
            Resolution::new(640, 480)
        );
        assert_eq!(Resolution::new(640, 480).to_string(), "640x480");
        assert!("1280".parse::<Resolution>().is_err());
        assert!("0x720".parse::<Resolution>().is_err());
        assert!("widexhigh".parse::<Resolution>().is_err());
    }
}
