use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrientationError {
    #[error("unhandled interface orientation: {0}")]
    Unhandled(String),
    #[error("exif orientation out of range: {0} (expected 1..=8)")]
    ExifOutOfRange(u32),
}

/// Orientation of the user interface at the moment a frame was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterfaceOrientation {
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeRight,
    LandscapeLeft,
}

impl InterfaceOrientation {
    /// Decode the platform's integer code (0 unknown, 1 portrait, 2 upside down,
    /// 3 landscape right, 4 landscape left).
    pub fn from_raw(raw: i64) -> Result<Self, OrientationError> {
        match raw {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Portrait),
            2 => Ok(Self::PortraitUpsideDown),
            3 => Ok(Self::LandscapeRight),
            4 => Ok(Self::LandscapeLeft),
            other => Err(OrientationError::Unhandled(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Portrait => "portrait",
            Self::PortraitUpsideDown => "portrait-upside-down",
            Self::LandscapeRight => "landscape-right",
            Self::LandscapeLeft => "landscape-left",
        }
    }
}

impl fmt::Display for InterfaceOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceOrientation {
    type Err = OrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "unknown" => Ok(Self::Unknown),
            "portrait" => Ok(Self::Portrait),
            "portrait-upside-down" | "upside-down" => Ok(Self::PortraitUpsideDown),
            "landscape-right" => Ok(Self::LandscapeRight),
            "landscape-left" => Ok(Self::LandscapeLeft),
            _ => Err(OrientationError::Unhandled(s.to_string())),
        }
    }
}

/// The eight EXIF orientation tags, in tag order (raw values 1..=8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExifOrientation {
    TopLeft = 1,
    TopRight,
    BottomRight,
    BottomLeft,
    LeftTop,
    RightTop,
    RightBottom,
    LeftBottom,
}

impl ExifOrientation {
    pub const ALL: [ExifOrientation; 8] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomRight,
        Self::BottomLeft,
        Self::LeftTop,
        Self::RightTop,
        Self::RightBottom,
        Self::LeftBottom,
    ];

    pub fn from_raw(raw: u32) -> Result<Self, OrientationError> {
        match raw {
            1..=8 => Ok(Self::ALL[(raw - 1) as usize]),
            other => Err(OrientationError::ExifOutOfRange(other)),
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }

    /// True when the tag needs a mirror flip on top of its rotation.
    pub fn is_reflect(self) -> bool {
        match self {
            Self::TopLeft | Self::BottomRight | Self::RightTop | Self::LeftBottom => false,
            Self::TopRight | Self::BottomLeft | Self::LeftTop | Self::RightBottom => true,
        }
    }

    /// Left/right family: the stored rows run along the display's vertical axis,
    /// so capture width lands on display height.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::LeftTop | Self::RightTop | Self::RightBottom | Self::LeftBottom
        )
    }
}

impl fmt::Display for ExifOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
            Self::LeftTop => "left-top",
            Self::RightTop => "right-top",
            Self::RightBottom => "right-bottom",
            Self::LeftBottom => "left-bottom",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAxes {
    /// Portrait: capture width/height are swapped against the display.
    Swap,
    /// Landscape: capture and display axes line up.
    Keep,
}

/// Map the interface orientation to the tag the detector expects for the raw
/// pixel buffer. Must be evaluated per frame; rotation races frame delivery.
pub fn resolve(interface: InterfaceOrientation) -> ExifOrientation {
    match interface {
        InterfaceOrientation::Portrait => ExifOrientation::RightTop,
        // down
        InterfaceOrientation::LandscapeRight => ExifOrientation::BottomRight,
        InterfaceOrientation::PortraitUpsideDown => ExifOrientation::LeftBottom,
        // up
        InterfaceOrientation::LandscapeLeft => ExifOrientation::TopLeft,
        InterfaceOrientation::Unknown => ExifOrientation::TopLeft,
    }
}

pub fn scale_axes(interface: InterfaceOrientation) -> ScaleAxes {
    match interface {
        InterfaceOrientation::Portrait | InterfaceOrientation::PortraitUpsideDown => ScaleAxes::Swap,
        InterfaceOrientation::LandscapeLeft
        | InterfaceOrientation::LandscapeRight
        | InterfaceOrientation::Unknown => ScaleAxes::Keep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_table() {
        assert_eq!(resolve(InterfaceOrientation::Portrait), ExifOrientation::RightTop);
        assert_eq!(resolve(InterfaceOrientation::LandscapeRight), ExifOrientation::BottomRight);
        assert_eq!(resolve(InterfaceOrientation::PortraitUpsideDown), ExifOrientation::LeftBottom);
        assert_eq!(resolve(InterfaceOrientation::LandscapeLeft), ExifOrientation::TopLeft);
        assert_eq!(resolve(InterfaceOrientation::Unknown), ExifOrientation::TopLeft);
    }

    #[test]
    fn landscape_left_is_top_left_without_reflection() {
        let tag = resolve(InterfaceOrientation::LandscapeLeft);
        assert_eq!(tag, ExifOrientation::TopLeft);
        assert!(!tag.is_reflect());
    }

    #[test]
    fn reflections() {
        let reflecting: Vec<_> = ExifOrientation::ALL.iter().copied().filter(|o| o.is_reflect()).collect();
        assert_eq!(
            reflecting,
            vec![
                ExifOrientation::TopRight,
                ExifOrientation::BottomLeft,
                ExifOrientation::LeftTop,
                ExifOrientation::RightBottom,
            ]
        );
    }

    #[test]
    fn resolved_tags_never_reflect() {
        for io in [
            InterfaceOrientation::Unknown,
            InterfaceOrientation::Portrait,
            InterfaceOrientation::PortraitUpsideDown,
            InterfaceOrientation::LandscapeLeft,
            InterfaceOrientation::LandscapeRight,
        ] {
            let tag = resolve(io);
            assert!(!tag.is_reflect(), "{io} -> {tag}");
            assert_eq!(tag.swaps_axes(), scale_axes(io) == ScaleAxes::Swap, "{io}");
        }
    }

    #[test]
    fn exif_raw_values() {
        assert_eq!(ExifOrientation::TopLeft.raw(), 1);
        assert_eq!(ExifOrientation::RightTop.raw(), 6);
        assert_eq!(ExifOrientation::LeftBottom.raw(), 8);
        for o in ExifOrientation::ALL {
            assert_eq!(ExifOrientation::from_raw(o.raw()).unwrap(), o);
        }
        assert_eq!(ExifOrientation::from_raw(0), Err(OrientationError::ExifOutOfRange(0)));
        assert_eq!(ExifOrientation::from_raw(9), Err(OrientationError::ExifOutOfRange(9)));
    }

    #[test]
    fn unknown_codes_fail_loudly() {
        assert!(matches!(InterfaceOrientation::from_raw(5), Err(OrientationError::Unhandled(_))));
        assert!(matches!(InterfaceOrientation::from_raw(-1), Err(OrientationError::Unhandled(_))));
        assert!("face-up".parse::<InterfaceOrientation>().is_err());
        assert_eq!(InterfaceOrientation::from_raw(4).unwrap(), InterfaceOrientation::LandscapeLeft);
        assert_eq!(
            "landscape_right".parse::<InterfaceOrientation>().unwrap(),
            InterfaceOrientation::LandscapeRight
        );
    }
}
