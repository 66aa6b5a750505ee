use std::fmt;
use std::str::FromStr;

/// Capture quality preset.
///
/// `High` keeps the device's native resolution; the others request a fixed
/// size from the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapturePreset {
    #[default]
    High,
    Medium,
    Low,
}

impl CapturePreset {
    pub const ALL: &[CapturePreset] = &[
        CapturePreset::High,
        CapturePreset::Medium,
        CapturePreset::Low,
    ];

    /// Requested `(width, height)`, or `None` for the device default.
    pub fn video_size(self) -> Option<(u32, u32)> {
        match self {
            CapturePreset::High => None,
            CapturePreset::Medium => Some((640, 480)),
            CapturePreset::Low => Some((352, 288)),
        }
    }
}

impl fmt::Display for CapturePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturePreset::High => write!(f, "high"),
            CapturePreset::Medium => write!(f, "medium"),
            CapturePreset::Low => write!(f, "low"),
        }
    }
}

impl FromStr for CapturePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(CapturePreset::High),
            "medium" => Ok(CapturePreset::Medium),
            "low" => Ok(CapturePreset::Low),
            other => Err(format!(
                "Preset must be one of: high, medium, low, got '{other}'"
            )),
        }
    }
}

/// Which camera to open and how.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureConfig {
    pub preset: CapturePreset,
    /// Backend-specific device name; `None` selects the system default.
    pub device: Option<String>,
    pub framerate: Option<u32>,
}

impl CaptureConfig {
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_preset(mut self, preset: CapturePreset) -> Self {
        self.preset = preset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_high_preset_default_device() {
        let config = CaptureConfig::default();
        assert_eq!(config.preset, CapturePreset::High);
        assert!(config.device.is_none());
        assert!(config.framerate.is_none());
    }

    #[test]
    fn test_high_preset_keeps_native_size() {
        assert_eq!(CapturePreset::High.video_size(), None);
    }

    #[rstest]
    #[case("high", CapturePreset::High)]
    #[case("Medium", CapturePreset::Medium)]
    #[case("LOW", CapturePreset::Low)]
    fn test_parse_preset(#[case] input: &str, #[case] expected: CapturePreset) {
        assert_eq!(input.parse::<CapturePreset>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_preset_fails() {
        let err = "ultra".parse::<CapturePreset>().unwrap_err();
        assert!(err.contains("ultra"));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for preset in CapturePreset::ALL {
            assert_eq!(preset.to_string().parse::<CapturePreset>().unwrap(), *preset);
        }
    }

    #[test]
    fn test_builders() {
        let config = CaptureConfig::default()
            .with_device("/dev/video2")
            .with_preset(CapturePreset::Low);
        assert_eq!(config.device.as_deref(), Some("/dev/video2"));
        assert_eq!(config.preset, CapturePreset::Low);
    }
}
