// ── Display settings ──
//
// How the embedded report should render. The token service binds these into
// the issued configuration, so any change means a new configuration.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Theme {
    #[default]
    Light,
    Dark,
    HighContrast,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    pub theme: Theme,
    pub filter_pane_enabled: bool,
    pub navigation_enabled: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            filter_pane_enabled: true,
            navigation_enabled: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("DARK".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!("high-contrast".parse::<Theme>().unwrap(), Theme::HighContrast);
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: DisplaySettings = serde_json::from_str(r#"{"theme":"dark"}"#).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert!(settings.filter_pane_enabled);
        assert!(settings.navigation_enabled);
    }
}
