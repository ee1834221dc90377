use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

/// [display] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// "dark", "light" or "auto"
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Reading column width cap; content centers inside wider terminals
    #[serde(default = "default_max_width")]
    pub max_width: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub mouse: bool,
    #[serde(default = "default_true")]
    pub watch: bool,
    #[serde(default = "default_true")]
    pub clipboard: bool,
}

fn default_true() -> bool {
    true
}

fn default_theme() -> String {
    "auto".to_string()
}

fn default_max_width() -> u16 {
    88
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            max_width: default_max_width(),
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            mouse: true,
            watch: true,
            clipboard: true,
        }
    }
}

/// Load config by merging global defaults with per-directory overrides.
/// Priority: local `.cv.toml` > global `~/.config/cv/config.toml` > built-in defaults.
/// Merging is deep: individual fields within sections (e.g. `[display]`) override independently.
pub fn load_config(dir: &str) -> CvConfig {
    let local_path = format!("{dir}/.cv.toml");
    let global_path = dirs::config_dir()
        .map(|d| d.join("cv/config.toml").to_string_lossy().to_string());

    let global_table = global_path
        .and_then(|p| std::fs::read_to_string(p).ok())
        .and_then(|c| c.parse::<toml::Value>().ok())
        .and_then(|v| match v {
            toml::Value::Table(t) => Some(t),
            _ => None,
        });

    let local_table = std::fs::read_to_string(&local_path)
        .ok()
        .and_then(|c| c.parse::<toml::Value>().ok())
        .and_then(|v| match v {
            toml::Value::Table(t) => Some(t),
            _ => None,
        });

    let merged = match (global_table, local_table) {
        (Some(mut global), Some(local)) => {
            deep_merge(&mut global, local);
            toml::Value::Table(global)
        }
        (Some(global), None) => toml::Value::Table(global),
        (None, Some(local)) => toml::Value::Table(local),
        (None, None) => return CvConfig::default(),
    };

    merged.try_into().unwrap_or_default()
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables are merged recursively.
fn deep_merge(
    base: &mut toml::map::Map<String, toml::Value>,
    overlay: toml::map::Map<String, toml::Value>,
) {
    for (key, value) in overlay {
        match (base.get_mut(&key), &value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table.clone());
            }
            _ => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(s: &str) -> toml::map::Map<String, toml::Value> {
        match s.parse::<toml::Value>().unwrap() {
            toml::Value::Table(t) => t,
            _ => panic!("not a table"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = CvConfig::default();
        assert_eq!(config.display.theme, "auto");
        assert_eq!(config.display.max_width, 88);
        assert!(config.features.mouse);
        assert!(config.features.watch);
        assert!(config.features.clipboard);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: CvConfig = toml::from_str("[display]\ntheme = \"light\"\n").unwrap();
        assert_eq!(config.display.theme, "light");
        assert_eq!(config.display.max_width, 88);
        assert!(config.features.watch);
    }

    #[test]
    fn test_deep_merge_overrides_per_field() {
        let mut base = table("[display]\ntheme = \"dark\"\nmax_width = 100\n[features]\nmouse = false\n");
        let overlay = table("[display]\ntheme = \"light\"\n");
        deep_merge(&mut base, overlay);

        let merged: CvConfig = toml::Value::Table(base).try_into().unwrap();
        assert_eq!(merged.display.theme, "light");
        // untouched fields from base survive
        assert_eq!(merged.display.max_width, 100);
        assert!(!merged.features.mouse);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config: CvConfig =
            toml::from_str("[display]\ntheme = \"dark\"\nfont = \"iosevka\"\n").unwrap();
        assert_eq!(config.display.theme, "dark");
    }
}
