use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::warn;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Cyan,
    Gray,
}

impl ProjectColor {
    /// SGR sequence used for task chips: white text on the project color.
    pub fn ansi_code(self) -> &'static str {
        match self {
            Self::Red => "97;41",
            Self::Blue => "97;44",
            Self::Green => "97;42",
            Self::Yellow => "30;43",
            Self::Purple => "97;45",
            Self::Cyan => "30;46",
            Self::Gray => "97;100",
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Purple => "purple",
            Self::Cyan => "cyan",
            Self::Gray => "gray",
        }
    }
}

impl fmt::Display for ProjectColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for ProjectColor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "purple" | "magenta" => Ok(Self::Purple),
            "cyan" => Ok(Self::Cyan),
            "gray" | "grey" => Ok(Self::Gray),
            other => Err(anyhow!("unknown color: {other}")),
        }
    }
}

/// Project label to chip color. Unknown projects get the fallback.
#[derive(Debug, Clone)]
pub struct ColorMap {
    colors: HashMap<String, ProjectColor>,
    fallback: ProjectColor,
}

impl Default for ColorMap {
    fn default() -> Self {
        let colors = [
            ("Project A", ProjectColor::Blue),
            ("Project B", ProjectColor::Green),
            ("Project C", ProjectColor::Yellow),
            ("Project D", ProjectColor::Purple),
        ]
        .into_iter()
        .map(|(name, color)| (name.to_string(), color))
        .collect();

        Self {
            colors,
            fallback: ProjectColor::Gray,
        }
    }
}

impl ColorMap {
    /// Defaults plus `color.project.<name> = <color>` entries. Unknown color
    /// names are logged and skipped.
    pub fn from_config(cfg: &Config) -> Self {
        let mut map = Self::default();
        for (project, raw) in cfg.with_prefix("color.project.") {
            match raw.parse::<ProjectColor>() {
                Ok(color) => {
                    map.colors.insert(project, color);
                }
                Err(err) => warn!(project = %project, error = %err, "ignoring project color"),
            }
        }
        map
    }

    pub fn color_for(&self, project: &str) -> ProjectColor {
        self.colors.get(project).copied().unwrap_or(self.fallback)
    }
}
