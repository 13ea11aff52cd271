use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Named pipeline step that the orchestrator knows how to run.
///
/// Each step is a fixed composition of engine methods; see
/// [`crate::build::steps`] for the exact sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Rebuild resources, then code.
    RebuildAll,
    /// Rebuild resources only (plus resource hooks).
    RebuildResource,
    /// Refresh derived UI atlases.
    RefreshUiAtlas,
    /// Regenerate role sprites, then role prefabs.
    RecreateRolePrefab,
}

impl BuildStep {
    pub const ALL: [BuildStep; 4] = [
        BuildStep::RebuildAll,
        BuildStep::RebuildResource,
        BuildStep::RefreshUiAtlas,
        BuildStep::RecreateRolePrefab,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStep::RebuildAll => "RebuildAll",
            BuildStep::RebuildResource => "RebuildResource",
            BuildStep::RefreshUiAtlas => "RefreshUIAtlas",
            BuildStep::RecreateRolePrefab => "RecreateRolePrefab",
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BuildStep::ALL
            .iter()
            .copied()
            .find(|step| step.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<_> = BuildStep::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown build step: {wanted} (expected one of {})", names.join(", "))
            })
    }
}

/// Target platform of the engine build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Osx,
    Win,
}

impl Platform {
    /// Value passed to the engine's `-buildTarget` flag.
    pub fn build_target(&self) -> &'static str {
        match self {
            Platform::Android => "Android",
            Platform::Ios => "iOS",
            Platform::Osx => "OSXUniversal",
            Platform::Win => "Win64",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "osx" => Ok(Platform::Osx),
            "win" => Ok(Platform::Win),
            other => Err(format!(
                "invalid platform: {other} (expected \"android\", \"ios\", \"osx\" or \"win\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_step_parses_case_insensitively() {
        assert_eq!("rebuildall".parse::<BuildStep>(), Ok(BuildStep::RebuildAll));
        assert_eq!("RefreshUIAtlas".parse::<BuildStep>(), Ok(BuildStep::RefreshUiAtlas));
        assert!("Deploy".parse::<BuildStep>().is_err());
    }

    #[test]
    fn platform_maps_to_engine_build_target() {
        assert_eq!("IOS".parse::<Platform>().unwrap().build_target(), "iOS");
        assert_eq!(Platform::Osx.build_target(), "OSXUniversal");
        assert!("linux".parse::<Platform>().is_err());
    }
}
