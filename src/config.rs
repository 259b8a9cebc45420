use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};

use grid_snap::{OverflowPolicy, PointerEvent, ScreenPoint, SnapResolver, WorldPoint, DEFAULT_SEARCH_RADIUS};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment overrides look like `FATM__GRID__CELL_SIZE=0.5`.
const ENV_PREFIX: &str = "FATM";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_frame_hz")]
    pub frame_hz: u32,
    pub grid: Option<GridSettings>,
    pub camera: Option<CameraSettings>,
    #[serde(default)]
    pub snap: SnapSettings,
    #[serde(default)]
    pub machines: Vec<MachineSettings>,
    pub freeze: Option<FreezeSettings>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

fn default_frame_hz() -> u32 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridSettings {
    pub rows: u32,
    pub columns: u32,
    pub cell_size: f32,
    #[serde(default)]
    pub origin: WorldPoint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraSettings {
    pub pixels_per_unit: f32,
    #[serde(default)]
    pub view_origin: WorldPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Overflow {
    #[default]
    Abort,
    Expand,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapSettings {
    #[serde(default = "default_search_radius")]
    pub search_radius: u32,
    #[serde(default)]
    pub overflow: Overflow,
    pub max_search_radius: Option<u32>,
}

fn default_search_radius() -> u32 {
    DEFAULT_SEARCH_RADIUS
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            search_radius: DEFAULT_SEARCH_RADIUS,
            overflow: Overflow::Abort,
            max_search_radius: None,
        }
    }
}

impl SnapSettings {
    pub fn resolver(&self) -> SnapResolver {
        let overflow = match self.overflow {
            Overflow::Abort => OverflowPolicy::Abort,
            Overflow::Expand => OverflowPolicy::ExpandRadius {
                // Without an explicit cap, allow four extra rings
                max_radius: self.max_search_radius.unwrap_or(self.search_radius.saturating_add(4)),
            },
        };
        SnapResolver::new(self.search_radius, overflow)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MachineSettings {
    pub name: String,
    pub position: WorldPoint,
    pub half_extents: Option<WorldPoint>,
    /// Child pivot offsets from the machine's root
    #[serde(default)]
    pub pivots: Vec<WorldPoint>,
    #[serde(default = "default_true")]
    pub draggable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct FreezeSettings {
    pub threshold: f32,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptEvent {
    Pressed,
    Held,
    Released,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptStep {
    pub event: ScriptEvent,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub delay_ms: u64,
}

impl ScriptStep {
    pub fn to_event(&self) -> PointerEvent {
        let screen = ScreenPoint::new(self.x, self.y);
        match self.event {
            ScriptEvent::Pressed => PointerEvent::Pressed(screen),
            ScriptEvent::Held => PointerEvent::Held(screen),
            ScriptEvent::Released => PointerEvent::Released,
        }
    }
}

pub fn load_config(path: &str) -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", path);

    let settings = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(true))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
        .build()
        .and_then(Config::try_deserialize::<Settings>);

    match settings {
        Ok(settings) => {
            info!(
                machines = settings.machines.len(),
                script_steps = settings.script.len(),
                "Successfully loaded configuration"
            );
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
pub(crate) fn parse_settings(toml: &str) -> Result<Settings, ConfigError> {
    Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize()
}
