//! Process-wide configuration of the viewer.
//!
//! The configuration is read once on startup from the environment. For web builds, where there is
//! no environment at runtime, the values baked in at compile time are used instead.

use log::{info, warn};

/// Style of the base map used when nothing else is configured.
pub const DEFAULT_MAP_STYLE: &str = "mapbox://styles/mapbox/streets-v11";

/// Environment variable with the base map style.
pub const MAP_STYLE_VAR: &str = "GEOVIEW_MAP_STYLE";
/// Environment variables with the base map access token, in the order they are checked.
pub const ACCESS_TOKEN_VARS: [&str; 2] = ["MAPBOX_TOKEN", "NEXT_PUBLIC_MAPBOX_TOKEN"];
/// Environment variable with the url loaded on startup.
pub const INITIAL_URL_VAR: &str = "GEOVIEW_INITIAL_URL";

const MAPBOX_STYLE_PREFIX: &str = "mapbox://styles/";

/// Configuration of the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Base map style identifier.
    pub map_style: String,
    /// Access token of the base map service.
    pub access_token: Option<String>,
    /// Url to load on startup.
    pub initial_url: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            map_style: DEFAULT_MAP_STYLE.to_string(),
            access_token: None,
            initial_url: None,
        }
    }
}

impl ViewerConfig {
    /// Reads the configuration from the process environment and the command line.
    ///
    /// The initial url is taken from `GEOVIEW_INITIAL_URL` or, if it is not set, from the first
    /// command line argument.
    pub fn from_env() -> Self {
        let config = Self::from_lookup(
            |name| std::env::var(name).ok().or_else(|| compile_time_var(name)),
            std::env::args().nth(1),
        );

        if config.access_token.is_none() {
            warn!("Base map access token is not set, falling back to OpenStreetMap tiles");
        }
        info!("Using base map style {}", config.map_style);

        config
    }

    /// Builds the configuration from the given variable lookup. Blank values count as unset.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        first_argument: Option<String>,
    ) -> Self {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            map_style: non_blank(MAP_STYLE_VAR).unwrap_or_else(|| DEFAULT_MAP_STYLE.to_string()),
            access_token: ACCESS_TOKEN_VARS.iter().find_map(|name| non_blank(*name)),
            initial_url: non_blank(INITIAL_URL_VAR)
                .or(first_argument.filter(|value| !value.trim().is_empty())),
        }
    }

    /// Raster base map to draw under the data layer.
    pub fn base_map(&self) -> BaseMap {
        match &self.access_token {
            Some(token) => BaseMap::Mapbox {
                style_path: self
                    .map_style
                    .strip_prefix(MAPBOX_STYLE_PREFIX)
                    .unwrap_or(&self.map_style)
                    .to_string(),
                access_token: token.clone(),
            },
            None => BaseMap::OpenStreetMap,
        }
    }
}

fn compile_time_var(name: &str) -> Option<String> {
    let value = match name {
        MAP_STYLE_VAR => option_env!("GEOVIEW_MAP_STYLE"),
        "MAPBOX_TOKEN" => option_env!("MAPBOX_TOKEN"),
        "NEXT_PUBLIC_MAPBOX_TOKEN" => option_env!("NEXT_PUBLIC_MAPBOX_TOKEN"),
        INITIAL_URL_VAR => option_env!("GEOVIEW_INITIAL_URL"),
        _ => None,
    };

    value.map(str::to_string)
}

/// Source of the raster base map tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseMap {
    /// Mapbox static tiles of the given style.
    Mapbox {
        /// `user/style` path of the style.
        style_path: String,
        /// Access token.
        access_token: String,
    },
    /// Standard OpenStreetMap tiles. Used when no access token is configured.
    OpenStreetMap,
}

impl BaseMap {
    /// Size of a tile in pixels.
    pub const TILE_SIZE: u32 = 256;

    /// Url of the tile with the given index.
    pub fn tile_url(&self, z: u32, x: u64, y: u64) -> String {
        match self {
            BaseMap::Mapbox {
                style_path,
                access_token,
            } => format!(
                "https://api.mapbox.com/styles/v1/{style_path}/tiles/{}/{z}/{x}/{y}?access_token={access_token}",
                Self::TILE_SIZE
            ),
            BaseMap::OpenStreetMap => format!("https://tile.openstreetmap.org/{z}/{x}/{y}.png"),
        }
    }

    /// Highest zoom level the tile service provides.
    pub fn max_z(&self) -> u32 {
        match self {
            BaseMap::Mapbox { .. } => 19,
            BaseMap::OpenStreetMap => 18,
        }
    }

    /// Attribution that must be shown with the tiles.
    pub fn attribution(&self) -> Attribution {
        match self {
            BaseMap::Mapbox { .. } => Attribution::new(
                "© Mapbox © OpenStreetMap contributors",
                Some("https://www.mapbox.com/about/maps/"),
            ),
            BaseMap::OpenStreetMap => Attribution::new(
                "© OpenStreetMap contributors",
                Some("https://www.openstreetmap.org/copyright"),
            ),
        }
    }
}

/// Credit of a data source with an optional link to the details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    text: String,
    url: Option<String>,
}

impl Attribution {
    /// Creates a new attribution.
    pub fn new(text: impl Into<String>, url: Option<&str>) -> Self {
        Self {
            text: text.into(),
            url: url.map(str::to_string),
        }
    }

    /// Text of the attribution.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Link to the details, if any.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}
