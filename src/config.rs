use anyhow::{anyhow, bail, Context, Result};
use eframe::egui::Color32;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};

pub const TOKEN_ENV_VAR: &str = "SPOTIFY_ACCESS_TOKEN";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub window: WindowConfig,
    pub disc: DiscConfig,
    pub spin: SpinConfig,
    pub gesture: GestureConfig,
    pub layout: LayoutConfig,
    pub refresh: RefreshConfig,
    pub assets: AssetsConfig,
    pub spotify: SpotifyConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.push(current_dir.join("config.toml"));
            candidates.push(current_dir.join("config").join("config.toml"));
            candidates.push(current_dir.join("config").join("record_spinner.toml"));
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join("config.toml"));
                candidates.push(dir.join("config").join("config.toml"));
                candidates.push(dir.join("config").join("record_spinner.toml"));
            }
        }

        let mut config = Config::default();
        for path in candidates {
            if path.exists() {
                let data = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                config = Self::from_toml(&data)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))?;
                break;
            }
        }

        if let Ok(token) = env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                config.spotify.access_token = Some(token.trim().to_string());
            }
        }

        Ok(config)
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        let doc: ConfigDocument = toml::from_str(data)?;
        doc.try_into()
    }
}

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub hide_cursor: bool,
    pub background: Color32,
    pub text_color: Color32,
    pub font_size: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1080.0,
            height: 1080.0,
            title: "Spotify Record Spinner".to_string(),
            hide_cursor: true,
            background: Color32::from_rgb(245, 230, 200),
            text_color: Color32::BLACK,
            font_size: 28.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscConfig {
    pub scale: f32,
    pub overlay_size: usize,
    pub hole_radius: f32,
    pub overlay_alpha: u8,
    pub thumbnail_size: u32,
}

impl Default for DiscConfig {
    fn default() -> Self {
        Self {
            scale: 1.25,
            overlay_size: 500,
            hole_radius: 24.0,
            overlay_alpha: 204,
            thumbnail_size: 96,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpinConfig {
    pub angular_speed: f32,
    pub drag_sensitivity: f32,
    pub frame_rate: f32,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            angular_speed: -0.5,
            drag_sensitivity: 0.1,
            frame_rate: 60.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GestureConfig {
    pub swipe_distance: f32,
    pub swipe_time: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_distance: 100.0,
            swipe_time: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutConfig {
    pub banner_top: f32,
    pub gap: f32,
    pub text_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            banner_top: 800.0,
            gap: 24.0,
            text_gap: 8.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
    pub http_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetsConfig {
    pub records_dir: PathBuf,
    pub icons_dir: PathBuf,
    pub sfx_dir: PathBuf,
    pub watch_sfx: bool,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            records_dir: PathBuf::from("records"),
            icons_dir: PathBuf::from("spotify"),
            sfx_dir: PathBuf::from("sfx"),
            watch_sfx: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub api_base: String,
    pub access_token: Option<String>,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            access_token: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    window: WindowSection,
    #[serde(default)]
    disc: DiscSection,
    #[serde(default)]
    spin: SpinSection,
    #[serde(default)]
    gesture: GestureSection,
    #[serde(default)]
    layout: LayoutSection,
    #[serde(default)]
    refresh: RefreshSection,
    #[serde(default)]
    assets: AssetsSection,
    #[serde(default)]
    spotify: SpotifySection,
}

impl TryFrom<ConfigDocument> for Config {
    type Error = anyhow::Error;

    fn try_from(value: ConfigDocument) -> Result<Self> {
        value.ensure_finite()?;
        let defaults = Config::default();

        let window = WindowConfig {
            width: value.window.width.unwrap_or(defaults.window.width).max(64.0),
            height: value.window.height.unwrap_or(defaults.window.height).max(64.0),
            title: value.window.title.unwrap_or(defaults.window.title),
            hide_cursor: value.window.hide_cursor.unwrap_or(defaults.window.hide_cursor),
            background: match value.window.background.as_deref() {
                Some(raw) => parse_color(raw).context("window.background")?,
                None => defaults.window.background,
            },
            text_color: match value.window.text_color.as_deref() {
                Some(raw) => parse_color(raw).context("window.text_color")?,
                None => defaults.window.text_color,
            },
            font_size: value
                .window
                .font_size
                .unwrap_or(defaults.window.font_size)
                .clamp(6.0, 200.0),
        };

        let disc = DiscConfig {
            scale: value.disc.scale.unwrap_or(defaults.disc.scale).max(0.1),
            overlay_size: value
                .disc
                .overlay_size
                .unwrap_or(defaults.disc.overlay_size)
                .clamp(16, 4096),
            hole_radius: value
                .disc
                .hole_radius
                .unwrap_or(defaults.disc.hole_radius)
                .max(0.0),
            overlay_alpha: value.disc.overlay_alpha.unwrap_or(defaults.disc.overlay_alpha),
            thumbnail_size: value
                .disc
                .thumbnail_size
                .unwrap_or(defaults.disc.thumbnail_size)
                .clamp(8, 1024),
        };

        let spin = SpinConfig {
            angular_speed: value.spin.angular_speed.unwrap_or(defaults.spin.angular_speed),
            drag_sensitivity: value
                .spin
                .drag_sensitivity
                .unwrap_or(defaults.spin.drag_sensitivity),
            frame_rate: value
                .spin
                .frame_rate
                .unwrap_or(defaults.spin.frame_rate)
                .clamp(1.0, 240.0),
        };

        let gesture = GestureConfig {
            swipe_distance: value
                .gesture
                .swipe_distance
                .unwrap_or(defaults.gesture.swipe_distance)
                .max(0.0),
            swipe_time: value
                .gesture
                .swipe_time_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.gesture.swipe_time),
        };

        let layout = LayoutConfig {
            banner_top: value.layout.banner_top.unwrap_or(defaults.layout.banner_top),
            gap: value.layout.gap.unwrap_or(defaults.layout.gap).max(0.0),
            text_gap: value.layout.text_gap.unwrap_or(defaults.layout.text_gap).max(0.0),
        };

        let refresh = RefreshConfig {
            interval: value
                .refresh
                .interval_secs
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or(defaults.refresh.interval),
            http_timeout: value
                .refresh
                .http_timeout_secs
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or(defaults.refresh.http_timeout),
        };

        let assets = AssetsConfig {
            records_dir: value.assets.records_dir.unwrap_or(defaults.assets.records_dir),
            icons_dir: value.assets.icons_dir.unwrap_or(defaults.assets.icons_dir),
            sfx_dir: value.assets.sfx_dir.unwrap_or(defaults.assets.sfx_dir),
            watch_sfx: value.assets.watch_sfx.unwrap_or(defaults.assets.watch_sfx),
        };

        let spotify = SpotifyConfig {
            api_base: value
                .spotify
                .api_base
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.spotify.api_base),
            access_token: value
                .spotify
                .access_token
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
        };

        Ok(Config {
            window,
            disc,
            spin,
            gesture,
            layout,
            refresh,
            assets,
            spotify,
        })
    }
}

impl ConfigDocument {
    /// TOML accepts `nan` and `inf`; clamping does not filter NaN out.
    fn ensure_finite(&self) -> Result<()> {
        let floats = [
            ("window.width", self.window.width),
            ("window.height", self.window.height),
            ("window.font_size", self.window.font_size),
            ("disc.scale", self.disc.scale),
            ("disc.hole_radius", self.disc.hole_radius),
            ("spin.angular_speed", self.spin.angular_speed),
            ("spin.drag_sensitivity", self.spin.drag_sensitivity),
            ("spin.frame_rate", self.spin.frame_rate),
            ("gesture.swipe_distance", self.gesture.swipe_distance),
            ("layout.banner_top", self.layout.banner_top),
            ("layout.gap", self.layout.gap),
            ("layout.text_gap", self.layout.text_gap),
        ];
        for (key, value) in floats {
            if let Some(value) = value.filter(|v| !v.is_finite()) {
                bail!("{key} must be a finite number, got {value}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct WindowSection {
    width: Option<f32>,
    height: Option<f32>,
    title: Option<String>,
    hide_cursor: Option<bool>,
    background: Option<String>,
    text_color: Option<String>,
    font_size: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscSection {
    scale: Option<f32>,
    overlay_size: Option<usize>,
    hole_radius: Option<f32>,
    overlay_alpha: Option<u8>,
    thumbnail_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SpinSection {
    angular_speed: Option<f32>,
    drag_sensitivity: Option<f32>,
    frame_rate: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct GestureSection {
    swipe_distance: Option<f32>,
    swipe_time_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutSection {
    banner_top: Option<f32>,
    gap: Option<f32>,
    text_gap: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct RefreshSection {
    interval_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetsSection {
    records_dir: Option<PathBuf>,
    icons_dir: Option<PathBuf>,
    sfx_dir: Option<PathBuf>,
    watch_sfx: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SpotifySection {
    api_base: Option<String>,
    access_token: Option<String>,
}

fn parse_color(value: &str) -> Result<Color32> {
    let v = value.trim();
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex_color(hex);
    }
    if let Some(rest) = v.strip_prefix("rgb(") {
        let parts: Vec<&str> = rest.trim_end_matches(')').split(',').collect();
        if parts.len() != 3 {
            return Err(anyhow!("Expected three components in rgb(): {v}"));
        }
        let mut channels = [0u8; 3];
        for (slot, part) in channels.iter_mut().zip(parts) {
            *slot = part
                .trim()
                .parse::<u8>()
                .with_context(|| format!("Invalid color component: {part}"))?;
        }
        return Ok(Color32::from_rgb(channels[0], channels[1], channels[2]));
    }
    Err(anyhow!("Unsupported color format: {v}"))
}

fn parse_hex_color(hex: &str) -> Result<Color32> {
    let value = hex.trim();
    let bytes = match value.len() {
        6 | 8 => u32::from_str_radix(value, 16).ok(),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Invalid hex color: #{value}"))?;

    Ok(if value.len() == 6 {
        Color32::from_rgb((bytes >> 16) as u8, (bytes >> 8) as u8, bytes as u8)
    } else {
        Color32::from_rgba_unmultiplied(
            (bytes >> 24) as u8,
            (bytes >> 16) as u8,
            (bytes >> 8) as u8,
            bytes as u8,
        )
    })
}
