use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub apod: ApodConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub wallpaper: WallpaperConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApodConfig {
    /// NASA API key. The public `DEMO_KEY` sentinel works but is heavily
    /// rate limited; set a real key via config or the APOD_API_KEY env var.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApodConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key() -> String {
    "DEMO_KEY".to_string()
}
fn default_base_url() -> String {
    "https://api.nasa.gov".to_string()
}
fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,
    /// Local wall-clock hour of the daily run.
    #[serde(default = "default_fire_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            hour: default_fire_hour(),
            minute: 0,
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}
fn default_fire_hour() -> u32 {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_enabled")]
    pub enabled: bool,
    /// ntfy-compatible push server.
    #[serde(default = "default_notify_server")]
    pub server: String,
    /// Reserved topic; each day's notification replaces the prior one on the
    /// subscriber side rather than stacking under a new identity.
    #[serde(default = "default_notify_topic")]
    pub topic: String,
    /// Bearer token for servers that require auth.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: default_notify_enabled(),
            server: default_notify_server(),
            topic: default_notify_topic(),
            token: None,
        }
    }
}

fn default_notify_enabled() -> bool {
    true
}
fn default_notify_server() -> String {
    "https://ntfy.sh".to_string()
}
fn default_notify_topic() -> String {
    "space_discovery".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct WallpaperConfig {
    /// Private scratch directory for downloads and processed images.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// Screen dimensions used as the lower bound for the sampled decode.
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,
    /// Command applying an image to the home screen; "{path}" is replaced
    /// with the processed file.
    #[serde(default = "default_home_command")]
    pub home_command: Vec<String>,
    #[serde(default = "default_lock_command")]
    pub lock_command: Vec<String>,
}

impl Default for WallpaperConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            home_command: default_home_command(),
            lock_command: default_lock_command(),
        }
    }
}

fn default_cache_dir() -> String {
    "/tmp/apodd/wallpapers".to_string()
}
fn default_screen_width() -> u32 {
    1920
}
fn default_screen_height() -> u32 {
    1080
}
fn default_home_command() -> Vec<String> {
    vec![
        "gsettings".into(),
        "set".into(),
        "org.gnome.desktop.background".into(),
        "picture-uri".into(),
        "file://{path}".into(),
    ]
}
fn default_lock_command() -> Vec<String> {
    vec![
        "gsettings".into(),
        "set".into(),
        "org.gnome.desktop.screensaver".into(),
        "picture-uri".into(),
        "file://{path}".into(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct DaemonConfig {
    #[serde(default = "default_health_port")]
    pub health_port: u16,
    /// IP address to bind the health server to (default: "127.0.0.1").
    #[serde(default = "default_health_bind")]
    pub health_bind: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            health_port: default_health_port(),
            health_bind: default_health_bind(),
        }
    }
}

fn default_health_port() -> u16 {
    8675
}
fn default_health_bind() -> String {
    "127.0.0.1".to_string()
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Missing config file is fine — every section has working defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("APOD_API_KEY") {
            if !key.is_empty() {
                self.apod.api_key = key;
            }
        }
    }
}
