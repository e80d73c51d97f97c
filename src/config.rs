use crate::error::{LightError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory (relative to the home directory) holding the configuration store.
const STORAGE_DIR: &str = ".config/matter-gpio-light";

/// Passcodes the Matter specification forbids (trivial or sequential values).
const INVALID_PASSCODES: [u32; 12] = [
    0, 11111111, 22222222, 33333333, 44444444, 55555555, 66666666, 77777777, 88888888, 99999999,
    12345678, 87654321,
];

/// Load environment variables from a `.env` file in the working directory.
///
/// Values already present in the environment win. Surrounding quotes are
/// stripped; lines without `=` and `#` comments are skipped.
pub fn load_dotenv() -> usize {
    let Ok(content) = fs::read_to_string(Path::new(".env")) else {
        return 0;
    };

    let mut loaded = 0;
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var_os(key).is_none() {
            // SAFETY: called from `main` before the tokio runtime spawns any worker.
            unsafe { std::env::set_var(key, value) };
            loaded += 1;
        }
    }
    loaded
}

fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some((key.trim(), value))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub led: LedConfig,
    pub matter: MatterConfig,
    pub identify: IdentifyConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedConfig {
    /// GPIO number the LED is wired to. Most ESP32-C3 DevKits use GPIO 8.
    pub gpio: u8,
    /// LED lights when the line is driven low.
    pub active_low: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatterConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_name: String,
    pub discriminator: u16,
    pub passcode: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyConfig {
    /// Half period of the default identify blink, in milliseconds.
    pub blink_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub dir: PathBuf,
}

impl IdentifyConfig {
    pub fn blink_period(&self) -> Duration {
        Duration::from_millis(self.blink_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            led: LedConfig {
                gpio: 8,
                active_low: false,
            },
            matter: MatterConfig {
                vendor_id: 0xFFF1,
                product_id: 0x8000,
                device_name: "GPIO Matter Light".to_string(),
                discriminator: 3840,
                passcode: 20202021,
            },
            identify: IdentifyConfig { blink_ms: 500 },
            storage: StorageConfig {
                dir: dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(STORAGE_DIR),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(gpio) = std::env::var("LED_GPIO")
            && let Ok(g) = gpio.parse()
        {
            config.led.gpio = g;
        }
        if let Ok(active_low) = std::env::var("LED_ACTIVE_LOW") {
            config.led.active_low = matches!(active_low.as_str(), "1" | "true" | "yes");
        }
        if let Ok(name) = std::env::var("DEVICE_NAME") {
            config.matter.device_name = name;
        }
        if let Ok(vendor_id) = std::env::var("MATTER_VENDOR_ID")
            && let Ok(v) = parse_u16(&vendor_id)
        {
            config.matter.vendor_id = v;
        }
        if let Ok(product_id) = std::env::var("MATTER_PRODUCT_ID")
            && let Ok(p) = parse_u16(&product_id)
        {
            config.matter.product_id = p;
        }
        if let Ok(discriminator) = std::env::var("MATTER_DISCRIMINATOR")
            && let Ok(d) = discriminator.parse()
        {
            config.matter.discriminator = d;
        }
        if let Ok(passcode) = std::env::var("MATTER_PASSCODE")
            && let Ok(p) = passcode.parse()
        {
            config.matter.passcode = p;
        }
        if let Ok(blink) = std::env::var("IDENTIFY_BLINK_MS")
            && let Ok(b) = blink.parse()
        {
            config.identify.blink_ms = b;
        }
        if let Ok(dir) = std::env::var("STORAGE_DIR") {
            config.storage.dir = PathBuf::from(dir);
        }

        config
    }

    /// Reject values the stack would refuse later, before any hardware is touched.
    pub fn validate(&self) -> Result<()> {
        if self.matter.discriminator > 0x0FFF {
            return Err(LightError::InvalidConfig(format!(
                "discriminator {} does not fit in 12 bits",
                self.matter.discriminator
            )));
        }
        if self.matter.passcode > 99_999_998 || INVALID_PASSCODES.contains(&self.matter.passcode)
        {
            return Err(LightError::InvalidConfig(format!(
                "passcode {} is not allowed",
                self.matter.passcode
            )));
        }
        if self.identify.blink_ms == 0 {
            return Err(LightError::InvalidConfig(
                "identify blink period must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_u16(value: &str) -> std::result::Result<u16, std::num::ParseIntError> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    }
}
