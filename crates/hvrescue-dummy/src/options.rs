use alloc::format;
use alloc::string::String;

use hvrescue_core::device::{DeviceRegistry, FuseSet};

use crate::target::DummyConfig;

fn parse_u8(key: &str, value: &str) -> Result<u8, String> {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16).map_err(|_| format!("Invalid {} value: {}", key, value))
}

/// Parse programmer options from a list of key-value pairs
///
/// # Supported Options
///
/// - `chip=NAME` - start from a factory fresh part of the device table
/// - `sig=1E950F` - signature (hex)
/// - `low=62`, `high=D9`, `ext=FF` - initial fuse bytes (hex)
/// - `lock=FF` - initial lock bits (hex)
/// - `busy=N` - RDY/BSY polls that read busy after each write
/// - `never_ready` - RDY/BSY never goes high
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyConfig, String> {
    let mut config = DummyConfig::default();
    let registry = DeviceRegistry::builtin();

    if let Some((_, name)) = options.iter().find(|(k, _)| *k == "chip") {
        let device = registry
            .find_by_name(name)
            .ok_or_else(|| format!("Unknown chip: {}", name))?;
        config = DummyConfig::for_device(device);
    }

    let FuseSet {
        mut low,
        mut high,
        mut extended,
    } = config.fuses;

    for (key, value) in options {
        match *key {
            "chip" => {}
            "sig" => {
                let digits = value.trim_start_matches("0x").trim_start_matches("0X");
                config.signature = u32::from_str_radix(digits, 16)
                    .ok()
                    .filter(|sig| *sig <= 0xFF_FFFF)
                    .ok_or_else(|| format!("Invalid sig value: {}", value))?;
            }
            "low" => low = parse_u8(key, value)?,
            "high" => high = parse_u8(key, value)?,
            "ext" => extended = parse_u8(key, value)?,
            "lock" => config.lock = parse_u8(key, value)?,
            "busy" => {
                config.busy_polls = value
                    .parse()
                    .map_err(|_| format!("Invalid busy value: {}", value))?;
            }
            "never_ready" => {
                config.never_ready = matches!(*value, "" | "1" | "yes" | "true");
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    config.fuses = FuseSet::new(low, high, extended);
    Ok(config)
}
