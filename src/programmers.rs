//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use hvrescue_core::programmer::ParallelPins;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "Simulated AVR target (chip=<name>,low=,high=,ext=,lock=,never_ready)",
    });

    #[cfg(feature = "linux-gpio")]
    programmers.push(ProgrammerInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio", "gpio"],
        description: "Linux GPIO character device (dev=/dev/gpiochipN,<signal>=<offset>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");

    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
        if !p.aliases.is_empty() {
            help.push_str(&format!("  {:12}   aliases: {}\n", "", p.aliases.join(", ")));
        }
    }

    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a programmer name or alias to its primary name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Execute a function with the specified programmer
///
/// The programmer string can be just the name (e.g., "linux_gpio") or include
/// parameters (e.g., "linux_gpio:dev=/dev/gpiochip1,hv=14").
#[allow(unused_variables, unused_mut)]
pub fn with_programmer<F>(programmer: &str, f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut dyn ParallelPins) -> Result<(), Box<dyn std::error::Error>>,
{
    // Parse programmer name and options
    let (name, options) = parse_programmer_string(programmer);

    // First check if the programmer is available at all
    let canonical_name = match find_programmer(name) {
        Some(n) => n,
        None => {
            return Err(unknown_programmer_error(name));
        }
    };

    // Dispatch to the appropriate programmer
    match canonical_name {
        #[cfg(feature = "dummy")]
        "dummy" => {
            let config = hvrescue_dummy::parse_options(&options)
                .map_err(|e| format!("Invalid dummy parameters: {}", e))?;
            let mut target = hvrescue_dummy::DummyAvr::new(config);
            let result = f(&mut target);
            log::debug!(
                "dummy: {} write strobes, {} us of simulated time",
                target.strobes(),
                target.elapsed_us()
            );
            result
        }

        #[cfg(feature = "linux-gpio")]
        "linux_gpio" => {
            log::info!("Opening Linux GPIO programmer...");

            let mut pins = hvrescue_linux_gpio::open_linux_gpio(&options).map_err(|e| {
                format!(
                    "Failed to open Linux GPIO programmer: {}\n\
                     Make sure the chip exists and you have read/write permissions.\n\
                     You may need to: sudo usermod -aG gpio $USER",
                    e
                )
            })?;

            f(pins.as_mut())
        }

        _ => Err(unknown_programmer_error(name)),
    }
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,flag,option2=value2". Options
/// without a value are returned with an empty one.
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter(|opt| !opt.is_empty())
            .map(|opt| opt.split_once('=').unwrap_or((opt, "")))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&programmer_help());
    msg.push_str("\nUse 'hvrescue list-programmers' for more details");
    msg.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_string() {
        assert_eq!(parse_programmer_string("dummy"), ("dummy", vec![]));
        assert_eq!(
            parse_programmer_string("dummy:chip=atmega8,never_ready,"),
            ("dummy", vec![("chip", "atmega8"), ("never_ready", "")])
        );
    }

    #[cfg(feature = "linux-gpio")]
    #[test]
    fn test_find_programmer_alias() {
        assert_eq!(find_programmer("gpio"), Some("linux_gpio"));
        assert_eq!(find_programmer("linux-gpio"), Some("linux_gpio"));
    }

    #[test]
    fn test_unknown_programmer() {
        assert_eq!(find_programmer("ch341a"), None);
        assert!(with_programmer("ch341a", |_| Ok(())).is_err());
    }
}
