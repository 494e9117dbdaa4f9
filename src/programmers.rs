//! Programmer registration and parsing
//!
//! A programmer string names the link to the bootloader and optional
//! parameters, e.g. `usb`, `usb:index=1`, `serial:dev=/dev/ttyUSB0:115200`
//! or `dummy:chip=CH549`.

use thiserror::Error;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all programmers enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "usb")]
    programmers.push(ProgrammerInfo {
        name: "usb",
        aliases: &["isp55e0"],
        description: "ISP bootloader over USB (VID:4348 PID:55e0) (index=<n>)",
    });

    #[cfg(feature = "serial")]
    programmers.push(ProgrammerInfo {
        name: "serial",
        aliases: &["uart"],
        description: "ISP bootloader over a serial line (dev=<port>[:baud])",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &["sim"],
        description: "Simulated bootloader for testing (chip=<name>)",
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
        help.push_str(&format!("  {:8} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Split `name:key=value,key=value` into the name and its options
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Problems with a programmer string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgrammerError {
    /// No compiled-in programmer has this name
    #[error("unknown programmer: {0}\n\n{help}Use 'wchflash list-programmers' for more details", help = programmer_help())]
    Unknown(String),

    /// A required option is missing
    #[error("{programmer} requires {option}=...")]
    MissingOption {
        /// Programmer name
        programmer: &'static str,
        /// Option name
        option: &'static str,
    },

    /// An option value did not parse
    #[error("invalid {option} for {programmer}: {value}")]
    InvalidOption {
        /// Programmer name
        programmer: &'static str,
        /// Option name
        option: &'static str,
        /// Offending value
        value: String,
    },
}

/// A parsed programmer string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgrammerSpec {
    /// USB bootloader, the nth one found
    Usb {
        /// Device index
        index: usize,
    },
    /// Serial bootloader
    Serial {
        /// Port path
        device: String,
        /// Baud rate, 115200 when absent
        baud: Option<u32>,
    },
    /// Simulated bootloader
    Dummy {
        /// Chip to simulate
        chip: Option<String>,
    },
}

fn option<'a>(options: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    options.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

impl ProgrammerSpec {
    /// Parse a programmer string
    pub fn parse(s: &str) -> Result<Self, ProgrammerError> {
        let (name, options) = parse_programmer_string(s);

        let canonical = available_programmers()
            .into_iter()
            .find(|p| p.name == name || p.aliases.contains(&name))
            .map(|p| p.name)
            .ok_or_else(|| ProgrammerError::Unknown(name.to_string()))?;

        match canonical {
            "usb" => {
                let index = match option(&options, "index") {
                    Some(v) => v.parse().map_err(|_| ProgrammerError::InvalidOption {
                        programmer: "usb",
                        option: "index",
                        value: v.to_string(),
                    })?,
                    None => 0,
                };
                Ok(Self::Usb { index })
            }
            "serial" => {
                let dev = option(&options, "dev").ok_or(ProgrammerError::MissingOption {
                    programmer: "serial",
                    option: "dev",
                })?;
                match dev.rsplit_once(':') {
                    Some((device, baud)) => {
                        let baud = baud.parse().map_err(|_| ProgrammerError::InvalidOption {
                            programmer: "serial",
                            option: "baud",
                            value: baud.to_string(),
                        })?;
                        Ok(Self::Serial {
                            device: device.to_string(),
                            baud: Some(baud),
                        })
                    }
                    None => Ok(Self::Serial {
                        device: dev.to_string(),
                        baud: None,
                    }),
                }
            }
            _ => Ok(Self::Dummy {
                chip: option(&options, "chip").map(str::to_string),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_string() {
        let (name, opts) = parse_programmer_string("serial:dev=/dev/ttyUSB0:57600");
        assert_eq!(name, "serial");
        assert_eq!(opts, vec![("dev", "/dev/ttyUSB0:57600")]);

        let (name, opts) = parse_programmer_string("usb");
        assert_eq!(name, "usb");
        assert!(opts.is_empty());
    }

    #[cfg(feature = "usb")]
    #[test]
    fn test_usb_spec() {
        assert_eq!(ProgrammerSpec::parse("usb"), Ok(ProgrammerSpec::Usb { index: 0 }));
        assert_eq!(
            ProgrammerSpec::parse("isp55e0:index=2"),
            Ok(ProgrammerSpec::Usb { index: 2 })
        );
        assert!(matches!(
            ProgrammerSpec::parse("usb:index=x"),
            Err(ProgrammerError::InvalidOption { option: "index", .. })
        ));
    }

    #[cfg(feature = "serial")]
    #[test]
    fn test_serial_spec() {
        assert_eq!(
            ProgrammerSpec::parse("serial:dev=/dev/ttyUSB0"),
            Ok(ProgrammerSpec::Serial {
                device: "/dev/ttyUSB0".into(),
                baud: None
            })
        );
        assert_eq!(
            ProgrammerSpec::parse("serial:dev=COM3:57600"),
            Ok(ProgrammerSpec::Serial {
                device: "COM3".into(),
                baud: Some(57600)
            })
        );
        assert_eq!(
            ProgrammerSpec::parse("serial"),
            Err(ProgrammerError::MissingOption {
                programmer: "serial",
                option: "dev"
            })
        );
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_spec() {
        assert_eq!(
            ProgrammerSpec::parse("dummy:chip=CH549"),
            Ok(ProgrammerSpec::Dummy {
                chip: Some("CH549".into())
            })
        );
    }

    #[test]
    fn test_unknown_programmer() {
        let err = ProgrammerSpec::parse("ch341a").unwrap_err();
        assert_eq!(err, ProgrammerError::Unknown("ch341a".into()));
        assert!(err.to_string().starts_with("unknown programmer: ch341a"));
    }
}
