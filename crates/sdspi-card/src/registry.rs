//! Transport registry and initialization
//!
//! This module handles opening transports by name and creating CardHandles.
//! Every transport is paired with the countdown source that suits it.

use std::collections::HashMap;

#[allow(unused_imports)] // Used in feature-gated code
use crate::handle::{BoxedTimer, BoxedTransport};
use crate::handle::CardHandle;
use crate::CardError;
use sdspi_core::card::CardConfig;

/// Parsed transport parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportParams {
    /// Transport name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl TransportParams {
    #[allow(dead_code)] // Used in feature-gated code
    fn options(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a transport string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```
/// let params = sdspi_card::parse_transport_params("linux_spi:dev=/dev/spidev0.0").unwrap();
/// assert_eq!(params.name, "linux_spi");
/// assert_eq!(params.params.get("dev"), Some(&"/dev/spidev0.0".to_string()));
/// ```
pub fn parse_transport_params(s: &str) -> Result<TransportParams, CardError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(CardError::InvalidParameter(opt.to_string()));
            }
        }
    }

    Ok(TransportParams {
        name: name.to_string(),
        params,
    })
}

/// Open a transport without negotiating with the card
#[allow(unused_variables)] // Used in feature-gated code
pub fn open_transport(spec: &str, config: CardConfig) -> Result<CardHandle, CardError> {
    let params = parse_transport_params(spec)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params, config),

        #[cfg(feature = "linux-spi")]
        "linux_spi" | "linux-spi" | "spidev" => open_linux_spi(&params, config),

        _ => Err(CardError::UnknownTransport(params.name)),
    }
}

/// Open a transport and initialize the card behind it
///
/// # Example
/// ```
/// use sdspi_core::card::CardConfig;
///
/// let handle = sdspi_card::open_card("dummy:kind=sdsc", CardConfig::default()).unwrap();
/// assert!(handle.is_initialized());
/// ```
pub fn open_card(spec: &str, config: CardConfig) -> Result<CardHandle, CardError> {
    let mut handle = open_transport(spec, config)?;
    handle.initialize()?;
    Ok(handle)
}

#[cfg(feature = "dummy")]
fn open_dummy(params: &TransportParams, config: CardConfig) -> Result<CardHandle, CardError> {
    use sdspi_dummy::{parse_options, DummyCard, SimTimer};

    log::info!("Opening dummy card...");

    let dummy = parse_options(&params.options()).map_err(|message| CardError::InvalidOptions {
        transport: "dummy",
        message,
    })?;

    log::debug!(
        "dummy: {} card with {} blocks",
        dummy.kind.name(),
        dummy.blocks
    );

    let bus: BoxedTransport = Box::new(DummyCard::new(dummy));
    let timer: BoxedTimer = Box::new(SimTimer::new());
    Ok(CardHandle::new("dummy", bus, timer, config))
}

#[cfg(feature = "linux-spi")]
fn open_linux_spi(params: &TransportParams, config: CardConfig) -> Result<CardHandle, CardError> {
    use sdspi_linux_spi::{parse_options, LinuxSpi, ThreadTimer};

    log::info!("Opening Linux SPI transport...");

    let spi_config =
        parse_options(&params.options()).map_err(|message| CardError::InvalidOptions {
            transport: "linux_spi",
            message,
        })?;

    let spi = LinuxSpi::open(&spi_config).map_err(|e| {
        CardError::OpenFailed(format!(
            "Failed to open Linux SPI device: {}\n\
             Make sure the device exists and you have read/write permissions.\n\
             You may need to: sudo usermod -aG spi $USER",
            e
        ))
    })?;

    let timer = ThreadTimer::start()
        .map_err(|e| CardError::OpenFailed(format!("Failed to start timeout thread: {}", e)))?;

    let bus: BoxedTransport = Box::new(spi);
    let timer: BoxedTimer = Box::new(timer);
    Ok(CardHandle::new("linux_spi", bus, timer, config))
}

/// Information about an available transport
#[derive(Debug, Clone)]
pub struct TransportInfo {
    /// Primary name
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Description
    pub description: &'static str,
}

/// Get a list of all available transports (based on enabled features)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_transports() -> Vec<TransportInfo> {
    let mut transports = Vec::new();

    #[cfg(feature = "dummy")]
    transports.push(TransportInfo {
        name: "dummy",
        aliases: &[],
        description: "Simulated SD card for testing (kind=<v1|sdsc|sdhc|none>, blocks=N, idle=N)",
    });

    #[cfg(feature = "linux-spi")]
    transports.push(TransportInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux SPI device via spidev interface (dev=/dev/spidevX.Y, spispeed=<kHz>)",
    });

    transports
}

/// Generate a short list of transport names for CLI help
pub fn transport_names_short() -> String {
    let transports = available_transports();
    if transports.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = transports.iter().map(|t| t.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let params = parse_transport_params("dummy").unwrap();
        assert_eq!(params.name, "dummy");
        assert!(params.params.is_empty());
    }

    #[test]
    fn test_parse_with_options() {
        let params = parse_transport_params("linux_spi:dev=/dev/spidev1.0,spispeed=4000").unwrap();
        assert_eq!(params.name, "linux_spi");
        assert_eq!(params.params.len(), 2);
        assert_eq!(params.params["dev"], "/dev/spidev1.0");
        assert_eq!(params.params["spispeed"], "4000");
    }

    #[test]
    fn test_parse_rejects_bare_option() {
        match parse_transport_params("dummy:kind") {
            Err(CardError::InvalidParameter(opt)) => assert_eq!(opt, "kind"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_transport() {
        assert!(matches!(
            open_transport("ch341a", CardConfig::default()),
            Err(CardError::UnknownTransport(name)) if name == "ch341a"
        ));
    }

    #[test]
    fn test_names_short_lists_enabled_transports() {
        let names = transport_names_short();
        #[cfg(feature = "dummy")]
        assert!(names.contains("dummy"));
        #[cfg(feature = "linux-spi")]
        assert!(names.contains("linux_spi"));
        assert!(!names.is_empty());
    }

    #[cfg(feature = "dummy")]
    mod dummy {
        use super::*;
        use sdspi_core::card::{Addressing, CardVersion};

        #[test]
        fn test_open_card_negotiates() {
            let handle = open_card("dummy", CardConfig::default()).unwrap();
            let info = handle.info().unwrap();
            assert_eq!(handle.transport_name(), "dummy");
            assert_eq!(info.version, CardVersion::V2);
            assert_eq!(info.addressing, Addressing::Block);
        }

        #[test]
        fn test_open_card_with_kind() {
            let handle = open_card("dummy:kind=v1,blocks=8", CardConfig::default()).unwrap();
            assert_eq!(handle.info().unwrap().version, CardVersion::V1);
        }

        #[test]
        fn test_open_transport_leaves_card_alone() {
            let handle = open_transport("dummy", CardConfig::default()).unwrap();
            assert!(!handle.is_initialized());
            assert!(handle.info().is_none());
        }

        #[test]
        fn test_absent_card_fails_init() {
            assert!(matches!(
                open_card("dummy:kind=none", CardConfig::default()),
                Err(CardError::Init(sdspi_core::Error::NoResponse))
            ));
        }

        #[test]
        fn test_invalid_dummy_options() {
            assert!(matches!(
                open_transport("dummy:blocks=0", CardConfig::default()),
                Err(CardError::InvalidOptions {
                    transport: "dummy",
                    ..
                })
            ));
        }

        #[test]
        fn test_config_is_passed_through() {
            let config = CardConfig::default().with_read_timeout_ms(5);
            let handle = open_transport("dummy", config).unwrap();
            assert_eq!(handle.config().read_timeout_ms, 5);
        }
    }
}
