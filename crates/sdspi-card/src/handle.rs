//! Type-erased card handle
//!
//! [`CardHandle`] owns an [`SdCard`] over boxed trait objects so the CLI can
//! work with any transport through one concrete type.

use sdspi_core::bus::{BusTransport, ClockDivider};
use sdspi_core::card::{Addressing, CardConfig, CardVersion, SdCard};
use sdspi_core::consts::BLOCK_SIZE;
use sdspi_core::timeout::TimeoutGuard;

use crate::error::CardError;

/// Boxed bus transport
pub type BoxedTransport = Box<dyn BusTransport + Send>;

/// Boxed countdown source
pub type BoxedTimer = Box<dyn TimeoutGuard + Send>;

/// Parameters of a negotiated card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    /// Card physical layer version
    pub version: CardVersion,
    /// How block numbers map to command addresses
    pub addressing: Addressing,
    /// Divider the bus runs at after negotiation
    pub operating_divider: ClockDivider,
}

impl CardInfo {
    /// Human readable capacity class
    pub fn capacity_class(&self) -> &'static str {
        match (self.version, self.addressing) {
            (CardVersion::V1, _) => "SDSC (v1.x)",
            (CardVersion::V2, Addressing::Byte) => "SDSC (v2.0)",
            (CardVersion::V2, Addressing::Block) => "SDHC/SDXC",
        }
    }
}

/// Card driver over a boxed transport and timer
pub struct CardHandle {
    card: SdCard<BoxedTransport, BoxedTimer>,
    transport: String,
    info: Option<CardInfo>,
}

impl CardHandle {
    pub(crate) fn new(
        transport: impl Into<String>,
        bus: BoxedTransport,
        timer: BoxedTimer,
        config: CardConfig,
    ) -> Self {
        Self {
            card: SdCard::new(bus, timer, config),
            transport: transport.into(),
            info: None,
        }
    }

    /// Name of the transport this handle was opened with
    pub fn transport_name(&self) -> &str {
        &self.transport
    }

    /// Driver configuration
    pub fn config(&self) -> &CardConfig {
        self.card.config()
    }

    /// Parameters of the last successful initialization
    pub fn info(&self) -> Option<&CardInfo> {
        self.info.as_ref()
    }

    /// Check if the card has been initialized
    pub fn is_initialized(&self) -> bool {
        self.card.is_initialized()
    }

    /// Run the power-up negotiation
    pub fn initialize(&mut self) -> Result<&CardInfo, CardError> {
        self.info = None;
        self.card.initialize().map_err(CardError::Init)?;

        let (version, addressing) = match (self.card.version(), self.card.addressing()) {
            (Some(version), Some(addressing)) => (version, addressing),
            _ => return Err(CardError::Init(sdspi_core::Error::NotInitialized)),
        };

        log::info!(
            "Found: SD card {:?} with {:?} addressing via {}",
            version,
            addressing,
            self.transport
        );

        Ok(self.info.insert(CardInfo {
            version,
            addressing,
            operating_divider: self.card.config().operating_divider,
        }))
    }

    /// Query the card's power-up status
    ///
    /// If the card has not been initialized through this handle the
    /// transport is enabled first, so a card negotiated by an earlier
    /// process can still be queried.
    pub fn is_ready(&mut self) -> bool {
        if !self.card.is_initialized() {
            if let Err(e) = self.card.transport_mut().enable() {
                log::debug!("Failed to enable transport: {}", e);
                return false;
            }
        }
        self.card.is_ready()
    }

    /// Read a single block
    pub fn read_block(&mut self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), CardError> {
        self.card
            .read_block(block, buf)
            .map_err(|source| CardError::Read { block, source })
    }

    /// Read consecutive blocks into `buf`, starting at `start`
    pub fn read_blocks(&mut self, start: u32, buf: &mut [u8]) -> Result<(), CardError> {
        self.read_blocks_with_progress(start, buf, |_| {})
    }

    /// Read consecutive blocks, calling `progress` with the bytes read so far
    pub fn read_blocks_with_progress<F>(
        &mut self,
        start: u32,
        buf: &mut [u8],
        mut progress: F,
    ) -> Result<(), CardError>
    where
        F: FnMut(usize),
    {
        if buf.len() % BLOCK_SIZE != 0 {
            return Err(CardError::BufferSize(buf.len()));
        }

        let len = buf.len();
        for (i, chunk) in buf.chunks_exact_mut(BLOCK_SIZE).enumerate() {
            let block = u32::try_from(i)
                .ok()
                .and_then(|offset| start.checked_add(offset))
                .ok_or(CardError::BlockRange { start })?;
            let block_buf: &mut [u8; BLOCK_SIZE] = chunk
                .try_into()
                .map_err(|_| CardError::BufferSize(len))?;
            self.read_block(block, block_buf)?;
            progress((i + 1) * BLOCK_SIZE);
        }

        Ok(())
    }

    /// Disable the transport and drop the negotiated state
    pub fn shutdown(&mut self) -> Result<(), CardError> {
        self.info = None;
        self.card.shutdown().map_err(CardError::Shutdown)
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use sdspi_dummy::{CardKind, DummyCard, DummyConfig, SimTimer};

    fn handle_with(kind: CardKind, data: &[u8]) -> CardHandle {
        let config = DummyConfig {
            kind,
            blocks: 16,
            ..DummyConfig::default()
        };
        CardHandle::new(
            "dummy",
            Box::new(DummyCard::with_data(config, data)),
            Box::new(SimTimer::new()),
            CardConfig::default(),
        )
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_initialize_reports_info() {
        let mut handle = handle_with(CardKind::V2HighCapacity, &[]);
        let info = handle.initialize().unwrap().clone();
        assert_eq!(info.version, CardVersion::V2);
        assert_eq!(info.addressing, Addressing::Block);
        assert_eq!(info.operating_divider, ClockDivider::Div2);
        assert_eq!(info.capacity_class(), "SDHC/SDXC");
        assert_eq!(handle.info(), Some(&info));
    }

    #[test]
    fn test_capacity_class_for_standard_cards() {
        let mut v1 = handle_with(CardKind::V1, &[]);
        assert_eq!(v1.initialize().unwrap().capacity_class(), "SDSC (v1.x)");

        let mut sdsc = handle_with(CardKind::V2Standard, &[]);
        assert_eq!(sdsc.initialize().unwrap().capacity_class(), "SDSC (v2.0)");
    }

    #[test]
    fn test_read_blocks_with_progress() {
        let data = pattern(16 * BLOCK_SIZE);
        let mut handle = handle_with(CardKind::V2HighCapacity, &data);
        handle.initialize().unwrap();

        let mut buf = vec![0u8; 3 * BLOCK_SIZE];
        let mut reported = Vec::new();
        handle
            .read_blocks_with_progress(2, &mut buf, |done| reported.push(done))
            .unwrap();

        assert_eq!(buf, data[2 * BLOCK_SIZE..5 * BLOCK_SIZE]);
        assert_eq!(reported, vec![512, 1024, 1536]);
    }

    #[test]
    fn test_read_blocks_rejects_partial_block() {
        let mut handle = handle_with(CardKind::V2HighCapacity, &[]);
        handle.initialize().unwrap();

        let mut buf = vec![0u8; 700];
        assert!(matches!(
            handle.read_blocks(0, &mut buf),
            Err(CardError::BufferSize(700))
        ));
    }

    #[test]
    fn test_read_past_end_names_block() {
        let mut handle = handle_with(CardKind::V2HighCapacity, &[]);
        handle.initialize().unwrap();

        let mut buf = vec![0u8; 2 * BLOCK_SIZE];
        let result = handle.read_blocks(15, &mut buf);
        assert!(matches!(
            result,
            Err(CardError::Read {
                block: 16,
                source: sdspi_core::Error::Parameter
            })
        ));
    }

    #[test]
    fn test_read_error_names_block() {
        let mut handle = handle_with(CardKind::V2HighCapacity, &[]);
        let mut buf = [0u8; BLOCK_SIZE];
        match handle.read_block(7, &mut buf) {
            Err(CardError::Read { block, source }) => {
                assert_eq!(block, 7);
                assert_eq!(source, sdspi_core::Error::NotInitialized);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_is_ready_without_initialize() {
        let mut handle = handle_with(CardKind::V2HighCapacity, &[]);
        // A card that never saw the reset command is not in SPI mode.
        assert!(!handle.is_ready());

        handle.initialize().unwrap();
        assert!(handle.is_ready());
    }

    #[test]
    fn test_shutdown_clears_info() {
        let mut handle = handle_with(CardKind::V2HighCapacity, &[]);
        handle.initialize().unwrap();
        handle.shutdown().unwrap();

        assert!(handle.info().is_none());
        assert!(!handle.is_initialized());
    }
}
