//! Linux SPI device implementation
//!
//! This module provides the `LinuxSpi` struct that implements the
//! `BusTransport` trait using Linux's spidev interface.
//!
//! spidev has no direct chip-select control. While the card is selected
//! every message is sent with `cs_change` set on its last transfer, which
//! keeps chip-select asserted between messages. Releasing chip-select sends
//! an empty message without `cs_change`, and clocks sent while released use
//! the `SPI_NO_CS` mode flag so the line stays high during them.

use crate::error::{LinuxSpiError, Result};

use sdspi_core::bus::{BusTransport, ClockDivider, CsLevel};
use sdspi_core::consts::FILL_BYTE;
use sdspi_core::error::{Error as CoreError, Result as CoreResult};

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Default base clock in Hz the dividers apply to (16 MHz)
pub const DEFAULT_BASE_CLOCK_HZ: u32 = 16_000_000;

/// SPI mode constants
pub mod mode {
    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = 0;
    /// SPI mode 1: CPOL=0, CPHA=1
    pub const MODE_1: u8 = 1;
    /// SPI mode 2: CPOL=1, CPHA=0
    pub const MODE_2: u8 = 2;
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = 3;
    /// Do not drive chip-select during transfers
    pub const NO_CS: u8 = 0x40;
}

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of spi_ioc_transfer struct
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        // _IOC(_IOC_WRITE, type, nr, size) = (1<<30)|((size)<<16)|((type)<<8)|(nr)
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// Configuration for opening a Linux SPI device
#[derive(Debug, Clone)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// Clock the dividers apply to, in Hz (default: 16 MHz)
    pub base_clock_hz: u32,
    /// SPI mode (0-3, default: 0)
    pub mode: u8,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            base_clock_hz: DEFAULT_BASE_CLOCK_HZ,
            mode: mode::MODE_0,
        }
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the base clock in Hz
    pub fn with_base_clock(mut self, base_clock_hz: u32) -> Self {
        self.base_clock_hz = base_clock_hz;
        self
    }

    /// Set the SPI mode (0-3)
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }
}

/// SD card transport over a spidev device
pub struct LinuxSpi {
    /// File handle for spidev device
    file: File,
    /// Maximum kernel buffer size
    max_kernel_buf_size: usize,
    /// Configured SPI mode without the chip-select flag
    mode: u8,
    /// Base clock the dividers apply to
    base_clock_hz: u32,
    /// Current speed in Hz
    speed_hz: u32,
    /// Logical chip-select level
    cs: CsLevel,
    /// Controller accepts SPI_NO_CS
    no_cs_supported: bool,
    enabled: bool,
}

impl LinuxSpi {
    /// Open a Linux SPI device with the given configuration
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxSpiError::NoDevice);
        }

        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        // Set bits per word (always 8)
        let bits: u8 = 8;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        // Chip-select starts released
        let no_cs_supported = match write_mode(&file, config.mode | mode::NO_CS) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "linux_spi: {} does not support SPI_NO_CS ({}); clocks sent with \
                     chip-select released will assert it",
                    config.device,
                    e
                );
                write_mode(&file, config.mode)?;
                false
            }
        };

        let speed = ClockDivider::Div128.apply(config.base_clock_hz);
        write_speed(&file, speed)?;

        log::info!(
            "linux_spi: Opened {} (mode={}, base clock={} kHz)",
            config.device,
            config.mode,
            config.base_clock_hz / 1000
        );

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self {
            file,
            max_kernel_buf_size,
            mode: config.mode,
            base_clock_hz: config.base_clock_hz,
            speed_hz: speed,
            cs: CsLevel::High,
            no_cs_supported,
            enabled: false,
        })
    }

    /// Open a device with default settings
    pub fn open_device(device: &str) -> Result<Self> {
        Self::open(&LinuxSpiConfig::new(device))
    }

    /// Get current speed setting
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }

    /// Perform one full-duplex SPI message
    ///
    /// `tx` and `rx` must have the same length. Empty buffers send an empty
    /// message, which only ends a chip-select hold.
    fn spi_transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        if !self.enabled {
            return Err(LinuxSpiError::Disabled);
        }

        let transfer = SpiIocTransfer {
            tx_buf: tx.as_ptr() as u64,
            rx_buf: rx.as_mut_ptr() as u64,
            len: tx.len() as u32,
            speed_hz: self.speed_hz,
            bits_per_word: 8,
            cs_change: u8::from(self.cs.is_asserted()),
            ..Default::default()
        };

        let fd = self.file.as_raw_fd();
        let ret = unsafe { libc::ioctl(fd, ioctl::spi_ioc_message(1), &transfer as *const SpiIocTransfer) };

        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }

        Ok(())
    }

    /// Exchange `tx` into `rx`, split at the kernel buffer size
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> CoreResult<()> {
        let chunk = self.max_kernel_buf_size.max(1);
        for (tx, rx) in tx.chunks(chunk).zip(rx.chunks_mut(chunk)) {
            self.spi_transfer(tx, rx).map_err(|e| {
                log::error!("linux_spi: {}", e);
                CoreError::Generic
            })?;
        }
        Ok(())
    }

    fn release_cs(&mut self) -> Result<()> {
        // cs_change is clear on an empty message sent while released
        self.cs = CsLevel::High;
        if self.enabled {
            self.spi_transfer(&[], &mut [])?;
        }
        if self.no_cs_supported {
            write_mode(&self.file, self.mode | mode::NO_CS)?;
        }
        Ok(())
    }

    fn assert_cs(&mut self) -> Result<()> {
        if self.no_cs_supported {
            write_mode(&self.file, self.mode)?;
        }
        self.cs = CsLevel::Low;
        Ok(())
    }

    fn drive_cs(&mut self, level: CsLevel) -> CoreResult<()> {
        let result = match (self.cs, level) {
            (CsLevel::Low, CsLevel::High) => self.release_cs(),
            (CsLevel::High, CsLevel::Low) => self.assert_cs(),
            _ => Ok(()),
        };
        result.map_err(|e| {
            log::error!("linux_spi: chip-select to {:?} failed: {}", level, e);
            CoreError::Generic
        })
    }
}

impl BusTransport for LinuxSpi {
    fn select(&mut self) -> CoreResult<CsLevel> {
        let prior = self.cs;
        self.drive_cs(CsLevel::Low)?;
        Ok(prior)
    }

    fn restore(&mut self, level: CsLevel) -> CoreResult<()> {
        self.drive_cs(level)
    }

    fn transfer_byte(&mut self, byte: u8) -> CoreResult<u8> {
        let mut rx = [0u8; 1];
        self.exchange(&[byte], &mut rx)?;
        Ok(rx[0])
    }

    fn set_clock(&mut self, divider: ClockDivider) -> CoreResult<()> {
        let speed = divider.apply(self.base_clock_hz);
        write_speed(&self.file, speed).map_err(|e| {
            log::error!("linux_spi: {}", e);
            CoreError::Generic
        })?;
        self.speed_hz = speed;
        log::debug!("linux_spi: Set speed to {} Hz ({:?})", speed, divider);
        Ok(())
    }

    fn enable(&mut self) -> CoreResult<()> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> CoreResult<()> {
        if self.cs.is_asserted() {
            self.drive_cs(CsLevel::High)?;
        }
        self.enabled = false;
        Ok(())
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> CoreResult<()> {
        let mut rx = vec![0u8; bytes.len()];
        self.exchange(bytes, &mut rx)
    }

    fn receive_bytes(&mut self, buf: &mut [u8]) -> CoreResult<()> {
        let tx = vec![FILL_BYTE; buf.len()];
        self.exchange(&tx, buf)
    }

    fn skip_bytes(&mut self, count: usize) -> CoreResult<()> {
        let tx = vec![FILL_BYTE; count];
        let mut rx = vec![0u8; count];
        self.exchange(&tx, &mut rx)
    }
}

fn write_mode(file: &File, mode: u8) -> Result<()> {
    unsafe {
        ioctl::spi_ioc_wr_mode(file.as_raw_fd(), &mode).map_err(|e| {
            LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            }
        })?;
    }
    Ok(())
}

fn write_speed(file: &File, speed: u32) -> Result<()> {
    unsafe {
        ioctl::spi_ioc_wr_max_speed_hz(file.as_raw_fd(), &speed).map_err(|e| {
            LinuxSpiError::SetSpeedFailed {
                speed,
                source: std::io::Error::from_raw_os_error(e as i32),
            }
        })?;
    }
    Ok(())
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

/// Parse transport options from a list of key-value pairs
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxSpiConfig, String> {
    let mut config = LinuxSpiConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "spispeed" => {
                // Base clock in kHz
                let speed_khz: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid spispeed value: {}", value))?;
                if speed_khz == 0 {
                    return Err("spispeed must be greater than 0".to_string());
                }
                config.base_clock_hz = speed_khz
                    .checked_mul(1000)
                    .ok_or_else(|| format!("spispeed too large: {}", value))?;
            }
            "mode" => {
                let mode: u8 = value
                    .parse()
                    .map_err(|_| format!("Invalid mode value: {}", value))?;
                if mode > 3 {
                    return Err(format!("Invalid SPI mode: {} (must be 0-3)", mode));
                }
                config.mode = mode;
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err("No device specified. Use dev=/dev/spidevX.Y".to_string());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("dev", "/dev/spidev1.0"), ("spispeed", "8000"), ("mode", "3")])
            .unwrap();
        assert_eq!(config.device, "/dev/spidev1.0");
        assert_eq!(config.base_clock_hz, 8_000_000);
        assert_eq!(config.mode, 3);
    }

    #[test]
    fn test_parse_options_defaults() {
        let config = parse_options(&[("dev", "/dev/spidev0.0")]).unwrap();
        assert_eq!(config.base_clock_hz, DEFAULT_BASE_CLOCK_HZ);
        assert_eq!(config.mode, mode::MODE_0);
        assert_eq!(ClockDivider::Div2.apply(config.base_clock_hz), 8_000_000);
        assert_eq!(ClockDivider::Div64.apply(config.base_clock_hz), 250_000);
    }

    #[test]
    fn test_parse_options_errors() {
        assert!(parse_options(&[]).is_err());
        assert!(parse_options(&[("dev", "/dev/spidev0.0"), ("mode", "4")]).is_err());
        assert!(parse_options(&[("dev", "/dev/spidev0.0"), ("spispeed", "fast")]).is_err());
        assert!(parse_options(&[("dev", "/dev/spidev0.0"), ("spispeed", "0")]).is_err());
    }

    #[test]
    fn test_transfer_struct_size() {
        assert_eq!(
            core::mem::size_of::<SpiIocTransfer>(),
            ioctl::SPI_IOC_TRANSFER_SIZE
        );
    }
}
