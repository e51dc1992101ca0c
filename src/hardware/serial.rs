//! Serial/UART device access
//!
//! Opens tty devices (or any file-like endpoint such as a FIFO), switches
//! them into raw mode and applies the requested line speed.

use crate::core::{Role, Topology};
use crate::hardware::{Channels, DeviceConfig, Direction, LinkError, LinkResult};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use tracing::{debug, info};

/// Supported line speeds and their termios symbols
const BAUD_TABLE: &[(libc::speed_t, u32)] = &[
    (libc::B0, 0),
    (libc::B50, 50),
    (libc::B75, 75),
    (libc::B110, 110),
    (libc::B134, 134),
    (libc::B150, 150),
    (libc::B200, 200),
    (libc::B300, 300),
    (libc::B600, 600),
    (libc::B1200, 1200),
    (libc::B1800, 1800),
    (libc::B2400, 2400),
    (libc::B4800, 4800),
    (libc::B9600, 9600),
    (libc::B19200, 19200),
    (libc::B38400, 38400),
    (libc::B57600, 57600),
    (libc::B115200, 115200),
    (libc::B230400, 230400),
    #[cfg(target_os = "linux")]
    (libc::B460800, 460800),
    #[cfg(target_os = "linux")]
    (libc::B500000, 500000),
    #[cfg(target_os = "linux")]
    (libc::B576000, 576000),
    #[cfg(target_os = "linux")]
    (libc::B921600, 921600),
    #[cfg(target_os = "linux")]
    (libc::B1000000, 1000000),
    #[cfg(target_os = "linux")]
    (libc::B1152000, 1152000),
    #[cfg(target_os = "linux")]
    (libc::B1500000, 1500000),
    #[cfg(target_os = "linux")]
    (libc::B2000000, 2000000),
    #[cfg(target_os = "linux")]
    (libc::B2500000, 2500000),
    #[cfg(target_os = "linux")]
    (libc::B3000000, 3000000),
    #[cfg(target_os = "linux")]
    (libc::B3500000, 3500000),
    #[cfg(target_os = "linux")]
    (libc::B4000000, 4000000),
];

/// Look up the termios symbol for a baud rate
pub fn baud_symbol(rate: u32) -> Option<libc::speed_t> {
    BAUD_TABLE.iter().find(|(_, value)| *value == rate).map(|(sym, _)| *sym)
}

/// Look up the baud rate for a termios symbol
pub fn baud_value(symbol: libc::speed_t) -> Option<u32> {
    BAUD_TABLE.iter().find(|(sym, _)| *sym == symbol).map(|(_, value)| *value)
}

/// Open a device in the given direction, applying `config`
pub fn open_device(path: &str, direction: Direction, config: &DeviceConfig) -> LinkResult<File> {
    debug!("Trying to open {}...", path);

    let mut options = OpenOptions::new();
    match direction {
        Direction::Read => options.read(true),
        Direction::Write => options.write(true),
        Direction::ReadWrite => options.read(true).write(true),
    };
    options.custom_flags(libc::O_NOCTTY);

    let file = options.open(path).map_err(|source| LinkError::Open {
        path: path.to_string(),
        direction: direction.describe(),
        source,
    })?;

    if config.raw {
        configure_raw(&file, path, config.baud_rate)?;
    }

    Ok(file)
}

fn termios_call(result: libc::c_int, operation: &'static str) -> LinkResult<()> {
    if result != 0 {
        return Err(LinkError::Configure {
            operation,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Put a tty into raw mode and optionally set its speed.
///
/// Devices that are not terminals are left untouched.
pub fn configure_raw(file: &File, path: &str, baud_rate: Option<u32>) -> LinkResult<()> {
    let fd = file.as_raw_fd();

    // SAFETY: termios is plain old data; tcgetattr fills it in before use.
    let mut termios: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: fd is owned by `file` and stays open for the duration of the call.
    if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOTTY) {
            info!("{} is not a tty, skipping tty config", path);
            return Ok(());
        }
        return Err(LinkError::Configure {
            operation: "get terminal attributes",
            source: err,
        });
    }
    debug!(
        "termios iflag={:o} oflag={:o} cflag={:o} lflag={:o}",
        termios.c_iflag, termios.c_oflag, termios.c_cflag, termios.c_lflag
    );

    // SAFETY: termios was initialised by tcgetattr above; fd is valid.
    unsafe {
        libc::cfmakeraw(&mut termios);
        termios_call(libc::tcsetattr(fd, libc::TCSANOW, &termios), "enable raw mode")?;
    }

    match baud_rate {
        Some(rate) => {
            let symbol = baud_symbol(rate)
                .ok_or_else(|| LinkError::Config(format!("Unknown serial speed {}", rate)))?;
            // SAFETY: see above.
            unsafe {
                termios_call(libc::cfsetspeed(&mut termios, symbol), "set terminal speed")?;
                termios_call(libc::tcsetattr(fd, libc::TCSANOW, &termios), "set speed attribute")?;
            }
        }
        None => {
            // SAFETY: termios is initialised.
            let (ispeed, ospeed) =
                unsafe { (libc::cfgetispeed(&termios), libc::cfgetospeed(&termios)) };
            debug!(
                "Serial speed is {}/{}",
                baud_value(ispeed).map_or_else(|| "?".to_string(), |v| v.to_string()),
                baud_value(ospeed).map_or_else(|| "?".to_string(), |v| v.to_string()),
            );
        }
    }

    // SAFETY: fd is valid.
    termios_call(unsafe { libc::tcflush(fd, libc::TCIOFLUSH) }, "flush")?;
    Ok(())
}

/// Open the devices for a session.
///
/// With two devices the first carries output and the second input. A single
/// device is shared by both roles in a chain; otherwise a master only writes
/// and a slave only reads.
pub fn open_channels(
    device1: &str,
    device2: Option<&str>,
    role: Role,
    topology: Topology,
    config: &DeviceConfig,
) -> LinkResult<Channels> {
    match device2 {
        Some(_) if !topology.is_chain() => Err(LinkError::Config(
            "two devices require chain topology".to_string(),
        )),
        Some(input) => {
            let (tx, rx) = if role.is_master() {
                let tx = open_device(device1, Direction::Write, config)?;
                let rx = open_device(input, Direction::Read, config)?;
                (tx, rx)
            } else {
                let rx = open_device(input, Direction::Read, config)?;
                let tx = open_device(device1, Direction::Write, config)?;
                (tx, rx)
            };
            Ok(Channels::duplex(tx, rx))
        }
        None if topology.is_chain() => {
            let rx = open_device(device1, Direction::ReadWrite, config)?;
            let tx = rx.try_clone().map_err(|source| LinkError::Configure {
                operation: "duplicate device handle",
                source,
            })?;
            Ok(Channels::duplex(tx, rx))
        }
        None if role.is_master() => {
            Ok(Channels::transmit_only(open_device(device1, Direction::Write, config)?))
        }
        None => Ok(Channels::receive_only(open_device(device1, Direction::Read, config)?)),
    }
}

/// Serial line interrupt counters as reported by the driver
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptCounters {
    pub cts: i32,
    pub dsr: i32,
    pub rng: i32,
    pub dcd: i32,
    pub rx: i32,
    pub tx: i32,
    pub frame: i32,
    pub overrun: i32,
    pub parity: i32,
    pub brk: i32,
    pub buf_overrun: i32,
    reserved: [i32; 9],
}

impl fmt::Display for InterruptCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("cts", self.cts),
            ("dsr", self.dsr),
            ("rng", self.rng),
            ("dcd", self.dcd),
            ("rx", self.rx),
            ("tx", self.tx),
            ("frame", self.frame),
            ("overrun", self.overrun),
            ("parity", self.parity),
            ("brk", self.brk),
            ("buf_overrun", self.buf_overrun),
        ];
        for (name, value) in rows {
            writeln!(f, "{:<11} = {}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
const TIOCGICOUNT: libc::c_ulong = 0x545D;

/// Read the interrupt counters of a serial device
#[cfg(target_os = "linux")]
pub fn read_icount(path: &str) -> LinkResult<InterruptCounters> {
    let file = open_device(path, Direction::Read, &DeviceConfig::default())?;
    let mut counters = InterruptCounters::default();

    // SAFETY: counters matches struct serial_icounter_struct and outlives the call.
    let result = unsafe {
        libc::ioctl(file.as_raw_fd(), TIOCGICOUNT as _, &mut counters as *mut InterruptCounters)
    };
    termios_call(result, "get icount")?;
    Ok(counters)
}

#[cfg(not(target_os = "linux"))]
pub fn read_icount(_path: &str) -> LinkResult<InterruptCounters> {
    Err(LinkError::Config("icount is only supported on Linux".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_baud_lookup() {
        assert_eq!(baud_symbol(115200), Some(libc::B115200));
        assert_eq!(baud_value(libc::B9600), Some(9600));
        assert_eq!(baud_symbol(12345), None);
    }

    #[test]
    fn test_open_missing_device() {
        let err = open_device("/nonexistent/ttyX", Direction::Read, &DeviceConfig::raw(None))
            .unwrap_err();
        assert!(matches!(err, LinkError::Open { .. }));
        assert!(err.to_string().contains("for reading"));
    }

    #[test]
    fn test_regular_file_skips_tty_config() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let file = open_device(path, Direction::ReadWrite, &DeviceConfig::raw(Some(9600)));
        assert!(file.is_ok());
    }

    #[test]
    fn test_two_devices_need_chain() {
        let err = open_channels("/dev/null", Some("/dev/null"), Role::Master, Topology::PointToPoint, &DeviceConfig::default())
            .err()
            .unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_open_channels_for_roles() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let input = dir.path().join("in");
        std::fs::write(&input, [1u8, 2, 3]).unwrap();
        std::fs::write(&out, b"").unwrap();
        let out = out.to_str().unwrap();
        let input = input.to_str().unwrap();

        let channels = open_channels(out, None, Role::Master, Topology::PointToPoint, &DeviceConfig::default()).unwrap();
        assert!(channels.tx.is_some() && channels.rx.is_none());

        let channels = open_channels(input, None, Role::Slave, Topology::PointToPoint, &DeviceConfig::default()).unwrap();
        assert!(channels.tx.is_none() && channels.rx.is_some());

        let mut channels = open_channels(out, Some(input), Role::Slave, Topology::Chain, &DeviceConfig::default()).unwrap();
        let mut buf = [0u8; 3];
        channels.rx.as_mut().unwrap().read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        channels.tx.as_mut().unwrap().write_all(&[4]).unwrap();
    }

    #[test]
    fn test_icount_display() {
        let counters = InterruptCounters { rx: 10, tx: 12, ..Default::default() };
        let text = counters.to_string();
        assert!(text.contains("rx          = 10"));
        assert!(text.contains("buf_overrun = 0"));
        assert_eq!(text.lines().count(), 11);
    }
}
