//! GPIO through the Linux sysfs interface (`/sys/class/gpio`).

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::{Direction, Gpio, Level};
use crate::error::{Error, Result};

pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

// udev may need a while to make a freshly exported line accessible.
const OPEN_ATTEMPTS: u32 = 1000;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(1);

/// An exported sysfs GPIO line. The `direction` and `value` attributes stay
/// open for the lifetime of the handle.
#[derive(Debug)]
pub struct SysfsGpio {
    number: u32,
    root: PathBuf,
    direction: File,
    value: File,
}

impl SysfsGpio {
    pub fn get(number: u32) -> Result<Self> {
        Self::get_at(SYSFS_GPIO_ROOT, number)
    }

    /// Like [`get`](Self::get), with the sysfs GPIO class rooted at `root`.
    pub fn get_at(root: impl AsRef<Path>, number: u32) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let gpio_err = |source: io::Error| Error::Gpio { number, source };

        write_number(&root.join("export"), number).map_err(|err| {
            warn!("gpio {}: export failed: {}", number, err);
            gpio_err(err)
        })?;

        let line = root.join(format!("gpio{}", number));
        let direction = open_attr(&line.join("direction")).map_err(gpio_err)?;
        let value = open_attr(&line.join("value")).map_err(gpio_err)?;

        debug!("gpio {}: exported", number);

        Ok(SysfsGpio {
            number,
            root,
            direction,
            value,
        })
    }

    /// For lines a board may not wire up: a line that cannot be exported is
    /// `None` rather than an error.
    pub fn get_optional(number: u32) -> Option<Self> {
        Self::get_optional_at(SYSFS_GPIO_ROOT, number)
    }

    pub fn get_optional_at(root: impl AsRef<Path>, number: u32) -> Option<Self> {
        match Self::get_at(root, number) {
            Ok(gpio) => Some(gpio),
            Err(err) => {
                debug!("optional {}", err);
                None
            }
        }
    }

    /// Closes the attributes and unexports the line.
    pub fn remove(self) -> Result<()> {
        let SysfsGpio {
            number,
            root,
            direction,
            value,
        } = self;
        drop(direction);
        drop(value);

        write_number(&root.join("unexport"), number)
            .map_err(|source| Error::Gpio { number, source })?;

        debug!("gpio {}: unexported", number);
        Ok(())
    }

    fn err(&self, source: io::Error) -> Error {
        Error::Gpio {
            number: self.number,
            source,
        }
    }
}

impl Gpio for SysfsGpio {
    fn number(&self) -> u32 {
        self.number
    }

    fn direction_input(&mut self) -> Result<()> {
        write_attr(&mut self.direction, b"in").map_err(|e| self.err(e))
    }

    fn direction_output(&mut self, level: Level) -> Result<()> {
        write_attr(&mut self.direction, b"out").map_err(|e| self.err(e))?;
        self.set_value(level)
    }

    fn get_direction(&mut self) -> Result<Direction> {
        match read_first(&mut self.direction).map_err(|e| self.err(e))? {
            b'o' => Ok(Direction::Output),
            _ => Ok(Direction::Input),
        }
    }

    fn set_value(&mut self, level: Level) -> Result<()> {
        let data: &[u8] = match level {
            Level::High => b"1",
            Level::Low => b"0",
        };
        write_attr(&mut self.value, data).map_err(|e| self.err(e))
    }

    fn get_value(&mut self) -> Result<Level> {
        match read_first(&mut self.value).map_err(|e| self.err(e))? {
            b'0' => Ok(Level::Low),
            _ => Ok(Level::High),
        }
    }
}

fn write_number(path: &Path, number: u32) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.write_all(number.to_string().as_bytes())
}

fn open_attr(path: &Path) -> io::Result<File> {
    let mut attempts = OPEN_ATTEMPTS;
    loop {
        match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => return Ok(file),
            Err(err) if attempts <= 1 => {
                warn!("can't open {}: {}", path.display(), err);
                return Err(err);
            }
            Err(_) => {
                attempts -= 1;
                thread::sleep(OPEN_RETRY_DELAY);
            }
        }
    }
}

// sysfs attributes are read and written from the start every time.
fn write_attr(file: &mut File, data: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(data)
}

fn read_first(file: &mut File) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut byte)?;
    Ok(byte[0])
}

#[cfg(feature = "embedded-hal")]
impl embedded_hal::digital::ErrorType for SysfsGpio {
    type Error = Error;
}

#[cfg(feature = "embedded-hal")]
impl embedded_hal::digital::InputPin for SysfsGpio {
    fn is_high(&mut self) -> Result<bool> {
        Ok(self.get_value()?.is_high())
    }

    fn is_low(&mut self) -> Result<bool> {
        Ok(!self.get_value()?.is_high())
    }
}

#[cfg(feature = "embedded-hal")]
impl embedded_hal::digital::OutputPin for SysfsGpio {
    fn set_low(&mut self) -> Result<()> {
        self.set_value(Level::Low)
    }

    fn set_high(&mut self) -> Result<()> {
        self.set_value(Level::High)
    }
}

// The value attribute of an output reads back the driven level.
#[cfg(feature = "embedded-hal")]
impl embedded_hal::digital::StatefulOutputPin for SysfsGpio {
    fn is_set_high(&mut self) -> Result<bool> {
        Ok(self.get_value()?.is_high())
    }

    fn is_set_low(&mut self) -> Result<bool> {
        Ok(!self.get_value()?.is_high())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    /// A directory laid out like `/sys/class/gpio` with `lines` pre-exported.
    struct FakeSysfs {
        root: PathBuf,
    }

    impl FakeSysfs {
        fn new(name: &str, lines: &[u32]) -> Self {
            let root = std::env::temp_dir()
                .join(format!("adi-hal-gpio-{}-{}", std::process::id(), name));
            let _ = fs::remove_dir_all(&root);
            fs::create_dir_all(&root).unwrap();
            fs::write(root.join("export"), "").unwrap();
            fs::write(root.join("unexport"), "").unwrap();
            for line in lines {
                let dir = root.join(format!("gpio{}", line));
                fs::create_dir_all(&dir).unwrap();
                fs::write(dir.join("direction"), "in").unwrap();
                fs::write(dir.join("value"), "0").unwrap();
            }
            FakeSysfs { root }
        }

        fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.root.join(rel)).unwrap()
        }
    }

    impl Drop for FakeSysfs {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn get_exports_the_line() {
        let sysfs = FakeSysfs::new("export", &[100]);

        let gpio = SysfsGpio::get_at(&sysfs.root, 100).unwrap();

        assert_eq!(gpio.number(), 100);
        assert_eq!(sysfs.read("export"), "100");
    }

    #[test]
    fn output_drives_the_value_attribute() {
        let sysfs = FakeSysfs::new("output", &[132]);
        let mut gpio = SysfsGpio::get_at(&sysfs.root, 132).unwrap();

        gpio.direction_output(Level::High).unwrap();
        assert_eq!(sysfs.read("gpio132/direction"), "out");
        assert_eq!(sysfs.read("gpio132/value"), "1");
        assert_eq!(gpio.get_direction().unwrap(), Direction::Output);
        assert_eq!(gpio.get_value().unwrap(), Level::High);

        gpio.set_value(Level::Low).unwrap();
        assert_eq!(gpio.get_value().unwrap(), Level::Low);
    }

    #[test]
    fn input_direction_is_read_back() {
        let sysfs = FakeSysfs::new("input", &[7]);
        let mut gpio = SysfsGpio::get_at(&sysfs.root, 7).unwrap();

        gpio.direction_output(Level::Low).unwrap();
        gpio.direction_input().unwrap();

        assert_eq!(gpio.get_direction().unwrap(), Direction::Input);
    }

    #[test]
    fn remove_unexports_the_line() {
        let sysfs = FakeSysfs::new("remove", &[54]);
        let gpio = SysfsGpio::get_at(&sysfs.root, 54).unwrap();

        gpio.remove().unwrap();

        assert_eq!(sysfs.read("unexport"), "54");
    }

    #[test]
    fn missing_export_is_an_error() {
        let sysfs = FakeSysfs::new("missing", &[]);
        fs::remove_file(sysfs.root.join("export")).unwrap();

        let err = SysfsGpio::get_at(&sysfs.root, 3).unwrap_err();

        assert!(matches!(err, Error::Gpio { number: 3, .. }));
        assert!(SysfsGpio::get_optional_at(&sysfs.root, 3).is_none());
    }

    #[test]
    fn line_created_late_is_opened_on_retry() {
        let sysfs = FakeSysfs::new("late", &[]);
        let line = sysfs.root.join("gpio11");
        let udev = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            fs::create_dir_all(&line).unwrap();
            fs::write(line.join("direction"), "in").unwrap();
            fs::write(line.join("value"), "1").unwrap();
        });

        let mut gpio = SysfsGpio::get_at(&sysfs.root, 11).unwrap();
        udev.join().unwrap();

        assert_eq!(gpio.get_value().unwrap(), Level::High);
    }

    #[test]
    fn missing_value_attribute_is_an_error() {
        let sysfs = FakeSysfs::new("novalue", &[12]);
        fs::remove_file(sysfs.root.join("gpio12/value")).unwrap();

        let err = SysfsGpio::get_at(&sysfs.root, 12).unwrap_err();

        match err {
            Error::Gpio { number, source } => {
                assert_eq!(number, 12);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(feature = "embedded-hal")]
    #[test]
    fn embedded_hal_pin_traits() {
        use embedded_hal::digital::{InputPin, OutputPin, StatefulOutputPin};

        let sysfs = FakeSysfs::new("ehal", &[9]);
        let mut gpio = SysfsGpio::get_at(&sysfs.root, 9).unwrap();
        gpio.direction_output(Level::Low).unwrap();

        gpio.set_high().unwrap();
        assert!(gpio.is_set_high().unwrap());
        assert!(gpio.is_high().unwrap());

        gpio.set_low().unwrap();
        assert!(gpio.is_low().unwrap());
    }
}
