//! Serial device setup.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::fcntl::OFlag;
use nix::sys::termios::{
    cfmakeraw, cfsetspeed, tcgetattr, tcsetattr, BaudRate, SetArg, SpecialCharacterIndices,
};

use crate::controller::ControllerError;

/// Open the device in raw mode at 9600 bauds. Reads never block : with `VMIN` and `VTIME` at zero, a read with no
/// pending data returns at once with nothing.
pub fn open(path: &Path) -> Result<File, ControllerError> {
    let port = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(OFlag::O_NOCTTY.bits())
        .open(path)?;

    let mut termios = tcgetattr(&port)?;
    cfmakeraw(&mut termios);
    cfsetspeed(&mut termios, BaudRate::B9600)?;
    termios.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    termios.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    tcsetattr(&port, SetArg::TCSANOW, &termios)?;
    Ok(port)
}
