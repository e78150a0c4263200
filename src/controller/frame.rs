//! Decoding of the controller's byte stream.
//!
//! A frame is the magic byte [`MAGIC`] followed by a little-endian `u16` : the channel id in the 6 upper bits and the
//! raw value in the 10 lower ones.

pub const MAGIC: u8 = 42;
const CHANNEL_MASK: u16 = 0xfc00;
const VALUE_MASK: u16 = 0x03ff;

/// One decoded channel value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample {
    pub channel: u16,
    /// Normalized to `[0, 1]`.
    pub value: f64,
}

impl From<u16> for Sample {
    fn from(word: u16) -> Self {
        Self {
            channel: (word & CHANNEL_MASK) >> 10,
            value: (word & VALUE_MASK) as f64 / VALUE_MASK as f64,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
enum State {
    #[default]
    Magic,
    Low,
    High(u8),
}

/// Byte by byte decoder. Bytes preceding a magic byte are dropped, which resynchronizes the stream after garbage.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    state: State,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { state: State::Magic }
    }

    /// Feed one byte, returning a sample when it completes a frame.
    pub fn push(&mut self, byte: u8) -> Option<Sample> {
        match self.state {
            State::Magic => {
                if byte == MAGIC {
                    self.state = State::Low;
                } else {
                    log::trace!("Skipping byte {byte} while waiting for a frame.");
                }
                None
            }
            State::Low => {
                self.state = State::High(byte);
                None
            }
            State::High(low) => {
                self.state = State::Magic;
                Some(Sample::from(u16::from_le_bytes([low, byte])))
            }
        }
    }
}
