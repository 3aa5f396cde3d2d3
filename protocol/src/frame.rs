use crate::constants::{
    ANALOG_MESSAGE, DIGITAL_MESSAGE, END_SYSEX, MAX_SYSEX_LEN, MSG_CMD_MIN, REPORT_VERSION,
    START_SYSEX,
};
use log::{debug, warn};

/// A complete message received from the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `0x90 | port` followed by an lsb/msb port mask.
    Digital { port: u8, lsb: u8, msb: u8 },
    /// `0xE0 | pin` followed by an lsb/msb value.
    Analog { pin: u8, lsb: u8, msb: u8 },
    /// `REPORT_VERSION` followed by major and minor.
    Version { major: u8, minor: u8 },
    /// `START_SYSEX id payload.. END_SYSEX`.
    Sysex { id: u8, payload: Vec<u8> },
    /// A command byte the host has no handler for.
    Unknown(u8),
}

impl Frame {
    /// The dispatch key: the base command byte, or the sysex ID.
    pub fn command(&self) -> u8 {
        match self {
            Frame::Digital { .. } => DIGITAL_MESSAGE,
            Frame::Analog { .. } => ANALOG_MESSAGE,
            Frame::Version { .. } => REPORT_VERSION,
            Frame::Sysex { id, .. } => *id,
            Frame::Unknown(cmd) => *cmd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Digital(u8),
    Analog(u8),
    Version,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Command {
        pending: Pending,
        args: [u8; 2],
        have: usize,
    },
    SysexId,
    SysexPayload {
        id: u8,
        payload: Vec<u8>,
    },
    /// Over-long sysex; swallow everything up to the terminator.
    SysexDiscard,
}

/// Non-sysex commands the host understands. Each carries two data bytes.
fn pending_for(command: u8) -> Option<Pending> {
    match command {
        0x90..=0x9F => Some(Pending::Digital(command & 0x0F)),
        0xE0..=0xEF => Some(Pending::Analog(command & 0x0F)),
        REPORT_VERSION => Some(Pending::Version),
        _ => None,
    }
}

/// Push-style Firmata framer, fed one byte at a time from the receive FIFO.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    state: State,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        // A sysex start always wins, even mid-frame.
        if byte == START_SYSEX {
            if !matches!(self.state, State::Idle) {
                debug!("Restarting sysex frame, discarding partial message");
            }
            self.state = State::SysexId;
            return None;
        }

        match std::mem::take(&mut self.state) {
            State::Idle => self.start(byte),
            State::Command {
                pending,
                mut args,
                have,
            } => {
                if byte >= MSG_CMD_MIN {
                    debug!("Command {byte:#04x} interrupted a partial message");
                    return self.start(byte);
                }
                args[have] = byte;
                if have + 1 < args.len() {
                    self.state = State::Command {
                        pending,
                        args,
                        have: have + 1,
                    };
                    return None;
                }
                Some(match pending {
                    Pending::Digital(port) => Frame::Digital {
                        port,
                        lsb: args[0],
                        msb: args[1],
                    },
                    Pending::Analog(pin) => Frame::Analog {
                        pin,
                        lsb: args[0],
                        msb: args[1],
                    },
                    Pending::Version => Frame::Version {
                        major: args[0],
                        minor: args[1],
                    },
                })
            }
            State::SysexId => {
                if byte >= MSG_CMD_MIN {
                    warn!("Sysex frame with no ID, got {byte:#04x}");
                    return self.start(byte);
                }
                self.state = State::SysexPayload {
                    id: byte,
                    payload: Vec::new(),
                };
                None
            }
            State::SysexPayload { id, mut payload } => {
                if byte == END_SYSEX {
                    return Some(Frame::Sysex { id, payload });
                }
                if payload.len() >= MAX_SYSEX_LEN {
                    warn!("Sysex frame {id:#04x} exceeds {MAX_SYSEX_LEN} bytes, dropping");
                    self.state = State::SysexDiscard;
                    return None;
                }
                payload.push(byte);
                self.state = State::SysexPayload { id, payload };
                None
            }
            State::SysexDiscard => {
                if byte != END_SYSEX {
                    self.state = State::SysexDiscard;
                }
                None
            }
        }
    }

    /// Feeds a whole buffer, returning every frame completed by it.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|b| self.push(*b)).collect()
    }

    fn start(&mut self, byte: u8) -> Option<Frame> {
        if byte < MSG_CMD_MIN {
            debug!("Discarding stray data byte {byte:#04x}");
            return None;
        }
        match pending_for(byte) {
            Some(pending) => {
                self.state = State::Command {
                    pending,
                    args: [0; 2],
                    have: 0,
                };
                None
            }
            None => Some(Frame::Unknown(byte)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn digital_and_analog_messages() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.extend(&[0x91, 0x05, 0x01, 0xE3, 0x7F, 0x07]);
        assert_eq!(
            frames,
            vec![
                Frame::Digital {
                    port: 1,
                    lsb: 0x05,
                    msb: 0x01
                },
                Frame::Analog {
                    pin: 3,
                    lsb: 0x7F,
                    msb: 0x07
                },
            ]
        );
        assert_eq!(frames[1].command(), ANALOG_MESSAGE);
    }

    #[test]
    fn version_report() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(
            decoder.extend(&[0xF9, 2, 5]),
            vec![Frame::Version { major: 2, minor: 5 }]
        );
    }

    #[test]
    fn sysex_frame_split_across_pushes() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.extend(&[0xF0, 0x79, 1]).is_empty());
        let frames = decoder.extend(&[4, b'A', 0, 0xF7]);
        assert_eq!(
            frames,
            vec![Frame::Sysex {
                id: 0x79,
                payload: vec![1, 4, b'A', 0]
            }]
        );
    }

    #[test]
    fn empty_sysex_payload() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(
            decoder.extend(&[0xF0, 0x6A, 0xF7]),
            vec![Frame::Sysex {
                id: 0x6A,
                payload: vec![]
            }]
        );
    }

    #[test]
    fn junk_is_discarded_until_a_command() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.extend(&[0x01, 0x02, 0x7F, 0x90, 0x01, 0x00]);
        assert_eq!(
            frames,
            vec![Frame::Digital {
                port: 0,
                lsb: 1,
                msb: 0
            }]
        );
    }

    #[test]
    fn unknown_commands_are_reported() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.extend(&[0xC1, 0x01, 0xE0, 0x10, 0x00]);
        assert_eq!(
            frames,
            vec![
                Frame::Unknown(0xC1),
                Frame::Analog {
                    pin: 0,
                    lsb: 0x10,
                    msb: 0
                }
            ]
        );
    }

    #[test]
    fn start_sysex_restarts_partial_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.extend(&[0xF0, 0x71, b'h', 0xF0, 0x63, 7, 10, 0, 0xF7]);
        assert_eq!(
            frames,
            vec![Frame::Sysex {
                id: 0x63,
                payload: vec![7, 10, 0]
            }]
        );
    }

    #[test]
    fn command_interrupting_short_message() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.extend(&[0x90, 0x01, 0xE1, 0x02, 0x00]);
        assert_eq!(
            frames,
            vec![Frame::Analog {
                pin: 1,
                lsb: 2,
                msb: 0
            }]
        );
    }

    #[test]
    fn oversized_sysex_is_dropped() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = vec![0xF0, 0x71];
        bytes.extend(std::iter::repeat(0x41).take(MAX_SYSEX_LEN + 10));
        bytes.push(0xF7);
        bytes.extend([0xF9, 2, 6]);
        assert_eq!(
            decoder.extend(&bytes),
            vec![Frame::Version { major: 2, minor: 6 }]
        );
    }
}
