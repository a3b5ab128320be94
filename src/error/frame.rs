use std::fmt::{Display, Formatter};

#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    Fragmented,

    ReservedBits,

    Compressed,

    UnsupportedOpCode,

    UnmaskedClientFrame,

    PayloadTooLong,
}

impl Display for FrameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use FrameError::*;
        match self {
            Fragmented => write!(f, "Fragmented frame"),
            ReservedBits => write!(f, "Reserved bits 2/3 set"),
            Compressed => write!(f, "Compressed frame"),
            UnsupportedOpCode => {
                write!(f, "Unsupported opcode, only text and close are accepted")
            }
            UnmaskedClientFrame => write!(f, "Client frame without mask"),
            PayloadTooLong => write!(f, "Payload length out of range"),
        }
    }
}

// use default impl
impl std::error::Error for FrameError {}
