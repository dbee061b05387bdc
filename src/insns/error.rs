use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("instruction at index {offset:#06x} runs past the end of the code item")]
    TooShort { offset: usize },
    #[error("unassigned opcode {value:#04x} at index {offset:#06x}")]
    BadOpcode { offset: usize, value: u8 },
    #[error("zero-width instruction at index {offset:#06x}")]
    ZeroWidth { offset: usize },
}
