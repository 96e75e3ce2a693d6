use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScratchError {
    #[error("A card needs exactly 9 symbols, got {0}")]
    InvalidSymbolCount(usize),
    #[error("Invalid cell index {0}")]
    InvalidCell(usize),
    #[error("Cover surface of {0}x{1} is too small to sample")]
    InvalidSurfaceSize(u32, u32),
    #[error("No card has been dealt")]
    NoActiveCard,
    #[error("Invalid money amount")]
    InvalidMoney,
    #[error("Symbol pool is empty")]
    EmptySymbolPool,
}

pub type Result<T> = core::result::Result<T, ScratchError>;
