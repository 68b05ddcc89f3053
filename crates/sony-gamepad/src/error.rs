use anyhow::Error;
use hidapi::HidError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GamepadError>;

#[derive(Error, Debug)]
pub enum GamepadError {
    #[error("communication error")]
    Hidapi(#[from] HidError),
    #[error("controller {0} not found")]
    NotFound(u32),
    #[error("unsupported device {vendor:04x}:{product:04x}")]
    UnsupportedDevice { vendor: u16, product: u16 },
    #[error("controller {0} is disconnected")]
    Disconnected(u32),
    #[error(transparent)]
    Anyhow(#[from] Error),
}
