//! SPI-visible registers of the ARM mailbox and DMA interface
//!
//! Addresses follow the AD9371 register map. Multi-byte registers occupy
//! consecutive byte addresses starting at the register id, least
//! significant byte first.

mod control;
mod dma;
mod mailbox;

pub use control::*;
pub use dma::*;
pub use mailbox::*;
