//! Command implementations for the Forge CLI.

pub mod inspect;
pub mod verify;
