pub mod errors;
pub mod index;
pub mod map;

#[cfg(test)]
mod utils;

pub const CRATE_NAME: &str = "bwalign";
