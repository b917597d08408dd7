pub mod align;
pub mod cli;
pub mod commands;
pub mod power;
pub mod score;
pub mod utils;
