pub mod config;
pub mod contexts;
pub mod error;
pub mod pass;
pub mod render_pass;
pub mod resources;
pub mod sync;
pub mod usage;

#[cfg(test)]
mod testing;
