//! Built-in vendor platforms.

pub mod arista;
pub mod cisco;
pub mod dell;
pub mod fortinet;
pub mod h3c;
pub mod solace;
