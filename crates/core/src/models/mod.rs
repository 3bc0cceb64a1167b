//! Data models for Pawpark

mod chat;
mod member;
mod profile;
mod recent;
mod venue;

pub use chat::*;
pub use member::*;
pub use profile::*;
pub use recent::*;
pub use venue::*;
