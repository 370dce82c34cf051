//! Native tray backends

mod backend;
pub mod memory_backend;

#[cfg(target_os = "macos")]
pub(crate) mod cocoa_backend;

#[cfg(target_os = "linux")]
pub(crate) mod ksni_backend;

pub use backend::*;
pub use memory_backend::MemoryBackend;

#[cfg(target_os = "macos")]
pub use cocoa_backend::CocoaBackend;

#[cfg(target_os = "linux")]
pub use ksni_backend::KsniBackend;
