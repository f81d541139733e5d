// Export modules for use in tests
pub mod clipboard;
pub mod panic_handler;
pub mod pdf;
pub mod settings;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use settings::Settings;
pub use viewer::{DocumentInfo, Viewer};
