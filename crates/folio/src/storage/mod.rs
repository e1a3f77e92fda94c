//! Page sources backed by on-device storage

pub mod local_source;

pub use local_source::LocalPageSource;
