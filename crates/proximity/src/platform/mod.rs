//! Platform-specific implementations.

#[cfg(all(target_os = "linux", feature = "iio"))]
mod linux;

#[cfg(any(test, all(target_os = "linux", feature = "iio")))]
mod reader;

#[cfg(all(target_os = "linux", feature = "iio"))]
pub use linux::LinuxProvider;

// Re-export the appropriate provider for the current platform
#[cfg(all(target_os = "linux", feature = "iio"))]
pub type PlatformProvider = LinuxProvider;

#[cfg(not(all(target_os = "linux", feature = "iio")))]
pub type PlatformProvider = crate::provider::NullProvider;
