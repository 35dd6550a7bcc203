pub mod file;

pub use file::{load_file, save_file, FileSource};

use async_trait::async_trait;

/// Where serialized recordings come from.
///
/// Implementations wrap whatever transport the host has (files, HTTP, an
/// asset bundle). Failures are reported to the engine, which keeps running
/// with an unloaded recording.
#[async_trait]
pub trait RecordingSource: Send + Sync {
    /// Fetch the serialized recording at `location`
    async fn fetch(&self, location: &str) -> anyhow::Result<String>;
}
