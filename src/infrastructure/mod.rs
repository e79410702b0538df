// Infrastructure implementations for Kaizen Graph.

pub mod concurrency;
pub mod json_exporter;
pub mod snapshot_loader;

pub use json_exporter::JsonExporter;
pub use snapshot_loader::SnapshotLoader;
