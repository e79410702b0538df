use crate::application::{DerivedSnapshot, Snapshot};
use crate::error::{Error, Result};

pub mod dot_exporter;

/// Where workflow snapshots come from (files, a socket, a test fixture).
pub trait SnapshotSource {
    fn load(&self) -> Result<Vec<Snapshot>>;
}

pub trait DerivationExporter {
    fn render(&self, snapshots: &[DerivedSnapshot]) -> Result<String>;

    fn export(&self, snapshots: &[DerivedSnapshot], path: &str) -> Result<()> {
        let content = self.render(snapshots)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Output formats understood by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Dot,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Result<ExportFormat> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "dot" | "graphviz" => Ok(ExportFormat::Dot),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Dot => "dot",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
