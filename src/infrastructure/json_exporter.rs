use crate::api::dto::DerivationDto;
use crate::application::DerivedSnapshot;
use crate::error::Result;
use crate::ports::DerivationExporter;

/// Pretty-printed JSON: a single object for one snapshot, an array otherwise.
pub struct JsonExporter;

impl DerivationExporter for JsonExporter {
    fn render(&self, snapshots: &[DerivedSnapshot]) -> Result<String> {
        let dtos: Vec<DerivationDto> = snapshots.iter().map(DerivationDto::from).collect();
        let content = match dtos.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            _ => serde_json::to_string_pretty(&dtos)?,
        };
        Ok(content)
    }
}
