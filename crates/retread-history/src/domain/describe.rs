//! Human-readable labels for journal entries.

use retread_core::change::OperationKind;
use retread_core::row::RowSnapshot;

/// Composes the description stored with a journal entry.
pub trait Describer: Send + Sync {
    /// Describes `operation` applied to `snapshot`.
    fn describe(&self, operation: &OperationKind, snapshot: &RowSnapshot) -> String;
}

/// Default describer: verb, singular table noun and the row's natural label,
/// falling back to its id.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableDescriber;

impl Describer for TableDescriber {
    fn describe(&self, operation: &OperationKind, snapshot: &RowSnapshot) -> String {
        let verb = match operation {
            OperationKind::Create => "Created",
            OperationKind::Update => "Updated",
            OperationKind::Delete => "Deleted",
            OperationKind::Unknown(raw) => raw.as_str(),
        };
        let noun = snapshot.table().singular();
        match snapshot.label() {
            Some(label) => format!("{verb} {noun} \"{label}\""),
            None => format!("{verb} {noun} {}", snapshot.id()),
        }
    }
}
