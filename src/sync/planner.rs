//! Field-set planning
//!
//! Computes the ordered set of source columns eligible for propagation.
//! The plan is derived from configuration and schema only, so the engine
//! computes it once per configuration and reuses it across events.

use std::collections::BTreeSet;

use tracing::debug;

use crate::board::BoardSchema;
use crate::board::ColumnId;
use crate::board::ColumnType;

/// Deterministic, ordered set of column ids eligible for propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    columns: Vec<ColumnId>,
}

impl FieldPlan {
    /// Plan the propagation set for a source board.
    ///
    /// Includes every source column except those explicitly excluded,
    /// the link column itself (overwriting the cross-reference on the
    /// target would corrupt the link), inherently read-only types and
    /// types no codec exists for. Order is the source board's native
    /// column order.
    #[must_use]
    pub fn compute(
        source_schema: &BoardSchema,
        excluded_columns: &BTreeSet<ColumnId>,
        link_column: &ColumnId,
    ) -> Self {
        let columns: Vec<ColumnId> = source_schema
            .columns
            .iter()
            .filter(|def| {
                if excluded_columns.contains(&def.id) || &def.id == link_column {
                    return false;
                }
                if def.column_type.is_read_only() {
                    return false;
                }
                if matches!(def.column_type, ColumnType::Unknown | ColumnType::File) {
                    debug!(column = %def.id, tag = %def.column_type, "column type not plannable");
                    return false;
                }
                true
            })
            .map(|def| def.id.clone())
            .collect();

        debug!(
            total = source_schema.columns.len(),
            planned = columns.len(),
            "computed field plan"
        );
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
