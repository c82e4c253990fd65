//! This module provides an extension for [`Summary`] to render the captured
//! resource identifiers as a table.

use crate::provisioner::Summary;

/// Extension trait for [`Summary`] to provide table rendering capabilities.
pub trait SummaryExt {
    /// Renders the captured resource identifiers into a human-readable table
    /// string with columns "RESOURCE" and "IDENTIFIER".
    fn render_table(&self) -> String;
}

impl SummaryExt for Summary {
    fn render_table(&self) -> String {
        let rows = std::iter::once(["vpc".to_string(), self.vpc_id.clone()])
            .chain(self.subnet_ids.iter().map(|id| ["subnet".to_string(), id.clone()]))
            .chain(
                self.security_group_ids
                    .iter()
                    .map(|id| ["security-group".to_string(), id.clone()]),
            )
            .collect::<Vec<_>>();

        comfy_table::Table::new()
            .load_preset(comfy_table::presets::NOTHING)
            .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
            .set_header(vec!["RESOURCE", "IDENTIFIER"])
            .add_rows(rows)
            .to_string()
    }
}
