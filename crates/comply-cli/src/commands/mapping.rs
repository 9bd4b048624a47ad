//! Mapping command implementation.

use crate::output::Formatter;
use crate::error::Result;
use comply_coverage::MappingTable;

/// Execute the mapping command.
pub fn execute_mapping(table: &MappingTable, formatter: &Formatter) -> Result<()> {
    println!("{}", formatter.format_mapping(table)?);
    Ok(())
}
