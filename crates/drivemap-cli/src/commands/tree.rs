//! Tree command - Print the mapping tree

use anyhow::Result;
use clap::Args;

use drivemap_core::domain::MapFile;

use super::Context;
use crate::output::get_formatter;

#[derive(Debug, Args)]
pub struct TreeCommand {}

impl TreeCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let registry = ctx.load_registry()?;
        if ctx.format.is_json() {
            let formatter = get_formatter(ctx.format);
            formatter.print_json(&serde_json::to_value(MapFile::from_registry(&registry)?)?);
            return Ok(());
        }
        print!("{}", registry.tree());
        Ok(())
    }
}
