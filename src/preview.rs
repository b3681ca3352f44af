use anyhow::{Context, Result};
use log::info;

use crate::{cli::PreviewArgs, dataset::Dataset, io_utils, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let delimiter = io_utils::resolve_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let dataset = Dataset::load(&args.input, delimiter, encoding)
        .with_context(|| format!("Loading {:?}", args.input))?;

    table::print_dataset(&dataset, args.rows);
    info!(
        "Displayed {} of {} row(s) from {:?}",
        dataset.len().min(args.rows),
        dataset.len(),
        args.input
    );
    Ok(())
}
