use crate::io::{report_field, summarize, write_summary};
use color_eyre::eyre::{Result, WrapErr};
use orbital::Universe;
use std::fs::File;
use tracing::info;

/// Log the attached field and optionally write its JSON summary.
pub fn report_universe(uni: &mut Universe, summary_path: Option<&String>) -> Result<()> {
    let Some(field) = uni.field() else {
        return Ok(());
    };
    let summary = summarize(field);
    report_field(&summary);

    if let Some(path) = summary_path {
        let mut file = File::create(path).wrap_err_with(|| format!("Unable to create summary file: {}", path))?;
        write_summary(&mut file, &summary)?;
        info!("Field summary written to: {}", path);
    }
    uni.mark_traits_updated();
    Ok(())
}
