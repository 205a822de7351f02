//! Input/Output operations for grid field calculations
//!
//! This module handles logging setup, basis set files and field reports.

mod basis_loader;
mod output;

pub use basis_loader::load_basis_file;
pub use output::{report_field, setup_output, summarize, write_summary};
