//! Console lines printed by the uploader.

use std::io::{self, Write};

use crate::rule::TempRange;

pub const BANNER_RULE: &str = "=========================================";
pub const BANNER_MESSAGE: &str = "All rules have been successfully uploaded!";

pub fn write_progress<W: Write + ?Sized>(out: &mut W, range: &TempRange) -> io::Result<()> {
    writeln!(out, "Added rule for temp range {range}")
}

pub fn write_dry_run_progress<W: Write + ?Sized>(out: &mut W, range: &TempRange) -> io::Result<()> {
    writeln!(out, "Would add rule for temp range {range}")
}

/// Writes the fixed three-line completion banner.
pub fn write_completion_banner<W: Write + ?Sized>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{BANNER_RULE}")?;
    writeln!(out, "{BANNER_MESSAGE}")?;
    writeln!(out, "{BANNER_RULE}")
}
