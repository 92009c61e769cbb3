//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use safext_core::ExtractionReport;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn summary_lines(&self, report: &ExtractionReport) -> Vec<String> {
        let mut lines = vec![
            format!("  Type: {}", report.extracted_type),
            format!("  Files extracted: {}", report.files),
            format!("  Directories: {}", report.dirs),
            format!("  Total size: {}", Self::format_size(report.extraction_size)),
        ];
        if report.pattern_mismatches > 0 {
            lines.push(format!("  Skipped by pattern: {}", report.pattern_mismatches));
        }
        if report.unsupported_files > 0 {
            lines.push(format!(
                "  Unsupported entries: {} (last: {})",
                report.unsupported_files,
                report.last_unsupported_file.as_deref().unwrap_or("-")
            ));
        }
        if report.extraction_errors > 0 {
            lines.push(format!(
                "  Errors: {} (last: {})",
                report.extraction_errors,
                report.last_extraction_error.as_deref().unwrap_or("-")
            ));
        }
        if self.verbose {
            lines.push(format!("  Symlinks: {}", report.symlinks));
            lines.push(format!(
                "  Input read: {}",
                Self::format_size(report.input_size)
            ));
            lines.push(format!("  Duration: {:?}", report.duration));
        }
        lines
    }

    fn write_lines(&self, lines: &[String]) {
        for line in lines {
            let _ = self.term.write_line(line);
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if self.use_colors {
            let _ = self.term.write_line(&format!(
                "{} Extraction complete",
                style("✓").green().bold()
            ));
        } else {
            let _ = self.term.write_line("Extraction complete");
        }
        self.write_lines(&self.summary_lines(report));

        Ok(())
    }

    fn format_extraction_failure(
        &self,
        report: &ExtractionReport,
        _error: &anyhow::Error,
    ) -> Result<()> {
        // The error itself goes to stderr through main.
        if self.quiet || report.total_items() == 0 {
            return Ok(());
        }

        if self.use_colors {
            let _ = self.term.write_line(&format!(
                "{} Extraction stopped after",
                style("✗").red().bold()
            ));
        } else {
            let _ = self.term.write_line("Extraction stopped after");
        }
        self.write_lines(&self.summary_lines(report));

        Ok(())
    }
}
