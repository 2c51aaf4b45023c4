use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdfslice")]
#[command(about = "Split a PDF by page selectors into a merged subset and/or one PDF per page")]
#[command(version)]
pub struct Cli {
    /// PDF file to split
    pub input: PathBuf,

    /// Page selectors, comma separated: N, A-B, A-, -B (e.g. "1,3,5-7,10-")
    #[arg(long, allow_hyphen_values = true)]
    pub pages: String,

    /// Merged output PDF
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for one PDF per selected page
    #[arg(long)]
    pub per_page_dir: Option<PathBuf>,

    /// Interpret page numbers as zero-based
    #[arg(long)]
    pub zero_based: bool,

    /// Password for encrypted PDFs
    #[arg(long, env = "PDFSLICE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Print a JSON report instead of the summary lines
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, env = "PDFSLICE_VERBOSE", conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, env = "PDFSLICE_QUIET")]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pages_is_required() {
        assert!(Cli::try_parse_from(["pdfslice", "in.pdf"]).is_err());
    }

    #[test]
    fn test_open_started_range_is_not_a_flag() {
        let cli =
            Cli::try_parse_from(["pdfslice", "in.pdf", "--pages", "-3", "-o", "x.pdf"]).unwrap();
        assert_eq!(cli.pages, "-3");
    }

    #[test]
    fn test_parse_full() {
        let cli = Cli::try_parse_from([
            "pdfslice",
            "in.pdf",
            "--pages",
            "0-2",
            "-o",
            "out.pdf",
            "--per-page-dir",
            "pages",
            "--zero-based",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("in.pdf"));
        assert_eq!(cli.pages, "0-2");
        assert_eq!(cli.output, Some(PathBuf::from("out.pdf")));
        assert_eq!(cli.per_page_dir, Some(PathBuf::from("pages")));
        assert!(cli.zero_based);
        assert!(!cli.json);
    }
}
