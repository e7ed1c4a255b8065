use std::{ffi::OsString, path::PathBuf};

use clap::{Parser, builder::NonEmptyStringValueParser};

use crate::render::{LIST_MARKER, YEAR_MARKER};

pub const DEFAULT_BIB_PATH: &str = "summary.bib";
pub const DEFAULT_TEMPLATE_PATH: &str = "template.html";
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Spellings that ask for help when given as the first argument.
const HELP_FLAGS: &[&str] = &["--help", "-h", "/?"];

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = None,
    disable_help_flag = true,
    disable_version_flag = true,
    override_usage = "bib2html [OPTIONS] [BIBTEX] [TEMPLATE] [OUTPUT_DIR]",
    after_help = "BIBTEX defaults to summary.bib, TEMPLATE to template.html and OUTPUT_DIR to the \
                  current directory. Options go before the paths; anything after OUTPUT_DIR is \
                  ignored."
)]
pub struct Cli {
    /// BibTeX file, template and output directory, in that order
    #[arg(
        value_name = "PATHS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub paths: Vec<PathBuf>,

    /// Text in the template replaced by the year
    #[arg(long, default_value = YEAR_MARKER, value_parser = NonEmptyStringValueParser::new())]
    pub year_marker: String,

    /// Text in the template replaced by the publication list
    #[arg(long, default_value = LIST_MARKER, value_parser = NonEmptyStringValueParser::new())]
    pub list_marker: String,

    /// Enable debug logging on stderr
    #[arg(long, default_value_t = false)]
    pub log: bool,
}

/// Everything a conversion run needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bib_path: PathBuf,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub year_marker: String,
    pub list_marker: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bib_path: DEFAULT_BIB_PATH.into(),
            template_path: DEFAULT_TEMPLATE_PATH.into(),
            output_dir: DEFAULT_OUTPUT_DIR.into(),
            year_marker: YEAR_MARKER.to_string(),
            list_marker: LIST_MARKER.to_string(),
        }
    }
}

impl From<Cli> for Config {
    /// Missing paths take their defaults; paths past the third are dropped.
    fn from(cli: Cli) -> Self {
        let defaults = Config::default();
        let mut paths = cli.paths.into_iter();
        Config {
            bib_path: paths.next().unwrap_or(defaults.bib_path),
            template_path: paths.next().unwrap_or(defaults.template_path),
            output_dir: paths.next().unwrap_or(defaults.output_dir),
            year_marker: cli.year_marker,
            list_marker: cli.list_marker,
        }
    }
}

/// Whether the first argument asks for help. Later arguments are never inspected.
pub fn is_help_request(args: &[OsString]) -> bool {
    args.get(1)
        .is_some_and(|first| HELP_FLAGS.iter().any(|flag| first.as_os_str() == *flag))
}
