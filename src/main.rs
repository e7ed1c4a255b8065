use std::ffi::OsString;

use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use tracing::debug;

use bib2html::{
    cli::{self, Cli, Config},
    loader,
    render::{self, Template},
};

fn main() -> anyhow::Result<()> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    if cli::is_help_request(&argv) {
        Cli::command().print_help()?;
        return Ok(());
    }

    let args = Cli::parse_from(argv);
    if args.log {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }
    run(&Config::from(args))
}

/// Load the bibliography, then write one page per year.
fn run(config: &Config) -> anyhow::Result<()> {
    debug!(?config, "starting conversion");
    let years = loader::load_records(&config.bib_path)?;
    let template = Template::load(
        &config.template_path,
        &config.year_marker,
        &config.list_marker,
    )?;
    let written = render::render(&years, &template, &config.output_dir)?;

    let entries: usize = years.values().map(Vec::len).sum();
    summary(written.len(), entries);
    Ok(())
}

fn summary(pages: usize, entries: usize) {
    let tick = if std::env::var_os("NO_COLOR").is_some() {
        "✓".to_string()
    } else {
        "✓".green().to_string()
    };
    eprintln!("{tick} {pages} pages, {entries} entries");
}
