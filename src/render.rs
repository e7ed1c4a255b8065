use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use quick_xml::escape::partial_escape;
use tracing::debug;

use crate::{loader::YearGrouping, record::LinkRecord};

pub const YEAR_MARKER: &str = "$THE_YEAR$";
pub const LIST_MARKER: &str = "$THE_LIST$";

/// Page text with a marker for the year and one for the publication list.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
    year_marker: String,
    list_marker: String,
}

impl Template {
    pub fn with_markers(
        text: impl Into<String>,
        year_marker: impl Into<String>,
        list_marker: impl Into<String>,
    ) -> Self {
        Template {
            text: text.into(),
            year_marker: year_marker.into(),
            list_marker: list_marker.into(),
        }
    }

    pub fn load(path: &Path, year_marker: &str, list_marker: &str) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read template {}", path.display()))?;
        Ok(Template::with_markers(text, year_marker, list_marker))
    }

    /// Substitute every year marker, then every list marker.
    pub fn fill(&self, year: &str, list: &str) -> String {
        self.text
            .replace(&self.year_marker, year)
            .replace(&self.list_marker, list)
    }
}

/// The `<ul>` block for one year, sorted by author.
///
/// Text nodes escape only `&`, `<` and `>` so apostrophes stay literal.
///
/// The sort is stable: records by the same author keep their bibliography order.
pub fn render_list(records: &[LinkRecord]) -> String {
    let mut sorted: Vec<&LinkRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.author.cmp(&b.author));

    let mut html = String::from("<ul>");
    for link in sorted {
        html.push_str(&format!(
            "<li><a href='{}'>{}</a> ({}) <i>{}</i></li>\n",
            quote_attribute(&link.url),
            partial_escape(link.title.as_str()),
            partial_escape(link.author.as_str()),
            partial_escape(link.publication.as_str()),
        ));
    }
    html.push_str("</ul>");
    html
}

/// Escape a value for a single-quoted attribute, using `&#39;` which every HTML version knows.
fn quote_attribute(value: &str) -> String {
    partial_escape(value).replace('\'', "&#39;")
}

/// Every page to be written, as `(year, html)` in ascending year order.
pub fn render_pages(grouping: &YearGrouping, template: &Template) -> Vec<(String, String)> {
    let mut years: Vec<&String> = grouping.keys().collect();
    years.sort();

    years
        .into_iter()
        .map(|year| {
            let page = template.fill(year, &render_list(&grouping[year]));
            (year.clone(), page)
        })
        .collect()
}

pub fn page_path(output_dir: &Path, year: &str) -> PathBuf {
    output_dir.join(format!("Literature{year}.html"))
}

/// Write one page per year into `output_dir`, replacing existing files.
///
/// Returns the written paths in the order they were written. Files written before a failure
/// are left in place.
pub fn render(
    grouping: &YearGrouping,
    template: &Template,
    output_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(grouping.len());
    for (year, page) in render_pages(grouping, template) {
        let path = page_path(output_dir, &year);
        println!("Writing to {}", path.display());
        fs::write(&path, &page).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(year = %year, bytes = page.len(), "wrote page");
        written.push(path);
    }
    Ok(written)
}
