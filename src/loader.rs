use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, anyhow};
use biblatex::{Bibliography, Entry, RawBibliography, RawEntry, Spanned};
use tracing::debug;

use crate::record::{LinkRecord, RecordError};

/// Link records keyed by publication year, each list in bibliography order.
pub type YearGrouping = HashMap<String, Vec<LinkRecord>>;

/// Read the bibliography at `path` and group its entries by year.
pub fn load_records(path: &Path) -> anyhow::Result<YearGrouping> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read bibliography {}", path.display()))?;
    parse_records(&text).with_context(|| format!("while loading {}", path.display()))
}

pub fn parse_records(text: &str) -> anyhow::Result<YearGrouping> {
    let entries = parse_entries(text)?;
    let years = group_by_year(&entries)?;
    debug!(entries = entries.len(), years = years.len(), "loaded bibliography");
    Ok(years)
}

/// Parse every entry in source order, keeping entries whose citation key repeats.
///
/// `Bibliography` refuses repeated keys, so the raw entries are spread over layers in which
/// each key occurs once: the n-th occurrence of a key goes to layer n. Each layer is resolved
/// with the file's `@string` abbreviations. Cross-references resolve within a layer.
pub fn parse_entries(text: &str) -> anyhow::Result<Vec<Entry>> {
    let raw = RawBibliography::parse(text).map_err(|e| anyhow!("failed to parse BibTeX: {e}"))?;

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut layers: Vec<Vec<Spanned<RawEntry>>> = Vec::new();
    let mut order = Vec::with_capacity(raw.entries.len());
    for entry in raw.entries {
        let layer = occurrences.entry(entry.v.key.v).or_default();
        if *layer == layers.len() {
            layers.push(Vec::new());
        }
        order.push((*layer, layers[*layer].len()));
        layers[*layer].push(entry);
        *layer += 1;
    }

    let resolved = layers
        .into_iter()
        .map(|entries| {
            Bibliography::from_raw(RawBibliography {
                preamble: String::new(),
                entries,
                abbreviations: raw.abbreviations.clone(),
            })
            .map(|bib| bib.into_iter().collect::<Vec<_>>())
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("failed to parse BibTeX: {e}"))?;

    order
        .into_iter()
        .map(|(layer, index)| {
            resolved
                .get(layer)
                .and_then(|entries| entries.get(index))
                .cloned()
                .ok_or_else(|| anyhow!("BibTeX entry {index} of layer {layer} went missing"))
        })
        .collect()
}

/// Fails on the first entry that cannot be turned into a link record.
pub fn group_by_year<'a, I>(entries: I) -> Result<YearGrouping, RecordError>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut years = YearGrouping::new();
    for entry in entries {
        let (year, link) = LinkRecord::from_entry(entry)?;
        years.entry(year).or_default().push(link);
    }
    Ok(years)
}
