use std::fmt;

use biblatex::{ChunksExt, Entry};
use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use thiserror::Error;

/// Base of the links synthesised for entries that only carry a DOI.
pub const DOI_RESOLVER: &str = "https://dx.doi.org/";

/// Fields that may name the venue, in order of preference.
const PUBLICATION_FIELDS: &[&str] = &["journal", "booktitle"];
/// Fields that may supply the link target, in order of preference.
const LINK_FIELDS: &[&str] = &["url", "doi"];

const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A publication reduced to what ends up on the rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub author: String,
    pub title: String,
    pub publication: String,
    pub url: String,
}

/// A field, or a set of alternative fields, that an entry has to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Field(&'static str),
    AnyOf(&'static [&'static str]),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Field(name) => f.write_str(name),
            Requirement::AnyOf(names) => f.write_str(&names.join(" or ")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed bibliography entry `{key}`: missing {}", list(.missing))]
pub struct RecordError {
    pub key: String,
    pub missing: Vec<Requirement>,
}

fn list(missing: &[Requirement]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Explicit lookup over the fields of a parsed entry.
///
/// Values are the verbatim field text with surrounding whitespace removed. A field that is
/// present but blank is reported as absent.
pub struct Fields<'a> {
    entry: &'a Entry,
}

impl<'a> Fields<'a> {
    pub fn new(entry: &'a Entry) -> Self {
        Fields { entry }
    }

    pub fn key(&self) -> &'a str {
        &self.entry.key
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let value = self.entry.get(name)?.format_verbatim();
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    /// The first of `names` that is present, together with the name that matched.
    pub fn first_of(&self, names: &'static [&'static str]) -> Option<(&'static str, String)> {
        names
            .iter()
            .find_map(|&name| self.get(name).map(|value| (name, value)))
    }
}

impl LinkRecord {
    /// Build the record for `entry` and return it with the entry's year.
    ///
    /// Every missing requirement is collected so the error names all of them at once.
    pub fn from_entry(entry: &Entry) -> Result<(String, LinkRecord), RecordError> {
        let fields = Fields::new(entry);
        let mut missing = Vec::new();
        let mut need = |value: Option<String>, requirement: Requirement| {
            if value.is_none() {
                missing.push(requirement);
            }
            value
        };

        let year = need(fields.get("year"), Requirement::Field("year"));
        let author = need(fields.get("author"), Requirement::Field("author"));
        let title = need(fields.get("title"), Requirement::Field("title"));
        let publication = need(
            fields.first_of(PUBLICATION_FIELDS).map(|(_, value)| value),
            Requirement::AnyOf(PUBLICATION_FIELDS),
        );
        let url = need(
            fields.first_of(LINK_FIELDS).map(|(name, value)| match name {
                "doi" => doi_link(&value),
                _ => value,
            }),
            Requirement::AnyOf(LINK_FIELDS),
        );

        match (year, author, title, publication, url) {
            (Some(year), Some(author), Some(title), Some(publication), Some(url)) => Ok((
                year,
                LinkRecord {
                    author,
                    title,
                    publication,
                    url,
                },
            )),
            _ => Err(RecordError {
                key: fields.key().to_string(),
                missing,
            }),
        }
    }
}

/// Resolver link for a DOI, as written in a bibliography.
///
/// Accepts bare DOIs as well as the `doi:` and `doi.org` URL spellings.
pub fn doi_link(doi: &str) -> String {
    static DOI_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^(?:urn:doi:|doi:|https?://(?:dx\.)?doi\.org/)\s*").unwrap()
    });

    let bare = DOI_PREFIX_RE.replace(doi.trim(), "");
    format!(
        "{DOI_RESOLVER}{}",
        utf8_percent_encode(&bare, PATH_SEGMENT_ENCODE_SET)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblatex::Bibliography;

    fn record(src: &str) -> Result<(String, LinkRecord), RecordError> {
        let bib = Bibliography::parse(src).expect("valid bibtex");
        let entry = bib.iter().next().expect("one entry");
        LinkRecord::from_entry(entry)
    }

    #[test]
    fn journal_wins_over_booktitle() {
        let (year, link) = record(
            "@article{k, author = {Doe, Jane}, title = {On Things}, year = {2020},
              journal = {J. Things}, booktitle = {Proc. Things}, url = {https://example.org/a}}",
        )
        .unwrap();
        assert_eq!(year, "2020");
        assert_eq!(link.publication, "J. Things");
        assert_eq!(link.author, "Doe, Jane");
        assert_eq!(link.title, "On Things");
    }

    #[test]
    fn booktitle_used_without_journal() {
        let (_, link) = record(
            "@inproceedings{k, author = {Doe}, title = {T}, year = {2021},
              booktitle = {Proc. Things}, url = {https://example.org/a}}",
        )
        .unwrap();
        assert_eq!(link.publication, "Proc. Things");
    }

    #[test]
    fn url_preferred_over_doi() {
        let (_, link) = record(
            "@article{k, author = {Doe}, title = {T}, year = {2021}, journal = {J},
              url = {https://example.org/paper}, doi = {10.1/xyz}}",
        )
        .unwrap();
        assert_eq!(link.url, "https://example.org/paper");
    }

    #[test]
    fn doi_becomes_resolver_link() {
        let (_, link) = record(
            "@article{k, author = {Doe}, title = {T}, year = {2021}, journal = {J},
              doi = {10.1/xyz}}",
        )
        .unwrap();
        assert_eq!(link.url, "https://dx.doi.org/10.1/xyz");
    }

    #[test]
    fn blank_url_falls_back_to_doi() {
        let (_, link) = record(
            "@article{k, author = {Doe}, title = {T}, year = {2021}, journal = {J},
              url = {  }, doi = {10.1/xyz}}",
        )
        .unwrap();
        assert_eq!(link.url, "https://dx.doi.org/10.1/xyz");
    }

    #[test]
    fn doi_link_strips_known_prefixes() {
        assert_eq!(doi_link("10.1/xyz"), "https://dx.doi.org/10.1/xyz");
        assert_eq!(doi_link("doi:10.1/xyz"), "https://dx.doi.org/10.1/xyz");
        assert_eq!(doi_link("https://doi.org/10.1/xyz"), "https://dx.doi.org/10.1/xyz");
        assert_eq!(doi_link("http://dx.doi.org/10.1/xyz"), "https://dx.doi.org/10.1/xyz");
    }

    #[test]
    fn doi_link_encodes_unsafe_characters() {
        assert_eq!(
            doi_link("10.1002/(SICI)1097 <x>"),
            "https://dx.doi.org/10.1002/(SICI)1097%20%3Cx%3E"
        );
    }

    #[test]
    fn missing_link_is_an_error() {
        let err = record(
            "@article{nolink, author = {Doe}, title = {T}, year = {2021}, journal = {J}}",
        )
        .unwrap_err();
        assert_eq!(err.key, "nolink");
        assert_eq!(err.missing, vec![Requirement::AnyOf(LINK_FIELDS)]);
        assert_eq!(
            err.to_string(),
            "malformed bibliography entry `nolink`: missing url or doi"
        );
    }

    #[test]
    fn every_missing_requirement_is_reported() {
        let err = record("@misc{bare, title = {T}}").unwrap_err();
        assert_eq!(
            err.missing,
            vec![
                Requirement::Field("year"),
                Requirement::Field("author"),
                Requirement::AnyOf(PUBLICATION_FIELDS),
                Requirement::AnyOf(LINK_FIELDS),
            ]
        );
        assert!(
            err.to_string()
                .ends_with("missing year, author, journal or booktitle, url or doi")
        );
    }

    #[test]
    fn fields_lookup_is_explicit() {
        let bib = Bibliography::parse(
            "@article{k, author = {Doe}, title = {  }, booktitle = {B}}",
        )
        .unwrap();
        let entry = bib.iter().next().unwrap();
        let fields = Fields::new(entry);
        assert_eq!(fields.key(), "k");
        assert_eq!(fields.get("author").as_deref(), Some("Doe"));
        assert_eq!(fields.get("title"), None);
        assert_eq!(fields.get("journal"), None);
        assert_eq!(
            fields.first_of(PUBLICATION_FIELDS),
            Some(("booktitle", "B".to_string()))
        );
    }
}
