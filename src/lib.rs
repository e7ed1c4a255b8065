//! Convert a BibTeX bibliography into one HTML page per publication year.
//!
//! [`loader::load_records`] groups the entries by year, [`render::render`] fills a template
//! for each year and writes `Literature<year>.html`.

pub mod cli;
pub mod loader;
pub mod record;
pub mod render;
