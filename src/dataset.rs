//! CSV loading for the two source tables.
//!
//! Only the columns the loader uses are read; any other columns in the
//! files are ignored. Empty cells become empty strings.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::models::{MovieRow, PlotRow};

#[derive(Debug, Deserialize)]
struct RawMovie {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "PosterLink", default)]
    poster_link: Option<String>,
    #[serde(rename = "Genres", default)]
    genres: Option<String>,
    #[serde(rename = "Actors", default)]
    actors: Option<String>,
    #[serde(rename = "Director", default)]
    director: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "DatePublished", default)]
    date_published: Option<String>,
    #[serde(rename = "Keywords", default)]
    keywords: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlot {
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Plot", default)]
    plot: Option<String>,
    #[serde(
        rename = "Release Year",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    release_year: Option<i32>,
}

const MOVIE_COLUMNS: &[&str] = &[
    "id",
    "Name",
    "PosterLink",
    "Genres",
    "Actors",
    "Director",
    "Description",
    "DatePublished",
    "Keywords",
];
const PLOT_COLUMNS: &[&str] = &["Title", "Plot", "Release Year"];

/// Load the movie table from a CSV file.
pub fn load_movies(path: &Path) -> Result<Vec<MovieRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open movie dataset: {}", path.display()))?;
    read_movies(file).with_context(|| format!("Failed to load {}", path.display()))
}

/// Load the plot table from a CSV file.
pub fn load_plots(path: &Path) -> Result<Vec<PlotRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open plot dataset: {}", path.display()))?;
    read_plots(file).with_context(|| format!("Failed to load {}", path.display()))
}

pub fn read_movies<R: Read>(input: R) -> Result<Vec<MovieRow>> {
    let mut reader = csv::Reader::from_reader(input);
    require_columns(&mut reader, MOVIE_COLUMNS)?;

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<RawMovie>().enumerate() {
        let raw = result.with_context(|| format!("Malformed movie row {}", i + 1))?;
        let year = raw
            .date_published
            .as_deref()
            .and_then(parse_year)
            .unwrap_or(0);
        rows.push(MovieRow {
            id: raw.id.unwrap_or_default(),
            name: raw.name.unwrap_or_default(),
            poster_link: raw.poster_link.unwrap_or_default(),
            genres: raw.genres.unwrap_or_default(),
            actors: raw.actors.unwrap_or_default(),
            director: raw.director.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            keywords: raw.keywords.unwrap_or_default(),
            year,
        });
    }
    Ok(rows)
}

pub fn read_plots<R: Read>(input: R) -> Result<Vec<PlotRow>> {
    let mut reader = csv::Reader::from_reader(input);
    require_columns(&mut reader, PLOT_COLUMNS)?;

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<RawPlot>().enumerate() {
        let raw = result.with_context(|| format!("Malformed plot row {}", i + 1))?;
        rows.push(PlotRow {
            title: raw.title.unwrap_or_default(),
            plot: raw.plot.unwrap_or_default(),
            release_year: raw.release_year,
        });
    }
    Ok(rows)
}

fn require_columns<R: Read>(reader: &mut csv::Reader<R>, columns: &[&str]) -> Result<()> {
    let headers = reader.headers().context("Failed to read CSV header")?;
    for col in columns {
        if !headers.iter().any(|h| h == *col) {
            anyhow::bail!("Missing required column '{}'", col);
        }
    }
    Ok(())
}

/// Extract the calendar year from a publication date cell.
///
/// Returns `None` for empty or unrecognised values.
pub fn parse_year(value: &str) -> Option<i32> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.year());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.year());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.year());
        }
    }
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok();
    }
    None
}
