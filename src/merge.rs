//! Dataset merging.
//!
//! Filters both tables to films released after the cut-off year, drops
//! duplicate plots, and left-joins plots onto movies by `(title, year)`.
//! Movies without a plot keep an empty plot string; the join never drops a
//! movie.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::models::{MovieRecord, MovieRow, PlotRow};

/// Row counts observed while merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub movies_read: usize,
    pub movies_kept: usize,
    pub plots_read: usize,
    pub plots_kept: usize,
    /// Movies that found a plot row.
    pub matched: usize,
}

#[derive(Debug, Clone)]
pub struct MergeResult {
    pub records: Vec<MovieRecord>,
    pub stats: MergeStats,
}

/// Keep the first row for each key, preserving order.
fn dedup_by_key<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    rows.into_iter().filter(|r| seen.insert(key(r))).collect()
}

/// Filter the plot table to `release_year > min_year` and remove duplicate
/// `(title, year, plot)` and `(title, year)` rows. First occurrence wins.
pub fn prepare_plots(plots: Vec<PlotRow>, min_year: i32) -> Vec<PlotRow> {
    let plots: Vec<PlotRow> = plots
        .into_iter()
        .filter(|p| p.release_year.is_some_and(|y| y > min_year))
        .collect();
    let plots = dedup_by_key(plots, |p| (p.title.clone(), p.release_year, p.plot.clone()));
    dedup_by_key(plots, |p| (p.title.clone(), p.release_year))
}

/// Filter the movie table to `year > min_year` and keep the first row for
/// each `(name, year)`.
pub fn prepare_movies(movies: Vec<MovieRow>, min_year: i32) -> Vec<MovieRow> {
    let movies: Vec<MovieRow> = movies.into_iter().filter(|m| m.year > min_year).collect();
    dedup_by_key(movies, |m| (m.name.clone(), m.year))
}

/// Merge the two tables into upload-ready records.
pub fn merge(movies: Vec<MovieRow>, plots: Vec<PlotRow>, min_year: i32) -> MergeResult {
    let movies_read = movies.len();
    let plots_read = plots.len();

    let movies = prepare_movies(movies, min_year);
    let plots = prepare_plots(plots, min_year);
    let plots_kept = plots.len();

    let mut by_key: HashMap<(String, i32), String> = HashMap::with_capacity(plots.len());
    for p in plots {
        if let Some(year) = p.release_year {
            by_key.insert((p.title, year), p.plot);
        }
    }

    let mut matched = 0;
    let records: Vec<MovieRecord> = movies
        .into_iter()
        .map(|m| {
            let plot = match by_key.get(&(m.name.clone(), m.year)) {
                Some(plot) => {
                    matched += 1;
                    plot.clone()
                }
                None => String::new(),
            };
            MovieRecord {
                id: m.id,
                title: m.name,
                poster_link: m.poster_link,
                genres: m.genres,
                actors: m.actors,
                director: m.director,
                description: m.description,
                year: m.year,
                keywords: m.keywords,
                plot,
            }
        })
        .collect();

    let stats = MergeStats {
        movies_read,
        movies_kept: records.len(),
        plots_read,
        plots_kept,
        matched,
    };

    tracing::debug!(?stats, "datasets merged");
    MergeResult { records, stats }
}
