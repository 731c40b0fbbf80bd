//! Core data models used throughout the loader.
//!
//! Rows flow `MovieRow` + `PlotRow` → [`MovieRecord`] (merge) →
//! [`MovieObject`] (upload payload).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One row of the IMDB-style movie table after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRow {
    pub id: String,
    pub name: String,
    pub poster_link: String,
    pub genres: String,
    pub actors: String,
    pub director: String,
    pub description: String,
    pub keywords: String,
    /// Calendar year of `DatePublished`, or `0` when absent or unparseable.
    pub year: i32,
}

/// One row of the Wikipedia plot table after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRow {
    pub title: String,
    pub plot: String,
    /// `None` when the release year cell is empty or not a number.
    pub release_year: Option<i32>,
}

/// A movie joined with its plot, ready to be turned into an upload object.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub id: String,
    pub title: String,
    pub poster_link: String,
    pub genres: String,
    pub actors: String,
    pub director: String,
    pub description: String,
    pub year: i32,
    pub keywords: String,
    /// Empty when no plot row matched on (title, year).
    pub plot: String,
}

/// Properties of one object in the remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieObject {
    pub movie_id: f64,
    pub title: String,
    pub year: i64,
    pub poster_link: String,
    pub genres: String,
    pub actors: String,
    pub director: String,
    pub description: String,
    pub plot: String,
    pub keywords: String,
}

impl MovieRecord {
    /// Map to the target shape. Title, actors and director are lower-cased
    /// so the search front-end can match them case-insensitively.
    pub fn to_object(&self) -> Result<MovieObject> {
        let movie_id = self
            .id
            .trim()
            .parse::<f64>()
            .with_context(|| format!("movie id '{}' is not a number", self.id))?;

        Ok(MovieObject {
            movie_id,
            title: self.title.to_lowercase(),
            year: i64::from(self.year),
            poster_link: self.poster_link.clone(),
            genres: self.genres.clone(),
            actors: self.actors.to_lowercase(),
            director: self.director.to_lowercase(),
            description: self.description.clone(),
            plot: self.plot.clone(),
            keywords: self.keywords.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) fn record(id: &str, title: &str, year: i32) -> MovieRecord {
    MovieRecord {
        id: id.to_string(),
        title: title.to_string(),
        poster_link: String::new(),
        genres: String::new(),
        actors: String::new(),
        director: String::new(),
        description: String::new(),
        year,
        keywords: String::new(),
        plot: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_object_lowercases_people_and_title() {
        let mut rec = record("42", "The Matrix", 1999);
        rec.actors = "Keanu Reeves,Carrie-Anne Moss".to_string();
        rec.director = "Lana Wachowski".to_string();
        rec.genres = "Action,Sci-Fi".to_string();

        let obj = rec.to_object().unwrap();
        assert_eq!(obj.movie_id, 42.0);
        assert_eq!(obj.title, "the matrix");
        assert_eq!(obj.actors, "keanu reeves,carrie-anne moss");
        assert_eq!(obj.director, "lana wachowski");
        assert_eq!(obj.genres, "Action,Sci-Fi");
        assert_eq!(obj.year, 1999);
    }

    #[test]
    fn to_object_rejects_non_numeric_id() {
        let rec = record("", "Untitled", 2001);
        assert!(rec.to_object().is_err());
    }

    #[test]
    fn object_serializes_with_property_names() {
        let obj = record("7", "Heat", 1995).to_object().unwrap();
        let json = serde_json::to_value(&obj).unwrap();
        assert_eq!(json["movie_id"], 7.0);
        assert_eq!(json["year"], 1995);
        assert_eq!(json["plot"], "");
        assert!(json.get("poster_link").is_some());
    }
}
