//! Import pipeline orchestration.
//!
//! Coordinates the full run: load datasets → merge → recreate the class →
//! batched upload → remote count. The pipeline is sequential; the only
//! network traffic is through the [`VectorStore`].

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::config::Config;
use crate::dataset;
use crate::import;
use crate::merge::{self, MergeResult};
use crate::progress::{ImportProgressEvent, ImportProgressReporter};
use crate::schema;
use crate::summary::{self, ImportReport};
use crate::weaviate::{VectorStore, WeaviateClient};

/// Per-run overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub movies: Option<PathBuf>,
    pub plots: Option<PathBuf>,
    /// Upload only the first `limit` merged rows.
    pub limit: Option<usize>,
    /// Stop after merging and print counts.
    pub dry_run: bool,
}

/// Run the import against the configured Weaviate instance.
pub async fn run_import(
    config: &Config,
    options: &ImportOptions,
    progress: &dyn ImportProgressReporter,
) -> Result<()> {
    let merged = load_and_merge(config, options, progress)?;

    if options.dry_run {
        println!("import {} (dry-run)", config.collection.name);
        summary::print_merge(&merged.stats);
        println!("  rows to upload: {}", merged.records.len());
        return Ok(());
    }

    let client = WeaviateClient::new(&config.weaviate, &config.batch)?;
    tracing::info!(url = client.base_url(), "connected");

    let report = run_import_with_store(config, &client, merged, progress).await?;
    summary::print_report(&report);
    Ok(())
}

/// Read both datasets and merge them. `limit` is applied after the merge.
pub fn load_and_merge(
    config: &Config,
    options: &ImportOptions,
    progress: &dyn ImportProgressReporter,
) -> Result<MergeResult> {
    let movies_path = options
        .movies
        .clone()
        .unwrap_or_else(|| config.data.movies_csv.clone());
    let plots_path = options
        .plots
        .clone()
        .unwrap_or_else(|| config.data.plots_csv.clone());

    progress.report(ImportProgressEvent::Loading {
        dataset: movies_path.display().to_string(),
    });
    let movies = dataset::load_movies(&movies_path)?;

    progress.report(ImportProgressEvent::Loading {
        dataset: plots_path.display().to_string(),
    });
    let plots = dataset::load_plots(&plots_path)?;

    tracing::info!(movies = movies.len(), plots = plots.len(), "datasets loaded");

    let mut merged = merge::merge(movies, plots, config.data.min_year);
    if let Some(limit) = options.limit {
        merged.records.truncate(limit);
    }
    Ok(merged)
}

/// Recreate the class, upload `merged` and fetch the remote count.
///
/// On an upload failure the failing row is printed to stderr and an error
/// is returned; no count is fetched.
pub async fn run_import_with_store(
    config: &Config,
    store: &dyn VectorStore,
    merged: MergeResult,
    progress: &dyn ImportProgressReporter,
) -> Result<ImportReport> {
    let class = config.collection.name.clone();
    let class_schema = schema::movie_class(&config.collection);

    let recreated = schema::recreate_collection(store, &class_schema).await?;

    let upload = import::upload_records(
        store,
        &class,
        &config.batch,
        &merged.records,
        progress,
    )
    .await;

    if let Some(failure) = &upload.failure {
        summary::print_failure(failure.index, &failure.error);
        bail!(
            "import aborted at row {} after storing {} objects",
            failure.index,
            upload.stored
        );
    }

    let remote_count = summary::fetch_count(store, &class).await?;

    Ok(ImportReport {
        class,
        merge: merged.stats,
        recreated,
        upload,
        remote_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::schema::Recreated;
    use crate::weaviate::testing::MemoryStore;
    use std::fs;
    use tempfile::TempDir;

    fn write_datasets(dir: &TempDir) -> Config {
        let movies = dir.path().join("movie_data.csv");
        let plots = dir.path().join("plots.csv");
        fs::write(
            &movies,
            "\
id,Name,PosterLink,Genres,Actors,Director,Description,DatePublished,Keywords
1,Heat,p1,\"Crime,Drama\",Al Pacino,Michael Mann,Cops and robbers.,1995-12-15,heist
2,Psycho,p2,Horror,Anthony Perkins,Alfred Hitchcock,Motel.,1960-09-08,motel
3,Jaws,p3,Thriller,Roy Scheider,Steven Spielberg,Shark.,1975-06-20,shark
3,Jaws,p3,Thriller,Roy Scheider,Steven Spielberg,Shark.,1975-06-20,shark
",
        )
        .unwrap();
        fs::write(
            &plots,
            "\
Release Year,Title,Plot
1995,Heat,A crew of thieves.
1995,Heat,Another heat plot.
1960,Psycho,Norman.
",
        )
        .unwrap();

        let mut config = Config::default();
        config.data.movies_csv = movies;
        config.data.plots_csv = plots;
        config.batch.dynamic = false;
        config
    }

    #[test]
    fn load_and_merge_applies_limit() {
        let dir = TempDir::new().unwrap();
        let config = write_datasets(&dir);

        let merged = load_and_merge(&config, &ImportOptions::default(), &NoProgress).unwrap();
        assert_eq!(merged.records.len(), 2);
        assert_eq!(merged.records[0].plot, "A crew of thieves.");
        assert_eq!(merged.records[1].plot, "");

        let options = ImportOptions {
            limit: Some(1),
            ..ImportOptions::default()
        };
        let merged = load_and_merge(&config, &options, &NoProgress).unwrap();
        assert_eq!(merged.records.len(), 1);
        assert_eq!(merged.stats.movies_kept, 2);
    }

    #[tokio::test]
    async fn full_run_against_memory_store() {
        let dir = TempDir::new().unwrap();
        let config = write_datasets(&dir);
        let store = MemoryStore::new();
        store.seed_class(&config.collection.name, 50);

        let merged = load_and_merge(&config, &ImportOptions::default(), &NoProgress).unwrap();
        let report = run_import_with_store(&config, &store, merged, &NoProgress)
            .await
            .unwrap();

        assert_eq!(report.recreated, Recreated::Replaced);
        assert_eq!(report.remote_count, 2);
        assert_eq!(report.upload.stored, 2);
        let objects = store.objects(&config.collection.name);
        assert_eq!(objects[0].title, "heat");
        assert_eq!(objects[0].director, "michael mann");
        assert_eq!(objects[1].title, "jaws");
    }

    #[tokio::test]
    async fn aborted_run_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = write_datasets(&dir);
        let store = MemoryStore::rejecting(1);

        let merged = load_and_merge(&config, &ImportOptions::default(), &NoProgress).unwrap();
        let err = run_import_with_store(&config, &store, merged, &NoProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("row 1"));
        assert_eq!(store.object_count(&config.collection.name), 1);
    }

    #[test]
    fn missing_dataset_fails() {
        let mut config = Config::default();
        config.data.movies_csv = PathBuf::from("/nonexistent/movies.csv");
        assert!(load_and_merge(&config, &ImportOptions::default(), &NoProgress).is_err());
    }
}
