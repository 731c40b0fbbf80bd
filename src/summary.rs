//! Post-import summary.
//!
//! Queries the service for the number of objects in the collection and
//! prints a short report of what the run did.

use anyhow::{Context, Result};

use crate::import::UploadOutcome;
use crate::merge::MergeStats;
use crate::progress::format_number;
use crate::schema::Recreated;
use crate::weaviate::VectorStore;

/// Everything a completed import reports.
#[derive(Debug)]
pub struct ImportReport {
    pub class: String,
    pub merge: MergeStats,
    pub recreated: Recreated,
    pub upload: UploadOutcome,
    pub remote_count: u64,
}

pub async fn fetch_count(store: &dyn VectorStore, class: &str) -> Result<u64> {
    store
        .count_objects(class)
        .await
        .with_context(|| format!("Failed to count objects in {}", class))
}

pub fn print_merge(stats: &MergeStats) {
    println!("  movies read: {}", format_number(stats.movies_read as u64));
    println!("  movies kept: {}", format_number(stats.movies_kept as u64));
    println!("  plots read: {}", format_number(stats.plots_read as u64));
    println!("  plots kept: {}", format_number(stats.plots_kept as u64));
    println!("  plots matched: {}", format_number(stats.matched as u64));
}

pub fn print_report(report: &ImportReport) {
    println!("import {}", report.class);
    print_merge(&report.merge);
    println!(
        "  class: {}",
        match report.recreated {
            Recreated::Created => "created",
            Recreated::Replaced => "replaced",
        }
    );
    println!(
        "  rows submitted: {}",
        format_number(report.upload.submitted as u64)
    );
    println!(
        "  objects stored: {}",
        format_number(report.upload.stored as u64)
    );
    println!("  batch requests: {}", report.upload.requests);
    println!("  remote count: {}", report.remote_count);
    println!("ok");
}

/// Print the failing row the way the loop reports it, on stderr.
pub fn print_failure(index: usize, error: &anyhow::Error) {
    eprintln!("Import failed at: {}", index);
    eprintln!("An exception occurred: {:#}", error);
}
