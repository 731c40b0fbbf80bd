//! # Moviate Loader
//!
//! Loads an IMDB-style movie table joined with Wikipedia plot summaries into
//! a Weaviate collection, where the `text2vec-openai` module embeds the
//! descriptive fields for semantic search.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │ movie_data   │──▶│          │   │ schema       │   │          │
//! │ .csv         │   │  merge   │──▶│ (re)create   │──▶│  batch   │──▶ count
//! │ wiki plots   │──▶│          │   │ class        │   │  upload  │
//! └──────────────┘   └──────────┘   └──────────────┘   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`models`] | Row, record and upload object types |
//! | [`dataset`] | CSV loading |
//! | [`merge`] | Filtering, deduplication and the plot join |
//! | [`schema`] | Class definition and recreation |
//! | [`weaviate`] | Remote store trait and REST client |
//! | [`batch`] | Batched writes with dynamic sizing |
//! | [`import`] | The upload loop |
//! | [`summary`] | Remote count and run report |
//! | [`ingest`] | End-to-end orchestration |
//! | [`progress`] | Stderr progress reporting |

pub mod batch;
pub mod config;
pub mod dataset;
pub mod import;
pub mod ingest;
pub mod merge;
pub mod models;
pub mod progress;
pub mod schema;
pub mod summary;
pub mod weaviate;
