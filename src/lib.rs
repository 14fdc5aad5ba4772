//! # Static API
//!
//! An incremental generator of static JSON endpoints. Your filesystem is the
//! data source: each child of the content root is a content type, each
//! directory inside it is one entity (metadata + markdown), and the output is
//! a tree of JSON documents a frontend can fetch directly — entity documents,
//! paginated category indexes, and an optional hash manifest.
//!
//! # Architecture: Plan, Then Commit
//!
//! Every build runs in two halves:
//!
//! ```text
//! 1. Plan     src/ + cache.json  →  Update       (pure-ish, read-only)
//! 2. Commit   Update             →  dist/        (all writes)
//! ```
//!
//! The plan half lists entries, classifies them by modification time,
//! renders only the stale ones, and diffs the category indexes against the
//! persisted cache. The commit half applies the resulting [`plan::Update`]
//! verbatim. This separation exists for three reasons:
//!
//! - **Incrementality**: unchanged entries are never re-read, and untouched
//!   index pages are never rewritten — touching one entity rewrites one
//!   document and the index pages from its position onward, nothing else.
//! - **Inspectability**: the `plan` command prints the update without
//!   applying it.
//! - **Testability**: the core diffing logic is pure functions over values,
//!   exercised without a filesystem.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`entry`] | Entry paths and timestamp-based change classification |
//! | [`entity`] | Metadata parsing and markdown rendering into entity documents |
//! | [`categorize`] | Category bucketing (slugified names plus the `all` bucket) |
//! | [`paginate`] | Fixed-size pagination of bucket entity lists |
//! | [`diff`] | Incremental index re-pagination against the persisted cache |
//! | [`manifest`] | Hash manifest derivation for content-addressed filenames |
//! | [`plan`] | Orchestrates the read half into a declarative update |
//! | [`endpoints`] | Applies an update to the output tree |
//! | [`author`] | Entry authoring commands: scaffold, edit, retire sources |
//! | [`config`] | `config.toml` loading, validation, and path layout |
//! | [`types`] | Shared types serialized as endpoint documents and cache state |
//! | [`output`] | CLI output formatting for plans and build summaries |
//!
//! # Design Decisions
//!
//! ## The Cache Is the Source of Truth for Indexes
//!
//! `cache.json` persists the complete paginated state between runs. The
//! differ reduces it against the run's written and removed entities, so the
//! incremental result must exactly equal a from-scratch re-pagination —
//! it is an optimization of that computation, not an approximation. Lose
//! the cache (or pass `--force`) and the next run rebuilds it whole.
//!
//! ## Timestamps, Not Content Diffing
//!
//! Change detection compares source modification times against published
//! outputs, split into three independent signals (document, index
//! projection, static assets). An excerpt edit rewrites index pages without
//! touching the entity document; a body edit does the reverse. Equal
//! timestamps read as unchanged, so repeated runs settle immediately.
//!
//! ## Content-Addressed Filenames Are Opt-In
//!
//! With `hash` enabled, every document gets an `index-<hash>.json` name
//! derived from its serialized content, and `manifest.json` maps stable
//! identities to current hashes. Consumers cache aggressively and bust via
//! the manifest. Without it, filenames are plain `index.json` and no
//! manifest is written.

pub mod author;
pub mod categorize;
pub mod config;
pub mod diff;
pub mod endpoints;
pub mod entity;
pub mod entry;
pub mod manifest;
pub mod output;
pub mod paginate;
pub mod plan;
pub mod types;
