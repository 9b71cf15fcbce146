//! # Lantern Core Library
//!
//! This crate provides the indexing engine behind the Lantern launcher
//! extension: it scans configured directory roots into searchable file
//! entries, indexes Chromium-family browser bookmarks, and publishes a
//! flat `(item, key)` catalog for a launcher's search index. It is
//! designed to be host-agnostic, with filesystem watching and the
//! settings store abstracted behind traits.
//!
//! ## Architecture
//!
//! - **Types** (`types`): Search items, file entries, bookmarks, actions
//! - **Filter** (`filter`): The per-root inclusion policy (name globs,
//!   mime prefixes, hidden files, depth)
//! - **Indexed paths** (`indexed_path`): One scan root with its settings
//!   and atomically swapped entry snapshot
//! - **Index** (`fs_index`): Aggregation and scan coordination across
//!   roots, one settled notification per batch
//! - **Bookmarks** (`bookmarks`): Abortable background bookmark parsing
//!   with source auto-discovery
//! - **Watch** (`watch`): Filesystem change notification seam
//! - **Persistence** (`persistence`): The JSON cache document
//! - **Settings** (`settings`): The host key-value settings seam
//! - **Config** (`config`): TOML configuration for standalone use
//! - **Engine** (`engine`): Wires the pieces together and publishes the
//!   catalog
//!
//! ## Example
//!
//! ```rust,ignore
//! use lantern_core::{Engine, EngineConfig, NullWatchSource};
//! use std::sync::Arc;
//!
//! let config = EngineConfig::from_config(&lantern_core::Config::load()?)?;
//! let engine = Engine::new(
//!     config,
//!     Arc::new(NullWatchSource::new()),
//!     Arc::new(NullWatchSource::new()),
//! )?;
//!
//! for item in engine.index_items() {
//!     println!("{} -> {}", item.key, item.item.text());
//! }
//! ```

pub mod bookmarks;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod fs_index;
pub mod indexed_path;
pub mod persistence;
pub mod settings;
pub mod types;
pub mod watch;

// Re-export commonly used types
pub use bookmarks::{discover_sources, BookmarkEvent, BookmarksIndexer};
pub use config::{BookmarksConfig, Config, GeneralConfig, RootConfig};
pub use engine::{config_from_settings, Engine, EngineConfig, EngineEvent};
pub use error::{LanternError, Result};
pub use filter::{Candidate, FilterPolicy, Verdict};
pub use fs_index::{FsIndex, IndexEvent};
pub use indexed_path::{IndexedPath, PathRecord, PathSettings};
pub use persistence::{CacheDocument, CacheStore};
pub use settings::{MemorySettings, SettingsStore, SettingsValue};
pub use types::{Action, ActionKind, BookmarkItem, Entry, EntryKind, IndexItem, SearchItem};
pub use watch::{NotifyWatcher, NullWatchSource, WatchEvent, WatchSource};
