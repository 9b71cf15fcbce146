//! Core data types for Lantern.
//!
//! This module defines the fundamental data structures used throughout the
//! indexing system. These types are designed to be:
//!
//! - **Serializable**: For persistence to disk where needed
//! - **Host-agnostic**: The launcher consumes them through the flat
//!   [`SearchItem`] trait, never through concrete types
//! - **Immutable after publication**: Snapshots replace wholesale, entries
//!   are never mutated in place

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Mime classification sentinel for directories.
pub const MIME_DIRECTORY: &str = "inode/directory";

/// Fallback mime classification for files with no recognized extension.
pub const MIME_UNKNOWN: &str = "application/octet-stream";

/// The kind of filesystem object an [`Entry`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Dir,
    /// Anything else (sockets, fifos, devices)
    Other,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Dir => write!(f, "dir"),
            EntryKind::Other => write!(f, "other"),
        }
    }
}

/// One discovered file-or-directory result of a scan.
///
/// Identity is the absolute path. An entry is owned by the indexed root
/// that discovered it and is replaced wholesale on each rescan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute path (identity)
    pub path: String,

    /// Base name without the parent path
    pub name: String,

    /// Parent directory path
    pub parent: String,

    /// File, directory, or other
    pub kind: EntryKind,

    /// Mime-type-like classification (e.g., `text/plain`, `inode/directory`)
    pub mime: String,

    /// Whether the entry is hidden (dotfile convention)
    pub hidden: bool,

    /// Whether the entry is a symbolic link
    pub symlink: bool,
}

impl Entry {
    /// Create a new entry. The mime classification is derived from the
    /// name and kind.
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        parent: impl Into<String>,
        kind: EntryKind,
    ) -> Self {
        let name = name.into();
        let mime = classify_mime(&name, kind).to_string();
        let hidden = name.starts_with('.');
        Entry {
            path: path.into(),
            name,
            parent: parent.into(),
            kind,
            mime,
            hidden,
            symlink: false,
        }
    }

    /// Mark this entry as a symbolic link
    pub fn with_symlink(mut self, symlink: bool) -> Self {
        self.symlink = symlink;
        self
    }

    /// True if this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Classify a filesystem name into a mime-type-like string.
///
/// Directories map to the [`MIME_DIRECTORY`] sentinel. Files are classified
/// by extension against a small table of common types; unknown extensions
/// fall back to [`MIME_UNKNOWN`].
pub fn classify_mime(name: &str, kind: EntryKind) -> &'static str {
    if kind == EntryKind::Dir {
        return MIME_DIRECTORY;
    }
    if kind == EntryKind::Other {
        return MIME_UNKNOWN;
    }

    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return MIME_UNKNOWN,
    };

    match ext.as_str() {
        "txt" | "md" | "rst" | "log" | "cfg" | "ini" | "conf" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "text/xml",
        "c" | "h" | "cpp" | "hpp" | "cc" | "rs" | "py" | "js" | "ts" | "go" | "java" | "sh" => {
            "text/x-source"
        }
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        _ => MIME_UNKNOWN,
    }
}

/// What invoking an action should do.
///
/// Actions are pure data; clipboard and URL-opening OS integration belongs
/// to the host, which interprets these when the user triggers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Open a filesystem path
    OpenPath(String),
    /// Open a URL in the default browser
    OpenUrl(String),
    /// Copy text to the clipboard
    CopyText(String),
    /// Trigger a rescan of the file index
    TriggerUpdate,
}

/// A named action attached to a search item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Stable action identifier
    pub id: String,

    /// Human-readable label
    pub label: String,

    /// What invoking the action does
    pub kind: ActionKind,
}

impl Action {
    /// Create a new action
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ActionKind) -> Self {
        Action {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }
}

/// The host search index's polymorphic item contract.
///
/// A flat trait with two concrete implementors ([`Entry`] and
/// [`BookmarkItem`]); the host owns ranking and matching, this crate only
/// publishes `(item, key)` pairs.
pub trait SearchItem: Send + Sync {
    /// Stable identifier for the item
    fn id(&self) -> String;

    /// Primary display text
    fn text(&self) -> String;

    /// Secondary display text
    fn subtext(&self) -> String;

    /// Icon lookup hints, most specific first
    fn icon_hints(&self) -> Vec<String>;

    /// Named actions the host can invoke on this item
    fn actions(&self) -> Vec<Action>;
}

impl SearchItem for Entry {
    fn id(&self) -> String {
        self.path.clone()
    }

    fn text(&self) -> String {
        self.name.clone()
    }

    fn subtext(&self) -> String {
        self.path.clone()
    }

    fn icon_hints(&self) -> Vec<String> {
        vec![format!("mime:{}", self.mime), "xdg:unknown".to_string()]
    }

    fn actions(&self) -> Vec<Action> {
        vec![
            Action::new(
                "open",
                "Open",
                ActionKind::OpenPath(self.path.clone()),
            ),
            Action::new(
                "open-parent",
                "Open enclosing directory",
                ActionKind::OpenPath(self.parent.clone()),
            ),
            Action::new(
                "copy-path",
                "Copy path to clipboard",
                ActionKind::CopyText(self.path.clone()),
            ),
        ]
    }
}

/// A flat bookmark parsed from a browser bookmarks file.
///
/// Identity is the source `guid`. The entire bookmark list is replaced
/// atomically when a reparse completes; items are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkItem {
    /// Source guid (identity)
    pub guid: String,

    /// Bookmark title
    pub name: String,

    /// Bookmark URL
    pub url: String,
}

impl BookmarkItem {
    /// Create a new bookmark item
    pub fn new(
        guid: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        BookmarkItem {
            guid: guid.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}

impl SearchItem for BookmarkItem {
    fn id(&self) -> String {
        self.guid.clone()
    }

    fn text(&self) -> String {
        self.name.clone()
    }

    fn subtext(&self) -> String {
        self.url.clone()
    }

    fn icon_hints(&self) -> Vec<String> {
        vec![
            "xdg:www".to_string(),
            "xdg:web-browser".to_string(),
            "xdg:emblem-web".to_string(),
        ]
    }

    fn actions(&self) -> Vec<Action> {
        vec![
            Action::new("open-url", "Open URL", ActionKind::OpenUrl(self.url.clone())),
            Action::new(
                "copy-url",
                "Copy URL to clipboard",
                ActionKind::CopyText(self.url.clone()),
            ),
        ]
    }
}

/// One `(item, searchable key)` pair published to the host search index.
///
/// The same underlying item may appear under several keys (e.g., a bookmark
/// under its title and its hostname).
#[derive(Clone)]
pub struct IndexItem {
    /// The underlying search item
    pub item: Arc<dyn SearchItem>,

    /// The key the host indexes this item under
    pub key: String,
}

impl IndexItem {
    /// Create a new index item
    pub fn new(item: Arc<dyn SearchItem>, key: impl Into<String>) -> Self {
        IndexItem {
            item,
            key: key.into(),
        }
    }
}

impl fmt::Debug for IndexItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexItem")
            .field("id", &self.item.id())
            .field("key", &self.key)
            .finish()
    }
}
