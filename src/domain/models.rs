//! Exported data models
//!
//! One export page carries a [`ContainerResource`]: albums and the items
//! that belong to them, or a bare reference to a sub-container that still
//! has to be exported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a container (album, folder, feed) on the export side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ContainerRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// An album holding photos or videos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl MediaAlbum {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }
}

/// A single photo or video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Identifier on the export side
    pub data_id: String,

    pub title: String,

    /// URL the importer can download the content from
    #[serde(default)]
    pub fetchable_url: Option<String>,

    /// MIME type, e.g. `image/jpeg`
    #[serde(default)]
    pub media_type: Option<String>,

    /// Export-side album the item belongs to
    #[serde(default)]
    pub album_id: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Content was staged in the job store under `data_id`
    #[serde(default)]
    pub in_temp_store: bool,
}

impl MediaItem {
    pub fn new(data_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            data_id: data_id.into(),
            title: title.into(),
            fetchable_url: None,
            media_type: None,
            album_id: None,
            description: None,
            in_temp_store: false,
        }
    }

    pub fn with_album(mut self, album_id: impl Into<String>) -> Self {
        self.album_id = Some(album_id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.fetchable_url = Some(url.into());
        self
    }

    /// Idempotent key of this item: album and item ids together, since the
    /// same item may appear in several albums
    pub fn idempotent_id(&self) -> String {
        match &self.album_id {
            Some(album_id) => format!("{album_id}-{}", self.data_id),
            None => self.data_id.clone(),
        }
    }
}

/// A social feed post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPost {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Payload of one export page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerResource {
    Photos {
        albums: Vec<MediaAlbum>,
        photos: Vec<MediaItem>,
    },
    Videos {
        albums: Vec<MediaAlbum>,
        videos: Vec<MediaItem>,
    },
    SocialActivity {
        posts: Vec<SocialPost>,
    },
    /// Only identifies a container; nothing to import on its own
    IdOnly(ContainerRef),
}

impl ContainerResource {
    /// Number of importable items on this page (albums included)
    pub fn item_count(&self) -> usize {
        match self {
            ContainerResource::Photos { albums, photos } => albums.len() + photos.len(),
            ContainerResource::Videos { albums, videos } => albums.len() + videos.len(),
            ContainerResource::SocialActivity { posts } => posts.len(),
            ContainerResource::IdOnly(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }
}
