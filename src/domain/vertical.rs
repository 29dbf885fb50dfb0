//! Data verticals

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A category of data with its own schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataVertical {
    Photos,
    Videos,
    Media,
    SocialPosts,
    Contacts,
    Calendar,
    Mail,
    Music,
    Playlists,
    BlobbyStorage,
}

impl DataVertical {
    /// Wire name of the vertical (matches the serialized form)
    pub fn as_str(&self) -> &'static str {
        match self {
            DataVertical::Photos => "PHOTOS",
            DataVertical::Videos => "VIDEOS",
            DataVertical::Media => "MEDIA",
            DataVertical::SocialPosts => "SOCIAL_POSTS",
            DataVertical::Contacts => "CONTACTS",
            DataVertical::Calendar => "CALENDAR",
            DataVertical::Mail => "MAIL",
            DataVertical::Music => "MUSIC",
            DataVertical::Playlists => "PLAYLISTS",
            DataVertical::BlobbyStorage => "BLOBBY_STORAGE",
        }
    }

    /// All known verticals
    pub fn all() -> &'static [DataVertical] {
        &[
            DataVertical::Photos,
            DataVertical::Videos,
            DataVertical::Media,
            DataVertical::SocialPosts,
            DataVertical::Contacts,
            DataVertical::Calendar,
            DataVertical::Mail,
            DataVertical::Music,
            DataVertical::Playlists,
            DataVertical::BlobbyStorage,
        ]
    }
}

impl fmt::Display for DataVertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataVertical {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        DataVertical::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| format!("Unknown data vertical: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!("photos".parse::<DataVertical>().unwrap(), DataVertical::Photos);
        assert_eq!(
            "social-posts".parse::<DataVertical>().unwrap(),
            DataVertical::SocialPosts
        );
        assert_eq!(
            "BLOBBY_STORAGE".parse::<DataVertical>().unwrap(),
            DataVertical::BlobbyStorage
        );
        assert!("holograms".parse::<DataVertical>().is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        for vertical in DataVertical::all() {
            let json = serde_json::to_string(vertical).unwrap();
            assert_eq!(json, format!("\"{vertical}\""));
        }
    }
}
