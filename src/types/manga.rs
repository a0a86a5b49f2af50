use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication state of a manga as reported by its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MangaState {
    Ongoing,
    Finished,
    Abandoned,
    Paused,
    Upcoming,
}

impl MangaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MangaState::Ongoing => "ONGOING",
            MangaState::Finished => "FINISHED",
            MangaState::Abandoned => "ABANDONED",
            MangaState::Paused => "PAUSED",
            MangaState::Upcoming => "UPCOMING",
        }
    }
}

impl fmt::Display for MangaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MangaState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONGOING" => Ok(MangaState::Ongoing),
            "FINISHED" => Ok(MangaState::Finished),
            "ABANDONED" => Ok(MangaState::Abandoned),
            "PAUSED" => Ok(MangaState::Paused),
            "UPCOMING" => Ok(MangaState::Upcoming),
            other => Err(format!("unknown manga state: {}", other)),
        }
    }
}

/// A genre/category tag. Identity is `(key, source)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MangaTag {
    pub title: String,
    pub key: String,
    pub source: String,
}

impl MangaTag {
    pub fn new(title: &str, key: &str, source: &str) -> Self {
        Self {
            title: title.to_string(),
            key: key.to_string(),
            source: source.to_string(),
        }
    }
}

/// Core metadata of a manga that bookmarks reference by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manga {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub alt_title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub public_url: String,
    /// Normalized rating in `[0, 1]`, or negative when unknown.
    #[serde(default = "Manga::unknown_rating")]
    pub rating: f32,
    #[serde(default)]
    pub is_nsfw: bool,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub large_cover_url: Option<String>,
    #[serde(default)]
    pub state: Option<MangaState>,
    #[serde(default)]
    pub author: Option<String>,
    pub source: String,
    #[serde(default)]
    pub tags: Vec<MangaTag>,
}

impl Manga {
    pub const NO_RATING: f32 = -1.0;

    fn unknown_rating() -> f32 {
        Self::NO_RATING
    }

    /// Creates a manga with only the required fields set.
    pub fn new(id: i64, title: &str, url: &str, source: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            alt_title: None,
            url: url.to_string(),
            public_url: String::new(),
            rating: Self::NO_RATING,
            is_nsfw: false,
            cover_url: String::new(),
            large_cover_url: None,
            state: None,
            author: None,
            source: source.to_string(),
            tags: Vec::new(),
        }
    }
}
