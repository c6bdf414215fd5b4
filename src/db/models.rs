use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub kinde_id: String,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub country: Option<String>,
    pub avatar_style: Option<AvatarStyle>,
    pub is_suspended: bool,
    pub is_password_reset_requested: bool,
    pub login_count: i64,
    pub last_login: DateTime<Utc>,
    pub user_since: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Avatar generator styles a user may pick for their profile picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvatarStyle {
    Adventurer,
    Avataaars,
    BigSmile,
    Bottts,
    Croodles,
    FunEmoji,
    Lorelei,
    Micah,
    Miniavs,
    Notionists,
    OpenPeeps,
    Personas,
    PixelArt,
    Thumbs,
}

impl AvatarStyle {
    pub const ALL: [AvatarStyle; 14] = [
        AvatarStyle::Adventurer,
        AvatarStyle::Avataaars,
        AvatarStyle::BigSmile,
        AvatarStyle::Bottts,
        AvatarStyle::Croodles,
        AvatarStyle::FunEmoji,
        AvatarStyle::Lorelei,
        AvatarStyle::Micah,
        AvatarStyle::Miniavs,
        AvatarStyle::Notionists,
        AvatarStyle::OpenPeeps,
        AvatarStyle::Personas,
        AvatarStyle::PixelArt,
        AvatarStyle::Thumbs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarStyle::Adventurer => "adventurer",
            AvatarStyle::Avataaars => "avataaars",
            AvatarStyle::BigSmile => "big-smile",
            AvatarStyle::Bottts => "bottts",
            AvatarStyle::Croodles => "croodles",
            AvatarStyle::FunEmoji => "fun-emoji",
            AvatarStyle::Lorelei => "lorelei",
            AvatarStyle::Micah => "micah",
            AvatarStyle::Miniavs => "miniavs",
            AvatarStyle::Notionists => "notionists",
            AvatarStyle::OpenPeeps => "open-peeps",
            AvatarStyle::Personas => "personas",
            AvatarStyle::PixelArt => "pixel-art",
            AvatarStyle::Thumbs => "thumbs",
        }
    }
}

impl fmt::Display for AvatarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAvatarStyle(pub String);

impl fmt::Display for UnknownAvatarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid avatar style: {}", self.0)
    }
}

impl FromStr for AvatarStyle {
    type Err = UnknownAvatarStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AvatarStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| UnknownAvatarStyle(s.to_string()))
    }
}

/// Fields required to insert a user row.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub kinde_id: String,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub country: Option<String>,
    pub avatar_style: Option<AvatarStyle>,
    pub is_suspended: Option<bool>,
    pub is_password_reset_requested: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.date_of_birth.is_none()
            && self.country.is_none()
            && self.avatar_style.is_none()
            && self.is_suspended.is_none()
            && self.is_password_reset_requested.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryData {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub age_group: String,
    pub language: String,
    pub topic: String,
    pub subtopic: String,
    pub style: String,
    pub first_name: Option<String>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryOutput {
    pub id: String,
    pub story_data_id: String,
    pub story_content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub id: String,
    pub user_id: String,
    pub story_data_id: String,
    pub story_output_id: String,
    pub shared: bool,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to write a story aggregate in one go. Missing fields
/// deserialize as empty and are rejected by validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewStory {
    pub user_id: String,
    pub title: String,
    pub story_content: String,
    pub age_group: String,
    pub language: String,
    pub topic: String,
    pub subtopic: String,
    pub style: String,
    pub first_name: Option<String>,
    pub gender: Option<String>,
    pub shared: bool,
    pub published: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub avatar_style: Option<AvatarStyle>,
}

/// A story joined with its config, text, and author.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoryWithDetails {
    pub id: String,
    pub story_data_id: String,
    pub story_output_id: String,
    pub title: String,
    pub story_content: String,
    pub age_group: String,
    pub language: String,
    pub topic: String,
    pub subtopic: String,
    pub style: String,
    pub first_name: Option<String>,
    pub gender: Option<String>,
    pub shared: bool,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Author,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Like {
    pub id: String,
    pub user_id: String,
    pub story_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Follow {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeletedAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    pub reason: Option<String>,
    pub feedback: Option<String>,
    pub deleted_at: DateTime<Utc>,
}
