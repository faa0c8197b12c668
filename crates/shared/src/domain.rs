use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(EventId);
id_newtype!(MentorId);
id_newtype!(QuoteId);
id_newtype!(PartnerId);
id_newtype!(MemberId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mentor {
    #[serde(alias = "_id")]
    pub id: MentorId,
    pub name: String,
    #[serde(default)]
    pub expertise: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, alias = "linkedin")]
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(alias = "_id")]
    pub id: QuoteId,
    #[serde(alias = "quote")]
    pub text: String,
    pub author: String,
    #[serde(default, alias = "designation")]
    pub role: Option<String>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(alias = "_id")]
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "date")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    #[serde(alias = "_id")]
    pub id: PartnerId,
    pub name: String,
    #[serde(default, alias = "logo")]
    pub logo_url: Option<String>,
    #[serde(default, alias = "website")]
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(alias = "_id")]
    pub id: MemberId,
    pub name: String,
    #[serde(default, alias = "designation")]
    pub position: Option<String>,
    #[serde(default, alias = "image")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(alias = "eventId")]
    pub event_id: EventId,
    #[serde(default, alias = "userId")]
    pub user_id: Option<UserId>,
    #[serde(default, alias = "createdAt")]
    pub registered_at: Option<DateTime<Utc>>,
}

/// Identity handed over by the external auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default, alias = "isAdmin")]
    pub is_admin: bool,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,
}
