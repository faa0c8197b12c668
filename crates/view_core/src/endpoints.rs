use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::domain::{EventId, Mentor, Partner, Quote, TeamMember};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    ContactMessages,
    Mentors,
    Quotes,
    Events,
    EventRegistration(EventId),
    Registrations,
    Partners,
    Team,
}

impl Resource {
    pub fn name(&self) -> &'static str {
        match self {
            Resource::ContactMessages => "contact_messages",
            Resource::Mentors => "mentors",
            Resource::Quotes => "quotes",
            Resource::Events => "events",
            Resource::EventRegistration(_) => "event_registration",
            Resource::Registrations => "registrations",
            Resource::Partners => "partners",
            Resource::Team => "team",
        }
    }
}

/// Paths of each resource relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointMap {
    pub contact_messages: String,
    pub mentors: String,
    pub quotes: String,
    pub events: String,
    /// The `{event_id}` segment is replaced with the percent-encoded event id.
    pub event_registration: String,
    pub registrations: String,
    pub partners: String,
    pub team: String,
}

impl Default for EndpointMap {
    fn default() -> Self {
        Self {
            contact_messages: "contact".into(),
            mentors: "mentors".into(),
            quotes: "quotes".into(),
            events: "events".into(),
            event_registration: "events/{event_id}/register".into(),
            registrations: "registrations".into(),
            partners: "partners".into(),
            team: "team".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    paths: EndpointMap,
}

impl Endpoints {
    pub fn new(mut base: Url, paths: EndpointMap) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base, paths }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn url_for(&self, resource: &Resource) -> Result<Url, url::ParseError> {
        let path = match resource {
            Resource::ContactMessages => self.paths.contact_messages.clone(),
            Resource::Mentors => self.paths.mentors.clone(),
            Resource::Quotes => self.paths.quotes.clone(),
            Resource::Events => self.paths.events.clone(),
            Resource::EventRegistration(event_id) => {
                return self.registration_url(event_id);
            }
            Resource::Registrations => self.paths.registrations.clone(),
            Resource::Partners => self.paths.partners.clone(),
            Resource::Team => self.paths.team.clone(),
        };
        self.base.join(path.trim_start_matches('/'))
    }

    fn registration_url(&self, event_id: &EventId) -> Result<Url, url::ParseError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty();
            for segment in self
                .paths
                .event_registration
                .split('/')
                .filter(|segment| !segment.is_empty())
            {
                if segment == "{event_id}" {
                    segments.push(event_id.as_str());
                } else {
                    segments.push(segment);
                }
            }
        }
        Ok(url)
    }
}

/// Records that have a list endpoint of their own.
pub trait ListResource: DeserializeOwned + Clone + Send + Sync + 'static {
    fn resource() -> Resource;
}

impl ListResource for Mentor {
    fn resource() -> Resource {
        Resource::Mentors
    }
}

impl ListResource for Quote {
    fn resource() -> Resource {
        Resource::Quotes
    }
}

impl ListResource for shared::domain::Event {
    fn resource() -> Resource {
        Resource::Events
    }
}

impl ListResource for Partner {
    fn resource() -> Resource {
        Resource::Partners
    }
}

impl ListResource for TeamMember {
    fn resource() -> Resource {
        Resource::Team
    }
}
