use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    domain::{EventId, Registration, UserId},
    error::DecodeError,
};

/// A list endpoint answers either a bare array or an object wrapping it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CollectionBody<T> {
    List(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> CollectionBody<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            CollectionBody::List(items) => items,
            CollectionBody::Wrapped { data } => data,
        }
    }
}

pub fn decode_collection<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, DecodeError> {
    if body.trim().is_empty() {
        return Err(DecodeError::EmptyBody);
    }
    let parsed: CollectionBody<T> = serde_json::from_str(body)?;
    Ok(parsed.into_items())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRegistrationRequest {
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RegistrationListing {
    Records(Vec<Registration>),
    Ids(Vec<EventId>),
}

impl RegistrationListing {
    pub fn event_ids(self) -> Vec<EventId> {
        match self {
            RegistrationListing::Records(records) => {
                records.into_iter().map(|r| r.event_id).collect()
            }
            RegistrationListing::Ids(ids) => ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Mentor;

    #[test]
    fn decodes_bare_array_and_wrapped_object() {
        let bare: Vec<Mentor> =
            decode_collection(r#"[{"_id":"m1","name":"Asha"}]"#).expect("bare");
        let wrapped: Vec<Mentor> =
            decode_collection(r#"{"data":[{"id":"m1","name":"Asha"}]}"#).expect("wrapped");
        assert_eq!(bare, wrapped);
        assert_eq!(bare[0].id.as_str(), "m1");
    }

    #[test]
    fn empty_array_is_a_valid_collection() {
        let items: Vec<Mentor> = decode_collection("[]").expect("empty");
        assert!(items.is_empty());
    }

    #[test]
    fn rejects_blank_body() {
        assert!(matches!(
            decode_collection::<Mentor>("  "),
            Err(DecodeError::EmptyBody)
        ));
    }

    #[test]
    fn registration_listing_accepts_records_or_ids() {
        let records: RegistrationListing =
            serde_json::from_str(r#"[{"eventId":"e1"},{"event_id":"e2"}]"#).expect("records");
        let ids: RegistrationListing = serde_json::from_str(r#"["e1","e2"]"#).expect("ids");
        assert_eq!(records.event_ids(), ids.event_ids());
    }
}
