//! Discord embed wire format

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tsbeacon_core::Representation;

pub const AUTHOR_NAME: &str = "TeamSpeak Server";
pub const AUTHOR_ICON_URL: &str = "https://i.imgur.com/pK2qRkC.png";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    pub timestamp: String,
    pub author: EmbedAuthor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmbedImage {
    pub url: String,
}

impl Embed {
    /// Render a representation, stamped with the send time.
    pub fn from_representation(rep: &Representation, now: DateTime<Utc>) -> Self {
        Self {
            title: rep.title.clone(),
            description: rep.description.clone(),
            color: rep.urgency.color(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            author: EmbedAuthor {
                name: AUTHOR_NAME.to_string(),
                icon_url: Some(AUTHOR_ICON_URL.to_string()),
            },
            fields: rep
                .fields
                .iter()
                .map(|f| EmbedField {
                    name: f.name.clone(),
                    value: f.value.clone(),
                    inline: f.inline,
                })
                .collect(),
            footer: rep.footer.clone().map(|text| EmbedFooter { text }),
            thumbnail: rep.thumbnail_url.clone().map(|url| EmbedImage { url }),
        }
    }
}

/// Body of a message create/edit.
#[derive(Clone, Debug, Serialize)]
pub struct MessagePayload {
    pub embeds: Vec<Embed>,
}

impl MessagePayload {
    pub fn single(rep: &Representation, now: DateTime<Utc>) -> Self {
        Self {
            embeds: vec![Embed::from_representation(rep, now)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tsbeacon_core::{Field, Urgency};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn placeholder_embed_has_no_fields() {
        let rep = Representation {
            title: None,
            urgency: Urgency::Pending,
            description: Some("connecting".into()),
            fields: vec![],
            footer: None,
            thumbnail_url: None,
            container_name: None,
        };
        let json = serde_json::to_value(Embed::from_representation(&rep, fixed_now())).unwrap();
        assert_eq!(json["color"], 0xFAA61A);
        assert_eq!(json["description"], "connecting");
        assert_eq!(json["timestamp"], "2024-05-01T12:30:00Z");
        assert_eq!(json["author"]["name"], AUTHOR_NAME);
        assert!(json.get("fields").is_none());
        assert!(json.get("title").is_none());
        assert!(json.get("footer").is_none());
    }

    #[test]
    fn status_embed_carries_fields_in_order() {
        let rep = Representation {
            title: Some("My Server".into()),
            urgency: Urgency::Busy,
            description: None,
            fields: vec![Field::inline("a", "1"), Field::block("b", "2")],
            footer: Some("Last updated".into()),
            thumbnail_url: Some("https://example.com/t.png".into()),
            container_name: Some("ignored".into()),
        };
        let embed = Embed::from_representation(&rep, fixed_now());
        assert_eq!(embed.color, 0xF39C12);
        assert_eq!(embed.fields[0].name, "a");
        assert!(embed.fields[0].inline);
        assert!(!embed.fields[1].inline);
        assert_eq!(embed.footer.unwrap().text, "Last updated");
        assert_eq!(embed.thumbnail.unwrap().url, "https://example.com/t.png");
    }
}
