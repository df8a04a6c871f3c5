//! External content model produced by the projector
//!
//! Shaped like a chat rich-embed: title, color class, description, ordered
//! fields, footer. Rebuilt wholesale every tick; sinks map it onto their wire
//! format and stamp the send time themselves.

use serde::{Deserialize, Serialize};

/// Name of the field holding the per-channel listing.
pub const CHANNELS_FIELD: &str = "📢 Channels";

/// Coarse occupancy class.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// No snapshot yet.
    Pending,
    Empty,
    Nominal,
    Busy,
    Critical,
}

impl Urgency {
    /// 24-bit RGB color used by embed-style sinks.
    pub fn color(self) -> u32 {
        match self {
            Self::Pending => 0xFAA61A,
            Self::Empty => 0x95A5A6,
            Self::Nominal => 0x2ECC71,
            Self::Busy => 0xF39C12,
            Self::Critical => 0xE74C3C,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Empty => "empty",
            Self::Nominal => "nominal",
            Self::Busy => "busy",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Field {
    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }

    pub fn block(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Representation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub urgency: Urgency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// New name for the container the artifact lives in, if renaming is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

impl Representation {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The channel listing, or the description when there is none.
    pub fn content(&self) -> Option<&str> {
        self.field(CHANNELS_FIELD)
            .map(|f| f.value.as_str())
            .or(self.description.as_deref())
    }
}
