use serde::{Deserialize, Serialize};

/// How much the team knows about a counterparty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    /// Only a phone number is known (the export was not saved under a name).
    PhoneOnly,
    #[default]
    Named,
    /// Already converted; excluded from lead scoring.
    Client,
}

impl ContactStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::PhoneOnly => 0,
            Self::Named => 1,
            Self::Client => 2,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        match value {
            0 => Self::PhoneOnly,
            2 => Self::Client,
            _ => Self::Named,
        }
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PhoneOnly => write!(f, "phone_only"),
            Self::Named => write!(f, "named"),
            Self::Client => write!(f, "client"),
        }
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "phone_only" | "unscheduled" => Ok(Self::PhoneOnly),
            "named" | "contact" => Ok(Self::Named),
            "client" => Ok(Self::Client),
            _ => Err(format!("Unknown contact status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
    Audio,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::File => write!(f, "file"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "file" => Ok(Self::File),
            "audio" => Ok(Self::Audio),
            _ => Err(format!("Unknown message kind: {s}")),
        }
    }
}

/// Coarse media class, also the storage subdirectory name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    #[default]
    File,
}

impl MediaKind {
    /// Classify by the major part of a media type (`image/jpeg` -> `Image`).
    pub fn from_mime(mime_type: Option<&str>) -> Self {
        let major = mime_type
            .and_then(|m| m.split('/').next())
            .map(|m| m.to_ascii_lowercase());
        match major.as_deref() {
            Some("image") => Self::Image,
            Some("audio") => Self::Audio,
            Some("video") => Self::Video,
            _ => Self::File,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::File => write!(f, "file"),
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "file" => Ok(Self::File),
            _ => Err(format!("Unknown media kind: {s}")),
        }
    }
}

/// Where a score event came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrigin {
    #[default]
    Rule,
    Human,
    Ai,
    External,
}

impl std::fmt::Display for ScoreOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rule => write!(f, "rule"),
            Self::Human => write!(f, "human"),
            Self::Ai => write!(f, "ai"),
            Self::External => write!(f, "external"),
        }
    }
}

impl std::str::FromStr for ScoreOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rule" => Ok(Self::Rule),
            "human" => Ok(Self::Human),
            "ai" | "ia" => Ok(Self::Ai),
            "external" => Ok(Self::External),
            _ => Err(format!("Unknown score origin: {s}")),
        }
    }
}

/// Stages of a single archive import, in order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Extracting,
    Parsing,
    ResolvingIdentity,
    PersistingMessages,
    ResolvingAttachments,
    Scoring,
    Committed,
    Failed,
}

impl std::fmt::Display for ImportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extracting => write!(f, "extracting"),
            Self::Parsing => write!(f, "parsing"),
            Self::ResolvingIdentity => write!(f, "resolving_identity"),
            Self::PersistingMessages => write!(f, "persisting_messages"),
            Self::ResolvingAttachments => write!(f, "resolving_attachments"),
            Self::Scoring => write!(f, "scoring"),
            Self::Committed => write!(f, "committed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_status_int_mapping() {
        for status in [
            ContactStatus::PhoneOnly,
            ContactStatus::Named,
            ContactStatus::Client,
        ] {
            assert_eq!(ContactStatus::from_i64(status.as_i64()), status);
        }
        assert_eq!(ContactStatus::from_i64(42), ContactStatus::Named);
    }

    #[test]
    fn test_media_kind_from_mime() {
        assert_eq!(MediaKind::from_mime(Some("image/jpeg")), MediaKind::Image);
        assert_eq!(MediaKind::from_mime(Some("AUDIO/ogg")), MediaKind::Audio);
        assert_eq!(MediaKind::from_mime(Some("video/mp4")), MediaKind::Video);
        assert_eq!(
            MediaKind::from_mime(Some("application/pdf")),
            MediaKind::File
        );
        assert_eq!(MediaKind::from_mime(None), MediaKind::File);
    }

    #[test]
    fn test_score_origin_from_str() {
        assert_eq!("rule".parse::<ScoreOrigin>().unwrap(), ScoreOrigin::Rule);
        assert_eq!("Human".parse::<ScoreOrigin>().unwrap(), ScoreOrigin::Human);
        assert_eq!("ia".parse::<ScoreOrigin>().unwrap(), ScoreOrigin::Ai);
        assert!("robot".parse::<ScoreOrigin>().is_err());
    }

    #[test]
    fn test_message_kind_serialization() {
        let json = serde_json::to_string(&MessageKind::Audio).unwrap();
        assert_eq!(json, "\"audio\"");
        let kind: MessageKind = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(kind, MessageKind::Image);
    }

    #[test]
    fn test_import_stage_display() {
        assert_eq!(
            ImportStage::ResolvingIdentity.to_string(),
            "resolving_identity"
        );
        assert_eq!(ImportStage::Committed.to_string(), "committed");
    }
}
