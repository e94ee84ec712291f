use std::fmt;

/// Settings keys the pipeline itself reads or writes
///
/// The store accepts any string key; these are the ones with a known owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Id of the most recently closed non-temporary session
    LastSessionId,
    /// Mapping of session id to the chosen video title
    PastTopics,
    /// Text-to-speech API key
    ElevenLabsApiKey,
    /// Checkout of the local image-generation server
    FooocusPath,
    /// Serialized OAuth credentials for YouTube uploads (stored encrypted)
    YoutubeAuthSession,
    /// Per-platform publisher credentials
    Publisher,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::LastSessionId,
        SettingKey::PastTopics,
        SettingKey::ElevenLabsApiKey,
        SettingKey::FooocusPath,
        SettingKey::YoutubeAuthSession,
        SettingKey::Publisher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::LastSessionId => "last_session_id",
            SettingKey::PastTopics => "past_topics",
            SettingKey::ElevenLabsApiKey => "ELEVENLABS_API_KEY",
            SettingKey::FooocusPath => "fooocus_path",
            SettingKey::YoutubeAuthSession => "youtube_auth_session",
            SettingKey::Publisher => "publisher",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl AsRef<str> for SettingKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
