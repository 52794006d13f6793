use crate::ClientError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use uuid::Uuid;

/// A synthesized clip, kept in the encoding it arrived in.
///
/// Every clip gets its own id, so two results with identical audio are still
/// told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    id: Uuid,
    prompt: String,
    audio_b64: String,
}

impl AudioClip {
    /// Synthesis output is always WAV.
    pub const MIME: &'static str = "audio/wav";

    pub fn new(audio_b64: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            audio_b64: audio_b64.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The prompt the clip was generated from.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn audio_b64(&self) -> &str {
        &self.audio_b64
    }

    /// Decode the audio bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, ClientError> {
        Ok(STANDARD.decode(self.audio_b64.trim())?)
    }

    /// A `data:` URI a player can load directly.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", Self::MIME, self.audio_b64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_payload() {
        let clip = AudioClip::new("QQ==", "test");
        assert_eq!(clip.bytes().unwrap(), b"A");
        assert_eq!(clip.prompt(), "test");
    }

    #[test]
    fn data_uri_carries_mime() {
        let clip = AudioClip::new("UklGRg==", "drums");
        assert_eq!(clip.data_uri(), "data:audio/wav;base64,UklGRg==");
    }

    #[test]
    fn identical_results_are_distinct_clips() {
        let a = AudioClip::new("QQ==", "test");
        let b = AudioClip::new("QQ==", "test");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn bad_base64_is_an_error() {
        let clip = AudioClip::new("not base64!", "x");
        assert!(matches!(clip.bytes(), Err(ClientError::Audio(_))));
    }
}
