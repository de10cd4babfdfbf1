//! Text preparation for the synthesis engine: sanitizing and SSML prosody

use crate::error::SpeechError;

/// Prosody applied to the whole utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundTraits {
    RateFast,
    PitchVeryLow,
}

impl SoundTraits {
    pub fn for_whisper(is_whisper: bool) -> Self {
        if is_whisper {
            SoundTraits::PitchVeryLow
        } else {
            SoundTraits::RateFast
        }
    }

    fn prosody_attr(self) -> &'static str {
        match self {
            SoundTraits::RateFast => r#"rate="fast""#,
            SoundTraits::PitchVeryLow => r#"pitch="x-low""#,
        }
    }
}

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric()
        || c.is_whitespace()
        || matches!(c, '.' | ',' | '!' | '?' | '-' | '\'' | ':' | ';' | '(' | ')')
}

/// Strip characters the engine can't pronounce and collapse whitespace
pub fn sanitize(text: &str) -> String {
    let filtered: String = text.chars().filter(|c| is_allowed(*c)).collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Wrap text in a `<speak>` document with the given prosody
pub fn to_ssml(text: &str, traits: SoundTraits) -> String {
    format!(
        "<speak><prosody {}>{}</prosody></speak>",
        traits.prosody_attr(),
        escape_xml(text)
    )
}

/// Sanitize, terminate and mark up `text` for the engine.
///
/// Fails with [`SpeechError::EmptyText`] when nothing pronounceable is left.
pub fn prepare(text: &str, is_whisper: bool) -> Result<String, SpeechError> {
    let mut sanitized = sanitize(text);
    let last = sanitized.chars().last().ok_or(SpeechError::EmptyText)?;
    if last.is_alphabetic() {
        sanitized.push('.');
    }
    Ok(to_ssml(&sanitized, SoundTraits::for_whisper(is_whisper)))
}
