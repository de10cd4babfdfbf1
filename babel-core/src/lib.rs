pub mod types;
pub mod error;
pub mod content;

pub use error::{Error, Result};
pub use types::{ActorId, SessionId, LanguageId, VoiceId, Position, ChannelKind};
pub use content::{ContentCatalog, Language, Voice};
