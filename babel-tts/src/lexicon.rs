//! Lexicon obfuscation: the garbled rendering heard by listeners who don't
//! know the speaker's language

use babel_core::Language;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Replace every whitespace-separated token of `message` with a random word
/// from `lexicon`. An empty lexicon leaves the message untouched.
pub fn obfuscate_with<R: Rng + ?Sized>(message: &str, lexicon: &[String], rng: &mut R) -> String {
    if lexicon.is_empty() {
        return message.to_string();
    }

    message
        .split_whitespace()
        .map(|_| lexicon[rng.gen_range(0..lexicon.len())].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Obfuscator owning a seedable random source
pub struct LexiconObfuscator {
    rng: Mutex<StdRng>,
}

impl LexiconObfuscator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic obfuscator for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Garble `message` in `language`; an unknown language passes it through
    pub fn obfuscate(&self, message: &str, language: Option<&Language>) -> String {
        match language {
            Some(language) => {
                let mut rng = self.rng.lock();
                obfuscate_with(message, &language.lexicon, &mut *rng)
            }
            None => message.to_string(),
        }
    }
}

impl Default for LexiconObfuscator {
    fn default() -> Self {
        Self::new()
    }
}
