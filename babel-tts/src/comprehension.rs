//! Which listeners understand which languages

use crate::listeners::Listener;
use babel_core::{ActorId, LanguageId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone)]
struct Knowledge {
    known: HashSet<LanguageId>,
    selected: Option<LanguageId>,
}

/// Known-language sets per actor.
///
/// Gameplay systems write through the mutation methods; the router only reads.
/// Nothing is cached between queries.
#[derive(Default)]
pub struct LanguageRegistry {
    actors: RwLock<HashMap<ActorId, Knowledge>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known set of `actor`
    pub fn set_languages(&self, actor: ActorId, languages: impl IntoIterator<Item = LanguageId>) {
        let mut actors = self.actors.write();
        let knowledge = actors.entry(actor).or_default();
        knowledge.known = languages.into_iter().collect();
        if let Some(selected) = &knowledge.selected {
            if !knowledge.known.contains(selected) {
                knowledge.selected = None;
            }
        }
    }

    /// Returns false if the language was already known
    pub fn learn(&self, actor: ActorId, language: LanguageId) -> bool {
        self.actors.write().entry(actor).or_default().known.insert(language)
    }

    /// Returns false if the language wasn't known
    pub fn forget(&self, actor: ActorId, language: &LanguageId) -> bool {
        let mut actors = self.actors.write();
        let Some(knowledge) = actors.get_mut(&actor) else {
            return false;
        };
        if knowledge.selected.as_ref() == Some(language) {
            knowledge.selected = None;
        }
        knowledge.known.remove(language)
    }

    pub fn remove_actor(&self, actor: ActorId) {
        self.actors.write().remove(&actor);
    }

    /// Known languages of `actor`, sorted for display
    pub fn languages_of(&self, actor: ActorId) -> Vec<LanguageId> {
        let mut languages: Vec<_> = self
            .actors
            .read()
            .get(&actor)
            .map(|k| k.known.iter().cloned().collect())
            .unwrap_or_default();
        languages.sort();
        languages
    }

    /// Make `language` the one `actor` speaks in. Only known languages can be selected.
    pub fn select_language(&self, actor: ActorId, language: LanguageId) -> bool {
        let mut actors = self.actors.write();
        match actors.get_mut(&actor) {
            Some(knowledge) if knowledge.known.contains(&language) => {
                knowledge.selected = Some(language);
                true
            }
            _ => false,
        }
    }

    pub fn selected_language(&self, actor: ActorId) -> Option<LanguageId> {
        self.actors.read().get(&actor).and_then(|k| k.selected.clone())
    }

    pub fn actor_knows(&self, actor: ActorId, language: &LanguageId) -> bool {
        self.actors
            .read()
            .get(&actor)
            .map(|k| k.known.contains(language))
            .unwrap_or(false)
    }

    /// A listener comprehends a language iff its attached actor knows it
    pub fn knows(&self, listener: &Listener, language: &LanguageId) -> bool {
        listener
            .actor
            .map(|actor| self.actor_knows(actor, language))
            .unwrap_or(false)
    }

    /// Split `listeners` into (understand, don't understand)
    pub fn partition_by_comprehension(
        &self,
        language: &LanguageId,
        listeners: impl IntoIterator<Item = Listener>,
    ) -> (Vec<Listener>, Vec<Listener>) {
        let actors = self.actors.read();
        listeners.into_iter().partition(|listener| {
            listener
                .actor
                .and_then(|actor| actors.get(&actor))
                .map(|k| k.known.contains(language))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use babel_core::SessionId;

    fn listener(actor: Option<u64>) -> Listener {
        Listener::new(SessionId::new(), actor.map(ActorId), None)
    }

    #[test]
    fn test_knows_tracks_membership() {
        let registry = LanguageRegistry::new();
        let galactic = LanguageId::from("Galactic");
        let l = listener(Some(1));

        assert!(!registry.knows(&l, &galactic));
        assert!(registry.learn(ActorId(1), galactic.clone()));
        assert!(!registry.learn(ActorId(1), galactic.clone()));
        assert!(registry.knows(&l, &galactic));
        assert!(registry.forget(ActorId(1), &galactic));
        assert!(!registry.knows(&l, &galactic));
        assert!(!registry.forget(ActorId(1), &galactic));
    }

    #[test]
    fn test_unattached_listener_understands_nothing() {
        let registry = LanguageRegistry::new();
        registry.learn(ActorId(1), LanguageId::from("Galactic"));
        assert!(!registry.knows(&listener(None), &LanguageId::from("Galactic")));
    }

    #[test]
    fn test_partition() {
        let registry = LanguageRegistry::new();
        let galactic = LanguageId::from("Galactic");
        registry.set_languages(ActorId(1), [galactic.clone(), LanguageId::from("Sol")]);
        registry.set_languages(ActorId(2), [LanguageId::from("Sol")]);

        let listeners = vec![listener(Some(1)), listener(Some(2)), listener(None), listener(Some(3))];
        let (understand, dont) = registry.partition_by_comprehension(&galactic, listeners.clone());
        assert_eq!(understand, vec![listeners[0]]);
        assert_eq!(dont.len(), 3);
    }

    #[test]
    fn test_selection_requires_knowledge() {
        let registry = LanguageRegistry::new();
        let sol = LanguageId::from("Sol");
        assert!(!registry.select_language(ActorId(1), sol.clone()));

        registry.set_languages(ActorId(1), [LanguageId::from("Galactic"), sol.clone()]);
        assert!(registry.select_language(ActorId(1), sol.clone()));
        assert_eq!(registry.selected_language(ActorId(1)), Some(sol.clone()));

        registry.set_languages(ActorId(1), [LanguageId::from("Galactic")]);
        assert_eq!(registry.selected_language(ActorId(1)), None);
    }

    #[test]
    fn test_languages_sorted_and_removed() {
        let registry = LanguageRegistry::new();
        registry.set_languages(
            ActorId(4),
            ["Sol", "Canilunzt", "Galactic"].into_iter().map(LanguageId::from),
        );
        let names: Vec<_> = registry.languages_of(ActorId(4)).iter().map(|l| l.to_string()).collect();
        assert_eq!(names, vec!["Canilunzt", "Galactic", "Sol"]);

        registry.remove_actor(ActorId(4));
        assert!(registry.languages_of(ActorId(4)).is_empty());
    }
}
