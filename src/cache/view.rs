//! The currently visible view.

use crate::cache::CacheKey;
use crate::types::PersonId;

/// What the presentation layer is showing right now
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveView {
    pub key: Option<CacheKey>,
    pub pinned_person: Option<PersonId>,
}

impl ActiveView {
    pub fn showing(key: CacheKey) -> Self {
        let pinned_person = key.person_scope();
        Self {
            key: Some(key),
            pinned_person,
        }
    }

    pub fn is_showing(&self, key: &CacheKey) -> bool {
        self.key.as_ref() == Some(key)
    }

    /// Re-point a view pinned to `from` at `to`. Returns true when redirected.
    pub fn redirect_person(&mut self, from: PersonId, to: PersonId) -> bool {
        let mut redirected = false;
        if self.pinned_person == Some(from) {
            self.pinned_person = Some(to);
            redirected = true;
        }
        if let Some(key) = &self.key {
            if key.person_scope() == Some(from) {
                self.key = Some(key.clone().with_param(crate::cache::key::PERSON_PARAM, to));
                redirected = true;
            }
        }
        redirected
    }
}
