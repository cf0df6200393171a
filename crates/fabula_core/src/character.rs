//! Character profiles and the merged roster.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A family tie to another character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, derive_getters::Getters)]
pub struct FamilyRelation {
    relation_type: String,
    name: String,
}

impl FamilyRelation {
    /// Create a family relation.
    pub fn new(relation_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            relation_type: relation_type.into(),
            name: name.into(),
        }
    }
}

// Backends sometimes emit a bare name instead of an object.
impl<'de> Deserialize<'de> for FamilyRelation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Full { relation_type: String, name: String },
            Bare(String),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Full {
                relation_type,
                name,
            } => FamilyRelation::new(relation_type, name),
            Wire::Bare(name) => FamilyRelation::new("unknown", name),
        })
    }
}

/// Named ties from one character to others.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct Relationships {
    #[serde(default)]
    lovers: Vec<String>,
    #[serde(default)]
    friends: Vec<String>,
    #[serde(default)]
    enemies: Vec<String>,
    #[serde(default)]
    family: Vec<FamilyRelation>,
}

impl Relationships {
    /// Create relationships from their parts.
    pub fn new(
        lovers: Vec<String>,
        friends: Vec<String>,
        enemies: Vec<String>,
        family: Vec<FamilyRelation>,
    ) -> Self {
        Self {
            lovers,
            friends,
            enemies,
            family,
        }
    }

    /// Every related name, deduplicated in first-seen order.
    pub fn related_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let all = self
            .lovers
            .iter()
            .chain(&self.friends)
            .chain(&self.enemies)
            .chain(self.family.iter().map(|f| &f.name));
        for name in all {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    fn absorb(&mut self, other: &Relationships) {
        union_into(&mut self.lovers, &other.lovers);
        union_into(&mut self.friends, &other.friends);
        union_into(&mut self.enemies, &other.enemies);
        union_into(&mut self.family, &other.family);
    }
}

/// Continuity metadata for one character.
///
/// Relationship lists are flattened into the profile on the wire
/// (`lovers`, `friends`, `enemies`, `family` sit beside `name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CharacterProfile {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
    role: String,
    #[serde(default)]
    occupation: String,
    #[serde(default)]
    personality_traits: Vec<String>,
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default)]
    fears: Vec<String>,
    #[serde(flatten)]
    relationships: Relationships,
    #[serde(default)]
    key_events: Vec<String>,
    #[serde(default)]
    profile_text: Option<String>,
}

impl CharacterProfile {
    /// Create a profile with only a name and role set.
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            role: role.into(),
            occupation: String::new(),
            personality_traits: Vec::new(),
            goals: Vec::new(),
            fears: Vec::new(),
            relationships: Relationships::default(),
            key_events: Vec::new(),
            profile_text: None,
        }
    }

    /// Set aliases.
    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Set occupation.
    pub fn with_occupation(mut self, occupation: impl Into<String>) -> Self {
        self.occupation = occupation.into();
        self
    }

    /// Set personality traits.
    pub fn with_traits(mut self, traits: Vec<String>) -> Self {
        self.personality_traits = traits;
        self
    }

    /// Set relationships.
    pub fn with_relationships(mut self, relationships: Relationships) -> Self {
        self.relationships = relationships;
        self
    }

    /// Set key events.
    pub fn with_key_events(mut self, key_events: Vec<String>) -> Self {
        self.key_events = key_events;
        self
    }

    /// Set the summary text.
    pub fn with_profile_text(mut self, text: impl Into<String>) -> Self {
        self.profile_text = Some(text.into());
        self
    }

    /// Whether the profile carries the minimum a roster entry needs.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.role.trim().is_empty()
    }

    /// Fold another profile for the same character into this one.
    ///
    /// Lists are unioned in first-seen order; scalars keep the first
    /// non-empty value. The incoming name becomes an alias when it differs
    /// from the canonical name.
    pub fn merge(&mut self, other: &CharacterProfile) {
        if other.name != self.name {
            union_into(&mut self.aliases, std::slice::from_ref(&other.name));
        }
        let foreign_aliases: Vec<String> = other
            .aliases
            .iter()
            .filter(|a| **a != self.name)
            .cloned()
            .collect();
        union_into(&mut self.aliases, &foreign_aliases);

        keep_first(&mut self.role, &other.role);
        keep_first(&mut self.occupation, &other.occupation);
        if self.profile_text.as_deref().is_none_or(|t| t.trim().is_empty()) {
            if let Some(text) = other.profile_text.as_ref().filter(|t| !t.trim().is_empty()) {
                self.profile_text = Some(text.clone());
            }
        }

        union_into(&mut self.personality_traits, &other.personality_traits);
        union_into(&mut self.goals, &other.goals);
        union_into(&mut self.fears, &other.fears);
        self.relationships.absorb(&other.relationships);
        union_into(&mut self.key_events, &other.key_events);
    }
}

fn union_into<T: PartialEq + Clone>(target: &mut Vec<T>, incoming: &[T]) {
    for item in incoming {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

fn keep_first(target: &mut String, incoming: &str) {
    if target.trim().is_empty() && !incoming.trim().is_empty() {
        *target = incoming.to_string();
    }
}

/// Canonical-name keyed character profiles with an alias index.
///
/// Inserting a profile whose name matches an existing canonical name or
/// alias, or whose aliases include an existing canonical name, merges it into
/// that entry instead of creating a new one.
///
/// # Examples
///
/// ```
/// use fabula_core::{CharacterProfile, CharacterRoster};
///
/// let mut roster = CharacterRoster::new();
/// roster.insert(
///     CharacterProfile::new("Mara Quill", "keeper").with_aliases(vec!["the keeper".into()]),
/// );
/// roster.insert(CharacterProfile::new("the keeper", "").with_occupation("lighthouse keeper"));
///
/// assert_eq!(roster.len(), 1);
/// let mara = roster.lookup("THE KEEPER").unwrap();
/// assert_eq!(mara.name(), "Mara Quill");
/// assert_eq!(mara.occupation(), "lighthouse keeper");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, CharacterProfile>",
    into = "BTreeMap<String, CharacterProfile>"
)]
pub struct CharacterRoster {
    profiles: BTreeMap<String, CharacterProfile>,
    aliases: HashMap<String, String>,
}

impl CharacterRoster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct characters.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles keyed by canonical name.
    pub fn profiles(&self) -> &BTreeMap<String, CharacterProfile> {
        &self.profiles
    }

    /// Find a profile by canonical name or alias, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<&CharacterProfile> {
        self.profiles.get(name).or_else(|| {
            self.aliases
                .get(&index_key(name))
                .and_then(|canonical| self.profiles.get(canonical))
        })
    }

    /// Canonical name an incoming profile resolves to, if it collides.
    fn resolve(&self, profile: &CharacterProfile) -> Option<String> {
        if let Some(canonical) = self.aliases.get(&index_key(&profile.name)) {
            return Some(canonical.clone());
        }
        profile.aliases.iter().map(|a| index_key(a)).find_map(|key| {
            self.profiles
                .keys()
                .find(|canonical| index_key(canonical) == key)
                .cloned()
        })
    }

    /// Insert a profile, merging on collision.
    ///
    /// A profile with a blank name or role that matches no existing entry
    /// is ignored and `false` is returned.
    pub fn insert(&mut self, profile: CharacterProfile) -> bool {
        if !profile.is_valid() && self.resolve(&profile).is_none() {
            return false;
        }

        let canonical = match self.resolve(&profile) {
            Some(canonical) => {
                if let Some(existing) = self.profiles.get_mut(&canonical) {
                    existing.merge(&profile);
                }
                canonical
            }
            None => {
                let canonical = profile.name.clone();
                self.profiles.insert(canonical.clone(), profile);
                canonical
            }
        };
        self.index(&canonical);
        true
    }

    /// Merge every profile from another roster into this one.
    pub fn merge(&mut self, other: &CharacterRoster) {
        for profile in other.profiles.values() {
            self.insert(profile.clone());
        }
    }

    /// Related character names for each canonical name.
    pub fn network(&self) -> BTreeMap<String, Vec<String>> {
        self.profiles
            .iter()
            .map(|(name, profile)| (name.clone(), profile.relationships.related_names()))
            .collect()
    }

    /// Register a canonical name and its aliases in the index.
    ///
    /// An alias already owned by another character stays with that character.
    fn index(&mut self, canonical: &str) {
        let Some(profile) = self.profiles.get(canonical) else {
            return;
        };
        let keys: Vec<String> = std::iter::once(&profile.name)
            .chain(&profile.aliases)
            .map(|n| index_key(n))
            .collect();
        for key in keys {
            self.aliases
                .entry(key)
                .or_insert_with(|| canonical.to_string());
        }
    }
}

fn index_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl From<BTreeMap<String, CharacterProfile>> for CharacterRoster {
    fn from(map: BTreeMap<String, CharacterProfile>) -> Self {
        let mut roster = CharacterRoster::new();
        for (_, profile) in map {
            roster.insert(profile);
        }
        roster
    }
}

impl From<CharacterRoster> for BTreeMap<String, CharacterProfile> {
    fn from(roster: CharacterRoster) -> Self {
        roster.profiles
    }
}

impl FromIterator<CharacterProfile> for CharacterRoster {
    fn from_iter<I: IntoIterator<Item = CharacterProfile>>(iter: I) -> Self {
        let mut roster = CharacterRoster::new();
        for profile in iter {
            roster.insert(profile);
        }
        roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn relation_set(profile: &CharacterProfile) -> BTreeSet<String> {
        profile.relationships().related_names().into_iter().collect()
    }

    #[test]
    fn family_accepts_bare_names() {
        let json = r#"{"name": "Mara", "role": "keeper", "family": ["Ilse", {"relation_type": "father", "name": "Oren"}]}"#;
        let profile: CharacterProfile = serde_json::from_str(json).unwrap();
        let family = profile.relationships().family();
        assert_eq!(family[0], FamilyRelation::new("unknown", "Ilse"));
        assert_eq!(family[1], FamilyRelation::new("father", "Oren"));
    }

    #[test]
    fn same_name_merges_and_keeps_first_scalars() {
        let mut roster = CharacterRoster::new();
        roster.insert(
            CharacterProfile::new("Mara", "keeper")
                .with_traits(names(&["stubborn", "quiet"])),
        );
        roster.insert(
            CharacterProfile::new("Mara", "smuggler")
                .with_occupation("lamplighter")
                .with_traits(names(&["quiet", "brave"])),
        );

        let mara = roster.lookup("Mara").unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(mara.role(), "keeper");
        assert_eq!(mara.occupation(), "lamplighter");
        assert_eq!(mara.personality_traits(), &names(&["stubborn", "quiet", "brave"]));
    }

    #[test]
    fn alias_matching_canonical_name_merges() {
        let mut roster = CharacterRoster::new();
        roster.insert(CharacterProfile::new("Oren", "father"));
        roster.insert(
            CharacterProfile::new("Old Oren Vale", "father").with_aliases(names(&["Oren"])),
        );

        assert_eq!(roster.len(), 1);
        let oren = roster.lookup("old oren vale").unwrap();
        assert_eq!(oren.name(), "Oren");
        assert!(oren.aliases().contains(&"Old Oren Vale".to_string()));
    }

    #[test]
    fn merge_is_idempotent() {
        let profile = CharacterProfile::new("Mara", "keeper").with_relationships(
            Relationships::new(names(&["Tomas"]), names(&["Ilse"]), vec![], vec![]),
        );
        let once: CharacterRoster = [profile.clone()].into_iter().collect();
        let mut twice = once.clone();
        twice.merge(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_is_order_insensitive_on_relationships() {
        let a = CharacterProfile::new("Mara", "keeper").with_relationships(Relationships::new(
            names(&["Tomas"]),
            names(&["Ilse"]),
            vec![],
            vec![FamilyRelation::new("father", "Oren")],
        ));
        let b = CharacterProfile::new("Mara", "keeper").with_relationships(Relationships::new(
            vec![],
            names(&["Petra", "Ilse"]),
            names(&["The Sea"]),
            vec![],
        ));

        let ab: CharacterRoster = [a.clone(), b.clone()].into_iter().collect();
        let ba: CharacterRoster = [b, a].into_iter().collect();

        assert_eq!(
            relation_set(ab.lookup("Mara").unwrap()),
            relation_set(ba.lookup("Mara").unwrap())
        );
    }

    #[test]
    fn invalid_profiles_are_rejected() {
        let mut roster = CharacterRoster::new();
        assert!(!roster.insert(CharacterProfile::new("", "keeper")));
        assert!(!roster.insert(CharacterProfile::new("Nobody", "  ")));
        assert!(roster.is_empty());
    }

    #[test]
    fn roster_serializes_as_name_map() {
        let roster: CharacterRoster = [CharacterProfile::new("Mara", "keeper")
            .with_aliases(names(&["the keeper"]))]
        .into_iter()
        .collect();
        let json = serde_json::to_value(&roster).unwrap();
        assert_eq!(json["Mara"]["role"], "keeper");

        let back: CharacterRoster = serde_json::from_value(json).unwrap();
        assert!(back.lookup("the keeper").is_some());
    }

    #[test]
    fn network_lists_related_names() {
        let roster: CharacterRoster = [CharacterProfile::new("Mara", "keeper")
            .with_relationships(Relationships::new(
                names(&["Tomas"]),
                names(&["Ilse", "Tomas"]),
                vec![],
                vec![FamilyRelation::new("father", "Oren")],
            ))]
        .into_iter()
        .collect();
        assert_eq!(roster.network()["Mara"], names(&["Tomas", "Ilse", "Oren"]));
    }
}
