use crate::entity::EntityId;
use crate::level::LevelKind;
use crate::store::EntityStore;

/// Category filter: everything, or an exact raw level value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub enum LevelFilter {
    #[default]
    All,
    Exact(String),
}

impl LevelFilter {
    /// Select option value -> filter. Empty string means "all".
    pub fn from_option(value: &str) -> Self {
        if value.is_empty() {
            Self::All
        } else {
            Self::Exact(value.to_string())
        }
    }

    pub fn option_value(&self) -> &str {
        match self {
            Self::All => "",
            Self::Exact(level) => level,
        }
    }

    pub fn matches(&self, raw_level: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(level) => level == raw_level,
        }
    }

    /// Options shown in the category select, in crowding order.
    pub fn options() -> Vec<(String, &'static str)> {
        std::iter::once((String::new(), "전체"))
            .chain(
                LevelKind::KNOWN
                    .iter()
                    .map(|kind| (kind.label().to_string(), kind.label())),
            )
            .collect()
    }
}

/// Ids of entities whose name contains `search` (case-insensitive) and whose
/// level passes `level`, in store order. Surrounding whitespace in `search`
/// is ignored; an empty search matches everything.
pub fn filter(store: &EntityStore, search: &str, level: &LevelFilter) -> Vec<EntityId> {
    let needle = search.trim().to_lowercase();
    store
        .iter()
        .filter(|entity| level.matches(entity.level.as_str()))
        .filter(|entity| needle.is_empty() || entity.name.to_lowercase().contains(&needle))
        .map(|entity| entity.id.clone())
        .collect()
}
