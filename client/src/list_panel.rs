use leptos::prelude::*;

use crowdmap_shared::format::format_population;
use crowdmap_shared::{Entity, EntityId, LevelKind};

use crate::app::{ListOpen, ListPages, ListRows};
use crate::icons::badge_style;

/// Rows revealed per "load more".
pub const PAGE_SIZE: usize = 200;

/// Plain-data copy of an entity for the list; the session keeps the real one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ListRow {
    pub id: EntityId,
    pub name: String,
    pub level_label: String,
    pub kind: LevelKind,
    pub population: String,
}

impl ListRow {
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            level_label: entity.level.display_label().to_string(),
            kind: entity.level.kind(),
            population: if entity.population.is_empty() {
                String::new()
            } else {
                format_population(&entity.population)
            },
        }
    }
}

/// How many of `total` rows are revealed after `pages` pages (at least one).
pub fn shown_len(total: usize, pages: usize) -> usize {
    total.min(pages.max(1).saturating_mul(PAGE_SIZE))
}

pub fn has_more(total: usize, pages: usize) -> bool {
    shown_len(total, pages) < total
}

#[component]
pub(crate) fn ListPanel() -> impl IntoView {
    let ListRows(rows) = expect_context();
    let ListPages(pages) = expect_context();
    let ListOpen(list_open) = expect_context();

    let total = Memo::new(move |_| rows.with(Vec::len));
    let shown = Memo::new(move |_| shown_len(total.get(), pages.get()));

    view! {
        <aside
            class="list-panel"
            style="position: absolute; top: 0; right: 0; bottom: 0; width: 320px; z-index: 10; background: #13161f; border-left: 1px solid #282c3e; display: flex; flex-direction: column; font-family: 'Inter', system-ui, sans-serif;"
            style:display=move || if list_open.get() { "flex" } else { "none" }
        >
            <div style="padding: 12px 16px; border-bottom: 1px solid #282c3e; color: #9a98a0; font-size: 0.75rem;">
                {move || format!("Showing {} of {}", shown.get(), total.get())}
            </div>
            <div style="flex: 1; overflow-y: auto;">
                <For
                    each=move || rows.with(|r| r.iter().take(shown.get()).cloned().collect::<Vec<_>>())
                    key=|row| (row.id.clone(), row.level_label.clone(), row.population.clone())
                    children=move |row| {
                        let id = row.id.clone();
                        view! {
                            <button
                                class="list-row"
                                style="display: block; width: 100%; text-align: left; padding: 10px 16px; background: none; border: none; border-bottom: 1px solid #1e2230; color: #e2e0d8; cursor: pointer;"
                                on:click=move |_| crate::app::focus_entity(&id)
                            >
                                <div style="font-size: 0.85rem; font-weight: 600;">{row.name}</div>
                                <div style="margin-top: 3px; display: flex; gap: 8px; align-items: center; font-size: 0.72rem; color: #9a98a0;">
                                    <span style=badge_style(row.kind)>{row.level_label}</span>
                                    <span>{row.population}</span>
                                </div>
                            </button>
                        }
                    }
                />
                <Show when=move || has_more(total.get(), pages.get())>
                    <button
                        style="display: block; margin: 12px auto; padding: 6px 14px; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 6px; color: #e2e0d8; cursor: pointer; font-size: 0.8rem;"
                        on:click=move |_| pages.update(|p| *p += 1)
                    >
                        {move || format!("Load more ({} left)", total.get() - shown.get())}
                    </button>
                </Show>
            </div>
        </aside>
    }
}
