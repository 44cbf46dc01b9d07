use std::fmt::Write;

use crowdmap_shared::format::{format_kst, format_population};
use crowdmap_shared::{Entity, EntityId, EntityStore};

use crate::icons::badge_style;
use crate::markers::MarkerReconciler;
use crate::sdk::MapSurface;

/// The single shared detail popup. Content is built only when a marker is
/// clicked (or a list row picked), always from the live store.
#[derive(Debug, Default)]
pub struct InfoOverlay {
    open_for: Option<EntityId>,
}

impl InfoOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open for `id` with its current data. Returns false (and leaves the
    /// overlay as it was) when the id has no entity or no marker.
    pub fn show_for<S: MapSurface>(
        &mut self,
        id: &EntityId,
        store: &EntityStore,
        markers: &MarkerReconciler<S::Marker>,
        map: &S,
    ) -> bool {
        let (Some(entity), Some(anchor)) = (store.get(id), markers.marker(id)) else {
            return false;
        };
        map.open_overlay(anchor, &render_content(entity));
        self.open_for = Some(id.clone());
        true
    }

    pub fn hide<S: MapSurface>(&mut self, map: &S) {
        if self.open_for.take().is_some() {
            map.close_overlay();
        }
    }

    /// After a store replace: redraw the open overlay from fresh data, or
    /// close it if its entity is gone.
    pub fn refresh<S: MapSurface>(
        &mut self,
        store: &EntityStore,
        markers: &MarkerReconciler<S::Marker>,
        map: &S,
    ) {
        let Some(id) = self.open_for.clone() else {
            return;
        };
        if !self.show_for(&id, store, markers, map) {
            self.hide(map);
        }
    }

    #[cfg(test)]
    pub fn open_id(&self) -> Option<&EntityId> {
        self.open_for.as_ref()
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Detail markup: name, level badge, population, last update, forecast.
pub fn render_content(entity: &Entity) -> String {
    let mut html = String::with_capacity(512);
    html.push_str(r#"<div class="crowd-overlay" style="padding:10px 12px;min-width:200px;max-width:260px;font-family:'Inter',system-ui,sans-serif;font-size:0.8rem;color:#1f2430;">"#);
    let _ = write!(
        html,
        r#"<div style="font-weight:700;font-size:0.9rem;margin-bottom:4px;">{}</div>"#,
        escape_html(&entity.name)
    );
    let _ = write!(
        html,
        r#"<span style="{}">{}</span>"#,
        badge_style(entity.level.kind()),
        escape_html(entity.level.display_label())
    );
    if !entity.population.is_empty() {
        let _ = write!(
            html,
            r#"<div style="margin-top:6px;">Population <b>{}</b></div>"#,
            format_population(&entity.population)
        );
    }
    if let Some(updated) = entity.updated_at.as_ref() {
        let _ = write!(
            html,
            r#"<div style="margin-top:2px;color:#6b7080;font-size:0.7rem;">Updated {}</div>"#,
            format_kst(updated)
        );
    }
    if !entity.forecast.is_empty() {
        html.push_str(r#"<div style="margin-top:8px;padding-top:6px;border-top:1px solid #e4e6ee;"><div style="font-weight:600;margin-bottom:3px;">Forecast</div>"#);
        for point in &entity.forecast {
            let _ = write!(
                html,
                r#"<div style="display:flex;justify-content:space-between;gap:6px;font-size:0.72rem;margin-top:2px;"><span>{}</span><span style="{}">{}</span><span>{}</span></div>"#,
                escape_html(&point.time),
                badge_style(point.level.kind()),
                escape_html(point.level.display_label()),
                format_population(&point.population)
            );
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}
