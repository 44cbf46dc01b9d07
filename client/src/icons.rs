use std::collections::HashMap;
use std::rc::Rc;

use crowdmap_shared::{CrowdLevel, LevelKind};

pub const ICON_WIDTH: u32 = 24;
pub const ICON_HEIGHT: u32 = 34;

/// Marker image for one crowding category. Immutable once built and shared
/// by every marker at that level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconAsset {
    pub kind: LevelKind,
    /// `data:` URI of the pin SVG.
    pub src: String,
    pub width: u32,
    pub height: u32,
}

impl IconAsset {
    fn synthesize(kind: LevelKind) -> Self {
        let svg = pin_svg(&kind.color_hex());
        Self {
            kind,
            src: format!("data:image/svg+xml;charset=utf-8,{}", encode_svg(&svg)),
            width: ICON_WIDTH,
            height: ICON_HEIGHT,
        }
    }
}

fn pin_svg(fill: &str) -> String {
    format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{ICON_WIDTH}' height='{ICON_HEIGHT}' viewBox='0 0 24 34'><path d='M12 0C5.4 0 0 5.3 0 11.9 0 20.8 12 34 12 34s12-13.2 12-22.1C24 5.3 18.6 0 12 0z' fill='{fill}' stroke='#ffffff' stroke-width='1.5'/><circle cx='12' cy='12' r='4.5' fill='#ffffff'/></svg>"
    )
}

fn encode_svg(svg: &str) -> String {
    let mut out = String::with_capacity(svg.len() + svg.len() / 4);
    for ch in svg.chars() {
        match ch {
            '#' => out.push_str("%23"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            _ => out.push(ch),
        }
    }
    out
}

/// Level -> icon memo. Keyed by category, so it never holds more than one
/// entry per known level plus one for unrecognized values.
#[derive(Debug, Default)]
pub struct IconCache {
    entries: HashMap<LevelKind, Rc<IconAsset>>,
}

impl IconCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, level: &CrowdLevel) -> Rc<IconAsset> {
        let kind = level.kind();
        self.entries
            .entry(kind)
            .or_insert_with(|| Rc::new(IconAsset::synthesize(kind)))
            .clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Inline style for a level badge in the list panel and overlay.
pub fn badge_style(kind: LevelKind) -> String {
    format!(
        "display:inline-block;padding:1px 7px;border-radius:9px;font-size:0.7rem;font-weight:600;color:#fff;background:{};",
        crate::colors::level_rgba(kind, 0.92)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_level_shares_one_asset() {
        let mut cache = IconCache::new();
        let a = cache.get(&CrowdLevel::new("여유"));
        let b = cache.get(&CrowdLevel::new("여유"));
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn aliases_of_one_category_share_an_entry() {
        let mut cache = IconCache::new();
        let a = cache.get(&CrowdLevel::new("여유"));
        let b = cache.get(&CrowdLevel::new("light"));
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn bounded_by_known_levels_plus_fallback() {
        let mut cache = IconCache::new();
        for _ in 0..10 {
            for kind in LevelKind::KNOWN {
                cache.get(&CrowdLevel::new(kind.label()));
            }
            cache.get(&CrowdLevel::new("폭주"));
            cache.get(&CrowdLevel::new("???"));
            cache.get(&CrowdLevel::default());
        }
        assert_eq!(cache.len(), LevelKind::KNOWN.len() + 1);
    }

    #[test]
    fn asset_is_deterministic_and_colored() {
        let mut first = IconCache::new();
        let mut second = IconCache::new();
        let a = first.get(&CrowdLevel::new("붐빔"));
        let b = second.get(&CrowdLevel::new("붐빔"));
        assert_eq!(*a, *b);
        assert!(a.src.starts_with("data:image/svg+xml"));
        assert!(a.src.contains("%23ef4444"));
        assert!(!a.src.contains('#'));
    }

    #[test]
    fn unknown_level_is_gray() {
        let mut cache = IconCache::new();
        let icon = cache.get(&CrowdLevel::new("n/a"));
        assert_eq!(icon.kind, LevelKind::Unknown);
        assert!(icon.src.contains("%239496a0"));
    }
}
