use crowdmap_shared::LevelKind;

/// CSS `rgba()` for a crowding category at the given opacity.
pub fn level_rgba(kind: LevelKind, alpha: f64) -> String {
    let (r, g, b) = kind.color_rgb();
    format!("rgba({r},{g},{b},{alpha})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_level_palette() {
        assert_eq!(level_rgba(LevelKind::Relaxed, 0.5), "rgba(34,197,94,0.5)");
        assert_eq!(level_rgba(LevelKind::Unknown, 1.0), "rgba(148,150,160,1)");
    }
}
