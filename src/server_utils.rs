use crate::constants::{compute_cell_size, sanitize_cell_size, DEFAULT_CELL_SIZE};
use crate::server_protocol::Viewport;

pub const MAX_LEVEL: u32 = 999;

pub fn normalize_level(value: Option<i64>) -> u32 {
    value.unwrap_or(1).clamp(1, MAX_LEVEL as i64) as u32
}

/// Client seeds wrap into the engine's 32-bit seed space.
pub fn normalize_seed(value: Option<i64>) -> Option<u32> {
    value.map(|seed| seed as u32)
}

/// Explicit cell size wins over a viewport fit; either way the result is safe for movement math.
pub fn resolve_cell_size(
    cell_size: Option<f64>,
    viewport: Option<Viewport>,
    rows: usize,
    cols: usize,
) -> f32 {
    if let Some(size) = cell_size {
        return sanitize_cell_size(size as f32);
    }
    match viewport {
        Some(viewport) => compute_cell_size(
            viewport.width as f32,
            viewport.height as f32,
            rows,
            cols,
        ),
        None => DEFAULT_CELL_SIZE,
    }
}

pub fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(8080)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MIN_SAFE_CELL_SIZE, VIEWPORT_MAX_CELL_SIZE};

    #[test]
    fn normalize_level_clamps_range() {
        assert_eq!(normalize_level(None), 1);
        assert_eq!(normalize_level(Some(-4)), 1);
        assert_eq!(normalize_level(Some(12)), 12);
        assert_eq!(normalize_level(Some(1_000_000)), MAX_LEVEL);
    }

    #[test]
    fn normalize_seed_wraps_into_u32() {
        assert_eq!(normalize_seed(None), None);
        assert_eq!(normalize_seed(Some(7)), Some(7));
        assert_eq!(normalize_seed(Some(-1)), Some(u32::MAX));
    }

    #[test]
    fn cell_size_prefers_explicit_value_then_viewport() {
        assert_eq!(resolve_cell_size(Some(0.0), None, 10, 10), MIN_SAFE_CELL_SIZE);
        assert_eq!(resolve_cell_size(Some(30.0), None, 10, 10), 30.0);
        let viewport = Viewport {
            width: 5_000.0,
            height: 5_000.0,
        };
        assert_eq!(
            resolve_cell_size(None, Some(viewport), 10, 10),
            VIEWPORT_MAX_CELL_SIZE
        );
        assert_eq!(resolve_cell_size(None, None, 10, 10), DEFAULT_CELL_SIZE);
    }

    #[test]
    fn port_parsing_is_lenient_for_invalid_values() {
        assert_eq!(parse_port(Some("9000")), 9000);
        assert_eq!(parse_port(Some(" 81 ")), 81);
        assert_eq!(parse_port(Some("abc")), 8080);
        assert_eq!(parse_port(Some("70000")), 8080);
        assert_eq!(parse_port(None), 8080);
    }
}
