use crate::RouteNumber;

pub const DEFAULT_ROUTE_COLOR: &str = "#94A3B8";

const ROUTE_COLORS: &[(u32, &str)] = &[
    (40, "#FF6B6B"),
    (94, "#4ECDC4"),
    (1, "#95E1D3"),
    (2, "#FFD93D"),
    (3, "#6BCB77"),
    (4, "#A78BFA"),
    (5, "#FB923C"),
    (6, "#F472B6"),
    (7, "#38BDF8"),
    (8, "#FDE047"),
];

/// Display color for a route, slate gray for lines without a palette entry.
pub fn route_color(number: RouteNumber) -> &'static str {
    ROUTE_COLORS
        .iter()
        .find(|(n, _)| *n == number.0)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_ROUTE_COLOR)
}
