//! Shared dark visual theme for every chart and page

use serde_json::{Value, json};

// page and plot colours
pub const BACKGROUND: &str = "#111111";
pub const FOREGROUND: &str = "#FFFFFF";
pub const MUTED: &str = "#E0E0E0";
pub const ACCENT: &str = "#A970FF";
pub const GRID: &str = "#444444";

/// Continuous scale for the choropleth
pub const CONTINUOUS_SCALE: &str = "Plasma";

/// Qualitative palette for per-continent / per-country series
pub const PALETTE: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// Figure height in pixels
pub const CHART_HEIGHT: u32 = 600;

/// Palette colour for the `i`-th series, cycling
pub fn series_color(i: usize) -> &'static str {
    PALETTE[i % PALETTE.len()]
}

/// Parse `#RRGGBB` into its components, black on malformed input
pub fn rgb(hex: &str) -> (u8, u8, u8) {
    let hex = hex.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    (channel(0), channel(2), channel(4))
}

/// Layout keys every figure starts from
///
/// Dark background, small white font, fixed margins and a horizontal legend
/// sitting above the plot area.
pub fn common_layout() -> Value {
    json!({
        "autosize": true,
        "height": CHART_HEIGHT,
        "title": { "x": 0.3, "y": 1 },
        "template": "plotly_dark",
        "plot_bgcolor": BACKGROUND,
        "paper_bgcolor": BACKGROUND,
        "font": { "color": FOREGROUND, "size": 9 },
        "margin": { "l": 10, "r": 10, "t": 80, "b": 80 },
        "legend": {
            "orientation": "h",
            "y": 1.15,
            "xanchor": "center",
            "x": 0.5
        }
    })
}

/// Axis styling shared by the cartesian charts
pub fn axis(title: &str) -> Value {
    json!({
        "title": { "text": title },
        "showgrid": false,
        "zeroline": false,
        "tickfont": { "color": FOREGROUND }
    })
}

/// Build a themed layout with a title and chart-specific overrides
///
/// `extra` is merged into [`common_layout`] recursively, so it can refine
/// nested keys such as `title.text` without dropping the theme's siblings.
pub fn layout(title: &str, extra: Value) -> Value {
    let mut base = common_layout();
    merge(&mut base, json!({ "title": { "text": title } }));
    merge(&mut base, extra);
    base
}

/// Recursive object merge; non-object values in `patch` replace `target`
pub fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_keeps_theme_and_applies_overrides() {
        let l = layout("Trend", json!({ "title": { "x": 0.5 }, "hovermode": "x unified" }));

        assert_eq!(l["title"]["text"], "Trend");
        assert_eq!(l["title"]["x"], 0.5);
        assert_eq!(l["title"]["y"], 1);
        assert_eq!(l["paper_bgcolor"], BACKGROUND);
        assert_eq!(l["legend"]["orientation"], "h");
        assert_eq!(l["hovermode"], "x unified");
    }

    #[test]
    fn merge_replaces_scalars_and_arrays() {
        let mut v = json!({ "a": [1, 2], "b": { "c": 1 } });
        merge(&mut v, json!({ "a": [3], "b": 7 }));
        assert_eq!(v, json!({ "a": [3], "b": 7 }));
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(rgb("#A970FF"), (0xA9, 0x70, 0xFF));
        assert_eq!(rgb("111111"), (0x11, 0x11, 0x11));
        assert_eq!(rgb("#zz"), (0, 0, 0));
        assert_eq!(series_color(10), PALETTE[0]);
    }
}
