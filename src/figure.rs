//! Chart builders
//!
//! Each builder wraps a shaped frame from [`crate::shaping`] in a Plotly
//! figure description (`data`, `layout`, `frames`) that the browser draws
//! with plotly.js. Every builder returns `None` for an empty frame.

use crate::metadata::Metadata;
use crate::shaping::{
    ContinentTotal, IndexedTrend, RankedSpender, ScatterPoint, SharePoint, TrendPoint,
};
use crate::theme::{self, CONTINUOUS_SCALE};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Largest marker diameter in the scatter, in pixels
const SCATTER_SIZE_MAX: f64 = 40.0;

const FRAME_MS: u32 = 500;
const TRANSITION_MS: u32 = 300;

/// A complete Plotly figure
#[derive(Clone, Debug, Serialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<Frame>,
}

/// One step of an animated figure
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub name: String,
    pub data: Vec<Value>,
}

impl Figure {
    /// JSON safe to inline inside a `<script>` element
    pub fn to_script_json(&self) -> Result<String, serde_json::Error> {
        Ok(serde_json::to_string(self)?.replace("</", "<\\/"))
    }

    pub fn is_animated(&self) -> bool {
        !self.frames.is_empty()
    }
}

/// Build an animated figure from one set of traces per year
///
/// The first year's traces become the initial `data`; every year becomes a
/// frame, driven by a Year slider plus play/pause buttons.
fn animated(years: &[i32], mut traces_for: impl FnMut(i32) -> Vec<Value>, mut layout: Value) -> Option<Figure> {
    let frames: Vec<Frame> = years
        .iter()
        .map(|&year| Frame {
            name: year.to_string(),
            data: traces_for(year),
        })
        .collect();
    let data = frames.first()?.data.clone();

    theme::merge(&mut layout, animation_controls(years));
    Some(Figure {
        data,
        layout,
        frames,
    })
}

fn animation_controls(years: &[i32]) -> Value {
    let play = json!({
        "frame": { "duration": FRAME_MS, "redraw": true },
        "fromcurrent": true,
        "transition": { "duration": TRANSITION_MS, "easing": "linear" }
    });
    let pause = json!({
        "mode": "immediate",
        "frame": { "duration": 0, "redraw": true },
        "transition": { "duration": 0 }
    });
    let steps: Vec<Value> = years
        .iter()
        .map(|year| {
            json!({
                "label": year.to_string(),
                "method": "animate",
                "args": [[year.to_string()], {
                    "mode": "immediate",
                    "frame": { "duration": FRAME_MS, "redraw": true },
                    "transition": { "duration": TRANSITION_MS }
                }]
            })
        })
        .collect();

    json!({
        "updatemenus": [{
            "type": "buttons",
            "direction": "left",
            "showactive": false,
            "x": 0.1, "xanchor": "right",
            "y": 0, "yanchor": "top",
            "pad": { "r": 10, "t": 70 },
            "buttons": [
                { "label": "\u{25B6}", "method": "animate", "args": [Value::Null, play] },
                { "label": "\u{25FC}", "method": "animate", "args": [[Value::Null], pause] }
            ]
        }],
        "sliders": [{
            "active": 0,
            "x": 0.1, "len": 0.9,
            "xanchor": "left",
            "y": 0, "yanchor": "top",
            "pad": { "b": 10, "t": 60 },
            "currentvalue": { "prefix": "Year=", "font": { "color": theme::FOREGROUND } },
            "steps": steps
        }]
    })
}

fn distinct_years<'a>(years: impl Iterator<Item = &'a i32>) -> Vec<i32> {
    years.copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Animated world map of defense spending as a share of GDP
///
/// Hover text shows each country's ISO3 code from `metadata`, or `N/A` when
/// the country is not in the reference table.
pub fn choropleth_map(frame: &[SharePoint], metadata: &Metadata) -> Option<Figure> {
    let years = distinct_years(frame.iter().map(|p| &p.year));
    // one colour scale for every year so frames are comparable
    let (cmin, cmax) = min_max(frame.iter().map(|p| p.share))?;

    let layout = theme::layout(
        "Global Defense Spending as % of GDP Over Time",
        json!({
            "dragmode": "zoom",
            "uirevision": "choropleth_map",
            "geo": {
                "showframe": false,
                "showcoastlines": false,
                "projection": { "type": "natural earth" },
                "bgcolor": theme::BACKGROUND
            },
            "coloraxis": {
                "colorscale": CONTINUOUS_SCALE,
                "cmin": cmin,
                "cmax": cmax,
                "colorbar": {
                    "orientation": "h",
                    "x": 0.5, "xanchor": "center",
                    "y": 1.1,
                    "title": { "text": "Defense % of GDP", "font": { "color": theme::FOREGROUND } },
                    "tickfont": { "color": theme::FOREGROUND }
                }
            }
        }),
    );

    animated(
        &years,
        |year| {
            let points: Vec<&SharePoint> = frame.iter().filter(|p| p.year == year).collect();
            vec![json!({
                "type": "choropleth",
                "locationmode": "country names",
                "locations": points.iter().map(|p| p.country.as_str()).collect::<Vec<_>>(),
                "z": points.iter().map(|p| p.share).collect::<Vec<_>>(),
                "text": points.iter().map(|p| p.country.as_str()).collect::<Vec<_>>(),
                "customdata": points
                    .iter()
                    .map(|p| metadata.iso3(&p.country).unwrap_or("N/A"))
                    .collect::<Vec<_>>(),
                "coloraxis": "coloraxis",
                "hovertemplate": "<b>%{text}</b> (%{customdata})<br>Defense_Share_GDP=%{z:.2f}<extra></extra>"
            })]
        },
        layout,
    )
}

/// Animated GDP vs defense scatter, one trace per continent
pub fn scatter_excluding_major_powers(frame: &[ScatterPoint]) -> Option<Figure> {
    let years = distinct_years(frame.iter().map(|p| &p.year));
    let continents: Vec<&str> = frame
        .iter()
        .map(|p| p.continent.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let (_, max_spend) = min_max(frame.iter().map(|p| p.defense_usd))?;
    let sizeref = if max_spend > 0.0 {
        2.0 * max_spend / (SCATTER_SIZE_MAX * SCATTER_SIZE_MAX)
    } else {
        1.0
    };

    let mut xaxis = theme::axis("GDP (USD)");
    theme::merge(&mut xaxis, json!({ "type": "log" }));
    let mut yaxis = theme::axis("Defense Spending (USD)");
    theme::merge(&mut yaxis, json!({ "type": "log" }));

    let layout = theme::layout(
        "Defense Spending vs GDP (Without USA & China)",
        json!({ "xaxis": xaxis, "yaxis": yaxis }),
    );

    animated(
        &years,
        |year| {
            continents
                .iter()
                .enumerate()
                .map(|(i, continent)| {
                    let points: Vec<&ScatterPoint> = frame
                        .iter()
                        .filter(|p| p.year == year && p.continent == *continent)
                        .collect();
                    json!({
                        "type": "scatter",
                        "mode": "markers",
                        "name": continent,
                        "legendgroup": continent,
                        "ids": points.iter().map(|p| p.country.as_str()).collect::<Vec<_>>(),
                        "x": points.iter().map(|p| p.gdp).collect::<Vec<_>>(),
                        "y": points.iter().map(|p| p.defense_usd).collect::<Vec<_>>(),
                        "text": points.iter().map(|p| p.country.as_str()).collect::<Vec<_>>(),
                        "hovertemplate": "<b>%{text}</b><br>GDP (USD)=%{x}<br>Defense Spending (USD)=%{y}<extra></extra>",
                        "marker": {
                            "color": theme::series_color(i),
                            "size": points.iter().map(|p| p.defense_usd).collect::<Vec<_>>(),
                            "sizemode": "area",
                            "sizeref": sizeref,
                            "sizemin": 2
                        }
                    })
                })
                .collect()
        },
        layout,
    )
}

/// Line per continent of summed defense spending
pub fn continental_trend(totals: &[ContinentTotal]) -> Option<Figure> {
    if totals.is_empty() {
        return None;
    }
    let continents: Vec<&str> = totals
        .iter()
        .map(|t| t.continent.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let data = continents
        .iter()
        .enumerate()
        .map(|(i, continent)| {
            let points: Vec<&ContinentTotal> =
                totals.iter().filter(|t| t.continent == *continent).collect();
            json!({
                "type": "scatter",
                "mode": "lines+markers",
                "name": continent,
                "line": { "color": theme::series_color(i) },
                "x": points.iter().map(|t| t.year).collect::<Vec<_>>(),
                "y": points.iter().map(|t| t.total).collect::<Vec<_>>()
            })
        })
        .collect();

    Some(Figure {
        data,
        layout: theme::layout(
            "Defense Spending Over Time by Continent",
            json!({
                "dragmode": "pan",
                "uirevision": "defense_spending_over_time",
                "hovermode": "x unified",
                "xaxis": theme::axis("Year"),
                "yaxis": theme::axis("Defense Spending (millions USD)")
            }),
        ),
        frames: Vec::new(),
    })
}

/// Animated horizontal bar race of the top spenders
///
/// Bars keep the same colour per country across years and the biggest
/// spender is drawn at the top.
pub fn top_spenders_race(ranked: &[RankedSpender]) -> Option<Figure> {
    let years = distinct_years(ranked.iter().map(|r| &r.year));
    let (_, max_spend) = min_max(ranked.iter().map(|r| r.defense_usd))?;
    // colour assignment follows first appearance in the ranking
    let mut order: Vec<&str> = Vec::new();
    for r in ranked {
        if !order.contains(&r.country.as_str()) {
            order.push(r.country.as_str());
        }
    }
    let color_of = |country: &str| {
        let i = order.iter().position(|c| *c == country).unwrap_or(0);
        theme::series_color(i)
    };

    let mut xaxis = theme::axis("Defense Spending (USD)");
    theme::merge(&mut xaxis, json!({ "range": [0.0, max_spend * 1.05] }));
    let layout = theme::layout(
        "Top 20 Defense Spenders Over Time",
        json!({
            "xaxis": xaxis,
            "yaxis": {
                "title": { "text": "" },
                "tickfont": { "color": theme::FOREGROUND },
                "categoryorder": "total ascending"
            },
            "bargap": 0.3,
            "uirevision": "country_defense_bar_animation",
            "showlegend": false
        }),
    );

    animated(
        &years,
        |year| {
            let bars: Vec<&RankedSpender> = ranked.iter().filter(|r| r.year == year).collect();
            vec![json!({
                "type": "bar",
                "orientation": "h",
                "x": bars.iter().map(|r| r.defense_usd).collect::<Vec<_>>(),
                "y": bars.iter().map(|r| r.country.as_str()).collect::<Vec<_>>(),
                "customdata": bars.iter().map(|r| r.rank).collect::<Vec<_>>(),
                "hovertemplate": "#%{customdata} %{y}<br>Defense Spending (USD)=%{x}<extra></extra>",
                "width": 0.5,
                "marker": {
                    "color": bars.iter().map(|r| color_of(&r.country)).collect::<Vec<_>>(),
                    "line": { "width": 0 }
                }
            })]
        },
        layout,
    )
}

/// Defense and GDP indexed lines for one country
///
/// A series whose base value is zero is left off the chart and replaced by
/// a note; if neither series can be indexed there is no chart.
pub fn indexed_trend(trend: &IndexedTrend) -> Option<Figure> {
    let years: Vec<i32> = trend.points.iter().map(|p| p.year).collect();
    let mut data = Vec::new();
    let mut notes = Vec::new();

    let series = [
        ("Defense", trend.defense_computable(), trend.points.iter().map(|p| p.defense_index).collect::<Vec<_>>()),
        ("GDP", trend.gdp_computable(), trend.points.iter().map(|p| p.gdp_index).collect::<Vec<_>>()),
    ];
    for (i, (label, computable, values)) in series.into_iter().enumerate() {
        if !computable {
            notes.push(format!(
                "{} index not computable: {} value in {} is zero",
                label, label, trend.base_year
            ));
            continue;
        }
        let values: Vec<f64> = values.into_iter().flatten().collect();
        let text: Vec<String> = years
            .iter()
            .zip(&values)
            .map(|(year, v)| format!("{}<br>{} Indexed: {:.1}", year, label, v))
            .collect();
        data.push(json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": format!("{} (Base 100)", label),
            "line": { "color": theme::series_color(i) },
            "x": years,
            "y": values,
            "text": text,
            "hoverinfo": "text"
        }));
    }
    if data.is_empty() {
        return None;
    }

    let annotations: Vec<Value> = notes
        .iter()
        .enumerate()
        .map(|(i, note)| {
            json!({
                "text": note,
                "showarrow": false,
                "xref": "paper", "yref": "paper",
                "x": 0.5, "y": -0.15 - 0.05 * i as f64,
                "font": { "color": theme::MUTED }
            })
        })
        .collect();

    Some(Figure {
        data,
        layout: theme::layout(
            &format!("Defense vs GDP Indexed Trend: {}", trend.country),
            json!({
                "dragmode": "pan",
                "uirevision": format!("defense_gdp_indexed_trend_{}", trend.country),
                "xaxis": theme::axis("Year"),
                "yaxis": theme::axis("Indexed Value (Base 100)"),
                "annotations": annotations
            }),
        ),
        frames: Vec::new(),
    })
}

/// Line per selected country of defense spending; gaps where values are missing
pub fn country_trend(points: &[TrendPoint]) -> Option<Figure> {
    if points.is_empty() {
        return None;
    }
    let countries: Vec<&str> = points
        .iter()
        .map(|p| p.country.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let data = countries
        .iter()
        .enumerate()
        .map(|(i, country)| {
            let series: Vec<&TrendPoint> = points.iter().filter(|p| p.country == *country).collect();
            json!({
                "type": "scatter",
                "mode": "lines+markers",
                "name": country,
                "line": { "color": theme::series_color(i) },
                "x": series.iter().map(|p| p.year).collect::<Vec<_>>(),
                "y": series.iter().map(|p| p.defense_usd).collect::<Vec<_>>()
            })
        })
        .collect();

    Some(Figure {
        data,
        layout: theme::layout(
            "Defense Spending Over Time by Country",
            json!({
                "dragmode": "pan",
                "uirevision": "country_defense_trend",
                "hovermode": "x unified",
                "xaxis": theme::axis("Year"),
                "yaxis": theme::axis("Defense Spending (millions USD)")
            }),
        ),
        frames: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Observation;
    use crate::metadata::CountryMeta;
    use crate::shaping;

    fn rows() -> Vec<Observation> {
        vec![
            Observation::new("United States", 2000, "North America", 300000.0, 10000000.0, 3.0),
            Observation::new("France", 2000, "Europe", 40000.0, 1300000.0, 3.1),
            Observation::new("India", 2000, "Asia", 14000.0, 460000.0, 3.0),
            Observation::new("France", 2001, "Europe", 42000.0, 1350000.0, 3.1),
            Observation::new("India", 2001, "Asia", 15000.0, 480000.0, 3.1),
        ]
    }

    fn metadata() -> Metadata {
        Metadata::from_rows(vec![CountryMeta {
            country: "France".to_string(),
            iso3: Some("FRA".to_string()),
            lat: Some(46.2),
            lon: Some(2.2),
        }])
    }

    #[test]
    fn choropleth_has_a_frame_per_year_and_iso_hover() {
        let frame = shaping::world_share_frame(&rows()).unwrap();
        let fig = choropleth_map(&frame, &metadata()).unwrap();

        assert!(fig.is_animated());
        let names: Vec<&str> = fig.frames.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["2000", "2001"]);
        assert_eq!(fig.layout["sliders"][0]["steps"].as_array().unwrap().len(), 2);

        let first = &fig.data[0];
        assert_eq!(first["type"], "choropleth");
        assert_eq!(first["customdata"], json!(["N/A", "FRA", "N/A"]));
        assert_eq!(fig.layout["coloraxis"]["cmin"], 3.0);
    }

    #[test]
    fn scatter_frames_keep_one_trace_per_continent() {
        let frame = shaping::scatter_excluding_major_powers(&rows()).unwrap();
        let fig = scatter_excluding_major_powers(&frame).unwrap();

        for f in &fig.frames {
            let names: Vec<&str> = f.data.iter().map(|t| t["name"].as_str().unwrap()).collect();
            assert_eq!(names, vec!["Asia", "Europe"]);
        }
        let json = serde_json::to_string(&fig).unwrap();
        assert!(!json.contains("United States"));
        assert_eq!(fig.layout["xaxis"]["type"], "log");
    }

    #[test]
    fn bar_race_puts_biggest_on_top() {
        let ranked = shaping::top_spenders(&rows(), shaping::TOP_SPENDERS).unwrap();
        let fig = top_spenders_race(&ranked).unwrap();

        assert_eq!(fig.layout["yaxis"]["categoryorder"], "total ascending");
        assert_eq!(fig.data[0]["y"], json!(["United States", "France", "India"]));
        assert_eq!(fig.frames.len(), 2);
        // France keeps its colour from one year to the next
        assert_eq!(fig.frames[0].data[0]["marker"]["color"][1], fig.frames[1].data[0]["marker"]["color"][0]);
    }

    #[test]
    fn indexed_trend_figure_has_two_series_from_100() {
        let trend = shaping::indexed_trend(&rows(), "India").unwrap();
        let fig = indexed_trend(&trend).unwrap();

        assert_eq!(fig.data.len(), 2);
        assert_eq!(fig.data[0]["y"][0], 100.0);
        assert_eq!(fig.data[1]["y"][0], 100.0);
        assert!(fig.layout["annotations"].as_array().unwrap().is_empty());
        assert!(!fig.is_animated());
    }

    #[test]
    fn indexed_trend_notes_uncomputable_series() {
        let rows = vec![
            Observation::new("Iceland", 2000, "Europe", 0.0, 8.0, 0.0),
            Observation::new("Iceland", 2001, "Europe", 1.0, 10.0, 0.1),
        ];
        let trend = shaping::indexed_trend(&rows, "Iceland").unwrap();
        let fig = indexed_trend(&trend).unwrap();

        assert_eq!(fig.data.len(), 1);
        assert_eq!(fig.data[0]["name"], "GDP (Base 100)");
        let note = fig.layout["annotations"][0]["text"].as_str().unwrap();
        assert!(note.contains("not computable"));
    }

    #[test]
    fn lines_follow_the_shared_theme() {
        let totals =
            shaping::continental_time_sum(&rows(), shaping::SpendingPolicy::Recorded).unwrap();
        let fig = continental_trend(&totals).unwrap();

        assert_eq!(fig.data.len(), 3);
        assert_eq!(fig.layout["paper_bgcolor"], theme::BACKGROUND);
        assert_eq!(fig.layout["legend"]["orientation"], "h");
        assert_eq!(fig.layout["hovermode"], "x unified");
    }

    #[test]
    fn empty_frames_give_no_figure() {
        assert!(choropleth_map(&[], &metadata()).is_none());
        assert!(scatter_excluding_major_powers(&[]).is_none());
        assert!(continental_trend(&[]).is_none());
        assert!(top_spenders_race(&[]).is_none());
        assert!(country_trend(&[]).is_none());
    }

    #[test]
    fn missing_values_serialize_as_gaps() {
        let points = vec![
            TrendPoint { year: 2000, country: "Chad".to_string(), defense_usd: Some(1.0) },
            TrendPoint { year: 2001, country: "Chad".to_string(), defense_usd: None },
        ];
        let fig = country_trend(&points).unwrap();
        assert_eq!(fig.data[0]["y"], json!([1.0, null]));
    }

    #[test]
    fn script_json_cannot_close_the_script_tag() {
        let fig = Figure {
            data: vec![json!({ "name": "</script>" })],
            layout: json!({}),
            frames: Vec::new(),
        };
        let out = fig.to_script_json().unwrap();
        assert!(!out.contains("</script>"));
        assert!(!out.contains("frames"));
    }
}
