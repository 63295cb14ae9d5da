//! Data-shaping transforms
//!
//! Each function takes the loaded rows and returns the exact frame one chart
//! needs. They are pure: same rows and parameters in, same frame out. An
//! input that filters down to nothing yields `None` rather than an error or
//! an empty frame, so callers can show a placeholder instead of a chart.

use crate::dataset::Observation;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Countries left out of the GDP-vs-defense scatter so the rest stay legible
pub const MAJOR_POWERS: [&str; 2] = ["United States", "China"];

/// Size of the per-year spending leaderboard
pub const TOP_SPENDERS: usize = 20;

/// Which `Defense_USD` values a spending chart admits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpendingPolicy {
    /// Any recorded value, zero included
    Recorded,
    /// Strictly positive values only
    Positive,
}

impl SpendingPolicy {
    fn admit(self, value: Option<f64>) -> Option<f64> {
        match self {
            SpendingPolicy::Recorded => value,
            SpendingPolicy::Positive => value.filter(|v| *v > 0.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SharePoint {
    pub country: String,
    pub year: i32,
    pub share: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub country: String,
    pub year: i32,
    pub continent: String,
    pub gdp: f64,
    pub defense_usd: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContinentTotal {
    pub year: i32,
    pub continent: String,
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedSpender {
    pub year: i32,
    pub country: String,
    pub defense_usd: f64,
    /// 1-based position within the year
    pub rank: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexedPoint {
    pub year: i32,
    pub defense_usd: f64,
    pub gdp: f64,
    /// `None` when the defense base value is zero
    pub defense_index: Option<f64>,
    /// `None` when the GDP base value is zero
    pub gdp_index: Option<f64>,
}

/// A country's defense and GDP series rebased to 100 at its first year
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexedTrend {
    pub country: String,
    pub base_year: i32,
    pub points: Vec<IndexedPoint>,
}

impl IndexedTrend {
    /// False when the base-year defense value is zero
    pub fn defense_computable(&self) -> bool {
        self.points.iter().all(|p| p.defense_index.is_some())
    }

    /// False when the base-year GDP is zero
    pub fn gdp_computable(&self) -> bool {
        self.points.iter().all(|p| p.gdp_index.is_some())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year: i32,
    pub country: String,
    pub defense_usd: Option<f64>,
}

fn non_empty<T>(frame: Vec<T>) -> Option<Vec<T>> {
    (!frame.is_empty()).then_some(frame)
}

/// Per-row defense share of GDP, ordered by year for animation
pub fn world_share_frame(rows: &[Observation]) -> Option<Vec<SharePoint>> {
    let mut frame: Vec<SharePoint> = rows
        .iter()
        .filter_map(|r| {
            r.defense_share_gdp.map(|share| SharePoint {
                country: r.country.clone(),
                year: r.year,
                share,
            })
        })
        .collect();
    frame.sort_by_key(|p| p.year);
    non_empty(frame)
}

/// GDP vs defense points with [`MAJOR_POWERS`] removed
///
/// Rows missing GDP, spending or continent are dropped.
pub fn scatter_excluding_major_powers(rows: &[Observation]) -> Option<Vec<ScatterPoint>> {
    let mut frame: Vec<ScatterPoint> = rows
        .iter()
        .filter(|r| !MAJOR_POWERS.contains(&r.country.as_str()))
        .filter_map(|r| {
            Some(ScatterPoint {
                country: r.country.clone(),
                year: r.year,
                continent: r.continent.clone()?,
                gdp: r.gdp?,
                defense_usd: r.defense_usd?,
            })
        })
        .collect();
    frame.sort_by_key(|p| p.year);
    non_empty(frame)
}

/// Total defense spending per (year, continent)
///
/// Output is ordered by year, then continent name.
pub fn continental_time_sum(
    rows: &[Observation],
    policy: SpendingPolicy,
) -> Option<Vec<ContinentTotal>> {
    let mut totals: BTreeMap<(i32, &str), f64> = BTreeMap::new();
    for row in rows {
        let (Some(value), Some(continent)) = (policy.admit(row.defense_usd), &row.continent) else {
            continue;
        };
        *totals.entry((row.year, continent.as_str())).or_insert(0.0) += value;
    }

    non_empty(
        totals
            .into_iter()
            .map(|((year, continent), total)| ContinentTotal {
                year,
                continent: continent.to_string(),
                total,
            })
            .collect(),
    )
}

/// The `n` biggest spenders of each year
///
/// Duplicate (year, country) rows are summed first. Equal totals keep the
/// order in which the countries first appear in `rows`. Output is ordered
/// by year, then rank.
pub fn top_spenders(rows: &[Observation], n: usize) -> Option<Vec<RankedSpender>> {
    let mut by_year: BTreeMap<i32, Vec<(&str, f64)>> = BTreeMap::new();
    let mut slot: HashMap<(i32, &str), usize> = HashMap::new();

    for row in rows {
        let Some(value) = row.defense_usd else {
            continue;
        };
        let year = by_year.entry(row.year).or_default();
        match slot.get(&(row.year, row.country.as_str())) {
            Some(&i) => year[i].1 += value,
            None => {
                slot.insert((row.year, row.country.as_str()), year.len());
                year.push((row.country.as_str(), value));
            }
        }
    }

    let mut frame = Vec::new();
    for (year, mut spenders) in by_year {
        // stable sort: ties stay in first-seen order
        spenders.sort_by(|a, b| b.1.total_cmp(&a.1));
        frame.extend(
            spenders
                .into_iter()
                .take(n)
                .enumerate()
                .map(|(i, (country, defense_usd))| RankedSpender {
                    year,
                    country: country.to_string(),
                    defense_usd,
                    rank: i + 1,
                }),
        );
    }
    non_empty(frame)
}

/// Defense and GDP for one country, each rebased to 100 at its first year
///
/// Only rows with both values recorded count. If a base value is zero the
/// corresponding index is left out (`None`) rather than dividing by zero.
pub fn indexed_trend(rows: &[Observation], country: &str) -> Option<IndexedTrend> {
    let mut series: Vec<(i32, f64, f64)> = rows
        .iter()
        .filter(|r| r.country == country)
        .filter_map(|r| Some((r.year, r.defense_usd?, r.gdp?)))
        .collect();
    series.sort_by_key(|&(year, _, _)| year);

    let &(base_year, base_def, base_gdp) = series.first()?;
    let rebase = |value: f64, base: f64| (base != 0.0).then(|| value / base * 100.0);

    Some(IndexedTrend {
        country: country.to_string(),
        base_year,
        points: series
            .into_iter()
            .map(|(year, defense_usd, gdp)| IndexedPoint {
                year,
                defense_usd,
                gdp,
                defense_index: rebase(defense_usd, base_def),
                gdp_index: rebase(gdp, base_gdp),
            })
            .collect(),
    })
}

/// Defense spending over time for a caller-chosen set of countries
///
/// An empty selection, or one that matches no rows, yields `None`.
pub fn country_trend<S: AsRef<str>>(
    rows: &[Observation],
    selected: &[S],
) -> Option<Vec<TrendPoint>> {
    if selected.is_empty() {
        return None;
    }
    let wanted: BTreeSet<&str> = selected.iter().map(AsRef::as_ref).collect();

    let mut frame: Vec<TrendPoint> = rows
        .iter()
        .filter(|r| wanted.contains(r.country.as_str()))
        .map(|r| TrendPoint {
            year: r.year,
            country: r.country.clone(),
            defense_usd: r.defense_usd,
        })
        .collect();
    frame.sort_by_key(|p| p.year);
    non_empty(frame)
}

/// Distinct country names, sorted
pub fn countries(rows: &[Observation]) -> Vec<String> {
    rows.iter()
        .map(|r| r.country.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Smallest and largest year present
pub fn year_span(rows: &[Observation]) -> Option<(i32, i32)> {
    let min = rows.iter().map(|r| r.year).min()?;
    let max = rows.iter().map(|r| r.year).max()?;
    Some((min, max))
}
