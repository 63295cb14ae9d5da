#![cfg(feature = "web")]
//! Page rendering
//!
//! Each page is rendered in two steps: the page body from its own template,
//! then the shared layout (sidebar, footer) around it. Charts are embedded
//! as Plotly figure JSON and drawn in the browser by `static/dashboard.js`.

use crate::app::{AppError, AppState};
use crate::cache::FileStamp;
use crate::dataset::Dataset;
use crate::figure::{self, Figure};
use crate::metadata::Metadata;
use crate::nav::{ExploreSelection, HOME_BUTTONS, Page, SubTopic, Topic};
use crate::shaping::{self, SpendingPolicy, TOP_SPENDERS};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Countries pre-selected in the multi-country trend
pub const DEFAULT_TREND_COUNTRIES: [&str; 3] = ["United States", "China", "Russia"];

/// Country shown first in the indexed trend dropdown
pub const DEFAULT_INDEXED_COUNTRY: &str = "United States";

/// Height of each embedded insight report, in pixels
const INSIGHT_HEIGHT: u32 = 1000;

/// Query string of `GET /`
///
/// `<select multiple>` submits one `countries=` pair per choice; they all
/// land in `countries`. `countries_submitted` marks a submitted selector
/// form, so an empty `countries` means "nothing selected" rather than
/// "use the defaults".
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<String>,
    pub nav: Option<String>,
    pub via: Option<String>,
    pub topic: Option<String>,
    pub sub: Option<String>,
    pub country: Option<String>,
    pub countries: Vec<String>,
    pub countries_submitted: Option<String>,
}

impl PageQuery {
    /// Chosen countries for the multi-country trend, blanks removed
    pub fn selected_countries(&self) -> Vec<&str> {
        self.countries
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

fn query_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[derive(Serialize)]
struct NavItem {
    title: &'static str,
    href: String,
    active: bool,
}

#[derive(Serialize)]
struct LayoutContext<'a> {
    title: &'static str,
    nav: Vec<NavItem>,
    body: &'a str,
    footer: Option<String>,
}

#[derive(Serialize)]
struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

impl SelectOption {
    fn new(label: &str, selected: bool) -> Self {
        SelectOption {
            value: label.to_string(),
            label: label.to_string(),
            selected,
        }
    }
}

/// One chart slot on a page: either a figure or a placeholder message
#[derive(Serialize)]
struct ChartBlock {
    id: &'static str,
    intro: String,
    figure_json: Option<String>,
    placeholder: Option<String>,
    snapshot_href: Option<String>,
    caption: Option<String>,
}

impl ChartBlock {
    fn new(
        id: &'static str,
        intro: &str,
        figure: Option<Figure>,
        placeholder: &str,
    ) -> Result<Self, AppError> {
        let figure_json = figure.map(|f| f.to_script_json()).transpose()?;
        if figure_json.is_none() {
            debug!("chart {} has no data, showing placeholder", id);
        }
        Ok(ChartBlock {
            id,
            intro: intro.to_string(),
            placeholder: figure_json.is_none().then(|| placeholder.to_string()),
            figure_json,
            snapshot_href: None,
            caption: None,
        })
    }

    fn with_snapshot(mut self, href: String) -> Self {
        if self.figure_json.is_some() {
            self.snapshot_href = Some(href);
        }
        self
    }

    fn with_caption(mut self, caption: String) -> Self {
        self.caption = Some(caption);
        self
    }
}

fn footer_for(path: &Path, dataset: &Dataset, stamp: &FileStamp) -> String {
    let updated: DateTime<Utc> = stamp.modified.into();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match shaping::year_span(&dataset.rows) {
        Some((first, last)) => format!(
            "Data: {}, {}-{} (updated {})",
            name,
            first,
            last,
            updated.format("%Y-%m-%d")
        ),
        None => format!("Data: {} (updated {})", name, updated.format("%Y-%m-%d")),
    }
}

/// Render `page` for a request, wrapped in the shared layout
pub fn render(state: &AppState, page: Page, query: &PageQuery) -> Result<String, AppError> {
    let (body, footer) = match page {
        Page::Home => render_home(state)?,
        Page::About => (state.templates.render("about", &())?, None),
        Page::Explore => render_explore(state, query)?,
        Page::Insights => (render_insights(state)?, None),
        Page::Contact => (render_contact(state, &ContactView::default())?, None),
    };
    wrap(state, page, &body, footer)
}

fn wrap(state: &AppState, page: Page, body: &str, footer: Option<String>) -> Result<String, AppError> {
    let nav = Page::ALL
        .into_iter()
        .map(|p| NavItem {
            title: p.title(),
            href: format!("/?{}", query_pairs([("page", page.slug()), ("nav", p.slug())])),
            active: p == page,
        })
        .collect();

    let context = LayoutContext {
        title: page.title(),
        nav,
        body,
        footer,
    };
    Ok(state.templates.render("layout", &context)?)
}

#[derive(Serialize)]
struct HomeButton {
    label: String,
    href: String,
}

#[derive(Serialize)]
struct HomeContext {
    buttons: Vec<HomeButton>,
    chart: ChartBlock,
}

fn render_home(state: &AppState) -> Result<(String, Option<String>), AppError> {
    let (dataset, stamp) = state.dataset()?;

    // the hero chart leaves out zero and negative spending
    let totals = shaping::continental_time_sum(&dataset.rows, SpendingPolicy::Positive);
    let chart = ChartBlock::new(
        "home-continents",
        "Defense Spending by Continent (1992 - 2023)",
        totals.as_deref().and_then(figure::continental_trend),
        "No defense spending data available yet.",
    )?
    .with_snapshot("/snapshot/continents?positive=1".to_string());

    let buttons = HOME_BUTTONS
        .iter()
        .map(|p| HomeButton {
            label: format!("Go to {}", p.title()),
            href: format!(
                "/?{}",
                query_pairs([("page", Page::Home.slug()), ("nav", p.slug()), ("via", "button")])
            ),
        })
        .collect();

    let body = state
        .templates
        .render("home", &HomeContext { buttons, chart })?;
    Ok((body, Some(footer_for(&state.config.data, &dataset, &stamp))))
}

#[derive(Serialize)]
struct ExploreContext {
    topics: Vec<SelectOption>,
    subs: Vec<SelectOption>,
    topic: &'static str,
    sub: &'static str,
    intro: &'static str,
    spending: Option<SpendingView>,
}

#[derive(Serialize)]
struct SpendingView {
    country_options: Vec<SelectOption>,
    trend_options: Vec<SelectOption>,
    charts_before_selectors: Vec<ChartBlock>,
    indexed: ChartBlock,
    race: ChartBlock,
    trend: ChartBlock,
    continents: ChartBlock,
}

fn sub_intro(sub: SubTopic) -> &'static str {
    match sub {
        SubTopic::DefenseSpending => {
            "How much countries spend on defense, how it compares to their economies, and who leads."
        }
        SubTopic::ArmsTrade => "Who sells weapons, who buys them, and how the flows have shifted.",
        SubTopic::OtherDefenseIndicators => {
            "Personnel, procurement and other measures of military capacity."
        }
        SubTopic::TopDonorsRecipients => {
            "Visualize the top aid donor and recipient countries over the years."
        }
    }
}

fn render_explore(
    state: &AppState,
    query: &PageQuery,
) -> Result<(String, Option<String>), AppError> {
    let selection = ExploreSelection::resolve(query.topic.as_deref(), query.sub.as_deref());

    let topics = Topic::ALL
        .iter()
        .map(|t| SelectOption::new(t.label(), *t == selection.topic))
        .collect();
    let subs = selection
        .topic
        .sub_topics()
        .iter()
        .map(|s| SelectOption::new(s.label(), *s == selection.sub))
        .collect();

    let (spending, footer) = if selection.sub == SubTopic::DefenseSpending {
        let (dataset, stamp) = state.dataset()?;
        let (metadata, _) = state.metadata()?;
        let view = spending_view(&dataset, &metadata, query)?;
        (Some(view), Some(footer_for(&state.config.data, &dataset, &stamp)))
    } else {
        (None, None)
    };

    let context = ExploreContext {
        topics,
        subs,
        topic: selection.topic.label(),
        sub: selection.sub.label(),
        intro: sub_intro(selection.sub),
        spending,
    };
    Ok((state.templates.render("explore", &context)?, footer))
}

/// Caption with the ISO3 code and coordinates of a country
fn location_caption(metadata: &Metadata, country: &str) -> String {
    let iso3 = metadata.iso3(country).unwrap_or("N/A");
    match metadata.coordinates(&[country]).get(country) {
        Some((Some(lat), Some(lon))) => format!(
            "{} ({}) \u{b7} {:.2}\u{b0}{}, {:.2}\u{b0}{}",
            country,
            iso3,
            lat.abs(),
            if *lat >= 0.0 { "N" } else { "S" },
            lon.abs(),
            if *lon >= 0.0 { "E" } else { "W" },
        ),
        _ => format!("{} ({}) \u{b7} location unknown", country, iso3),
    }
}

fn spending_view(
    dataset: &Dataset,
    metadata: &Metadata,
    query: &PageQuery,
) -> Result<SpendingView, AppError> {
    let rows = &dataset.rows;
    let countries = shaping::countries(rows);

    let indexed_country = query
        .country
        .as_deref()
        .filter(|c| countries.iter().any(|known| known == *c))
        .or_else(|| {
            countries
                .iter()
                .find(|c| *c == DEFAULT_INDEXED_COUNTRY)
                .or_else(|| countries.first())
                .map(String::as_str)
        })
        .unwrap_or(DEFAULT_INDEXED_COUNTRY)
        .to_string();

    // an explicit (possibly empty) choice overrides the defaults
    let trend_selection: Vec<&str> = if query.countries_submitted.is_some() {
        query.selected_countries()
    } else {
        DEFAULT_TREND_COUNTRIES
            .into_iter()
            .filter(|d| countries.iter().any(|c| c == d))
            .collect()
    };

    let country_options = countries
        .iter()
        .map(|c| SelectOption::new(c, *c == indexed_country))
        .collect();
    let trend_options = countries
        .iter()
        .map(|c| SelectOption::new(c, trend_selection.contains(&c.as_str())))
        .collect();

    let map = ChartBlock::new(
        "share-map",
        "Explore how defense spending evolves across countries worldwide with this interactive choropleth map.",
        shaping::world_share_frame(rows).and_then(|f| figure::choropleth_map(&f, metadata)),
        "No defense share of GDP data to map.",
    )?;

    let scatter = ChartBlock::new(
        "gdp-scatter",
        "Watch how defense budgets move with the size of each economy, leaving out the two largest spenders.",
        shaping::scatter_excluding_major_powers(rows)
            .and_then(|f| figure::scatter_excluding_major_powers(&f)),
        "No countries with both GDP and defense spending recorded.",
    )?;

    let trend = shaping::indexed_trend(rows, &indexed_country);
    let indexed_placeholder = match &trend {
        Some(t) => format!(
            "Index not computable for {}: defense and GDP are both zero in {}.",
            t.country, t.base_year
        ),
        None => format!("No year with both defense and GDP data for {}.", indexed_country),
    };
    let indexed = ChartBlock::new(
        "indexed-trend",
        "View indexed trends of defense spending and GDP by country to understand relative changes over time.",
        trend.as_ref().and_then(figure::indexed_trend),
        &indexed_placeholder,
    )?
    .with_snapshot(format!("/snapshot/indexed?{}", query_pairs([("country", indexed_country.as_str())])))
    .with_caption(location_caption(metadata, &indexed_country));

    let race = ChartBlock::new(
        "top-spenders",
        "The evolution of the top 20 spenders over time.",
        shaping::top_spenders(rows, TOP_SPENDERS).and_then(|r| figure::top_spenders_race(&r)),
        "No defense spending data to rank.",
    )?;

    let country_trend = ChartBlock::new(
        "country-trend",
        "Pick countries from the list to compare their defense spending over time.",
        shaping::country_trend(rows, &trend_selection).and_then(|p| figure::country_trend(&p)),
        "Select at least one country with data to see its trend.",
    )?
    .with_snapshot(format!(
        "/snapshot/countries?{}",
        query_pairs(trend_selection.iter().map(|c| ("countries", *c)))
    ));

    let continents = ChartBlock::new(
        "continent-trend",
        "An overview of defense spending over time across continents.",
        shaping::continental_time_sum(rows, SpendingPolicy::Recorded)
            .and_then(|t| figure::continental_trend(&t)),
        "No continental spending data available.",
    )?
    .with_snapshot("/snapshot/continents".to_string());

    Ok(SpendingView {
        country_options,
        trend_options,
        charts_before_selectors: vec![map, scatter],
        indexed,
        race,
        trend: country_trend,
        continents,
    })
}

#[derive(Serialize)]
struct Insight {
    title: String,
    src: String,
    height: u32,
}

/// HTML reports in the insights directory, sorted by file name
fn list_insights(dir: &Path) -> Vec<Insight> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        debug!("no insights directory at {}", dir.display());
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        })
        .collect();
    names.sort();

    names
        .into_iter()
        .map(|name| Insight {
            title: Path::new(&name)
                .file_stem()
                .map(|s| s.to_string_lossy().replace(['_', '-'], " "))
                .unwrap_or_default(),
            src: format!("/insights/{}", urlencoding::encode(&name)),
            height: INSIGHT_HEIGHT,

        })
        .collect()
}

fn render_insights(state: &AppState) -> Result<String, AppError> {
    let insights = list_insights(&state.config.insights_dir);
    Ok(state
        .templates
        .render("insights", &serde_json::json!({ "insights": insights }))?)
}

/// Values and feedback shown on the Contact page
#[derive(Debug, Default, Serialize)]
pub struct ContactView {
    pub name: String,
    pub email: String,
    pub message: String,
    pub errors: Vec<&'static str>,
    pub sent: bool,
}

impl ContactView {
    /// Check a submission; nothing is stored or sent either way
    pub fn submitted(name: &str, email: &str, message: &str) -> Self {
        let mut errors = Vec::new();
        if name.trim().is_empty() {
            errors.push("Please enter your name.");
        }
        let email_ok = email
            .trim()
            .split_once('@')
            .is_some_and(|(user, host)| !user.is_empty() && host.contains('.'));
        if !email_ok {
            errors.push("Please enter a valid email address.");
        }
        if message.trim().is_empty() {
            errors.push("Please enter a message.");
        }

        let sent = errors.is_empty();
        ContactView {
            // a successful submission clears the form
            name: if sent { String::new() } else { name.to_string() },
            email: if sent { String::new() } else { email.to_string() },
            message: if sent { String::new() } else { message.to_string() },
            errors,
            sent,
        }
    }
}

/// Renders the Contact form body, with the acknowledgement once sent
pub fn render_contact(state: &AppState, view: &ContactView) -> Result<String, AppError> {
    Ok(state.templates.render("contact", view)?)
}

/// Render the Contact page after a form submission
pub fn render_contact_page(state: &AppState, view: &ContactView) -> Result<String, AppError> {
    let body = render_contact(state, view)?;
    wrap(state, Page::Contact, &body, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::CountryMeta;

    #[test]
    fn selected_countries_drop_blanks() {
        let query = PageQuery {
            countries: vec!["United States".to_string(), " ".to_string(), "Chad".to_string()],
            ..Default::default()
        };
        assert_eq!(query.selected_countries(), vec!["United States", "Chad"]);
        assert!(PageQuery::default().selected_countries().is_empty());
    }

    #[test]
    fn query_pairs_encode_values() {
        assert_eq!(
            query_pairs([("countries", "United States"), ("countries", "A&B")]),
            "countries=United%20States&countries=A%26B"
        );
    }

    #[test]
    fn caption_shows_code_and_hemispheres() {
        let meta = Metadata::from_rows(vec![CountryMeta {
            country: "Chile".to_string(),
            iso3: Some("CHL".to_string()),
            lat: Some(-35.675),
            lon: Some(-71.543),
        }]);
        assert_eq!(location_caption(&meta, "Chile"), "Chile (CHL) \u{b7} 35.67\u{b0}S, 71.54\u{b0}W");
        assert_eq!(location_caption(&meta, "Mars"), "Mars (N/A) \u{b7} location unknown");
    }

    #[test]
    fn contact_validation() {
        let ok = ContactView::submitted("Ada", "ada@example.org", "Hello");
        assert!(ok.sent);
        assert!(ok.errors.is_empty());
        assert!(ok.name.is_empty());

        let bad = ContactView::submitted(" ", "ada-at-example", "");
        assert!(!bad.sent);
        assert_eq!(bad.errors.len(), 3);
        assert_eq!(bad.email, "ada-at-example");
    }

    #[test]
    fn insights_list_only_html_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_aid_flows.html"), "<p>b</p>").unwrap();
        std::fs::write(dir.path().join("a-arms.HTML"), "<p>a</p>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let insights = list_insights(dir.path());
        let titles: Vec<&str> = insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a arms", "b aid flows"]);
        assert_eq!(insights[0].src, "/insights/a-arms.HTML");
        assert!(list_insights(Path::new("no/such/dir")).is_empty());
    }
}
