#![cfg(feature = "web")]

use axum::{
    Form, Router,
    extract::{Path, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::Query;
use handlebars::Handlebars;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::cache::{FileCache, FileStamp};
use crate::config::Config;
use crate::dataset::{Dataset, load_dataset};
use crate::error::DataError;
use crate::metadata::{Metadata, load_metadata};
use crate::nav::{NavEvent, Page, transition};
use crate::pages::{self, ContactView, DEFAULT_INDEXED_COUNTRY, PageQuery};
use crate::shaping::{self, SpendingPolicy};
use crate::snapshot::{self, SnapshotOptions};

/// Shared state for all handlers
pub struct AppState {
    pub config: Config,
    datasets: FileCache<Dataset>,
    metadata: FileCache<Metadata>,
    pub(crate) templates: Handlebars<'static>,
}

impl AppState {
    /// Registers the templates and creates empty caches
    pub fn new(config: Config) -> Result<Self, handlebars::TemplateError> {
        Ok(AppState {
            config,
            datasets: FileCache::new(),
            metadata: FileCache::new(),
            templates: templates()?,
        })
    }

    /// The primary dataset, reloaded when the file changes
    pub fn dataset(&self) -> Result<(Arc<Dataset>, FileStamp), DataError> {
        self.datasets
            .get_or_load(&self.config.data, |path| load_dataset(path))
    }

    /// The country metadata table, reloaded when the file changes
    pub fn metadata(&self) -> Result<(Arc<Metadata>, FileStamp), DataError> {
        self.metadata
            .get_or_load(&self.config.coords, |path| load_metadata(path))
    }
}

fn templates() -> Result<Handlebars<'static>, handlebars::TemplateError> {
    let mut hb = Handlebars::new();
    hb.register_template_string("layout", include_str!("./templates/layout.hbs"))?;
    hb.register_template_string("home", include_str!("./templates/home.hbs"))?;
    hb.register_template_string("about", include_str!("./templates/about.hbs"))?;
    hb.register_template_string("explore", include_str!("./templates/explore.hbs"))?;
    hb.register_template_string("insights", include_str!("./templates/insights.hbs"))?;
    hb.register_template_string("contact", include_str!("./templates/contact.hbs"))?;
    hb.register_partial("chart", include_str!("./templates/chart.hbs"))?;
    Ok(hb)
}

/// Failure while handling a request
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("failed to render page: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("failed to encode chart: {0}")]
    Figure(#[from] serde_json::Error),

    #[error("failed to draw snapshot: {0}")]
    Snapshot(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, heading) = match &self {
            AppError::NotFound(_) => {
                warn!("{}", self);
                (StatusCode::NOT_FOUND, "Not found")
            }
            AppError::Data(_) => {
                error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "The dashboard data could not be loaded")
            }
            _ => {
                error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        };

        let body = format!(
            "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
             <title>DefaidX - {heading}</title>\
             <link rel=\"stylesheet\" href=\"/static/dashboard.css\"></head>\
             <body><main class=\"content error\"><h1>{heading}</h1><p>{message}</p>\
             <p><a href=\"/\">Back to Home</a></p></main></body></html>",
            heading = heading,
            message = handlebars::html_escape(&self.to_string()),
        );
        (status, Html(body)).into_response()
    }
}

/// Builds the dashboard router
///
/// # Arguments
/// * `state` - Shared configuration, caches and templates
///
/// # Returns
/// * Page, contact, snapshot and asset routes wrapped in request logging
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let insights_dir = state.config.insights_dir.clone();

    Router::new()
        .route("/", get(serve_page))
        .route("/contact", post(submit_contact))
        .route("/snapshot/:chart", get(serve_snapshot))
        .nest_service("/static", ServeDir::new(static_dir))
        .nest_service("/insights", ServeDir::new(insights_dir))
        .fallback(not_found)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bind = config.bind;
    let state = Arc::new(AppState::new(config)?);

    // pages report data errors per request; this only warns early
    if let Err(e) = state.dataset() {
        warn!("{}", e);
    }

    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// One log line per request with its status and latency
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    info!(
        "{} {} -> {} ({:?})",
        method,
        uri,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

/// `GET /`: apply any navigation event, then render the current page
async fn serve_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let current = match query.page.as_deref() {
        Some(name) => Page::parse(name).unwrap_or_else(|| {
            warn!("unknown page {:?}, showing Home", name);
            Page::default()
        }),
        None => Page::default(),
    };

    if let Some(nav) = query.nav.as_deref() {
        match NavEvent::from_query(nav, query.via.as_deref()) {
            Some(event) => {
                let next = transition(current, event);
                if next != current {
                    debug!("{:?} -> {:?} on {:?}", current, next, event);
                    return Ok(Redirect::to(&next.href()).into_response());
                }
            }
            None => warn!("ignoring navigation to {:?}", nav),
        }
    }

    let html = pages::render(&state, current, &query)?;
    Ok(Html(html).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactForm {
    name: String,
    email: String,
    message: String,
}

/// `POST /contact`: validate and acknowledge; nothing is kept
async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ContactForm>,
) -> Result<Html<String>, AppError> {
    let view = ContactView::submitted(&form.name, &form.email, &form.message);
    if view.sent {
        info!("contact form submitted");
    }
    Ok(Html(pages::render_contact_page(&state, &view)?))
}

/// Query string of `GET /snapshot/:chart`, matching the Explore selectors
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SnapshotQuery {
    country: Option<String>,
    countries: Vec<String>,
    /// Present for the Home chart, which leaves out non-positive spending
    positive: Option<String>,
}

/// `GET /snapshot/:chart`: SVG image of one of the line charts
async fn serve_snapshot(
    State(state): State<Arc<AppState>>,
    Path(chart): Path<String>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Response, AppError> {
    let (dataset, _) = state.dataset()?;
    let rows = &dataset.rows;

    let (series, options) = match chart.as_str() {
        "continents" => {
            let policy = if query.positive.is_some() {
                SpendingPolicy::Positive
            } else {
                SpendingPolicy::Recorded
            };
            (
                shaping::continental_time_sum(rows, policy)
                    .map(|t| snapshot::continental_series(&t)),
                SnapshotOptions {
                    title: "Defense Spending Over Time by Continent".to_string(),
                    ..Default::default()
                },
            )
        }
        "countries" => (
            shaping::country_trend(rows, &query.countries)
                .map(|p| snapshot::country_series(&p)),
            SnapshotOptions {
                title: "Defense Spending Over Time".to_string(),
                ..Default::default()
            },
        ),
        "indexed" => {
            let country = query.country.as_deref().unwrap_or(DEFAULT_INDEXED_COUNTRY);
            (
                shaping::indexed_trend(rows, country).map(|t| snapshot::indexed_series(&t)),
                SnapshotOptions {
                    title: format!("Indexed Defense Spending vs GDP: {}", country),
                    y_label: "Index (base year = 100)".to_string(),
                    ..Default::default()
                },
            )
        }
        _ => return Err(AppError::NotFound(format!("chart {:?}", chart))),
    };

    let series = series
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::NotFound(format!("data for chart {:?}", chart)))?;
    let svg = snapshot::render_line_chart(&series, &options)
        .map_err(|e| AppError::Snapshot(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.svg\"", chart),
            ),
        ],
        svg,
    )
        .into_response())
}

async fn not_found() -> AppError {
    AppError::NotFound("page".to_string())
}
