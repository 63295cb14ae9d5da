/*!
# DefaidX

A browser-based dashboard for defense spending, GDP and aid data, built in Rust.

## Overview

DefaidX reads a long-format country/year table of defense spending and GDP,
plus a country reference table with ISO3 codes and coordinates, and serves
a five-page dashboard of interactive charts: an animated world map of defense
share of GDP, an animated GDP-vs-defense scatter, a top-20 spender race and
several line trends.

## Architecture

### Data Layer
- **dataset**: loads the primary table and coerces its cells
- **metadata**: loads the country table, resolving header synonyms
- **cache**: memoizes loaded tables by path, modification time and length

### Shaping Layer
- **shaping**: pure transforms from rows to the exact frame each chart needs
- **figure**: turns frames into Plotly figure JSON (traces, layout, frames)
- **theme**: the dark colour scheme shared by every chart
- **snapshot**: static SVG renderings of the line charts (plotters)

### Web Layer
- **nav**: page and topic selection as plain values and a pure transition
- **pages**: renders each page with handlebars templates
- **app**: axum routing, request logging and error pages
- **config**: command line and environment configuration

## Data Flow

Every request runs one pass of load, shape and draw:

1. The cached tables are fetched (reloaded only if the file changed)
2. The page's charts each shape their own frame from the shared rows
3. A frame that filters down to nothing becomes a placeholder message
4. Figures are embedded as JSON and drawn in the browser by plotly.js

## Routes

- `/?page={page}` - Renders a page (`home`, `about`, `explore`, `insights`, `contact`)
- `/?page={page}&nav={target}&via={sidebar|button}` - Navigation event, redirects on change
- `/contact` - Contact form submission
- `/snapshot/{chart}` - SVG of a line chart (`continents`, `countries`, `indexed`)
- `/static/{file}`, `/insights/{report}` - Assets and insight reports
*/

pub mod cache;
pub mod dataset;
pub mod error;
pub mod figure;
pub mod metadata;
pub mod nav;
pub mod shaping;
pub mod theme;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod config;
#[cfg(feature = "web")]
pub mod pages;
#[cfg(feature = "web")]
pub mod snapshot;

pub use dataset::{Dataset, Observation, load_dataset};
pub use error::DataError;
pub use metadata::{CountryMeta, Metadata, load_metadata};
