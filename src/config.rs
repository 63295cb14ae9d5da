#![cfg(feature = "web")]

use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_DATA: &str = "data/clean/all/merged_long_1992-2023.csv";
const DEFAULT_COORDS: &str = "data/clean/all/country_coordinates.csv";
const DEFAULT_INSIGHTS: &str = "assets/insights";
const DEFAULT_STATIC: &str = "static";

/// Server configuration, from flags or `DEFAIDX_*` environment variables
#[derive(Clone, Debug, Parser)]
#[command(name = "defaidx")]
#[command(about = "DefaidX - defense spending dashboard")]
#[command(version)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "DEFAIDX_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Merged long-format dataset (Country, Year, Continent, Defense_USD, GDP, Defense_Share_GDP)
    #[arg(long, env = "DEFAIDX_DATA", default_value = DEFAULT_DATA)]
    pub data: PathBuf,

    /// Country metadata table (Country, ISO3, lat, lon or synonyms)
    #[arg(long, env = "DEFAIDX_COORDS", default_value = DEFAULT_COORDS)]
    pub coords: PathBuf,

    /// Directory of HTML insight reports shown on the Insights page
    #[arg(long, env = "DEFAIDX_INSIGHTS", default_value = DEFAULT_INSIGHTS)]
    pub insights_dir: PathBuf,

    /// Directory served under /static
    #[arg(long, env = "DEFAIDX_STATIC", default_value = DEFAULT_STATIC)]
    pub static_dir: PathBuf,
}

impl Config {
    /// Configuration pointing at explicit input files, other settings default
    ///
    /// Neither the command line nor the `DEFAIDX_*` environment is read.
    pub fn with_files(data: impl Into<PathBuf>, coords: impl Into<PathBuf>) -> Self {
        Config {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            data: data.into(),
            coords: coords.into(),
            insights_dir: PathBuf::from(DEFAULT_INSIGHTS),
            static_dir: PathBuf::from(DEFAULT_STATIC),
        }
    }
}
