use crate::error::DataError;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

// canonical column names of the merged long-format dataset

/// Country name, rows without one are dropped
pub const COUNTRY: &str = "Country";
/// Calendar year, rows without a usable one are dropped
pub const YEAR: &str = "Year";
/// Continent label, kept as text
pub const CONTINENT: &str = "Continent";
/// Defense spending, millions of US dollars
pub const DEFENSE_USD: &str = "Defense_USD";
/// Gross domestic product, millions of US dollars
pub const GDP: &str = "GDP";
/// Defense spending as a percentage of GDP
pub const DEFENSE_SHARE_GDP: &str = "Defense_Share_GDP";

/// Cell spellings that mean "no value"
const MISSING_MARKERS: [&str; 7] = ["", "na", "n/a", "nan", "null", "..", "-"];

/// One row of the primary dataset
///
/// Amounts are in millions of USD. `defense_usd` and `gdp` are never
/// negative: a negative cell is loaded as missing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Observation {
    pub country: String,
    pub year: i32,
    pub continent: Option<String>,
    pub defense_usd: Option<f64>,
    pub gdp: Option<f64>,
    pub defense_share_gdp: Option<f64>,
}

impl Observation {
    /// Builds a row with every indicator present
    ///
    /// Mostly useful for fixtures; loaded rows come from [`load_dataset`].
    pub fn new(
        country: &str,
        year: i32,
        continent: &str,
        defense_usd: f64,
        gdp: f64,
        defense_share_gdp: f64,
    ) -> Self {
        Observation {
            country: country.to_string(),
            year,
            continent: Some(continent.to_string()),
            defense_usd: Some(defense_usd),
            gdp: Some(gdp),
            defense_share_gdp: Some(defense_share_gdp),
        }
    }
}

/// The loaded and normalized primary table
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    /// Rows in file order
    pub rows: Vec<Observation>,

    /// Number of rows dropped because Country or Year was unusable
    pub dropped: usize,
}

impl Dataset {
    /// Wraps already-parsed rows; nothing counts as dropped
    pub fn from_rows(rows: Vec<Observation>) -> Self {
        Dataset { rows, dropped: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Column positions resolved from the header row
struct Columns {
    country: usize,
    year: usize,
    continent: usize,
    defense_usd: usize,
    gdp: usize,
    defense_share_gdp: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord, source: &Path) -> Result<Self, DataError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| DataError::MissingColumn {
                    path: source.to_path_buf(),
                    column,
                })
        };

        Ok(Columns {
            country: find(COUNTRY)?,
            year: find(YEAR)?,
            continent: find(CONTINENT)?,
            defense_usd: find(DEFENSE_USD)?,
            gdp: find(GDP)?,
            defense_share_gdp: find(DEFENSE_SHARE_GDP)?,
        })
    }
}

/// Load the primary dataset from a delimited file
///
/// The delimiter follows the file extension (`.csv` or `.tsv`). Rows whose
/// Year cannot be read as an integer, or whose Country is blank, are
/// dropped and counted in [`Dataset::dropped`]. The file is only read.
///
/// # Errors
/// * [`DataError::Io`] if the file is missing or unreadable
/// * [`DataError::MissingColumn`] if a required column is absent
/// * [`DataError::Csv`] if a record is malformed
///
/// # Examples
/// ```no_run
/// use defaidx::dataset::load_dataset;
///
/// match load_dataset("data/clean/all/merged_long_1992-2023.csv") {
///     Ok(data) => println!("Loaded {} observations", data.rows.len()),
///     Err(e) => eprintln!("Error loading dataset: {}", e),
/// }
/// ```
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, DataError> {
    let path = path.as_ref();
    let delimiter = delimiter_for(path)?;
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let dataset = from_reader(file, delimiter, path)?;

    debug!(
        "loaded {} observations from {} ({} dropped)",
        dataset.rows.len(),
        path.display(),
        dataset.dropped
    );

    Ok(dataset)
}

/// Parse the primary dataset from any reader
///
/// `source` is only used to label errors.
pub fn from_reader<R: Read>(reader: R, delimiter: u8, source: &Path) -> Result<Dataset, DataError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| DataError::csv(source, e))?
        .clone();
    let columns = Columns::resolve(&headers, source)?;

    let mut dataset = Dataset::default();
    for record in reader.records() {
        let record = record.map_err(|e| DataError::csv(source, e))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let country = cell(columns.country);
        let year = parse_year(cell(columns.year));
        let (false, Some(year)) = (country.is_empty(), year) else {
            dataset.dropped += 1;
            continue;
        };

        let continent = cell(columns.continent);
        dataset.rows.push(Observation {
            country: country.to_string(),
            year,
            // text column: only a blank cell is missing, "NA" is North America
            continent: (!continent.trim().is_empty()).then(|| continent.to_string()),
            defense_usd: parse_amount(cell(columns.defense_usd)).filter(|v| *v >= 0.0),
            gdp: parse_amount(cell(columns.gdp)).filter(|v| *v >= 0.0),
            defense_share_gdp: parse_amount(cell(columns.defense_share_gdp)),
        });
    }

    Ok(dataset)
}

/// Pick the field delimiter for a flat file from its extension
pub(crate) fn delimiter_for(path: &Path) -> Result<u8, DataError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") | Some("txt") => Ok(b','),
        Some("tsv") | Some("tab") => Ok(b'\t'),
        Some(ext) => Err(DataError::UnsupportedExtension(ext.to_string())),
        None => Err(DataError::UnsupportedExtension(String::from("(none)"))),
    }
}

fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    MISSING_MARKERS
        .iter()
        .any(|marker| cell.eq_ignore_ascii_case(marker))
}

/// Years a row may carry; anything outside is a corrupt cell
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

/// Coerce a Year cell to an integer
///
/// Accepts `1992` and `1992.0`; anything with a fractional part, outside
/// [`YEAR_RANGE`] or non-numeric yields `None`.
pub fn parse_year(cell: &str) -> Option<i32> {
    let cell = cell.trim();
    let year = match cell.parse::<i32>() {
        Ok(year) => year,
        Err(_) => {
            let value = cell.parse::<f64>().ok()?;
            if !value.is_finite() || value.fract() != 0.0 || value.abs() > 1e9 {
                return None;
            }
            value as i32
        }
    };
    YEAR_RANGE.contains(&year).then_some(year)
}

/// Parse a numeric cell, mapping missing markers and junk to `None`
pub fn parse_amount(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    cell.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
