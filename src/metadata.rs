use crate::dataset::{delimiter_for, parse_amount};
use crate::error::DataError;
use csv::{ReaderBuilder, StringRecord, Trim};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

lazy_static! {
    // Spaces, ASCII hyphens and the Unicode hyphen/non-breaking hyphen all
    // count as an underscore when comparing headers.
    static ref HEADER_SEPARATORS: Regex = Regex::new(r"[\s\-\u{2010}\u{2011}]+").unwrap();
}

/// Accepted header spellings for one canonical metadata field
///
/// Spellings are stored already normalized (see [`normalize_header`]).
#[derive(Debug)]
pub struct FieldSynonyms {
    /// Name the field is exposed under after loading
    pub canonical: &'static str,
    pub accepted: &'static [&'static str],
}

/// Country name column
pub const COUNTRY_FIELD: FieldSynonyms = FieldSynonyms {
    canonical: "Country",
    accepted: &["country"],
};

/// ISO 3166 alpha-3 code column
pub const ISO3_FIELD: FieldSynonyms = FieldSynonyms {
    canonical: "ISO3",
    accepted: &["iso3", "alpha3", "alpha_3", "iso_3", "iso"],
};

/// Latitude, decimal degrees
pub const LAT_FIELD: FieldSynonyms = FieldSynonyms {
    canonical: "lat",
    accepted: &["lat", "latitude"],
};

/// Longitude, decimal degrees
pub const LON_FIELD: FieldSynonyms = FieldSynonyms {
    canonical: "lon",
    accepted: &["lon", "lng", "long", "longitude"],
};

/// Lower-case a header and fold separators to `_`
pub fn normalize_header(header: &str) -> String {
    HEADER_SEPARATORS
        .replace_all(header.trim(), "_")
        .to_lowercase()
}

impl FieldSynonyms {
    /// Find the column for this field
    ///
    /// A header spelled exactly like the canonical name wins; otherwise the
    /// first header (in file order) that matches any accepted spelling.
    pub fn resolve(&self, headers: &[String]) -> Option<usize> {
        if let Some(idx) = headers.iter().position(|h| h.trim() == self.canonical) {
            return Some(idx);
        }
        headers.iter().position(|h| {
            let normalized = normalize_header(h);
            self.accepted.iter().any(|a| *a == normalized)
        })
    }

    fn spellings(&self) -> String {
        self.accepted.join(", ")
    }
}

/// Reference data for one country
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountryMeta {
    pub country: String,
    pub iso3: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Country name → ISO3 / coordinates lookup table
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    rows: Vec<CountryMeta>,
    index: HashMap<String, usize>,
}

impl Metadata {
    /// Indexes rows by country name
    pub fn from_rows(rows: Vec<CountryMeta>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            // first spelling of a country wins
            index.entry(row.country.clone()).or_insert(i);
        }
        Metadata { rows, index }
    }

    /// Rows in file order, duplicates included
    pub fn rows(&self) -> &[CountryMeta] {
        &self.rows
    }

    /// Number of rows, duplicates included
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact-match lookup by country name
    pub fn get(&self, country: &str) -> Option<&CountryMeta> {
        self.index.get(country).map(|&i| &self.rows[i])
    }

    /// ISO3 code for a country, `None` if the country is unknown
    pub fn iso3(&self, country: &str) -> Option<&str> {
        self.get(country).and_then(|m| m.iso3.as_deref())
    }

    /// `(lat, lon)` for each requested country
    ///
    /// Countries absent from the table map to `(None, None)` so callers can
    /// decide how to present them.
    pub fn coordinates<S: AsRef<str>>(
        &self,
        countries: &[S],
    ) -> HashMap<String, (Option<f64>, Option<f64>)> {
        countries
            .iter()
            .map(|c| {
                let c = c.as_ref();
                let coords = self.get(c).map(|m| (m.lat, m.lon)).unwrap_or((None, None));
                (c.to_string(), coords)
            })
            .collect()
    }
}

/// Load the country metadata table
///
/// Headers are matched against the declared synonym tables
/// ([`ISO3_FIELD`], [`LAT_FIELD`], [`LON_FIELD`]) so the result always
/// exposes exactly `Country`, `ISO3`, `lat` and `lon`.
///
/// # Errors
/// * [`DataError::Io`] if the file is missing or unreadable
/// * [`DataError::UnresolvedHeader`] if no ISO3 column, or not both
///   latitude and longitude columns, can be found
/// * [`DataError::MissingColumn`] if there is no Country column
pub fn load_metadata(path: impl AsRef<Path>) -> Result<Metadata, DataError> {
    let path = path.as_ref();
    let delimiter = delimiter_for(path)?;
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let metadata = metadata_from_reader(file, delimiter, path)?;

    debug!(
        "loaded metadata for {} countries from {}",
        metadata.len(),
        path.display()
    );

    Ok(metadata)
}

/// Reads a metadata table from any reader
///
/// # Arguments
/// * `reader` - The table contents
/// * `delimiter` - Field separator byte
/// * `source` - Path used in error messages
///
/// # Errors
/// * `DataError::UnresolvedHeader` when a required column has no accepted spelling
/// * `DataError::Csv` for malformed records
pub fn metadata_from_reader<R: Read>(
    reader: R,
    delimiter: u8,
    source: &Path,
) -> Result<Metadata, DataError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::csv(source, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let country = COUNTRY_FIELD
        .resolve(&headers)
        .ok_or_else(|| DataError::MissingColumn {
            path: source.to_path_buf(),
            column: COUNTRY_FIELD.canonical,
        })?;

    let iso3 = ISO3_FIELD
        .resolve(&headers)
        .ok_or_else(|| DataError::UnresolvedHeader {
            path: source.to_path_buf(),
            concept: "an ISO3 column",
            canonical: ISO3_FIELD.canonical,
            synonyms: ISO3_FIELD.spellings(),
        })?;

    let (Some(lat), Some(lon)) = (LAT_FIELD.resolve(&headers), LON_FIELD.resolve(&headers)) else {
        return Err(DataError::UnresolvedHeader {
            path: source.to_path_buf(),
            concept: "both latitude and longitude columns",
            canonical: "lat and lon",
            synonyms: format!("{}; {}", LAT_FIELD.spellings(), LON_FIELD.spellings()),
        });
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record: StringRecord = record.map_err(|e| DataError::csv(source, e))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let name = cell(country);
        if name.is_empty() {
            continue;
        }
        let code = cell(iso3);
        rows.push(CountryMeta {
            country: name.to_string(),
            iso3: (!code.is_empty()).then(|| code.to_string()),
            lat: parse_amount(cell(lat)),
            lon: parse_amount(cell(lon)),
        });
    }

    Ok(Metadata::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn parse(text: &str) -> Result<Metadata, DataError> {
        metadata_from_reader(text.as_bytes(), b',', Path::new("coords.csv"))
    }

    #[test]
    fn normalization_folds_case_and_separators() {
        assert_eq!(normalize_header(" Alpha-3 "), "alpha_3");
        assert_eq!(normalize_header("alpha\u{2011}3"), "alpha_3");
        assert_eq!(normalize_header("ISO 3"), "iso_3");
        assert_eq!(normalize_header("Longitude"), "longitude");
    }

    #[test]
    fn synonyms_resolve_in_isolation() {
        let h = headers(&["name", "Alpha-3", "Latitude", "LNG"]);
        assert_eq!(ISO3_FIELD.resolve(&h), Some(1));
        assert_eq!(LAT_FIELD.resolve(&h), Some(2));
        assert_eq!(LON_FIELD.resolve(&h), Some(3));
        assert_eq!(COUNTRY_FIELD.resolve(&h), None);
    }

    #[test]
    fn canonical_spelling_beats_earlier_synonym() {
        let h = headers(&["iso", "ISO3"]);
        assert_eq!(ISO3_FIELD.resolve(&h), Some(1));
    }

    #[test]
    fn unrelated_headers_do_not_match() {
        let h = headers(&["isolation", "latency", "longevity"]);
        assert_eq!(ISO3_FIELD.resolve(&h), None);
        assert_eq!(LAT_FIELD.resolve(&h), None);
        assert_eq!(LON_FIELD.resolve(&h), None);
    }

    #[test]
    fn loads_with_synonym_headers() {
        let meta = parse(
            "Country,alpha_3,latitude,longitude\n\
             France,FRA,46.2,2.2\n\
             Chile,CHL,-35.7,-71.5\n",
        )
        .unwrap();

        assert_eq!(meta.len(), 2);
        assert_eq!(meta.iso3("Chile"), Some("CHL"));
        let chile = meta.get("Chile").unwrap();
        assert_eq!((chile.lat, chile.lon), (Some(-35.7), Some(-71.5)));
    }

    #[test]
    fn unknown_country_has_no_code_or_coordinates() {
        let meta = parse("Country,ISO3,lat,lon\nFrance,FRA,46.2,2.2\n").unwrap();
        assert_eq!(meta.iso3("france"), None);

        let coords = meta.coordinates(&["France", "Atlantis"]);
        assert_eq!(coords["France"], (Some(46.2), Some(2.2)));
        assert_eq!(coords["Atlantis"], (None, None));
    }

    #[test]
    fn missing_iso_column_is_descriptive() {
        let err = parse("Country,code,lat,lon\nFrance,FRA,1,2\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ISO3"), "{}", message);
        assert!(message.contains("alpha3"), "{}", message);
    }

    #[test]
    fn missing_longitude_reports_the_pair() {
        let err = parse("Country,ISO3,lat\nFrance,FRA,1\n").unwrap_err();
        assert!(err.to_string().contains("latitude and longitude"));
    }
}
