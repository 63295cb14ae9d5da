//! End-to-end checks of load -> shape -> figure on small on-disk tables.

use std::fs;
use std::path::{Path, PathBuf};

use defaidx::figure;
use defaidx::shaping::{self, SpendingPolicy};
use defaidx::{DataError, load_dataset, load_metadata};
use tempfile::TempDir;

const DATASET: &str = "\
Country,Year,Continent,Defense_USD,GDP,Defense_Share_GDP,Notes
United States,2000,North America,300,10000,3.0,x
United States,2001,North America,330,10500,3.1,
China,2000,Asia,20,1200,1.7,
China,2001,Asia,25,1300,1.9,
France,2000,Europe,35,1400,2.5,
France,2001,Europe,NA,1500,..,
Kenya,2000,Africa,0,15,0.0,
Kenya,2001,Africa,-4,16,,
Atlantis,2000,,5,50,10.0,
,2000,Europe,1,1,1,
Narnia,year two,Europe,1,1,1,
";

const COORDINATES: &str = "\
country\tAlpha-3\tLatitude\tLongitude
France\tFRA\t46.2276\t2.2137
United States\tUSA\t37.0902\t-95.7129
China\tCHN\t35.8617\t104.1954
France\tXXX\t0\t0
";

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn loader_coerces_and_drops_rows() {
    let dir = TempDir::new().unwrap();
    let dataset = load_dataset(write(&dir, "merged.csv", DATASET)).unwrap();

    // blank country and unparsable year
    assert_eq!(dataset.dropped, 2);
    assert_eq!(dataset.rows.len(), 9);

    let france_2001 = dataset
        .rows
        .iter()
        .find(|r| r.country == "France" && r.year == 2001)
        .unwrap();
    assert_eq!(france_2001.defense_usd, None);
    assert_eq!(france_2001.defense_share_gdp, None);
    assert_eq!(france_2001.gdp, Some(1500.0));

    let kenya_2001 = dataset
        .rows
        .iter()
        .find(|r| r.country == "Kenya" && r.year == 2001)
        .unwrap();
    assert_eq!(kenya_2001.defense_usd, None);

    let atlantis = dataset.rows.iter().find(|r| r.country == "Atlantis").unwrap();
    assert_eq!(atlantis.continent, None);
}

#[test]
fn charts_shape_from_loaded_rows() {
    let dir = TempDir::new().unwrap();
    let dataset = load_dataset(write(&dir, "merged.csv", DATASET)).unwrap();
    let rows = &dataset.rows;

    // Atlantis has no continent and never reaches a continental total
    let totals = shaping::continental_time_sum(rows, SpendingPolicy::Recorded).unwrap();
    let africa_2000 = totals
        .iter()
        .find(|t| t.continent == "Africa" && t.year == 2000)
        .unwrap();
    assert_eq!(africa_2000.total, 0.0);
    let positive = shaping::continental_time_sum(rows, SpendingPolicy::Positive).unwrap();
    assert!(positive.iter().all(|t| t.continent != "Africa"));

    let ranked = shaping::top_spenders(rows, 2).unwrap();
    let leaders_2000: Vec<(&str, usize)> = ranked
        .iter()
        .filter(|r| r.year == 2000)
        .map(|r| (r.country.as_str(), r.rank))
        .collect();
    assert_eq!(leaders_2000, vec![("United States", 1), ("France", 2)]);

    let scatter = shaping::scatter_excluding_major_powers(rows).unwrap();
    assert!(
        scatter
            .iter()
            .all(|p| p.country != "United States" && p.country != "China")
    );

    let indexed = shaping::indexed_trend(rows, "China").unwrap();
    assert_eq!(indexed.base_year, 2000);
    assert_eq!(indexed.points[1].defense_index, Some(125.0));

    // zero base spending: the defense line cannot be indexed
    let kenya = shaping::indexed_trend(rows, "Kenya").unwrap();
    assert!(!kenya.defense_computable());

    assert!(shaping::country_trend(rows, &["Nowhere"]).is_none());
    assert_eq!(shaping::year_span(rows), Some((2000, 2001)));
}

#[test]
fn north_america_coded_na_survives_loading() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "merged.csv",
        "Country,Year,Continent,Defense_USD,GDP,Defense_Share_GDP\n\
         USA,2000,NA,500000,10000000,5.0\n\
         France,2000,EU,40000,1300000,3.1\n",
    );
    let dataset = load_dataset(&path).unwrap();

    let totals = shaping::continental_time_sum(&dataset.rows, SpendingPolicy::Recorded).unwrap();
    let by_continent: Vec<(&str, f64)> = totals
        .iter()
        .map(|t| (t.continent.as_str(), t.total))
        .collect();
    assert_eq!(by_continent, vec![("EU", 40000.0), ("NA", 500000.0)]);

    let ranked = shaping::top_spenders(&dataset.rows, shaping::TOP_SPENDERS).unwrap();
    let ranks: Vec<(&str, usize)> = ranked.iter().map(|r| (r.country.as_str(), r.rank)).collect();
    assert_eq!(ranks, vec![("USA", 1), ("France", 2)]);
}

#[test]
fn shaped_years_stay_within_the_loaded_span() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "merged.csv",
        "Country,Year,Continent,Defense_USD,GDP,Defense_Share_GDP\n\
         Chile,1992.0,South America,10,100,1.0\n\
         Chile,1993,South America,12,110,1.1\n\
         Chile,19x4,South America,13,120,1.1\n\
         Chile,1994.5,South America,13,120,1.1\n\
         Peru,1993,South America,7,90,0.8\n",
    );
    let dataset = load_dataset(&path).unwrap();
    let rows = &dataset.rows;

    assert_eq!(dataset.dropped, 2);
    assert_eq!(rows[0].year, 1992);
    let (first, last) = shaping::year_span(rows).unwrap();
    assert_eq!((first, last), (1992, 1993));

    let mut years: Vec<i32> = Vec::new();
    years.extend(shaping::world_share_frame(rows).unwrap().iter().map(|p| p.year));
    years.extend(shaping::scatter_excluding_major_powers(rows).unwrap().iter().map(|p| p.year));
    years.extend(
        shaping::continental_time_sum(rows, SpendingPolicy::Recorded)
            .unwrap()
            .iter()
            .map(|t| t.year),
    );
    years.extend(shaping::top_spenders(rows, 20).unwrap().iter().map(|r| r.year));
    years.extend(shaping::indexed_trend(rows, "Chile").unwrap().points.iter().map(|p| p.year));
    years.extend(shaping::country_trend(rows, &["Chile", "Peru"]).unwrap().iter().map(|p| p.year));

    assert!(!years.is_empty());
    assert!(years.iter().all(|y| (first..=last).contains(y)), "years {:?}", years);
}

#[test]
fn choropleth_hover_codes_come_from_metadata() {
    let dir = TempDir::new().unwrap();
    let dataset = load_dataset(write(&dir, "merged.csv", DATASET)).unwrap();
    let metadata = load_metadata(write(&dir, "coords.tsv", COORDINATES)).unwrap();

    // first occurrence wins for duplicated countries
    assert_eq!(metadata.iso3("France"), Some("FRA"));

    let frame = shaping::world_share_frame(&dataset.rows).unwrap();
    let fig = figure::choropleth_map(&frame, &metadata).unwrap();
    assert!(fig.is_animated());

    let first = &fig.data[0];
    let locations = first["locations"].as_array().unwrap();
    let codes = first["customdata"].as_array().unwrap();
    for (location, code) in locations.iter().zip(codes) {
        let expected = match location.as_str().unwrap() {
            "France" => "FRA",
            "United States" => "USA",
            "China" => "CHN",
            _ => "N/A",
        };
        assert_eq!(code, expected);
    }
}

#[test]
fn metadata_without_iso3_names_the_concept() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "coords.csv", "Country,lat,lon\nFrance,46.2,2.2\n");

    let err = load_metadata(&path).unwrap_err();
    assert!(matches!(err, DataError::UnresolvedHeader { .. }));
    assert!(err.to_string().contains("ISO3"));
}

#[test]
fn missing_and_unsupported_files_are_errors() {
    let dir = TempDir::new().unwrap();

    let missing = load_dataset(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(missing, DataError::Io { .. }));
    assert!(missing.to_string().contains("absent.csv"));

    let parquet = write(&dir, "merged.parquet", "");
    assert!(matches!(
        load_dataset(Path::new(&parquet)).unwrap_err(),
        DataError::UnsupportedExtension(_)
    ));
}
