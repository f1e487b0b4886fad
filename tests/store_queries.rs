use ccx_rs::CountryStore;
use ccx_rs::models::{CountryQuery, NewCountry};
use chrono::{Duration, Utc};
use tempfile::tempdir;

fn country(
    name: &str,
    region: &str,
    population: i64,
    currency: Option<&str>,
    gdp: Option<f64>,
) -> NewCountry {
    NewCountry {
        name: name.into(),
        capital: Some(format!("{name} City")),
        region: Some(region.into()),
        population,
        currency_code: currency.map(Into::into),
        exchange_rate: currency.map(|_| 1.0),
        estimated_gdp: gdp,
        flag_url: Some(format!("https://flagcdn.com/{}.svg", name.to_lowercase())),
    }
}

fn sample() -> Vec<NewCountry> {
    vec![
        country("Nigeria", "Africa", 206_139_589, Some("NGN"), Some(1.9e8)),
        country("Ghana", "Africa", 31_072_940, Some("GHS"), Some(3.1e9)),
        country("Germany", "Europe", 83_240_525, Some("EUR"), Some(1.3e11)),
        country("Antarctica", "Polar", 1_000, None, Some(0.0)),
        country("Atlantis", "Europe", 5, Some("XAT"), None),
    ]
}

fn names(store: &CountryStore, q: CountryQuery) -> Vec<String> {
    store.list(&q).unwrap().into_iter().map(|c| c.name).collect()
}

fn sorted(sort: &str) -> CountryQuery {
    CountryQuery {
        sort: Some(sort.into()),
        ..Default::default()
    }
}

#[test]
fn sort_orders_put_missing_gdp_last() {
    let store = CountryStore::open_in_memory().unwrap();
    store.upsert_all(&sample(), Utc::now()).unwrap();

    assert_eq!(
        names(&store, CountryQuery::default()),
        ["Antarctica", "Atlantis", "Germany", "Ghana", "Nigeria"]
    );
    assert_eq!(
        names(&store, sorted("gdp_desc")),
        ["Germany", "Ghana", "Nigeria", "Antarctica", "Atlantis"]
    );
    assert_eq!(
        names(&store, sorted("gdp_asc")),
        ["Antarctica", "Nigeria", "Ghana", "Germany", "Atlantis"]
    );
    assert_eq!(
        names(&store, sorted("population_desc")),
        ["Nigeria", "Germany", "Ghana", "Antarctica", "Atlantis"]
    );
    assert_eq!(
        names(&store, sorted("population_asc")),
        ["Atlantis", "Antarctica", "Ghana", "Germany", "Nigeria"]
    );
    assert_eq!(names(&store, sorted("nonsense")), names(&store, CountryQuery::default()));
}

#[test]
fn filters_are_case_insensitive_and_combine() {
    let store = CountryStore::open_in_memory().unwrap();
    store.upsert_all(&sample(), Utc::now()).unwrap();

    let africa = CountryQuery {
        region: Some("aFrIcA".into()),
        ..Default::default()
    };
    assert_eq!(names(&store, africa), ["Ghana", "Nigeria"]);

    let eur = CountryQuery {
        currency: Some("eur".into()),
        ..Default::default()
    };
    assert_eq!(names(&store, eur), ["Germany"]);

    let both = CountryQuery {
        region: Some("Europe".into()),
        currency: Some("XAT".into()),
        sort: Some("gdp_desc".into()),
    };
    assert_eq!(names(&store, both), ["Atlantis"]);

    let blank = CountryQuery {
        region: Some("".into()),
        ..Default::default()
    };
    assert_eq!(names(&store, blank).len(), 5);

    let none = CountryQuery {
        region: Some("Atlantic".into()),
        ..Default::default()
    };
    assert!(names(&store, none).is_empty());
}

#[test]
fn upsert_matches_names_case_insensitively() {
    let store = CountryStore::open_in_memory().unwrap();
    let first = Utc::now() - Duration::hours(1);
    store.upsert_all(&sample(), first).unwrap();
    let before = store.get_by_name("ghana").unwrap().unwrap();

    let second = Utc::now();
    let mut updated = country("GHANA", "Africa", 32_000_000, Some("GHS"), Some(4.0e9));
    updated.capital = Some("Accra".into());
    store.upsert_all(&[updated], second).unwrap();

    let after = store.get_by_name("Ghana").unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.name, "Ghana", "stored spelling is kept");
    assert_eq!(after.population, 32_000_000);
    assert_eq!(after.capital.as_deref(), Some("Accra"));
    assert_eq!(after.estimated_gdp, Some(4.0e9));
    assert_eq!(after.last_refreshed_at, second);

    // Rows missing from a later batch are kept.
    let status = store.status().unwrap();
    assert_eq!(status.total_countries, 5);
    assert_eq!(status.last_refreshed_at, Some(second));
}

#[test]
fn non_ascii_names_match_case_insensitively() {
    let store = CountryStore::open_in_memory().unwrap();
    store
        .upsert_all(
            &[
                country("Åland Islands", "Europe", 28_875, Some("EUR"), Some(2.6e4)),
                country("Côte d'Ivoire", "Africa", 26_378_275, Some("XOF"), None),
            ],
            Utc::now(),
        )
        .unwrap();

    let aland = store.get_by_name("åland islands").unwrap().unwrap();
    assert_eq!(aland.name, "Åland Islands");
    let civ = store.get_by_name("CÔTE D'IVOIRE").unwrap().unwrap();
    assert_eq!(civ.name, "Côte d'Ivoire");

    // Same country in different case updates in place.
    store
        .upsert_all(
            &[country("ÅLAND ISLANDS", "Europe", 30_000, Some("EUR"), Some(2.7e4))],
            Utc::now(),
        )
        .unwrap();
    let after = store.get_by_name("Åland Islands").unwrap().unwrap();
    assert_eq!(after.id, aland.id);
    assert_eq!(after.population, 30_000);
    assert_eq!(store.status().unwrap().total_countries, 2);

    assert!(store.delete_by_name("åland islands").unwrap());
    assert!(store.get_by_name("Åland Islands").unwrap().is_none());
    assert_eq!(store.status().unwrap().total_countries, 1);
}

#[test]
fn get_and_delete_by_name() {
    let store = CountryStore::open_in_memory().unwrap();
    store.upsert_all(&sample(), Utc::now()).unwrap();

    let ng = store.get_by_name("NIGERIA").unwrap().unwrap();
    assert_eq!(ng.region.as_deref(), Some("Africa"));
    assert_eq!(ng.currency_code.as_deref(), Some("NGN"));
    assert!(store.get_by_name("Narnia").unwrap().is_none());

    assert!(store.delete_by_name("nigeria").unwrap());
    assert!(!store.delete_by_name("nigeria").unwrap());
    assert!(store.get_by_name("Nigeria").unwrap().is_none());
    assert_eq!(store.status().unwrap().total_countries, 4);
}

#[test]
fn top_by_gdp_skips_missing_estimates() {
    let store = CountryStore::open_in_memory().unwrap();
    store.upsert_all(&sample(), Utc::now()).unwrap();

    let top: Vec<String> = store
        .top_by_gdp(5)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(top, ["Germany", "Ghana", "Nigeria", "Antarctica"]);
    assert_eq!(store.top_by_gdp(2).unwrap().len(), 2);
}

#[test]
fn file_database_persists_across_opens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("countries.db");
    {
        let store = CountryStore::open(&path).unwrap();
        store.upsert_all(&sample(), Utc::now()).unwrap();
    }
    let store = CountryStore::open(&path).unwrap();
    assert_eq!(store.status().unwrap().total_countries, 5);
    assert!(store.get_by_name("germany").unwrap().is_some());
}
