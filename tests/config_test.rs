use std::time::Duration;

use anyhow::Result;
use job_harvest::{ConfigError, CrawlMode, HarvestConfig, LocationMode, PaginationStrategy};
use tempfile::TempDir;

const CONFIG: &str = r#"{
    "mode": { "mode": "full" },
    "database_path": "out/jobs.sqlite",
    "wait_timeout": 7.5,
    "poll_interval": 0.1,
    "max_concurrent_sites": 3,
    "sites": ["avl", "Expleo", "acme"],
    "country_aliases": { "cz": "Czech Republic" },
    "extra_sites": [
        {
            "name": "acme",
            "company": "Acme",
            "start_url": "https://careers.acme.test/jobs",
            "location_mode": "columns",
            "pagination": { "kind": "page_param", "param": "p" },
            "listing": {
                "item": "tr.job",
                "title": { "kind": "css", "selector": "td.title" },
                "link": { "kind": "css", "selector": "td.title a", "attr": "href" },
                "location": { "kind": "css", "selector": "td.city" },
                "country": { "kind": "css", "selector": "td.country" }
            },
            "detail": { "description": ["article"] }
        }
    ]
}"#;

#[test]
fn json_file_overrides_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("harvest.json");
    std::fs::write(&path, CONFIG)?;

    let config = HarvestConfig::from_json_file(&path)?;

    assert_eq!(config.mode(), CrawlMode::Full);
    assert_eq!(config.database_path().to_str(), Some("out/jobs.sqlite"));
    assert_eq!(config.wait_settings().required, Duration::from_millis(7500));
    assert_eq!(config.wait_settings().poll_interval, Duration::from_millis(100));
    assert_eq!(config.max_concurrent_sites(), 3);
    assert!(config.headless());

    let names: Vec<String> = config.enabled_sites().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["avl", "expleo", "acme"]);

    let acme = config
        .enabled_sites()
        .into_iter()
        .find(|s| s.name == "acme")
        .expect("extra site enabled");
    assert_eq!(acme.location_mode, LocationMode::Columns);
    assert_eq!(
        acme.pagination,
        PaginationStrategy::PageParam {
            param: "p".into(),
            first_page: 1
        }
    );
    assert!(acme.admit_undated);

    assert_eq!(config.country_normalizer().normalize("CZ"), Some("Czech Republic"));
    assert_eq!(config.country_normalizer().normalize("Deutschland"), Some("Germany"));
    Ok(())
}

#[test]
fn unknown_site_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("harvest.json");
    std::fs::write(&path, r#"{ "sites": ["avl", "nowhere"] }"#)?;

    let err = HarvestConfig::from_json_file(&path).expect_err("unknown site");
    assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("nowhere")));
    Ok(())
}

#[test]
fn malformed_and_missing_files_are_distinguished() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("harvest.json");
    std::fs::write(&path, "{ \"mode\": ")?;

    assert!(matches!(
        HarvestConfig::from_json_file(&path),
        Err(ConfigError::Parse { .. })
    ));
    assert!(matches!(
        HarvestConfig::from_json_file(dir.path().join("absent.json")),
        Err(ConfigError::Read { .. })
    ));
    Ok(())
}

#[test]
fn zero_page_sample_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("harvest.json");
    std::fs::write(&path, r#"{ "mode": { "mode": "sample", "pages": 0 } }"#)?;

    assert!(matches!(
        HarvestConfig::from_json_file(&path),
        Err(ConfigError::Invalid(_))
    ));
    Ok(())
}
