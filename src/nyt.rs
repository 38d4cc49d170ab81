use std::{fs,io};
use std::fs::File;
use std::path::{Path,PathBuf};

use chrono::{DateTime,Duration,Utc};
use chrono::naive::NaiveDate;
use log::{debug,info,warn};

use super::county::{NormalizedRecord,TimeSeries};
use super::error::{Result,Error};
use super::normalize::{self,DataSource};
use super::registry::Registry;


/// Source of the raw daily county datasets.
pub trait Upstream {
    fn fetch(&self, source: DataSource) -> Result<String>;
}

/// The New York Times county data repository.
pub struct Nyt;

impl Nyt {
    fn url(source: DataSource) -> &'static str {
	match source {
	    DataSource::Cumulative => "https://raw.githubusercontent.com/nytimes/covid-19-data\
				       /master/us-counties-recent.csv",
	    DataSource::Rolling => "https://raw.githubusercontent.com/nytimes/covid-19-data\
				    /master/rolling-averages/us-counties-recent.csv",
	}
    }
}

impl Upstream for Nyt {
    fn fetch(&self, source: DataSource) -> Result<String> {
	info!("Downloading {} county data...", source.name());
	let res = reqwest::blocking::get(Self::url(source))?;
	match res.status().as_u16() {
	    200 => Ok(res.text()?),
	    _ => Err(Error::HttpError(res.status())),
	}
    }
}


const SOURCES: [DataSource; 2] = [DataSource::Cumulative, DataSource::Rolling];

/// Normalized datasets on disk, refreshed at most once per day.
pub struct Cache {
    path: PathBuf,
}

impl Cache {

    pub fn new(path: &Path) -> Self {
	Self { path: path.to_path_buf() }
    }

    /// Most recent day the upstream is expected to be complete for.
    pub fn target_date(now: DateTime<Utc>) -> NaiveDate {
	(now - Duration::hours(29)).naive_utc().date()
    }

    fn timestamp_file(&self) -> PathBuf {
	self.path.join("last-update.txt")
    }

    fn data_file(&self, source: DataSource) -> PathBuf {
	self.path.join(format!("{}.csv", source.name()))
    }

    /// Date of the last successful update, `None` if there never was one.
    pub fn last_update(&self) -> Result<Option<String>> {
	match fs::read_to_string(self.timestamp_file()) {
	    Ok(date) => Ok(Some(date.trim().to_string())),
	    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
	    Err(err) => Err(err.into()),
	}
    }

    fn is_fresh(&self, date: NaiveDate) -> Result<bool> {
	let stamp = format!("{}", date.format("%Y-%m-%d"));
	Ok(self.last_update()?.map_or(false, |last| last == stamp)
	   && SOURCES.iter().all(|source| self.data_file(*source).exists()))
    }

    /// Fetches and normalizes both datasets, then overwrites the cache.
    pub fn refresh(&self, upstream: &dyn Upstream, registry: &Registry, date: NaiveDate) -> Result<()> {

	let datasets = SOURCES.iter().map(|source| {
	    let text = upstream.fetch(*source)?;
	    Ok((*source, normalize::parse(*source, text.as_bytes(), registry)?))
	}).collect::<Result<Vec<_>>>()?;

	fs::create_dir_all(&self.path)?;
	for (source, records) in datasets {
	    normalize::write(io::BufWriter::new(File::create(self.data_file(source))?), &records)?;
	}
	fs::write(self.timestamp_file(), format!("{}", date.format("%Y-%m-%d")))?;
	info!("Cache updated for {}", date);
	Ok(())

    }

    fn read(&self, source: DataSource) -> Result<Vec<NormalizedRecord>> {
	normalize::read(io::BufReader::new(File::open(self.data_file(source))?))
    }

    /// Rows of the current day. Falls back to the latest day present when
    /// the upstream has not published the target day yet.
    pub fn current(&self, source: DataSource, upstream: &dyn Upstream,
		   registry: &Registry, now: DateTime<Utc>) -> Result<Vec<NormalizedRecord>> {

	let date = Self::target_date(now);
	match self.is_fresh(date)? {
	    true => debug!("Cache hit for {}", date),
	    false => {
		info!("Cache outdated, fetching data for {}", date);
		self.refresh(upstream, registry, date)?;
	    }
	}

	let records = self.read(source)?;
	let day = match records.iter().any(|r| r.date == date) {
	    true => date,
	    false => {
		let latest = records.iter().map(|r| r.date).max().ok_or(Error::MissingData)?;
		warn!("No {} data for {}, serving {}", source.name(), date, latest);
		latest
	    }
	};
	Ok(records.into_iter().filter(|r| r.date == day).collect())

    }

    /// Full cached history of one county.
    pub fn historical(&self, fips: &str, source: DataSource) -> Result<TimeSeries> {
	let records = self.read(source)?.into_iter().filter(|r| r.fips == fips).collect();
	TimeSeries::from_records(fips, records)
    }

}


#[cfg(test)]
mod tests {

    use std::cell::Cell;
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;

    struct Fake {
	calls: Cell<usize>,
    }

    impl Upstream for Fake {
	fn fetch(&self, source: DataSource) -> Result<String> {
	    self.calls.set(self.calls.get() + 1);
	    Ok(match source {
		DataSource::Cumulative => "\
date,county,state,fips,cases,deaths
2022-05-11,Autauga,Alabama,01001,4900,49
2022-05-12,Autauga,Alabama,01001,5000,50
2022-05-11,New York City,New York,,990,29
2022-05-12,New York City,New York,,1000,30
".to_string(),
		DataSource::Rolling => "\
date,geoid,county,state,cases,cases_avg,cases_avg_per_100k,deaths,deaths_avg,deaths_avg_per_100k
2022-05-12,USA-01001,Autauga,Alabama,10,8.2,14.6,0,0.14,0.25
".to_string(),
	    })
	}
    }

    struct Offline;

    impl Upstream for Offline {
	fn fetch(&self, _source: DataSource) -> Result<String> {
	    Err(Error::MissingData)
	}
    }

    fn registry() -> Registry {
	let mut populations = BTreeMap::new();
	populations.insert("01001".to_string(), 10_000);
	Registry::new(populations)
    }

    fn now() -> DateTime<Utc> {
	// 29 hours earlier is 2022-05-12
	Utc.with_ymd_and_hms(2022, 5, 13, 12, 0, 0).unwrap()
    }

    #[test]
    fn target_date_lags_by_29_hours() {
	assert_eq!(Cache::target_date(now()), NaiveDate::from_ymd_opt(2022, 5, 12).unwrap());
	let early = Utc.with_ymd_and_hms(2022, 5, 13, 4, 0, 0).unwrap();
	assert_eq!(Cache::target_date(early), NaiveDate::from_ymd_opt(2022, 5, 11).unwrap());
    }

    #[test]
    fn missing_cache_forces_a_fetch() {
	let dir = tempfile::tempdir().unwrap();
	let cache = Cache::new(dir.path());
	assert_eq!(cache.last_update().unwrap(), None);

	let fake = Fake { calls: Cell::new(0) };
	let today = cache.current(DataSource::Cumulative, &fake, &registry(), now()).unwrap();
	assert_eq!(fake.calls.get(), 2);
	assert_eq!(cache.last_update().unwrap(), Some("2022-05-12".to_string()));
	assert_eq!(today.len(), 2);
	assert!(today.iter().all(|r| r.date == Cache::target_date(now())));
	assert_eq!(today[1].fips, "unique:nyc");
    }

    #[test]
    fn fresh_cache_is_served_without_fetching() {
	let dir = tempfile::tempdir().unwrap();
	let cache = Cache::new(dir.path());
	let fake = Fake { calls: Cell::new(0) };
	cache.current(DataSource::Cumulative, &fake, &registry(), now()).unwrap();

	let rolling = cache.current(DataSource::Rolling, &Offline, &registry(), now()).unwrap();
	assert_eq!(rolling.len(), 1);
	assert_eq!(rolling[0].cases, Some(14.6));
    }

    #[test]
    fn stale_cache_is_refetched() {
	let dir = tempfile::tempdir().unwrap();
	let cache = Cache::new(dir.path());
	let fake = Fake { calls: Cell::new(0) };
	cache.current(DataSource::Cumulative, &fake, &registry(), now()).unwrap();

	let tomorrow = now() + Duration::days(1);
	assert!(cache.current(DataSource::Cumulative, &Offline, &registry(), tomorrow).is_err());
	let today = cache.current(DataSource::Cumulative, &fake, &registry(), tomorrow).unwrap();
	assert_eq!(fake.calls.get(), 4);
	assert_eq!(today[0].date, NaiveDate::from_ymd_opt(2022, 5, 12).unwrap());
	assert_eq!(cache.last_update().unwrap(), Some("2022-05-13".to_string()));
    }

    #[test]
    fn history_is_read_per_county() {
	let dir = tempfile::tempdir().unwrap();
	let cache = Cache::new(dir.path());
	cache.refresh(&Fake { calls: Cell::new(0) }, &registry(), Cache::target_date(now())).unwrap();

	let history = cache.historical("01001", DataSource::Cumulative).unwrap();
	assert_eq!(history.records.len(), 2);
	assert_eq!(history.records[0].cases, Some(4900.0));
	assert_eq!(history.population(), Some(10_000));

	assert!(cache.historical("99999", DataSource::Cumulative).is_err());
    }

}
