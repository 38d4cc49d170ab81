use chrono::naive::NaiveDate;
use log::warn;
use serde::{Serialize,Deserialize};

use super::error::{Result,Error};
use super::series::Series;


/// One county on one day, after identifier repair and population join.
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct CountyRecord {
    pub fips: String,
    pub county: String,
    pub state: String,
    pub population: Option<u64>,
    pub date: NaiveDate,
    pub cases: Option<f64>,
    pub deaths: Option<f64>,
}

#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct NormalizedRecord {
    pub fips: String,
    pub county: String,
    pub state: String,
    pub population: Option<u64>,
    pub date: NaiveDate,
    pub cases: Option<f64>,
    pub deaths: Option<f64>,
    pub p_cases: Option<f64>,
    pub p_deaths: Option<f64>,
    pub death_rate: Option<f64>,
}

/// Quotient, or `None` when either side is missing or the result is not
/// finite.
pub fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    let val = num? / den?;
    match val.is_finite() {
	true => Some(val),
	false => None,
    }
}

impl From<CountyRecord> for NormalizedRecord {
    fn from(record: CountyRecord) -> Self {
	let population = record.population.filter(|p| *p > 0).map(|p| p as f64);
	Self {
	    p_cases: ratio(record.cases, population),
	    p_deaths: ratio(record.deaths, population),
	    death_rate: ratio(record.deaths, record.cases),
	    fips: record.fips,
	    county: record.county,
	    state: record.state,
	    population: record.population,
	    date: record.date,
	    cases: record.cases,
	    deaths: record.deaths,
	}
    }
}

impl NormalizedRecord {
    pub fn name(&self) -> String {
	format!("{}, {}", self.county, self.state)
    }
}


/// Date-ordered history of a single county.
#[derive(Debug,Clone)]
pub struct TimeSeries {
    pub records: Vec<NormalizedRecord>,
}

impl TimeSeries {

    /// Sorts by date. Of several rows for the same date only the last one
    /// in input order is kept.
    pub fn from_records(fips: &str, mut records: Vec<NormalizedRecord>) -> Result<Self> {

	if records.is_empty() {
	    return Err(Error::MissingCounty(fips.to_string()));
	}
	records.sort_by_key(|r| r.date);

	let mut deduped : Vec<NormalizedRecord> = Vec::with_capacity(records.len());
	for record in records {
	    match deduped.last_mut() {
		Some(last) if last.date == record.date => {
		    warn!("Duplicate row for {} on {}", fips, record.date);
		    *last = record;
		},
		_ => deduped.push(record),
	    }
	}

	Ok(Self { records: deduped })

    }

    pub fn name(&self) -> String {
	self.records.last().map(|r| r.name()).unwrap_or_default()
    }

    pub fn population(&self) -> Option<u64> {
	self.records.iter().rev().find_map(|r| r.population)
    }

    /// Case and death counts for the days on which both are reported.
    pub fn counts(&self) -> (Series,Series) {
	self.records.iter().filter_map(
	    |r| Some(((r.date, r.cases?), (r.date, r.deaths?)))
	).unzip()
    }

    pub fn map<F>(&self, f: F) -> Series
    where F: Fn(&NormalizedRecord) -> Option<f64> {
	self.records.iter().filter_map(|r| Some((r.date, f(r)?))).collect()
    }

}
