use std::io;

use chrono::naive::NaiveDate;
use log::{debug,info};
use serde::{Serialize,Deserialize};

use super::county::{CountyRecord,NormalizedRecord};
use super::error::Result;
use super::registry::Registry;


/// The two upstream dataset variants.
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Cumulative,
    Rolling,
}

impl Default for DataSource {
    fn default() -> Self {
	Self::Cumulative
    }
}

impl DataSource {
    pub fn name(&self) -> &'static str {
	match self {
	    Self::Cumulative => "cumulative",
	    Self::Rolling => "rolling",
	}
    }
}


#[derive(Deserialize,Debug)]
struct CumulativeRow {
    date: NaiveDate,
    county: String,
    state: String,
    fips: Option<String>,
    cases: Option<f64>,
    deaths: Option<f64>,
}

#[derive(Deserialize,Debug)]
struct RollingRow {
    date: NaiveDate,
    geoid: Option<String>,
    county: String,
    state: String,
    cases_avg_per_100k: Option<f64>,
    deaths_avg_per_100k: Option<f64>,
}

/// Row common to both variants, before repair and join.
struct RawRow {
    date: NaiveDate,
    fips: Option<String>,
    county: String,
    state: String,
    cases: Option<f64>,
    deaths: Option<f64>,
}

impl From<CumulativeRow> for RawRow {
    fn from(row: CumulativeRow) -> Self {
	Self {
	    date: row.date,
	    fips: row.fips,
	    county: row.county,
	    state: row.state,
	    cases: row.cases,
	    deaths: row.deaths,
	}
    }
}

impl From<RollingRow> for RawRow {
    fn from(row: RollingRow) -> Self {
	Self {
	    date: row.date,
	    fips: row.geoid.map(|geoid| geoid2fips(&geoid)),
	    county: row.county,
	    state: row.state,
	    cases: row.cases_avg_per_100k,
	    deaths: row.deaths_avg_per_100k,
	}
    }
}

/// `USA-01001` -> `01001`
pub fn geoid2fips(geoid: &str) -> String {
    geoid.chars().skip(4).collect()
}


pub fn parse<R: io::Read>(source: DataSource, reader: R,
			  registry: &Registry) -> Result<Vec<NormalizedRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let rows : Vec<RawRow> = match source {
	DataSource::Cumulative => reader.deserialize::<CumulativeRow>()
	    .map(|row| Ok(row?.into())).collect::<Result<_>>()?,
	DataSource::Rolling => reader.deserialize::<RollingRow>()
	    .map(|row| Ok(row?.into())).collect::<Result<_>>()?,
    };
    debug!("{} {} rows read", rows.len(), source.name());
    Ok(normalize(rows, registry))
}


fn normalize(rows: Vec<RawRow>, registry: &Registry) -> Vec<NormalizedRecord> {

    let mut repaired = 0;
    let mut records : Vec<NormalizedRecord> = rows.into_iter()
	.filter(|row| row.county != "Unknown")
	.map(|row| {
	    let fips = match row.fips.filter(|fips| !fips.is_empty()) {
		Some(fips) => fips,
		None => match registry.repair(&row.county, &row.state) {
		    Some(exception) => {
			repaired += 1;
			exception.fips.to_string()
		    },
		    None => String::new(),
		},
	    };
	    let population = match fips.is_empty() {
		true => None,
		false => registry.population(&fips),
	    };
	    NormalizedRecord::from(CountyRecord {
		fips, population,
		county: row.county,
		state: row.state,
		date: row.date,
		cases: row.cases,
		deaths: row.deaths,
	    })
	}).collect();

    info!("{} records normalized, {} identifiers repaired", records.len(), repaired);

    records.sort_by(|a,b| a.fips.cmp(&b.fips));
    records

}


pub fn write<W: io::Write>(writer: W, records: &[NormalizedRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
	writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read<R: io::Read>(reader: R) -> Result<Vec<NormalizedRecord>> {
    Ok(csv::Reader::from_reader(reader).deserialize().collect::<std::result::Result<_,_>>()?)
}


#[cfg(test)]
mod tests {

    use std::collections::BTreeMap;
    use super::*;

    const CUMULATIVE: &str = "\
date,county,state,fips,cases,deaths
2022-05-12,Kansas City,Missouri,,100,2
2022-05-12,Autauga,Alabama,01001,5000,50
2022-05-12,Unknown,Alabama,,7,0
2022-05-12,Los Angeles,California,06037,0,0
2022-05-12,Nowhere,Oregon,,12,1
2022-05-12,Baldwin,Alabama,01003,200,
2022-05-12,New York City,New York,,1000,30
";

    const ROLLING: &str = "\
date,geoid,county,state,cases,cases_avg,cases_avg_per_100k,deaths,deaths_avg,deaths_avg_per_100k
2022-05-12,USA-06037,Los Angeles,California,300,250.1,2.49,3,2.0,0.02
2022-05-12,USA-01001,Autauga,Alabama,10,8.2,14.6,0,0.14,0.25
";

    fn registry() -> Registry {
	let mut populations = BTreeMap::new();
	populations.insert("01001".to_string(), 10_000);
	populations.insert("01003".to_string(), 20_000);
	populations.insert("06037".to_string(), 10_000_000);
	Registry::new(populations)
    }

    fn fips(records: &[NormalizedRecord]) -> Vec<&str> {
	records.iter().map(|r| r.fips.as_str()).collect()
    }

    #[test]
    fn cumulative_rows_are_repaired_joined_and_sorted() {
	let records = parse(DataSource::Cumulative, CUMULATIVE.as_bytes(), &registry()).unwrap();
	assert_eq!(fips(&records), vec!["", "01001", "01003", "06037", "unique:kc", "unique:nyc"]);

	let unmapped = &records[0];
	assert_eq!(unmapped.county, "Nowhere");
	assert_eq!(unmapped.population, None);
	assert_eq!(unmapped.cases, Some(12.0));
	assert_eq!(unmapped.p_cases, None);

	let autauga = &records[1];
	assert_eq!(autauga.p_cases, Some(0.5));
	assert_eq!(autauga.death_rate, Some(0.01));

	let baldwin = &records[2];
	assert_eq!(baldwin.deaths, None);
	assert_eq!(baldwin.p_deaths, None);
	assert_eq!(baldwin.death_rate, None);

	assert_eq!(records[3].death_rate, None);
	assert_eq!(records[4].population, Some(495_327));
    }

    #[test]
    fn normalized_fields_are_bounded() {
	let records = parse(DataSource::Cumulative, CUMULATIVE.as_bytes(), &registry()).unwrap();
	for r in records.iter().filter(|r| r.population.map_or(false, |p| p > 0)) {
	    assert!(r.p_cases.map_or(true, |p| p >= 0.0));
	    assert!(r.p_deaths.map_or(true, |p| p >= 0.0));
	    let defined = r.cases.map_or(false, |c| c > 0.0) && r.deaths.is_some();
	    assert_eq!(r.death_rate.is_some(), defined);
	}
    }

    #[test]
    fn rolling_rows_use_per_100k_averages() {
	let records = parse(DataSource::Rolling, ROLLING.as_bytes(), &registry()).unwrap();
	assert_eq!(fips(&records), vec!["01001", "06037"]);
	assert_eq!(records[0].cases, Some(14.6));
	assert_eq!(records[0].deaths, Some(0.25));
	assert_eq!(records[0].population, Some(10_000));
    }

    #[test]
    fn rewriting_is_byte_identical() {
	let mut first = Vec::new();
	let mut second = Vec::new();
	write(&mut first, &parse(DataSource::Cumulative, CUMULATIVE.as_bytes(), &registry()).unwrap()).unwrap();
	write(&mut second, &parse(DataSource::Cumulative, CUMULATIVE.as_bytes(), &registry()).unwrap()).unwrap();
	assert_eq!(first, second);

	let reread = read(first.as_slice()).unwrap();
	let mut third = Vec::new();
	write(&mut third, &reread).unwrap();
	assert_eq!(first, third);
    }

    #[test]
    fn sort_is_lexicographic() {
	let mut populations = BTreeMap::new();
	populations.insert("9001".to_string(), 1);
	let data = "date,county,state,fips,cases,deaths\n\
		    2022-05-12,A,X,9001,1,0\n\
		    2022-05-12,B,X,10001,1,0\n";
	let records = parse(DataSource::Cumulative, data.as_bytes(), &Registry::new(populations)).unwrap();
	assert_eq!(fips(&records), vec!["10001", "9001"]);
    }

}
