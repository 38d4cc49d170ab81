use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;

use lazy_static::lazy_static;
use log::{debug,info};
use serde::{Serialize,Deserialize};

use super::error::Result;


/// A county-equivalent without a standard FIPS code upstream.
#[derive(Debug,Clone,PartialEq)]
pub struct Exception {
    pub county: &'static str,
    pub state: &'static str,
    pub fips: &'static str,
    pub population: u64,
}

lazy_static! {
    static ref EXCEPTIONS: Vec<Exception> = vec![
	Exception { county: "New York City", state: "New York",
		    fips: "unique:nyc", population: 8_336_817 },
	Exception { county: "Kansas City", state: "Missouri",
		    fips: "unique:kc", population: 495_327 },
	Exception { county: "Joplin", state: "Missouri",
		    fips: "unique:jop", population: 50_925 },
	Exception { county: "Bristol Bay plus Lake and Peninsula", state: "Alaska",
		    fips: "unique:bblp", population: 2_428 },
    ];
}


#[derive(Deserialize)]
struct PopulationRow {
    fips: String,
    population: u64,
}

/// County identifier to population, with the hand-entered overrides for
/// the synthetic identifiers.
#[derive(Debug,Clone,Default)]
pub struct Registry {
    populations: BTreeMap<String,u64>,
}

impl Registry {

    #[cfg(test)]
    pub fn new(populations: BTreeMap<String,u64>) -> Self {
	Self { populations }
    }

    pub fn load(path: &Path) -> Result<Self> {
	info!("Loading populations from {}...", path.display());
	Self::from_reader(io::BufReader::new(File::open(path)?))
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
	let populations = csv::Reader::from_reader(reader).deserialize().map(|row| {
	    let row: PopulationRow = row?;
	    Ok((row.fips, row.population))
	}).collect::<Result<BTreeMap<_,_>>>()?;
	debug!("{} populations loaded", populations.len());
	Ok(Self { populations })
    }

    pub fn population(&self, fips: &str) -> Option<u64> {
	self.populations.get(fips).cloned().or_else(
	    || EXCEPTIONS.iter().find(|e| e.fips == fips).map(|e| e.population))
    }

    /// Synthetic identifier for a county the upstream leaves unmapped.
    pub fn repair(&self, county: &str, state: &str) -> Option<&'static Exception> {
	EXCEPTIONS.iter().find(|e| e.county == county && e.state == state)
    }

}


#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MapView {
    Contiguous,
    Alaska,
    Hawaii,
    PuertoRico,
    MarianaIslands,
}

impl Default for MapView {
    fn default() -> Self {
	Self::Contiguous
    }
}

impl MapView {

    /// Map centre as (latitude, longitude).
    pub fn center(&self) -> (f64,f64) {
	match self {
	    Self::Contiguous => (37.0902, -95.7129),
	    Self::Alaska => (63.3850, -152.2683),
	    Self::Hawaii => (19.8983, -155.5822),
	    Self::PuertoRico => (18.4389, -66.0079),
	    Self::MarianaIslands => (15.2, 145.75),
	}
    }

    pub fn zoom(&self) -> f64 {
	match self {
	    Self::Contiguous => 3.0,
	    Self::Alaska => 2.0,
	    Self::Hawaii => 5.0,
	    Self::PuertoRico => 6.5,
	    Self::MarianaIslands => 7.0,
	}
    }

    pub fn region(&self) -> &'static str {
	match self {
	    Self::Contiguous => "the contiguous U.S",
	    Self::Alaska => "Alaska",
	    Self::Hawaii => "Hawaii",
	    Self::PuertoRico => "Puerto Rico & the U.S. Virgin Islands",
	    Self::MarianaIslands => "the Northern Mariana Islands",
	}
    }

    pub fn subdivision(&self) -> &'static str {
	match self {
	    Self::Contiguous | Self::Hawaii => "counties",
	    Self::Alaska => "boroughs and census-designated areas",
	    Self::PuertoRico | Self::MarianaIslands => "municipalities",
	}
    }

}
