use std::collections::BTreeMap;

use chrono::naive::NaiveDate;
use log::{debug,info};
use serde::{Serialize,Deserialize};

use super::county::TimeSeries;
use super::deconvolve::{self,Observed,Reconstruction};
use super::error::{Result,Error};
use super::integrate::Integrator;
use super::model::{CompartmentState,ModelConfig,ModelFamily,SeriesName,Sir,Seir,Sird,Seird};
use super::normalize::DataSource;
use super::series::{self,NaiveDateRange,Series};
use super::session::Session;


pub const HORIZON_DAYS: usize = 14;

#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "lowercase")]
pub enum ForecastExtent {
    None,
    Historical,
    Comprehensive,
}

impl Default for ForecastExtent {
    fn default() -> Self {
	Self::None
    }
}


#[derive(Debug,Clone,PartialEq)]
pub struct NamedSeries {
    pub name: SeriesName,
    pub points: Series,
}

#[derive(Debug,Clone,Default)]
pub struct Forecast {
    pub county: String,
    /// The selected statistic as reported, when no forecast is requested.
    pub observed: Series,
    pub historical: Vec<NamedSeries>,
    pub projected: Vec<NamedSeries>,
}

impl Forecast {
    pub fn last_date(&self) -> Option<NaiveDate> {
	self.observed.iter().chain(
	    self.historical.iter().chain(self.projected.iter()).flat_map(|s| s.points.iter())
	).map(|(date,_)| *date).max()
    }
}


/// Builds the chart series of one county for the current selection.
pub fn forecast(history: &TimeSeries, session: &Session,
		integrator: &dyn Integrator) -> Result<Forecast> {

    let county = history.name();
    let params = &session.forecast;

    if params.extent == ForecastExtent::None {
	return Ok(Forecast {
	    observed: history.map(|r| session.statistic.value(session.source, r)),
	    county, ..Forecast::default()
	});
    }

    let fips = history.records.last().map(|r| r.fips.clone()).unwrap_or_default();
    let population = history.population().ok_or(Error::MissingPopulation(fips))? as f64;
    if population <= 0.0 {
	return Err(Error::configuration(format!("population of {} is not positive", county)));
    }

    let (cases, deaths) = totals(history, session.source, population);
    let reconstruction = deconvolve::deconvolve(&cases, &deaths, params)?;
    if reconstruction.is_empty() {
	return Err(Error::MissingData);
    }
    debug!("{} days reconstructed for {}", reconstruction.len(), county);

    let projector = Projector {
	reconstruction: &reconstruction,
	session, population, integrator,
    };
    let (historical, projected) = match params.family {
	ModelFamily::Sir => projector.run::<Sir>()?,
	ModelFamily::Seir => projector.run::<Seir>()?,
	ModelFamily::Sird => projector.run::<Sird>()?,
	ModelFamily::Seird => projector.run::<Seird>()?,
    };

    Ok(Forecast { county, observed: vec![], historical, projected })

}


/// Cumulative absolute case and death counts. The rolling source holds
/// daily averages per 100k, which are scaled to the population and summed.
fn totals(history: &TimeSeries, source: DataSource, population: f64) -> (Series,Series) {
    let (cases, deaths) = history.counts();
    match source {
	DataSource::Cumulative => (cases, deaths),
	DataSource::Rolling => {
	    let factor = population / 100_000.0;
	    (series::cumsum(&series::scale(&cases, factor)),
	     series::cumsum(&series::scale(&deaths, factor)))
	}
    }
}

/// Display value of an absolute count: the population share, times 100
/// for the per-100k source.
pub fn rescale(val: f64, population: f64, source: DataSource) -> f64 {
    let share = val / population;
    match source {
	DataSource::Cumulative => share,
	DataSource::Rolling => share * 100.0,
    }
}


struct Projector<'a> {
    reconstruction: &'a Reconstruction,
    session: &'a Session,
    population: f64,
    integrator: &'a dyn Integrator,
}

impl<'a> Projector<'a> {

    fn run<S: CompartmentState>(&self) -> Result<(Vec<NamedSeries>,Vec<NamedSeries>)> {

	let rec = self.reconstruction;
	let historical = self.collect((0..rec.len()).map(|t| {
	    let observed = Observed {
		active: rec.active[t].1,
		fatalities: rec.fatalities[t].1,
		recovered: rec.recovered[t].1,
	    };
	    (rec.active[t].0, S::seed(&observed, 0.0))
	}), true);

	if self.session.forecast.extent != ForecastExtent::Comprehensive {
	    return Ok((historical, vec![]));
	}

	let (start, last) = match (rec.active.last(), rec.last()) {
	    (Some((date,_)), Some(last)) => (*date, last),
	    _ => return Err(Error::MissingData),
	};
	let params = &self.session.forecast;
	let config = ModelConfig::build(S::FAMILY, &params.scenario_parameters(), self.population)?;
	let initial = S::initial(&last, self.population)?;
	let rows = self.integrator.integrate(&config, &initial.to_row(), params.horizon())?;
	let states = rows.iter().map(|row| S::from_row(row)).collect::<Result<Vec<S>>>()?;
	info!("{} {} scenario projected {} days from {}", S::FAMILY.name(),
	      serde_plain::to_string(&params.scenario)?, params.horizon(), start);

	let projected = self.collect(NaiveDateRange(start, None).zip(states), false);
	Ok((historical, projected))

    }

    fn collect<S, I>(&self, states: I, historical: bool) -> Vec<NamedSeries>
    where S: CompartmentState, I: Iterator<Item = (NaiveDate,S)> {
	let mut named : BTreeMap<SeriesName,Series> = BTreeMap::new();
	for (date, state) in states {
	    for (name, val) in state.display() {
		if historical && name == SeriesName::Exposed {
		    continue;
		}
		named.entry(name).or_insert_with(Vec::new)
		    .push((date, rescale(val, self.population, self.session.source)));
	    }
	}
	named.into_iter().map(|(name, points)| NamedSeries { name, points }).collect()
    }

}
