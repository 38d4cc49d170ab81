use serde::{Serialize,Deserialize};

use super::county::NormalizedRecord;
use super::error::{Result,Error};
use super::forecast::ForecastExtent;
use super::model::{ModelFamily,Scenario,ScenarioParameters};
use super::normalize::DataSource;
use super::registry::MapView;


#[derive(Debug,Clone,PartialEq)]
pub struct ForecastParameters {
    pub scenario: Scenario,
    pub family: ModelFamily,
    pub extent: ForecastExtent,
    /// Daily rate of leaving the infectious state.
    pub recovery_rate: f64,
    pub reporting_delay: u32,
    /// Reported counts are divided by this factor to estimate true counts.
    pub undercount_factor: f64,
}

impl Default for ForecastParameters {
    fn default() -> Self {
	Self {
	    scenario: Scenario::Average,
	    family: ModelFamily::Sir,
	    extent: ForecastExtent::None,
	    recovery_rate: 0.1,
	    reporting_delay: 7,
	    undercount_factor: 1.0,
	}
    }
}

impl ForecastParameters {

    pub fn validate(&self) -> Result<()> {
	if !(self.undercount_factor.is_finite() && self.undercount_factor > 0.0) {
	    return Err(Error::configuration(format!(
		"undercount factor must be positive, got {}", self.undercount_factor)));
	}
	if !(self.recovery_rate.is_finite() && self.recovery_rate > 0.0) {
	    return Err(Error::configuration(format!(
		"recovery rate must be positive, got {}", self.recovery_rate)));
	}
	Ok(())
    }

    /// Days an infection stays active.
    pub fn infectious_period(&self) -> Result<usize> {
	self.validate()?;
	let days = (1.0 / self.recovery_rate).round();
	match days >= 1.0 {
	    true => Ok(days as usize),
	    false => Err(Error::configuration(format!(
		"recovery rate {} gives an infectious period under one day", self.recovery_rate))),
	}
    }

    /// Days projected past the last reconstructed day.
    pub fn horizon(&self) -> usize {
	super::forecast::HORIZON_DAYS + self.reporting_delay as usize
    }

    pub fn scenario_parameters(&self) -> ScenarioParameters {
	self.scenario.parameters(self.recovery_rate)
    }

}


/// What is shown on the map and in the county chart.
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Statistic {
    Cases,
    Fatalities,
    FatalityRate,
}

impl Default for Statistic {
    fn default() -> Self {
	Self::Cases
    }
}

impl Statistic {

    pub fn value(&self, source: DataSource, record: &NormalizedRecord) -> Option<f64> {
	match (self, source) {
	    (Self::Cases, DataSource::Cumulative) => record.p_cases,
	    (Self::Fatalities, DataSource::Cumulative) => record.p_deaths,
	    (Self::Cases, DataSource::Rolling) => record.cases,
	    (Self::Fatalities, DataSource::Rolling) => record.deaths,
	    (Self::FatalityRate, _) => record.death_rate,
	}
    }

    /// Upper end of the map colour scale.
    pub fn zmax(&self, source: DataSource) -> f64 {
	match (self, source) {
	    (Self::Cases, DataSource::Cumulative) => 0.5,
	    (Self::Fatalities, DataSource::Cumulative) => 0.01,
	    (Self::Cases, DataSource::Rolling) => 75.0,
	    (Self::Fatalities, DataSource::Rolling) => 1.0,
	    (Self::FatalityRate, _) => 0.035,
	}
    }

    pub fn name(&self) -> &'static str {
	match self {
	    Self::Cases => "cases",
	    Self::Fatalities => "deaths",
	    Self::FatalityRate => "fatality rate",
	}
    }

    pub fn format(&self, source: DataSource, val: f64) -> String {
	match (self, source) {
	    (Self::FatalityRate, _) | (_, DataSource::Cumulative) => format!("{:.1}%", val * 100.0),
	    (_, DataSource::Rolling) => format!("{:.1}/100k", val),
	}
    }

}


/// Selection state for one request, replaced wholesale on every change.
#[derive(Debug,Clone,Default,PartialEq)]
pub struct Session {
    pub source: DataSource,
    pub statistic: Statistic,
    pub map_view: MapView,
    pub forecast: ForecastParameters,
}

impl Session {

    pub fn info(&self) -> String {

	let (grouping, mut unit) = match self.source {
	    DataSource::Cumulative => ("cumulative totals", "as percentage of total population"),
	    DataSource::Rolling => ("rolling averages from the past 7 days", "per 100k people"),
	};
	if self.statistic == Statistic::FatalityRate {
	    unit = "as percentage of total cases";
	}

	format!("Viewing {} for all {} in {}. Showing {} {}.",
		grouping, self.map_view.subdivision(), self.map_view.region(),
		self.statistic.name(), unit)

    }

}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn infectious_period_rounds_inverse_rate() {
	let mut params = ForecastParameters::default();
	assert_eq!(params.infectious_period().unwrap(), 10);
	params.recovery_rate = 1.0 / 6.6;
	assert_eq!(params.infectious_period().unwrap(), 7);
	params.recovery_rate = 3.0;
	assert!(params.infectious_period().is_err());
    }

    #[test]
    fn horizon_covers_the_delay() {
	let params = ForecastParameters { reporting_delay: 5, ..ForecastParameters::default() };
	assert_eq!(params.horizon(), 19);
    }

    #[test]
    fn statistics_parse_from_labels() {
	let stat: Statistic = serde_plain::from_str("fatality-rate").unwrap();
	assert_eq!(stat, Statistic::FatalityRate);
	assert_eq!(stat.format(DataSource::Rolling, 0.0123), "1.2%");
	assert_eq!(Statistic::Cases.format(DataSource::Rolling, 42.24), "42.2/100k");
	assert_eq!(Statistic::Cases.zmax(DataSource::Rolling), 75.0);
    }

    #[test]
    fn info_describes_the_selection() {
	let session = Session {
	    source: DataSource::Rolling,
	    statistic: Statistic::Fatalities,
	    map_view: MapView::Alaska,
	    ..Session::default()
	};
	assert_eq!(session.info(),
		   "Viewing rolling averages from the past 7 days for all boroughs and \
		    census-designated areas in Alaska. Showing deaths per 100k people.");
	assert_eq!(Session::default().info(),
		   "Viewing cumulative totals for all counties in the contiguous U.S. \
		    Showing cases as percentage of total population.");
    }

}
