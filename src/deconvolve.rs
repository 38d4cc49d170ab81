use log::debug;

use super::error::Result;
use super::series::{self,Series};
use super::session::ForecastParameters;


/// Compartment occupancy on one day, in absolute counts.
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Observed {
    pub active: f64,
    pub fatalities: f64,
    pub recovered: f64,
}

/// Latent series reconstructed from reported totals, indexed by the
/// delay-shifted dates.
#[derive(Debug,Clone,Default)]
pub struct Reconstruction {
    pub active: Series,
    pub fatalities: Series,
    pub recovered: Series,
}

impl Reconstruction {

    pub fn len(&self) -> usize {
	self.active.len()
    }

    pub fn is_empty(&self) -> bool {
	self.active.is_empty()
    }

    pub fn last(&self) -> Option<Observed> {
	Some(Observed {
	    active: self.active.last()?.1,
	    fatalities: self.fatalities.last()?.1,
	    recovered: self.recovered.last()?.1,
	})
    }

}


/// Rebuilds active infections, fatalities and recoveries from cumulative
/// reported cases and deaths.
///
/// Reported counts are divided by the undercount factor, differenced, and
/// shifted back by the reporting delay. An infection stays active for
/// `round(1 / recovery_rate)` days. Daily deaths are clamped to the
/// infections of the window that are still alive. Deaths are paid first
/// from the cohort leaving the window that day; any excess is taken from
/// the active pool and repaid from later cohorts before they count as
/// recovered. Active, fatalities and recovered thus always add up to the
/// cumulative true cases.
pub fn deconvolve(cases: &Series, deaths: &Series,
		  params: &ForecastParameters) -> Result<Reconstruction> {

    params.validate()?;
    let window = params.infectious_period()?;
    let delay = params.reporting_delay as usize;
    let len = cases.len().min(deaths.len());

    if len <= delay {
	debug!("{} days of history do not cover a {} day delay", len, delay);
	return Ok(Reconstruction::default());
    }

    let new_cases = new_events(cases, params.undercount_factor);
    let new_deaths = new_events(deaths, params.undercount_factor);

    let infections : Series = (0..len-delay).map(
	|t| (cases[t].0, new_cases[t+delay].1)
    ).collect();
    let infected = series::trailing_sum(&infections, window);

    let mut rec = Reconstruction::default();
    let (mut owed, mut dead, mut recovered, mut clamped) = (0.0, 0.0, 0.0, 0);
    for t in 0..len-delay {

	let date = infections[t].0;
	let outflow = if t >= window {infections[t-window].1} else {0.0};
	let repaid = outflow.min(owed);
	owed -= repaid;
	let leaving = outflow - repaid;

	let alive = (infected[t].1 - owed).max(0.0);
	let reported = new_deaths[t+delay].1;
	if reported > alive {
	    clamped += 1;
	}
	let died = reported.min(alive);
	let died_leaving = died.min(leaving);
	owed += died - died_leaving;

	dead += died;
	recovered += leaving - died_leaving;
	rec.active.push((date, infected[t].1 - owed));
	rec.fatalities.push((date, dead));
	rec.recovered.push((date, recovered));

    }
    if clamped > 0 {
	debug!("{} daily death counts clamped to the active infections", clamped);
    }

    Ok(rec)

}

/// Undercount-corrected daily counts. Decreasing totals are upstream
/// corrections and count as no new events.
fn new_events(totals: &Series, undercount_factor: f64) -> Series {
    series::daily(&series::scale(totals, 1.0 / undercount_factor)).into_iter()
	.map(|(date,val)| (date, val.max(0.0)))
	.collect()
}
