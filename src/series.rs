use chrono::naive::NaiveDate;


pub type Series = Vec<(NaiveDate,f64)>;


/// Daily new values from a running total. The first day has no
/// predecessor, so it keeps the total itself.
pub fn daily(data: &Series) -> Series {
    (0..data.len()).map(
	|i| (data[i].0, data[i].1 - if i > 0 {data[i-1].1} else {0.0})
    ).collect()
}

pub fn cumsum(data: &Series) -> Series {
    let mut sum = 0.0;
    data.iter().map(
	|(k,v)| {sum += v; (*k, sum)}
    ).collect()
}

/// Sum over the last `window` days, including the current one. Days before
/// the start of the series count as zero.
pub fn trailing_sum(data: &Series, window: usize) -> Series {
    let mut sum = 0.0;
    (0..data.len()).map(|i| {
	sum += data[i].1 - if i >= window {data[i-window].1} else {0.0};
	(data[i].0, sum)
    }).collect()
}

pub fn scale(data: &Series, factor: f64) -> Series {
    data.iter().map(|(date,val)| (*date, val * factor)).collect()
}

#[cfg(test)]
pub fn values(data: &Series) -> Vec<f64> {
    data.iter().map(|(_,val)| *val).collect()
}


#[derive(Clone,Debug)]
pub struct NaiveDateRange(pub NaiveDate, pub Option<NaiveDate>);

impl Iterator for NaiveDateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<NaiveDate> {
	match self.1.map_or(true, |end| self.0 <= end) {
	    false => None,
	    true => {
		let current = self.0;
		self.0 = self.0.succ_opt()?;
		Some(current)
	    }
	}
    }
}
