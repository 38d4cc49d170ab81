use std::{io,num,fmt};
use std::convert::From;


pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    CSV(csv::Error),
    JSON(serde_json::Error),
    Plain(serde_plain::Error),
    Reqwest(reqwest::Error),
    HttpError(reqwest::StatusCode),
    ParseFloat(num::ParseFloatError),
    ParseInt(num::ParseIntError),
    Configuration(String),
    MissingCounty(String),
    MissingPopulation(String),
    MissingData,
}

impl Error {
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
	Self::Configuration(msg.into())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
	Self::IO(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
	Self::CSV(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
	Self::JSON(err)
    }
}

impl From<serde_plain::Error> for Error {
    fn from(err: serde_plain::Error) -> Self {
	Self::Plain(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
	Self::Reqwest(err)
    }
}

impl From<num::ParseFloatError> for Error {
    fn from(err: num::ParseFloatError) -> Self {
	Self::ParseFloat(err)
    }
}

impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Self {
	Self::ParseInt(err)
    }
}


impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	match self {
	    Self::IO(err) => write!(f, "I/O error: {}", err),
	    Self::CSV(err) => write!(f, "CSV error: {}", err),
	    Self::JSON(err) => write!(f, "JSON error: {}", err),
	    Self::Plain(err) => write!(f, "Invalid option: {}", err),
	    Self::Reqwest(err) => write!(f, "Request error: {}", err),
	    Self::HttpError(err) => write!(f, "HTTP error: {}", err),
	    Self::ParseFloat(err) => write!(f, "Number parse error: {}", err),
	    Self::ParseInt(err) => write!(f, "Integer parse error: {}", err),
	    Self::Configuration(msg) => write!(f, "Configuration error: {}", msg),
	    Self::MissingCounty(fips) => write!(f, "Missing county: {}", fips),
	    Self::MissingPopulation(fips) => write!(f, "Missing population for county: {}", fips),
	    Self::MissingData => write!(f, "No data!"),
	}
    }
}

impl std::error::Error for Error {}
