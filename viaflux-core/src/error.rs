use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network response contained no elements")]
    NoData,
    #[error("No origin/destination pair yields a route")]
    NoRouteFound,
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
