use thiserror::Error;

use crate::mpd::RepresentationAddress;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    // MPEG-DASH errors
    #[error("Invalid MPD: {0}")]
    MpdParseError(#[from] quick_xml::DeError),

    #[error("{0} does not exist in the current MPD")]
    AddressOutOfRange(RepresentationAddress),

    #[error("MPD contains no Period")]
    NoPeriod,
}

pub type ProxyResult<T> = Result<T, ProxyError>;
