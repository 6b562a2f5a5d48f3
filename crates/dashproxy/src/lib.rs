//! ```text
//! ┌──────────────────┐              ┌────────────────────────────┐
//! │                  │  Rep (0,0,0) │                            │  init + segments
//! │                  ├──────────────► RepresentationDownloader   ├─────────────────► Storage
//! │                  │              │                            │
//! │  MPD Refresh #N  │              └────────────────────────────┘
//! │                  │  Rep (0,0,1) ┌────────────────────────────┐
//! │    DashProxy     ├──────────────► RepresentationDownloader   ├─────────────────► Storage
//! │                  │              │                            │
//! │                  │     ...      └────────────────────────────┘
//! │                  │
//! │                  ├────────────────────────────────────────── manifest.mpd ───► Storage
//! └──────────────────┘
//! ```
//!
//! Downloaders are created once per representation address and reused by every refresh.

pub mod dash;
pub mod downloader;
pub mod duration;
pub mod error;
pub mod fetch;
pub mod mpd;
pub mod proxy;
pub mod storage;
pub mod transport;

pub use error::{ProxyError, ProxyResult};
pub use proxy::{DashProxy, ProxyConfig, RefreshOutcome};
pub use storage::{ProxyStorage, Storage};
pub use transport::{HttpClient, Transport, TransportResponse};
