use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use clap::{Args, Parser};
use dashproxy::{DashProxy, HttpClient, ProxyConfig, ProxyStorage};
use fake_user_agent::get_chrome_rua;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct DashProxyArgs {
    /// Debug output
    #[clap(short, long = "verbose")]
    verbose: bool,

    /// Accepted for compatibility, has no effect
    #[clap(short, long, hide = true)]
    download: bool,

    /// Output directory
    #[clap(short, long, default_value = ".")]
    output: PathBuf,

    /// Only mirror adaptation sets with this exact mimeType, e.g. "video/mp4"
    #[clap(short, long = "mime-type", default_value = "")]
    mime_type: String,

    /// Also keep every refreshed manifest as manifest.<refresh>.mpd
    #[clap(long = "save-individual-mpds")]
    save_individual_mpds: bool,

    /// Segment requests in flight per representation
    #[clap(long, default_value = "1")]
    concurrency: NonZeroUsize,

    #[clap(flatten)]
    http: HttpOptions,

    /// MPD URL
    mpd: Url,
}

#[derive(Args, Clone, Debug)]
pub struct HttpOptions {
    /// Additional HTTP headers, eg. "Referer: https://example.com"
    #[clap(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// HTTP timeout, in seconds
    #[clap(short, long, default_value = "10")]
    pub timeout: u64,
}

impl HttpOptions {
    pub fn into_client(self) -> anyhow::Result<HttpClient> {
        let mut headers = HeaderMap::new();

        for header in &self.headers {
            let (key, value) = header
                .split_once(':')
                .with_context(|| format!("Invalid header: {header}"))?;
            headers.insert(
                HeaderName::from_str(key.trim()).context("Invalid header name")?,
                HeaderValue::from_str(value.trim()).context("Invalid header value")?,
            );
        }

        let builder = Client::builder()
            .default_headers(headers)
            .user_agent(get_chrome_rua())
            .timeout(Duration::from_secs(self.timeout));
        Ok(HttpClient::new(builder)?)
    }
}

impl DashProxyArgs {
    fn config(&self) -> ProxyConfig {
        ProxyConfig {
            mime_type: self.mime_type.clone(),
            verbose: self.verbose,
            download: self.download,
            save_individual_manifests: self.save_individual_mpds,
            concurrency: self.concurrency,
            ..ProxyConfig::new(self.mpd.clone(), self.output.clone())
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dashproxy={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = DashProxyArgs::parse();
    init_tracing(args.verbose);

    let config = args.config();
    let client = args.http.into_client()?;
    let storage = ProxyStorage::file(&config.output_dir);

    DashProxy::new(config, client, storage).run().await?;
    Ok(())
}
