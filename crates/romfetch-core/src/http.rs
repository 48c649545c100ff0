//! Shared libcurl setup for catalog and archive requests.

use std::time::Duration;

use crate::control::InterruptFlag;
use crate::settings::Settings;

/// Per-request curl knobs taken from [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct CurlOptions {
    pub connect_timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl From<&Settings> for CurlOptions {
    fn from(s: &Settings) -> Self {
        Self {
            connect_timeout: s.connect_timeout(),
            user_agent: s.user_agent.clone(),
        }
    }
}

/// New easy handle for a GET on `url`: follows redirects, applies `opts`.
/// No overall timeout is set; a stalled transfer ends only on interrupt.
pub(crate) fn easy_get(url: &str, opts: &CurlOptions) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    if let Some(t) = opts.connect_timeout {
        easy.connect_timeout(t)?;
    }
    if let Some(ua) = &opts.user_agent {
        easy.useragent(ua)?;
    }
    Ok(easy)
}

/// Blocking GET that buffers the whole body. Returns (status, body).
///
/// The transfer aborts with `CURLE_ABORTED_BY_CALLBACK` once `interrupt` is raised.
pub(crate) fn get_body(
    url: &str,
    opts: &CurlOptions,
    interrupt: &InterruptFlag,
) -> Result<(u32, Vec<u8>), curl::Error> {
    let mut body = Vec::new();
    let mut easy = easy_get(url, opts)?;
    easy.progress(true)?;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.progress_function(|_, _, _, _| !interrupt.is_raised())?;
        transfer.perform()?;
    }
    let code = easy.response_code()?;
    Ok((code, body))
}
