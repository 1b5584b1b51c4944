use url::Url;

fn is_local(host: &str) -> bool {
    host.starts_with("localhost") || host.starts_with("127.0.0.1") || host.contains(".localhost")
}

/// canonical form of a relay address: websocket scheme, lowercase host, no trailing slash.
/// `http(s)` becomes `ws(s)` and a bare host gets `wss`, or `ws` when it is local.
pub fn normalize_url(raw: &str) -> Result<Url, url::ParseError> {
    let raw = raw.trim();
    let with_scheme = match raw.split_once("://") {
        Some((scheme, rest)) => match scheme.to_ascii_lowercase().as_str() {
            "https" => format!("wss://{}", rest),
            "http" => format!("ws://{}", rest),
            _ => raw.to_string(),
        },
        None if is_local(raw) => format!("ws://{}", raw),
        None => format!("wss://{}", raw),
    };

    let mut url = Url::parse(&with_scheme)?;
    if let Some(host) = url.host_str().map(str::to_lowercase) {
        let _ = url.set_host(Some(&host));
    }
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&path);

    Ok(url)
}

/// whether the normalized form of `raw` is something we can open a relay connection to
pub fn is_valid_relay_url(raw: &str) -> bool {
    match normalize_url(raw) {
        Ok(url) => matches!(url.scheme(), "ws" | "wss") && url.host_str().is_some(),
        Err(_) => false,
    }
}
