use url::Url;
use validator::ValidationError;

pub const MAX_EVENT_TYPES: usize = 50;
pub const MAX_EVENT_TYPE_LEN: usize = 128;

/// A subscription's target must be an absolute `http(s)` URL with a host;
/// `validator`'s built-in `url` check only verifies the string parses as a
/// URL, not that it is something we can actually deliver to.
pub fn target_url(value: &str) -> Result<(), ValidationError> {
    let url = Url::parse(value).map_err(|_| ValidationError::new("invalid_url"))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(()),
        _ => Err(ValidationError::new("target_url_must_be_http_or_https")),
    }
}

pub fn event_types(value: &[String]) -> Result<(), ValidationError> {
    if value.len() > MAX_EVENT_TYPES {
        return Err(ValidationError::new("too_many_event_types"));
    }
    if value.iter().any(|t| t.is_empty() || t.len() > MAX_EVENT_TYPE_LEN) {
        return Err(ValidationError::new("invalid_event_type_length"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https() {
        assert!(target_url("https://example.com/hook").is_ok());
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(target_url("ftp://example.com/hook").is_err());
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(target_url("not a url").is_err());
    }

    #[test]
    fn rejects_too_many_event_types() {
        let types: Vec<String> = (0..MAX_EVENT_TYPES + 1).map(|i| i.to_string()).collect();
        assert!(event_types(&types).is_err());
    }
}
