//! Realtime endpoint normalization.

use url::Url;

use cw_core::constants::ROOM_KEY_PARAM;
use cw_core::error::{CwError, CwResult};

/// A validated realtime endpoint with the room key applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    room_key: String,
}

impl Endpoint {
    /// Build an endpoint from a configured address and room key.
    ///
    /// `http` becomes `ws` and `https` becomes `wss`; other schemes are
    /// rejected. Any `room_key` already present in the query is replaced.
    pub fn new(api_url: &str, room_key: &str) -> CwResult<Self> {
        let room_key = room_key.trim();
        if room_key.is_empty() {
            return Err(CwError::MissingConfig("room key".into()));
        }

        let trimmed = api_url.trim();
        if trimmed.is_empty() {
            return Err(CwError::MissingConfig("api url".into()));
        }

        let mut url =
            Url::parse(trimmed).map_err(|e| CwError::InvalidEndpoint(format!("{trimmed}: {e}")))?;

        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => return Err(CwError::UnsupportedScheme(other.to_string())),
        };
        if url.scheme() != scheme {
            url.set_scheme(scheme)
                .map_err(|_| CwError::InvalidEndpoint(format!("cannot use {scheme} for {trimmed}")))?;
        }

        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != ROOM_KEY_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in &retained {
                query.append_pair(k, v);
            }
            query.append_pair(ROOM_KEY_PARAM, room_key);
        }

        Ok(Self {
            url,
            room_key: room_key.to_string(),
        })
    }

    /// Full connect URL, including the `room_key` parameter.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Room key this endpoint connects to.
    pub fn room_key(&self) -> &str {
        &self.room_key
    }

    /// Connect URL as a string.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_normalization() {
        let ep = Endpoint::new("http://localhost:8000/v1/ws/chat", "tenant_123").unwrap();
        assert_eq!(ep.as_str(), "ws://localhost:8000/v1/ws/chat?room_key=tenant_123");

        let ep = Endpoint::new("https://bot.example.com/v1/ws/chat", "t").unwrap();
        assert_eq!(ep.as_str(), "wss://bot.example.com/v1/ws/chat?room_key=t");

        let ep = Endpoint::new("wss://bot.example.com/ws", "t").unwrap();
        assert_eq!(ep.url().scheme(), "wss");
    }

    #[test]
    fn test_room_key_replaced_not_duplicated() {
        let ep = Endpoint::new("ws://host/ws?lang=tr&room_key=old", "new").unwrap();
        assert_eq!(ep.as_str(), "ws://host/ws?lang=tr&room_key=new");
        assert_eq!(ep.room_key(), "new");
    }

    #[test]
    fn test_room_key_is_encoded() {
        let ep = Endpoint::new("ws://host/ws", "a b&c").unwrap();
        assert_eq!(ep.as_str(), "ws://host/ws?room_key=a+b%26c");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            Endpoint::new("ftp://host/ws", "t"),
            Err(CwError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            Endpoint::new("ws://host/ws", "  "),
            Err(CwError::MissingConfig(_))
        ));
        assert!(matches!(
            Endpoint::new("not a url", "t"),
            Err(CwError::InvalidEndpoint(_))
        ));
    }
}
