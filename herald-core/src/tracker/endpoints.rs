//! Ordered set of fallback announce URLs for one logical tracker

use url::Url;

use super::TrackerError;
use super::protocol::constants::HTTP_SCHEMES;

/// Candidate base URLs for the same tracker, tried in order.
///
/// Index 0 is always tried first. The set is never resized after
/// construction; the only mutation is promoting an endpoint to the front so
/// the last endpoint that answered is preferred next time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerEndpoints {
    urls: Vec<String>,
}

impl TrackerEndpoints {
    /// Creates the endpoint set from torrent announce URLs.
    ///
    /// Keeps only URLs with an `http` or `https` scheme, in their original
    /// order. Unparseable and non-HTTP URLs (e.g. `udp://`) are dropped.
    ///
    /// # Errors
    ///
    /// - `TrackerError::NoValidEndpoints` - If no candidate is an HTTP URL
    pub fn new<I, S>(candidates: I) -> Result<Self, TrackerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut candidate_count = 0;
        let mut urls = Vec::new();

        for candidate in candidates {
            candidate_count += 1;
            let candidate = candidate.into();
            if is_http_url(&candidate) {
                urls.push(candidate);
            } else {
                tracing::debug!("Skipping non-HTTP tracker URL: {}", candidate);
            }
        }

        if urls.is_empty() {
            return Err(TrackerError::NoValidEndpoints {
                candidates: candidate_count,
            });
        }

        Ok(Self { urls })
    }

    /// Swaps the endpoint at `index` with the one at the front.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn promote_to_front(&mut self, index: usize) {
        self.urls.swap(0, index);
    }

    /// Returns the endpoint tried first.
    pub fn primary(&self) -> &str {
        &self.urls[0]
    }

    /// Returns endpoint at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.urls.get(index).map(String::as_str)
    }

    /// Returns all endpoints in current order.
    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Always false; construction rejects empty sets.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| HTTP_SCHEMES.contains(&url.scheme()))
        .unwrap_or(false)
}

/// Joins an endpoint base URL and an encoded announce query.
///
/// Uses `?` when the base has no query yet and `&` otherwise. Leading `?` or
/// `&` characters on `query` are stripped first.
pub fn build_full_url(base_url: &str, query: &str) -> String {
    let query = query.trim_start_matches(['?', '&']);
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}{query}")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_new_filters_non_http_urls() {
        let endpoints = TrackerEndpoints::new([
            "udp://tracker.example.com:1337/announce",
            "http://tracker.example.com/announce",
            "wss://tracker.example.com",
            "https://backup.example.com/announce",
        ])
        .unwrap();

        assert_eq!(
            endpoints.as_slice(),
            [
                "http://tracker.example.com/announce",
                "https://backup.example.com/announce"
            ]
        );
        assert_eq!(endpoints.primary(), "http://tracker.example.com/announce");
    }

    #[test]
    fn test_new_without_http_urls_fails() {
        let result = TrackerEndpoints::new(["udp://tracker.example.com:1337/announce", "not a url"]);
        assert!(matches!(
            result,
            Err(TrackerError::NoValidEndpoints { candidates: 2 })
        ));

        let result = TrackerEndpoints::new(Vec::<String>::new());
        assert!(matches!(
            result,
            Err(TrackerError::NoValidEndpoints { candidates: 0 })
        ));
    }

    #[test]
    fn test_httpish_scheme_prefix_is_not_enough() {
        let result = TrackerEndpoints::new(["httpx://tracker.example.com/announce"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_promote_to_front_swaps() {
        let mut endpoints =
            TrackerEndpoints::new(["http://a/announce", "http://b/announce", "http://c/announce"])
                .unwrap();

        endpoints.promote_to_front(2);
        assert_eq!(
            endpoints.as_slice(),
            ["http://c/announce", "http://b/announce", "http://a/announce"]
        );

        endpoints.promote_to_front(0);
        assert_eq!(endpoints.primary(), "http://c/announce");
    }

    #[test]
    #[should_panic]
    fn test_promote_out_of_range_panics() {
        let mut endpoints = TrackerEndpoints::new(["http://a/announce"]).unwrap();
        endpoints.promote_to_front(1);
    }

    #[test]
    fn test_build_full_url_without_query() {
        assert_eq!(
            build_full_url("http://tracker.example/announce", "info_hash=abc&peer_id=xyz"),
            "http://tracker.example/announce?info_hash=abc&peer_id=xyz"
        );
    }

    #[test]
    fn test_build_full_url_with_existing_query() {
        assert_eq!(
            build_full_url("http://t/a?x=1", "info_hash=abc&peer_id=xyz"),
            "http://t/a?x=1&info_hash=abc&peer_id=xyz"
        );
    }

    #[test]
    fn test_build_full_url_strips_leading_separators() {
        assert_eq!(
            build_full_url("http://t/a", "?info_hash=abc"),
            "http://t/a?info_hash=abc"
        );
        assert_eq!(
            build_full_url("http://t/a?x=1", "&&info_hash=abc"),
            "http://t/a?x=1&info_hash=abc"
        );
    }

    fn endpoint_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,8}", 1..8).prop_map(|hosts| {
            hosts
                .into_iter()
                .enumerate()
                .map(|(i, host)| format!("http://{host}{i}.example/announce"))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_construction_succeeds_with_any_http_url(
            urls in endpoint_list(),
            udp_count in 0usize..4,
        ) {
            let mut candidates: Vec<String> = (0..udp_count)
                .map(|i| format!("udp://tracker{i}.example:1337/announce"))
                .collect();
            candidates.extend(urls.iter().cloned());

            let endpoints = TrackerEndpoints::new(candidates).unwrap();
            prop_assert_eq!(endpoints.as_slice(), urls.as_slice());
        }

        #[test]
        fn prop_construction_fails_without_http_urls(count in 0usize..6) {
            let candidates: Vec<String> = (0..count)
                .map(|i| format!("udp://tracker{i}.example:1337/announce"))
                .collect();
            let result = TrackerEndpoints::new(candidates);
            prop_assert!(
                matches!(result, Err(TrackerError::NoValidEndpoints { .. })),
                "expected NoValidEndpoints"
            );
        }

        #[test]
        fn prop_promote_swaps_only_front_and_index(
            (urls, index) in endpoint_list()
                .prop_flat_map(|urls| { let len = urls.len(); (Just(urls), 0..len) })
        ) {
            let original = TrackerEndpoints::new(urls.clone()).unwrap();
            let mut promoted = original.clone();
            promoted.promote_to_front(index);

            prop_assert_eq!(promoted.get(0), original.get(index));
            prop_assert_eq!(promoted.get(index), original.get(0));
            for position in 1..urls.len() {
                if position != index {
                    prop_assert_eq!(promoted.get(position), original.get(position));
                }
            }
        }

        #[test]
        fn prop_full_url_contains_single_query_start(query in "[a-z_]{1,10}=[a-z0-9]{1,10}") {
            let plain = build_full_url("http://t/announce", &query);
            prop_assert_eq!(plain.matches('?').count(), 1);
            prop_assert!(plain.ends_with(&query));

            let with_query = build_full_url("http://t/announce?passkey=1", &query);
            prop_assert_eq!(with_query.matches('?').count(), 1);
            let expected_suffix = format!("&{}", query);
            prop_assert!(with_query.ends_with(&expected_suffix));
        }
    }
}
