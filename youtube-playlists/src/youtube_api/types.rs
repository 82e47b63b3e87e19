//! Types shared by all YouTube resources, and the paginated stream used by list endpoints.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

/// One page of a list endpoint: its items and the token of the following page, if any.
pub type Page<T> = (VecDeque<T>, Option<String>);

type PendingPage<'a, F, T> = Pin<Box<dyn Future<Output = eyre::Result<(F, Page<T>)>> + 'a + Send>>;

/// Walks a `nextPageToken`-paginated list endpoint item by item.
///
/// `fetch_page` is called with `None` for the first page and with the previous page's
/// `nextPageToken` afterwards. The next page is only requested once the current one has been
/// drained. An error ends the stream after it has been yielded.
pub struct PagedStream<'a, T, F> {
    buffered: VecDeque<T>,
    in_flight: Option<PendingPage<'a, F, T>>,
    pages_fetched: usize,
    exhausted: bool,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    pub fn new<Fut>(fetch_page: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
    {
        Self {
            buffered: VecDeque::new(),
            in_flight: Some(Self::request(fetch_page, None)),
            pages_fetched: 0,
            exhausted: false,
        }
    }

    fn request<Fut>(fetch_page: F, page_token: Option<String>) -> PendingPage<'a, F, T>
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
    {
        Box::pin(async move {
            let page = fetch_page(page_token).await?;
            Ok((fetch_page, page))
        })
    }
}

impl<'a, T: Unpin, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T: Unpin, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = eyre::Result<Page<T>>> + Send + 'a,
{
    type Item = eyre::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }
            if self.exhausted {
                return Poll::Ready(None);
            }
            let Some(in_flight) = self.in_flight.as_mut() else {
                self.exhausted = true;
                return Poll::Ready(None);
            };

            match in_flight.as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => {
                    self.in_flight = None;
                    self.exhausted = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Ok((fetch_page, (items, next_page_token)))) => {
                    self.pages_fetched += 1;
                    tracing::trace!(
                        page = self.pages_fetched,
                        items = items.len(),
                        more = next_page_token.is_some(),
                        "received page"
                    );
                    self.buffered.extend(items);
                    // An empty token is how some endpoints say "no more pages".
                    match next_page_token.filter(|token| !token.is_empty()) {
                        Some(token) => {
                            self.in_flight = Some(Self::request(fetch_page, Some(token)));
                        }
                        None => {
                            self.in_flight = None;
                            self.exhausted = true;
                        }
                    }
                }
            }
        }
    }
}

/// Paging details for lists of resources.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults", default)]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(rename = "resultsPerPage", default)]
    pub results_per_page: u32,
}

/// Privacy setting of a playlist.
///
/// Only used for validating user input: the API layer passes privacy values through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Unlisted => "unlisted",
        }
    }
}

impl std::fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PrivacyStatus {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "unlisted" => Ok(Self::Unlisted),
            other => Err(eyre::eyre!("unknown privacy status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_paged_stream_walks_all_pages_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stream = PagedStream::new(|token: Option<String>| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(match token.as_deref() {
                    None => (VecDeque::from([1, 2]), Some("p2".to_string())),
                    Some("p2") => (VecDeque::from([3]), Some("p3".to_string())),
                    Some("p3") => (VecDeque::from([4, 5]), None),
                    Some(other) => panic!("unexpected page token {other}"),
                })
            }
        });

        let items: Vec<i32> = stream.collect::<eyre::Result<_>>().await.unwrap();
        assert_eq!(items, [1, 2, 3, 4, 5]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_paged_stream_stops_after_error() {
        let stream = PagedStream::new(|token: Option<String>| async move {
            match token {
                None => Ok((VecDeque::from([1]), Some("p2".to_string()))),
                Some(_) => Err(eyre::eyre!("boom")),
            }
        });
        let mut stream = std::pin::pin!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_paged_stream_treats_empty_token_as_end() {
        let stream = PagedStream::new(|token: Option<String>| async move {
            assert!(token.is_none(), "only one page should be requested");
            Ok((VecDeque::from(["a"]), Some(String::new())))
        });

        let items: Vec<&str> = stream.collect::<eyre::Result<_>>().await.unwrap();
        assert_eq!(items, ["a"]);
    }

    #[test]
    fn test_privacy_status_parsing() {
        assert_eq!("public".parse::<PrivacyStatus>().unwrap(), PrivacyStatus::Public);
        assert_eq!("unlisted".parse::<PrivacyStatus>().unwrap(), PrivacyStatus::Unlisted);
        assert!("hidden".parse::<PrivacyStatus>().is_err());
        assert!("Public".parse::<PrivacyStatus>().is_err());
        assert_eq!(PrivacyStatus::default().to_string(), "private");
    }
}
