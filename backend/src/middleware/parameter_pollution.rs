//! HTTP parameter pollution guard.
//!
//! Repeated query parameters collapse to their last value before routing
//! reaches a handler, so `Query<T>` extractors never see duplicates. The
//! complete value lists of every repeated key are kept in request extensions
//! as [`PollutedQuery`], and the untouched request target as
//! [`OriginalUri`].

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::Uri;
use actix_web::http::uri::PathAndQuery;
use actix_web::middleware::Next;
use actix_web::{Error, HttpMessage};
use tracing::{debug, warn};
use url::form_urlencoded;

/// Every value supplied for each repeated query key, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollutedQuery(pub Vec<(String, Vec<String>)>);

impl PollutedQuery {
    /// All values supplied for `key`, if it was repeated.
    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, values)| values.as_slice())
    }
}

/// Path and query as the client sent them, recorded when the query is
/// rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalUri(pub String);

/// Outcome of collapsing a query string.
#[derive(Debug, PartialEq, Eq)]
pub struct CollapsedQuery {
    /// Re-encoded query with one value per key.
    pub query: String,
    /// Keys that were repeated, with all their values.
    pub polluted: PollutedQuery,
}

/// Collapse repeated keys to their last value.
///
/// Returns `None` when no key repeats. Key order follows first appearance.
///
/// # Examples
/// ```
/// use todo_backend::middleware::collapse_query;
///
/// let collapsed = collapse_query("sort=asc&page=1&sort=desc").expect("sort repeats");
/// assert_eq!(collapsed.query, "sort=desc&page=1");
/// assert_eq!(
///     collapsed.polluted.values("sort"),
///     Some(&["asc".to_owned(), "desc".to_owned()][..])
/// );
/// assert!(collapse_query("page=1").is_none());
/// ```
pub fn collapse_query(query: &str) -> Option<CollapsedQuery> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match grouped.iter_mut().find(|(name, _)| *name == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => grouped.push((key.into_owned(), vec![value.into_owned()])),
        }
    }

    if grouped.iter().all(|(_, values)| values.len() < 2) {
        return None;
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in &grouped {
        if let Some(last) = values.last() {
            serializer.append_pair(key, last);
        }
    }
    let query = serializer.finish();
    let polluted = grouped
        .into_iter()
        .filter(|(_, values)| values.len() > 1)
        .collect();

    Some(CollapsedQuery {
        query,
        polluted: PollutedQuery(polluted),
    })
}

fn rewrite_uri(uri: &Uri, query: &str) -> Option<Uri> {
    let path_and_query = PathAndQuery::try_from(format!("{}?{query}", uri.path())).ok()?;
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).ok()
}

/// Middleware function applying [`collapse_query`] to every request.
///
/// # Errors
///
/// Propagates errors from the wrapped service unchanged.
pub async fn parameter_pollution(
    mut req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    if let Some(collapsed) = collapse_query(req.query_string()) {
        match rewrite_uri(req.uri(), &collapsed.query) {
            Some(uri) => {
                let original = req
                    .uri()
                    .path_and_query()
                    .map_or_else(|| req.path().to_owned(), |pq| pq.as_str().to_owned());
                debug!(
                    keys = collapsed.polluted.0.len(),
                    "collapsed repeated query parameters"
                );
                req.head_mut().uri = uri;
                req.extensions_mut().insert(OriginalUri(original));
                req.extensions_mut().insert(collapsed.polluted);
            }
            None => warn!("could not rebuild request URI after collapsing query"),
        }
    }
    next.call(req).await
}
