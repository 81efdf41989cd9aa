//! Catch-all handler for requests no route matched.

use actix_web::{HttpMessage, HttpRequest, HttpResponse};

use crate::domain::NotFoundResponse;
use crate::middleware::OriginalUri;

/// Answer any method on an unregistered path with
/// `404 {"message": "<original-url> not found"}`.
///
/// The original URL is the path plus query string as the client sent it,
/// before any query normalisation.
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    let original = req.extensions().get::<OriginalUri>().map(|uri| uri.0.clone());
    let url = original.unwrap_or_else(|| {
        req.uri()
            .path_and_query()
            .map_or_else(|| req.path().to_owned(), |pq| pq.as_str().to_owned())
    });
    HttpResponse::NotFound().json(NotFoundResponse::for_url(&url))
}
