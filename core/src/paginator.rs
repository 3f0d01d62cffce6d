//! Cursoring over repeatable listing endpoints.
//!
//! # Design
//! One `Paginator` wraps one endpoint path plus a session snapshot. It
//! tracks the highest entity id it has seen (the watermark) and turns it
//! into `since_id` and `max_id` query parameters, so callers get "what is
//! new since last time" and "page N of what I was looking at" without
//! touching query strings themselves.
//!
//! Decoding is deferred. A fetch parses one JSON array eagerly, notes the
//! newest id from the raw elements, and hands back an [`Items`] iterator
//! that decodes one element per step. The watermark therefore advances
//! even when individual elements later fail to decode.

use std::marker::PhantomData;

use serde_json::Value;

use crate::entities::FromJson;
use crate::error::ApiError;
use crate::session::Session;

/// Largest page size the API accepts.
pub const MAX_COUNT: u64 = 3200;

/// Page size used when the caller never sets one.
pub const DEFAULT_COUNT: u64 = 20;

/// Lazily decoded elements of one listing response.
///
/// Finite, single pass, in server order (newest first). Elements that
/// fail to decode yield an `Err` without ending the iteration.
#[derive(Debug)]
pub struct Items<T> {
    values: std::vec::IntoIter<Value>,
    _decode: PhantomData<fn() -> T>,
}

impl<T: FromJson> Items<T> {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Items { values: values.into_iter(), _decode: PhantomData }
    }

    /// Build from a whole listing response, which must be a JSON array.
    pub(crate) fn from_response(body: Value) -> Result<Self, ApiError> {
        let values = serde_json::from_value(body).map_err(|e| ApiError::Json(e.to_string()))?;
        Ok(Items::new(values))
    }
}

impl<T: FromJson> Iterator for Items<T> {
    type Item = Result<T, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.values.next().map(T::from_json)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<T: FromJson> ExactSizeIterator for Items<T> {}

/// Stateful cursor over one listing endpoint.
pub struct Paginator<T> {
    session: Session,
    path: String,
    count: u64,
    page: u64,
    last_id: Option<u64>,
    _decode: PhantomData<fn() -> T>,
}

impl<T: FromJson> Paginator<T> {
    /// Cursor over `path`, issuing requests through a snapshot of
    /// `session`.
    pub fn new(session: Session, path: impl Into<String>) -> Self {
        Paginator {
            session,
            path: path.into(),
            count: DEFAULT_COUNT,
            page: 1,
            last_id: None,
            _decode: PhantomData,
        }
    }

    /// Set the page size, clamped to the API ceiling. Returns the value
    /// actually stored.
    pub fn set_count(&mut self, count: u64) -> u64 {
        self.count = count.clamp(1, MAX_COUNT);
        self.count
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Page the next [`fetch_next_page`](Self::fetch_next_page) call will
    /// advance past.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Highest entity id seen by [`fetch_latest`](Self::fetch_latest) or
    /// [`fetch_new`](Self::fetch_new) so far.
    pub fn last_seen_id(&self) -> Option<u64> {
        self.last_id
    }

    /// Fetch the newest items regardless of the watermark, and reset the
    /// page counter. A non-empty result moves the watermark to the newest
    /// returned id.
    pub fn fetch_latest(&mut self) -> Result<Items<T>, ApiError> {
        self.page = 1;
        let params = [("count", self.count.to_string())];
        let values = self.fetch(&params)?;
        if let Some(newest) = newest_id(&values)? {
            self.last_id = Some(newest);
        }
        Ok(Items::new(values))
    }

    /// Fetch items that appeared after the watermark, newest first. This
    /// is the polling call: an empty result leaves the watermark alone, a
    /// non-empty one advances it. Without a watermark it behaves like
    /// [`fetch_latest`](Self::fetch_latest).
    pub fn fetch_new(&mut self) -> Result<Items<T>, ApiError> {
        self.page = 1;
        let mut params = vec![("count", self.count.to_string())];
        if let Some(id) = self.last_id {
            params.push(("since_id", id.to_string()));
        }
        let values = self.fetch(&params)?;
        if let Some(newest) = newest_id(&values)? {
            // The watermark never moves backwards, whatever the server
            // returns.
            self.last_id = Some(self.last_id.map_or(newest, |seen| seen.max(newest)));
        }
        Ok(Items::new(values))
    }

    /// Fetch an arbitrary page. Once a watermark exists the request is
    /// bounded by `max_id`, so page numbers keep addressing the same
    /// items while newer ones arrive upstream.
    pub fn fetch_page(&self, page: u64) -> Result<Items<T>, ApiError> {
        let mut params = vec![("count", self.count.to_string()), ("page", page.to_string())];
        if let Some(id) = self.last_id {
            params.push(("max_id", id.to_string()));
        }
        Ok(Items::new(self.fetch(&params)?))
    }

    /// Advance the page counter and fetch that page.
    pub fn fetch_next_page(&mut self) -> Result<Items<T>, ApiError> {
        self.page += 1;
        self.fetch_page(self.page)
    }

    fn fetch(&self, params: &[(&str, String)]) -> Result<Vec<Value>, ApiError> {
        let body = self.session.request(&self.path, params)?;
        serde_json::from_value(body).map_err(|e| ApiError::Json(e.to_string()))
    }
}

/// Id of the newest (first) element of a raw listing, read before any
/// entity decoding happens.
fn newest_id(values: &[Value]) -> Result<Option<u64>, ApiError> {
    let Some(first) = values.first() else {
        return Ok(None);
    };
    match first.get("id") {
        None => Err(ApiError::MissingField { entity: "listing item", field: "id" }),
        Some(id) => id
            .as_u64()
            .map(Some)
            .ok_or(ApiError::InvalidField { entity: "listing item", field: "id" }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::http::mock::MockTransport;

    /// Minimal decodable record; paginator logic is entity-agnostic.
    #[derive(Debug, PartialEq)]
    struct Item {
        id: u64,
    }

    impl FromJson for Item {
        fn from_json(value: Value) -> Result<Self, ApiError> {
            value
                .get("id")
                .and_then(Value::as_u64)
                .map(|id| Item { id })
                .ok_or(ApiError::MissingField { entity: "item", field: "id" })
        }
    }

    const PATH: &str = "statuses/public_timeline";
    const URL: &str = "http://api.test/statuses/public_timeline.json";

    fn paginator(mock: &MockTransport) -> Paginator<Item> {
        let session = Session::with_transport("http://api.test", Arc::new(mock.clone()));
        Paginator::new(session, PATH)
    }

    fn ids(items: Items<Item>) -> Vec<u64> {
        items.map(|item| item.unwrap().id).collect()
    }

    #[test]
    fn count_is_clamped_to_the_api_ceiling() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        assert_eq!(timeline.count(), DEFAULT_COUNT);
        assert_eq!(timeline.set_count(5000), 3200);
        assert_eq!(timeline.set_count(0), 1);
        assert_eq!(timeline.set_count(50), 50);
        assert_eq!(timeline.count(), 50);
    }

    #[test]
    fn fetch_latest_sets_the_watermark_from_the_newest_element() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 30}, {"id": 29}]"#);

        let items = timeline.fetch_latest().unwrap();
        assert_eq!(ids(items), vec![30, 29]);
        assert_eq!(timeline.last_seen_id(), Some(30));
    }

    #[test]
    fn fetch_new_without_a_watermark_sends_no_since_id() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 7}]"#);

        let items = timeline.fetch_new().unwrap();
        assert_eq!(ids(items), vec![7]);
        assert_eq!(timeline.last_seen_id(), Some(7));
    }

    #[test]
    fn fetch_new_sends_the_watermark_as_since_id_and_advances_it() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 30}]"#);
        mock.push_json(format!("{URL}?count=20&since_id=30"), r#"[{"id": 42}, {"id": 31}]"#);

        timeline.fetch_latest().unwrap();
        let items = timeline.fetch_new().unwrap();
        assert_eq!(ids(items), vec![42, 31]);
        assert_eq!(timeline.last_seen_id(), Some(42));
    }

    #[test]
    fn empty_fetch_new_leaves_the_watermark_alone() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 30}]"#);
        mock.push_json(format!("{URL}?count=20&since_id=30"), "[]");
        mock.push_json(format!("{URL}?count=20&since_id=30"), "[]");

        timeline.fetch_latest().unwrap();
        assert_eq!(ids(timeline.fetch_new().unwrap()), Vec::<u64>::new());
        assert_eq!(ids(timeline.fetch_new().unwrap()), Vec::<u64>::new());
        assert_eq!(timeline.last_seen_id(), Some(30));
    }

    #[test]
    fn the_watermark_never_moves_backwards() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 30}]"#);
        // A misbehaving server returns an older item despite since_id.
        mock.push_json(format!("{URL}?count=20&since_id=30"), r#"[{"id": 10}]"#);

        timeline.fetch_latest().unwrap();
        timeline.fetch_new().unwrap();
        assert_eq!(timeline.last_seen_id(), Some(30));
    }

    #[test]
    fn fetch_page_is_unbounded_until_a_watermark_exists() {
        let mock = MockTransport::new();
        let timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20&page=2"), r#"[{"id": 5}]"#);

        let items = timeline.fetch_page(2).unwrap();
        assert_eq!(ids(items), vec![5]);
    }

    #[test]
    fn fetch_page_pins_the_listing_with_max_id_once_a_watermark_exists() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 30}]"#);
        mock.push_json(format!("{URL}?count=20&page=2&max_id=30"), r#"[{"id": 8}]"#);

        timeline.fetch_latest().unwrap();
        let items = timeline.fetch_page(2).unwrap();
        assert_eq!(ids(items), vec![8]);
        // Paging does not disturb the watermark.
        assert_eq!(timeline.last_seen_id(), Some(30));
    }

    #[test]
    fn fetch_next_page_walks_forward_and_fetch_latest_resets_it() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20&page=2"), r#"[{"id": 5}]"#);
        mock.push_json(format!("{URL}?count=20&page=3"), r#"[{"id": 3}]"#);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 30}]"#);
        mock.push_json(format!("{URL}?count=20&page=2&max_id=30"), r#"[{"id": 8}]"#);

        assert_eq!(ids(timeline.fetch_next_page().unwrap()), vec![5]);
        assert_eq!(timeline.page(), 2);
        assert_eq!(ids(timeline.fetch_next_page().unwrap()), vec![3]);
        assert_eq!(timeline.page(), 3);

        timeline.fetch_latest().unwrap();
        assert_eq!(timeline.page(), 1);
        assert_eq!(ids(timeline.fetch_next_page().unwrap()), vec![8]);
    }

    #[test]
    fn a_custom_count_reaches_the_query_string() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=3200"), "[]");

        timeline.set_count(9999);
        timeline.fetch_latest().unwrap();
    }

    #[test]
    fn elements_decode_one_at_a_time_and_errors_do_not_end_iteration() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 3}, {"nope": true}, {"id": 1}]"#);

        let mut items = timeline.fetch_latest().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items.next().unwrap().unwrap(), Item { id: 3 });
        assert!(items.next().unwrap().is_err());
        assert_eq!(items.next().unwrap().unwrap(), Item { id: 1 });
        assert!(items.next().is_none());
    }

    #[test]
    fn a_non_array_response_is_a_json_error() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"{"error": "unexpected"}"#);

        let err = timeline.fetch_latest().unwrap_err();
        assert!(matches!(err, ApiError::Json(_)));
    }

    #[test]
    fn http_failures_propagate_without_touching_state() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 30}]"#);
        mock.push_response(format!("{URL}?count=20&since_id=30"), 503, "over capacity");

        timeline.fetch_latest().unwrap();
        let err = timeline.fetch_new().unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 503, .. }));
        assert_eq!(timeline.last_seen_id(), Some(30));
    }

    #[test]
    fn a_listing_element_without_an_id_fails_the_fetch() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"text": "no id"}]"#);

        let err = timeline.fetch_latest().unwrap_err();
        assert!(matches!(
            err,
            ApiError::MissingField { entity: "listing item", field: "id" }
        ));
        assert_eq!(timeline.last_seen_id(), None);
    }

    #[test]
    fn items_can_be_collected_into_a_result_vec() {
        let mock = MockTransport::new();
        let mut timeline = paginator(&mock);
        mock.push_json(format!("{URL}?count=20"), r#"[{"id": 2}, {"id": 1}]"#);

        let items: Result<Vec<Item>, ApiError> = timeline.fetch_latest().unwrap().collect();
        assert_eq!(items.unwrap(), vec![Item { id: 2 }, Item { id: 1 }]);
    }

    #[test]
    fn json_fixtures_decode_through_the_paginator() {
        use crate::entities::fixtures::status_json;
        use crate::entities::Status;

        let mock = MockTransport::new();
        let session = Session::with_transport("http://api.test", Arc::new(mock.clone()));
        let mut timeline: Paginator<Status> = Paginator::new(session, PATH);
        let body = json!([status_json(42, "finch", "hello")]);
        mock.push_json(format!("{URL}?count=20"), body.to_string());

        let statuses: Result<Vec<Status>, ApiError> = timeline.fetch_latest().unwrap().collect();
        let statuses = statuses.unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].user.screen_name, "finch");
        assert_eq!(timeline.last_seen_id(), Some(42));
    }
}
