//! Endpoint facade over [`Session`] and [`Paginator`].
//!
//! # Design
//! `Client` maps one method per API endpoint onto the shared request
//! path. Timeline-shaped endpoints hand out a [`Paginator`] carrying a
//! session snapshot; single-entity endpoints decode through [`FromJson`]
//! directly. Two endpoints with no stable schema (`friendships/show` and
//! `account/rate_limit_status`) return raw JSON values instead of typed
//! records.
//!
//! The API dialect is GET-only: even write operations put their input in
//! the query string, so every method below ends up in
//! [`Session::request`].

use std::sync::Arc;

use serde_json::Value;

use crate::entities::{DirectMessage, FromJson, Status, User};
use crate::error::ApiError;
use crate::http::Transport;
use crate::paginator::{Items, Paginator};
use crate::session::Session;

/// High-level handle for one API host.
#[derive(Clone)]
pub struct Client {
    session: Session,
}

impl Client {
    /// Anonymous client using the bundled blocking transport.
    pub fn new(base_url: &str) -> Self {
        Client { session: Session::new(base_url) }
    }

    /// Anonymous client using a caller-supplied transport.
    pub fn with_transport(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Client { session: Session::with_transport(base_url, transport) }
    }

    /// See [`Session::authenticate`].
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<bool, ApiError> {
        self.session.authenticate(username, password)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// The underlying session, for issuing requests to endpoints this
    /// facade does not cover.
    pub fn session(&self) -> &Session {
        &self.session
    }

    // Timelines.

    /// The public timeline of the whole service. No authentication
    /// needed.
    pub fn public_timeline(&self) -> Paginator<Status> {
        self.paginator("statuses/public_timeline")
    }

    /// Statuses from the authenticated user and the accounts they follow.
    pub fn friends_timeline(&self) -> Paginator<Status> {
        self.paginator("statuses/friends_timeline")
    }

    /// Statuses mentioning the authenticated user.
    pub fn mentions(&self) -> Paginator<Status> {
        self.paginator("statuses/mentions")
    }

    /// Statuses posted by one account, or by the authenticated user when
    /// `user` is `None`.
    pub fn user_timeline(&self, user: Option<&str>) -> Paginator<Status> {
        match user {
            Some(user) => self.paginator(format!("statuses/user_timeline/{user}")),
            None => self.paginator("statuses/user_timeline"),
        }
    }

    // Statuses.

    /// Post a status. Text past the service limit is truncated
    /// server-side.
    pub fn update_status(&self, text: &str, in_reply_to: Option<u64>) -> Result<Status, ApiError> {
        let mut params = vec![("status", text.to_string())];
        if let Some(id) = in_reply_to {
            params.push(("in_reply_to_status_id", id.to_string()));
        }
        self.entity("statuses/update", &params)
    }

    pub fn get_status(&self, id: u64) -> Result<Status, ApiError> {
        self.entity(&format!("statuses/show/{id}"), &[])
    }

    /// Delete one of the authenticated user's statuses. Returns the
    /// deleted status.
    pub fn destroy_status(&self, id: u64) -> Result<Status, ApiError> {
        self.entity(&format!("statuses/destroy/{id}"), &[])
    }

    // Direct messages.

    /// Messages received by the authenticated user.
    pub fn direct_messages(&self) -> Paginator<DirectMessage> {
        self.paginator("direct_messages")
    }

    /// Messages sent by the authenticated user.
    pub fn sent_direct_messages(&self) -> Paginator<DirectMessage> {
        self.paginator("direct_messages/sent")
    }

    /// Send `text` to `user`. Direct message text is never truncated or
    /// folded.
    pub fn new_direct_message(&self, user: &str, text: &str) -> Result<DirectMessage, ApiError> {
        let params = [("user", user.to_string()), ("text", text.to_string())];
        self.entity("direct_messages/new", &params)
    }

    /// Delete a message the authenticated user sent or received. Returns
    /// the deleted message.
    pub fn destroy_direct_message(&self, id: u64) -> Result<DirectMessage, ApiError> {
        self.entity(&format!("direct_messages/destroy/{id}"), &[])
    }

    // Social graph.

    /// Follow `user`. `notify` asks the service to deliver their statuses
    /// to the device channel as well.
    pub fn friendship_create(&self, user: &str, notify: bool) -> Result<User, ApiError> {
        let params = [("follow", notify.to_string())];
        self.entity(&format!("friendships/create/{user}"), &params)
    }

    /// Unfollow `user`. Returns the unfollowed account.
    pub fn friendship_destroy(&self, user: &str) -> Result<User, ApiError> {
        self.entity(&format!("friendships/destroy/{user}"), &[])
    }

    /// Relationship detail between two accounts by id. `source_id`
    /// defaults server-side to the authenticated user. The response
    /// schema is unstable, so this returns raw JSON.
    pub fn friendship_show_by_id(
        &self,
        target_id: u64,
        source_id: Option<u64>,
    ) -> Result<Value, ApiError> {
        let mut params = vec![("target_id", target_id.to_string())];
        if let Some(id) = source_id {
            params.push(("source_id", id.to_string()));
        }
        self.session.request("friendships/show", &params)
    }

    /// Relationship detail between two accounts by screen name.
    pub fn friendship_show_by_screen_name(
        &self,
        target: &str,
        source: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut params = vec![("target_screen_name", target.to_string())];
        if let Some(name) = source {
            params.push(("source_screen_name", name.to_string()));
        }
        self.session.request("friendships/show", &params)
    }

    /// Ids of every account the authenticated user follows.
    pub fn friends_ids(&self) -> Result<Vec<u64>, ApiError> {
        self.id_list("friends/ids")
    }

    /// Ids of every account following the authenticated user.
    pub fn followers_ids(&self) -> Result<Vec<u64>, ApiError> {
        self.id_list("followers/ids")
    }

    // Favorites.

    /// One page of favorites, for `screen_name` or the authenticated
    /// user. The endpoint only supports page-number paging, so this is a
    /// one-shot call rather than a [`Paginator`].
    pub fn favorites(&self, page: u64, screen_name: Option<&str>) -> Result<Items<Status>, ApiError> {
        let params = [("page", page.to_string())];
        let path = match screen_name {
            Some(name) => format!("favorites/{name}"),
            None => "favorites".to_string(),
        };
        Items::from_response(self.session.request(&path, &params)?)
    }

    /// Favorite a status. Returns it with the `favorited` flag set.
    pub fn favorite_create(&self, id: u64) -> Result<Status, ApiError> {
        self.entity(&format!("favorites/create/{id}"), &[])
    }

    pub fn favorite_destroy(&self, id: u64) -> Result<Status, ApiError> {
        self.entity(&format!("favorites/destroy/{id}"), &[])
    }

    // Notifications.

    /// Enable device notifications for `user`'s statuses.
    pub fn notifications_follow(&self, user: &str) -> Result<User, ApiError> {
        self.entity(&format!("notifications/follow/{user}"), &[])
    }

    /// Disable device notifications for `user`'s statuses.
    pub fn notifications_leave(&self, user: &str) -> Result<User, ApiError> {
        self.entity(&format!("notifications/leave/{user}"), &[])
    }

    // Blocks.

    /// Block `user`. The service also removes any friendship in both
    /// directions.
    pub fn block_create(&self, user: &str) -> Result<User, ApiError> {
        self.entity(&format!("blocks/create/{user}"), &[])
    }

    pub fn block_destroy(&self, user: &str) -> Result<User, ApiError> {
        self.entity(&format!("blocks/destroy/{user}"), &[])
    }

    /// Whether the authenticated user blocks `user`. The endpoint answers
    /// "no" with a 404, which this maps back to `Ok(None)`.
    pub fn block_exists(&self, user: &str) -> Result<Option<User>, ApiError> {
        match self.entity(&format!("blocks/exists/{user}"), &[]) {
            Ok(user) => Ok(Some(user)),
            Err(ApiError::Http { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// One page of accounts the authenticated user blocks.
    pub fn blocked_users(&self, page: u64) -> Result<Items<User>, ApiError> {
        let params = [("page", page.to_string())];
        Items::from_response(self.session.request("blocks/blocking", &params)?)
    }

    /// Ids of every account the authenticated user blocks.
    pub fn blocked_ids(&self) -> Result<Vec<u64>, ApiError> {
        self.id_list("blocks/blocking/ids")
    }

    // Account.

    /// Remaining request allowance for this session. The schema drifts
    /// between server versions, so this returns raw JSON.
    pub fn rate_limit_status(&self) -> Result<Value, ApiError> {
        self.session.request("account/rate_limit_status", &[])
    }

    fn paginator<T: FromJson>(&self, path: impl Into<String>) -> Paginator<T> {
        Paginator::new(self.session.clone(), path)
    }

    fn entity<T: FromJson>(&self, path: &str, params: &[(&str, String)]) -> Result<T, ApiError> {
        T::from_json(self.session.request(path, params)?)
    }

    fn id_list(&self, path: &str) -> Result<Vec<u64>, ApiError> {
        let body = self.session.request(path, &[])?;
        serde_json::from_value(body).map_err(|e| ApiError::Json(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::entities::fixtures::{direct_message_json, status_json, user_json};
    use crate::http::mock::MockTransport;
    use crate::http::UreqTransport;

    fn client(mock: &MockTransport) -> Client {
        Client::with_transport("http://api.test", Arc::new(mock.clone()))
    }

    #[test]
    fn session_accessor_exposes_auth_state_and_trimmed_base_url() {
        let transport = Arc::new(UreqTransport::with_timeout(Duration::from_secs(5)));
        let api = Client::with_transport("http://api.test///", transport);
        assert!(!api.session().is_authenticated());
        assert_eq!(api.session().base_url(), "http://api.test");
    }

    #[test]
    fn update_status_encodes_text_and_reply_id() {
        let mock = MockTransport::new();
        mock.push_json(
            "http://api.test/statuses/update.json?status=hello+there&in_reply_to_status_id=9",
            status_json(42, "finch", "hello there").to_string(),
        );

        let status = client(&mock).update_status("hello there", Some(9)).unwrap();
        assert_eq!(status.id, 42);
        assert_eq!(status.text, "hello there");
    }

    #[test]
    fn update_status_without_reply_sends_only_the_text() {
        let mock = MockTransport::new();
        mock.push_json(
            "http://api.test/statuses/update.json?status=solo",
            status_json(43, "finch", "solo").to_string(),
        );

        client(&mock).update_status("solo", None).unwrap();
    }

    #[test]
    fn user_timeline_switches_path_on_the_target_account() {
        let mock = MockTransport::new();
        mock.push_json("http://api.test/statuses/user_timeline/wren.json?count=20", "[]");
        mock.push_json("http://api.test/statuses/user_timeline.json?count=20", "[]");

        let api = client(&mock);
        api.user_timeline(Some("wren")).fetch_latest().unwrap();
        api.user_timeline(None).fetch_latest().unwrap();
    }

    #[test]
    fn get_status_decodes_the_entity() {
        let mock = MockTransport::new();
        mock.push_json(
            "http://api.test/statuses/show/42.json",
            status_json(42, "finch", "hello").to_string(),
        );

        let status = client(&mock).get_status(42).unwrap();
        assert_eq!(status.user.screen_name, "finch");
    }

    #[test]
    fn new_direct_message_sends_recipient_and_text() {
        let mock = MockTransport::new();
        mock.push_json(
            "http://api.test/direct_messages/new.json?user=wren&text=psst",
            direct_message_json(5, "finch", "wren", "psst").to_string(),
        );

        let message = client(&mock).new_direct_message("wren", "psst").unwrap();
        assert_eq!(message.recipient.screen_name, "wren");
        assert_eq!(message.text, "psst");
    }

    #[test]
    fn friendship_create_passes_the_notify_flag() {
        let mock = MockTransport::new();
        mock.push_json(
            "http://api.test/friendships/create/wren.json?follow=true",
            user_json(2, "wren").to_string(),
        );

        let followed = client(&mock).friendship_create("wren", true).unwrap();
        assert_eq!(followed.screen_name, "wren");
    }

    #[test]
    fn friendship_show_selects_params_by_identifier_kind() {
        let mock = MockTransport::new();
        let body = json!({"relationship": {"source": {"id": 1}, "target": {"id": 2}}});
        mock.push_json(
            "http://api.test/friendships/show.json?target_id=2&source_id=1",
            body.to_string(),
        );
        mock.push_json(
            "http://api.test/friendships/show.json?target_screen_name=wren",
            body.to_string(),
        );

        let api = client(&mock);
        let by_id = api.friendship_show_by_id(2, Some(1)).unwrap();
        assert_eq!(by_id["relationship"]["target"]["id"], json!(2));
        let by_name = api.friendship_show_by_screen_name("wren", None).unwrap();
        assert_eq!(by_name["relationship"]["source"]["id"], json!(1));
    }

    #[test]
    fn id_lists_decode_into_plain_vectors() {
        let mock = MockTransport::new();
        mock.push_json("http://api.test/friends/ids.json", "[2, 3, 5]");
        mock.push_json("http://api.test/followers/ids.json", "[]");

        let api = client(&mock);
        assert_eq!(api.friends_ids().unwrap(), vec![2, 3, 5]);
        assert_eq!(api.followers_ids().unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn favorites_addresses_the_page_and_optional_account() {
        let mock = MockTransport::new();
        mock.push_json(
            "http://api.test/favorites.json?page=1",
            json!([status_json(8, "finch", "kept")]).to_string(),
        );
        mock.push_json("http://api.test/favorites/wren.json?page=3", "[]");

        let api = client(&mock);
        let mine: Vec<Status> = api.favorites(1, None).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(mine[0].text, "kept");
        assert_eq!(api.favorites(3, Some("wren")).unwrap().len(), 0);
    }

    #[test]
    fn notification_endpoints_decode_the_user_envelope() {
        let mock = MockTransport::new();
        let enveloped = json!({"user": user_json(2, "wren")});
        mock.push_json(
            "http://api.test/notifications/follow/wren.json",
            enveloped.to_string(),
        );

        let user = client(&mock).notifications_follow("wren").unwrap();
        assert_eq!(user.screen_name, "wren");
    }

    #[test]
    fn block_exists_maps_404_to_none() {
        let mock = MockTransport::new();
        mock.push_response(
            "http://api.test/blocks/exists/wren.json",
            404,
            r#"{"error": "You are not blocking this user."}"#,
        );
        mock.push_json("http://api.test/blocks/exists/wren.json", user_json(2, "wren").to_string());

        let api = client(&mock);
        assert!(api.block_exists("wren").unwrap().is_none());
        let blocked = api.block_exists("wren").unwrap().unwrap();
        assert_eq!(blocked.id, 2);
    }

    #[test]
    fn block_exists_still_surfaces_auth_errors() {
        let mock = MockTransport::new();
        mock.push_response("http://api.test/blocks/exists/wren.json", 401, "{}");

        let err = client(&mock).block_exists("wren").unwrap_err();
        assert!(matches!(err, ApiError::AuthRequired));
    }

    #[test]
    fn blocked_users_decode_as_user_items() {
        let mock = MockTransport::new();
        mock.push_json(
            "http://api.test/blocks/blocking.json?page=1",
            json!([user_json(2, "wren")]).to_string(),
        );

        let blocked: Vec<User> =
            client(&mock).blocked_users(1).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(blocked[0].screen_name, "wren");
    }

    #[test]
    fn rate_limit_status_returns_raw_json() {
        let mock = MockTransport::new();
        mock.push_json(
            "http://api.test/account/rate_limit_status.json",
            r#"{"remaining_hits": 147, "hourly_limit": 150}"#,
        );

        let value = client(&mock).rate_limit_status().unwrap();
        assert_eq!(value["remaining_hits"], json!(147));
    }
}
