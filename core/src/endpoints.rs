//! Typed operations of the Gorse API.
//!
//! Each method names one endpoint: its method, path and optional body or
//! query go to `GorseClient::send`, and the decoded value is converted into
//! the operation's result type. Identifiers and categories are escaped as
//! path segments.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::{GorseClient, NO_BODY};
use crate::error::ApiError;
use crate::http::{HttpMethod, Transport};
use crate::query::{encode_segment, ListOptions, QueryValue};
use crate::types::{Feedback, Item, RowAffected, User};

impl<T: Transport> GorseClient<T> {
    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    pub fn insert_user(&self, user: &User) -> Result<RowAffected, ApiError> {
        self.post("/api/user/", user)
    }

    pub fn get_user(&self, user_id: &str) -> Result<User, ApiError> {
        self.get(&format!("/api/user/{}", encode_segment(user_id)), &[])
    }

    pub fn delete_user(&self, user_id: &str) -> Result<RowAffected, ApiError> {
        self.delete(&format!("/api/user/{}", encode_segment(user_id)))
    }

    /// Users most similar to `user_id`.
    pub fn get_user_neighbors(&self, user_id: &str) -> Result<Vec<Value>, ApiError> {
        self.get_list(&format!("/api/user/{}/neighbors", encode_segment(user_id)), &[])
    }

    // ---------------------------------------------------------------------
    // Items
    // ---------------------------------------------------------------------

    pub fn insert_item(&self, item: &Item) -> Result<RowAffected, ApiError> {
        self.post("/api/item/", item)
    }

    /// Insert several items with one request. The slice is sent as a JSON array.
    pub fn batch_insert_items(&self, items: &[Item]) -> Result<RowAffected, ApiError> {
        self.post("/api/items", items)
    }

    pub fn get_item(&self, item_id: &str) -> Result<Item, ApiError> {
        self.get(&format!("/api/item/{}", encode_segment(item_id)), &[])
    }

    pub fn get_item_neighbors(&self, item_id: &str) -> Result<Vec<Value>, ApiError> {
        self.get_list(&format!("/api/item/{}/neighbors", encode_segment(item_id)), &[])
    }

    pub fn get_item_neighbors_in_category(
        &self,
        item_id: &str,
        category: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let path = format!(
            "/api/item/{}/neighbors/{}",
            encode_segment(item_id),
            encode_segment(category)
        );
        self.get_list(&path, &[])
    }

    pub fn delete_item(&self, item_id: &str) -> Result<RowAffected, ApiError> {
        self.delete(&format!("/api/item/{}", encode_segment(item_id)))
    }

    // ---------------------------------------------------------------------
    // Feedback
    // ---------------------------------------------------------------------

    pub fn insert_feedback(&self, feedback: &[Feedback]) -> Result<RowAffected, ApiError> {
        self.post("/api/feedback/", feedback)
    }

    // ---------------------------------------------------------------------
    // Recommendation lists
    // ---------------------------------------------------------------------

    /// Latest items. The endpoint is global: `user_id` is not part of the
    /// request and only labels the call in diagnostics.
    pub fn get_latest_items(&self, user_id: &str, options: &ListOptions) -> Result<Vec<Value>, ApiError> {
        tracing::trace!(user_id, "latest items");
        self.get_list("/api/latest/", &options.to_query())
    }

    pub fn get_latest_category_items(
        &self,
        user_id: &str,
        category: &str,
        options: &ListOptions,
    ) -> Result<Vec<Value>, ApiError> {
        tracing::trace!(user_id, category, "latest items in category");
        self.get_list(&format!("/api/latest/{}", encode_segment(category)), &options.to_query())
    }

    /// Popular items. Like `get_latest_items`, `user_id` is not sent.
    pub fn get_popular_items(&self, user_id: &str, options: &ListOptions) -> Result<Vec<Value>, ApiError> {
        tracing::trace!(user_id, "popular items");
        self.get_list("/api/popular", &options.to_query())
    }

    pub fn get_popular_category_items(
        &self,
        user_id: &str,
        category: &str,
        options: &ListOptions,
    ) -> Result<Vec<Value>, ApiError> {
        tracing::trace!(user_id, category, "popular items in category");
        self.get_list(&format!("/api/popular/{}", encode_segment(category)), &options.to_query())
    }

    pub fn get_recommend(&self, user_id: &str, options: &ListOptions) -> Result<Vec<Value>, ApiError> {
        self.get_list(&format!("/api/recommend/{}", encode_segment(user_id)), &options.to_query())
    }

    pub fn get_recommend_in_category(
        &self,
        user_id: &str,
        category: &str,
        options: &ListOptions,
    ) -> Result<Vec<Value>, ApiError> {
        let path = format!(
            "/api/recommend/{}/{}",
            encode_segment(user_id),
            encode_segment(category)
        );
        self.get_list(&path, &options.to_query())
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn get<R: DeserializeOwned>(&self, path: &str, query: &[(&str, QueryValue)]) -> Result<R, ApiError> {
        self.send_typed(HttpMethod::Get, path, NO_BODY, query)
    }

    fn get_list(&self, path: &str, query: &[(&str, QueryValue)]) -> Result<Vec<Value>, ApiError> {
        self.get(path, query)
    }

    fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<RowAffected, ApiError> {
        self.send_typed(HttpMethod::Post, path, Some(body), &[])
    }

    fn delete(&self, path: &str) -> Result<RowAffected, ApiError> {
        self.send_typed(HttpMethod::Delete, path, NO_BODY, &[])
    }
}
