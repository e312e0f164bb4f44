//! Issues of a project version and custom tags.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::validation::validate_page_limit;
use crate::{SscClient, SscError};

/// An issue found in a project version.
///
/// Only the commonly used members are typed; everything else is kept in
/// `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: u64,
    pub issue_instance_id: Option<String>,
    pub issue_name: Option<String>,
    pub primary_location: Option<String>,
    pub line_number: Option<u64>,
    pub friority: Option<String>,
    pub kingdom: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Paging and filtering for issue listing.
#[derive(Debug, Clone, Default)]
pub struct IssueQuery {
    pub start: u64,
    /// Page size, defaults to 20
    pub limit: Option<u32>,
    /// Server-side filter expression, e.g. `FOLDER:b968f72f-cc12-03b5-976e-ad4c13920c21`
    pub filter: Option<String>,
}

/// One page of issues plus the total number of matches.
#[derive(Debug, Clone)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    pub count: u64,
}

/// A custom tag definition.
///
/// Unknown members are preserved so that tag lists can be sent back
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub value_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Issue and custom tag API operations.
#[derive(Clone, Copy)]
pub struct IssueApi<'a> {
    client: &'a SscClient,
}

impl<'a> IssueApi<'a> {
    #[must_use]
    pub fn new(client: &'a SscClient) -> Self {
        Self { client }
    }

    /// List one page of issues of a version.
    ///
    /// # Errors
    ///
    /// Returns an error if the limit is invalid or the request fails.
    pub async fn list_issues(
        &self,
        version_id: u64,
        query: &IssueQuery,
    ) -> Result<IssuePage, SscError> {
        let limit = validate_page_limit(query.limit)?.to_string();
        let start = query.start.to_string();
        let mut params: Vec<(&str, &str)> =
            vec![("start", start.as_str()), ("limit", limit.as_str())];
        if let Some(filter) = query.filter.as_deref() {
            params.push(("filter", filter));
        }

        let endpoint = format!("/projectVersions/{version_id}/issues");
        let envelope = self.client.get_envelope::<Vec<Issue>>(&endpoint, &params).await?;
        let count = envelope.count.unwrap_or_default();
        let issues = envelope.into_data("list issues")?;
        debug!(
            "Fetched {} issues of version {version_id} (start {start}, total {count})",
            issues.len()
        );
        Ok(IssuePage { issues, count })
    }

    /// Walk every issue of a version page by page.
    ///
    /// `on_page` is invoked once per non-empty page. Returns the number of
    /// issues seen.
    ///
    /// # Errors
    ///
    /// Returns the first request error; pages already delivered stay
    /// delivered.
    pub async fn for_each_issue_page<F>(
        &self,
        version_id: u64,
        limit: Option<u32>,
        mut on_page: F,
    ) -> Result<u64, SscError>
    where
        F: FnMut(&[Issue]),
    {
        let mut seen: u64 = 0;
        loop {
            let query = IssueQuery {
                start: seen,
                limit,
                filter: None,
            };
            let page = self.list_issues(version_id, &query).await?;
            if page.issues.is_empty() {
                break;
            }
            seen = seen.saturating_add(page.issues.len() as u64);
            on_page(&page.issues);
            if page.count <= seen {
                break;
            }
        }
        Ok(seen)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_custom_tag(&self, tag: &CustomTag) -> Result<CustomTag, SscError> {
        self.client.post_data("/customTags", tag).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_custom_tag(&self, tag_id: u64) -> Result<CustomTag, SscError> {
        self.client
            .get_data(&format!("/customTags/{tag_id}"), &[])
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_custom_tags_of_version(
        &self,
        version_id: u64,
    ) -> Result<Vec<CustomTag>, SscError> {
        self.client
            .get_data(&format!("/projectVersions/{version_id}/customTags"), &[])
            .await
    }

    /// Replace the custom tags assigned to a version.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_custom_tags_of_version(
        &self,
        version_id: u64,
        tags: &[CustomTag],
    ) -> Result<Vec<CustomTag>, SscError> {
        self.client
            .put_data(&format!("/projectVersions/{version_id}/customTags"), tags)
            .await
    }
}
