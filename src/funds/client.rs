use crate::cache::{CapabilityKey, CapabilityKind, EntityPage, PermissionSet};
use crate::config::Config;
use crate::credentials::Credential;
use crate::funds::api_types::{
  ApiActionPermissions, ApiActivitiesResponse, ApiActivity, ApiFieldPermissions,
};
use crate::funds::types::{Activity, ActivityPatch, NewActivity};
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Funds API client wrapper
#[derive(Clone)]
pub struct FundsClient {
  http: reqwest::Client,
  base: Url,
}

impl FundsClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.api.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.api.url, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .user_agent(concat!("fundsctl/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  /// Build an endpoint url below the base path, percent-encoding each segment
  fn endpoint<I>(&self, segments: I) -> Result<Url>
  where
    I: IntoIterator,
    I::Item: AsRef<str>,
  {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| eyre!("API url {} cannot be a base", self.base))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  /// Get all activities of an initiative together with the initiative payload
  pub async fn get_activities(
    &self,
    initiative_id: i64,
    credential: &Credential,
  ) -> Result<EntityPage<Activity>> {
    let url = self.endpoint(["initiatives", initiative_id.to_string().as_str(), "activities"])?;
    debug!(%url, "GET activities");

    let response = self
      .http
      .get(url)
      .bearer_auth(credential.token())
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| eyre!("Failed to fetch activities for initiative {}: {}", initiative_id, e))?;

    let body: ApiActivitiesResponse = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse activities for initiative {}: {}", initiative_id, e))?;

    Ok(body.into_page(initiative_id))
  }

  /// Get the permission set for an entity.
  ///
  /// Returns `Ok(None)` when the authority answers 401 or 403.
  pub async fn get_permissions(
    &self,
    key: &CapabilityKey,
    credential: &Credential,
  ) -> Result<Option<PermissionSet>> {
    let kind = match key.kind {
      CapabilityKind::Fields => "fields",
      CapabilityKind::Actions => "actions",
    };
    let url = self.endpoint([
      "permissions",
      key.entity_class.as_str(),
      key.entity_id.to_string().as_str(),
      kind,
    ])?;
    debug!(%url, "GET permissions");

    let response = self
      .http
      .get(url)
      .bearer_auth(credential.token())
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch permissions for {}: {}", key, e))?;

    if matches!(
      response.status(),
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) {
      return Ok(None);
    }

    let response = response
      .error_for_status()
      .map_err(|e| eyre!("Failed to fetch permissions for {}: {}", key, e))?;

    let set = match key.kind {
      CapabilityKind::Fields => response
        .json::<ApiFieldPermissions>()
        .await
        .map(PermissionSet::from),
      CapabilityKind::Actions => response
        .json::<ApiActionPermissions>()
        .await
        .map(PermissionSet::from),
    }
    .map_err(|e| eyre!("Failed to parse permissions for {}: {}", key, e))?;

    Ok(Some(set))
  }

  /// Create an activity and return it as stored by the server
  pub async fn create_activity(
    &self,
    initiative_id: i64,
    activity: &NewActivity,
    credential: &Credential,
  ) -> Result<Activity> {
    let url = self.endpoint(["initiatives", initiative_id.to_string().as_str(), "activities"])?;

    let response = self
      .http
      .post(url)
      .bearer_auth(credential.token())
      .json(activity)
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| eyre!("Failed to create activity: {}", e))?;

    let created: ApiActivity = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse created activity: {}", e))?;

    Ok(created.into_activity(initiative_id))
  }

  /// Send a partial update for an activity
  pub async fn update_activity(&self, patch: &ActivityPatch, credential: &Credential) -> Result<()> {
    let url = self.endpoint(["activities", patch.id.to_string().as_str()])?;

    self
      .http
      .patch(url)
      .bearer_auth(credential.token())
      .json(patch)
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| eyre!("Failed to update activity {}: {}", patch.id, e))?;

    Ok(())
  }

  pub async fn delete_activity(&self, id: i64, credential: &Credential) -> Result<()> {
    let url = self.endpoint(["activities", id.to_string().as_str()])?;

    self
      .http
      .delete(url)
      .bearer_auth(credential.token())
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| eyre!("Failed to delete activity {}: {}", id, e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ApiConfig;

  fn client(url: &str) -> FundsClient {
    let config = Config {
      api: ApiConfig {
        url: url.to_string(),
        timeout_secs: 5,
      },
      ..Config::default()
    };
    FundsClient::new(&config).unwrap()
  }

  #[test]
  fn test_endpoint_below_base_path() {
    let client = client("https://funds.example.org/api/v2/");
    let url = client
      .endpoint(["initiatives", "42", "activities"])
      .unwrap();
    assert_eq!(
      url.as_str(),
      "https://funds.example.org/api/v2/initiatives/42/activities"
    );
  }

  #[test]
  fn test_endpoint_without_trailing_slash() {
    let client = client("https://funds.example.org/api");
    let url = client.endpoint(["activities", "7"]).unwrap();
    assert_eq!(url.as_str(), "https://funds.example.org/api/activities/7");
  }

  #[test]
  fn test_endpoint_encodes_segments() {
    let client = client("https://funds.example.org/");
    let url = client
      .endpoint(["permissions", "Funding Line", "3", "fields"])
      .unwrap();
    assert_eq!(
      url.as_str(),
      "https://funds.example.org/permissions/Funding%20Line/3/fields"
    );
  }

  #[test]
  fn test_invalid_url_is_rejected() {
    let config = Config {
      api: ApiConfig {
        url: "not a url".to_string(),
        timeout_secs: 5,
      },
      ..Config::default()
    };
    assert!(FundsClient::new(&config).is_err());
  }
}
