//! HTTPS client for the array management REST API.

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{
    ArrayApi, ArrayError, ArrayFuture, ArrayInfo, Host, HostConnectionRow, Message,
    MessageFilter, PhoneHomeStatus, SpaceInfo, Volume, VolumeConnection,
};
use crate::config::ArrayConfig;

/// Username and password for management access.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    /// Management username.
    pub username: String,
    /// Management password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials, trimming the username.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into().trim().to_owned(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct ApiTokenResponse {
    api_token: String,
}

/// Connecting a host answers with the host under `name`.
#[derive(Deserialize)]
struct ConnectResponse {
    name: String,
    vol: String,
    lun: u32,
}

impl From<ConnectResponse> for VolumeConnection {
    fn from(value: ConnectResponse) -> Self {
        Self {
            host: value.name,
            vol: value.vol,
            lun: value.lun,
        }
    }
}

#[derive(Deserialize)]
struct ErrorEntry {
    msg: String,
    #[serde(default)]
    ctx: Option<String>,
}

/// Array client backed by a logged-in REST session.
#[derive(Clone, Debug)]
pub struct RestArray {
    client: reqwest::Client,
    base_url: String,
    target: String,
}

impl RestArray {
    /// Logs in to the array at `target` and returns a session-backed client.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::Transport`] when the array cannot be reached and
    /// [`ArrayError::Auth`] when the credentials are rejected.
    pub async fn connect(
        target: &str,
        credentials: &Credentials,
        config: &ArrayConfig,
    ) -> Result<Self, ArrayError> {
        if !config.verify_tls {
            warn!(array = target, "TLS certificate verification is disabled");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(true)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|err| ArrayError::Transport {
                target: target.to_owned(),
                message: err.to_string(),
            })?;

        let array = Self {
            client,
            base_url: base_url(target, &config.api_version),
            target: target.to_owned(),
        };
        array.login(credentials).await?;
        Ok(array)
    }

    /// Ends the REST session.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError`] when the array rejects the logout request.
    pub async fn close(&self) -> Result<(), ArrayError> {
        self.request_unit(Method::DELETE, "auth/session", &[], None, "session")
            .await
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), ArrayError> {
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        let token: ApiTokenResponse = self
            .request(Method::POST, "auth/apitoken", &[], Some(body), "api token")
            .await
            .map_err(|err| self.as_auth_error(err))?;

        let session = json!({ "api_token": token.api_token });
        self.request_unit(Method::POST, "auth/session", &[], Some(session), "session")
            .await
            .map_err(|err| self.as_auth_error(err))?;
        debug!(array = %self.target, user = %credentials.username, "session established");
        Ok(())
    }

    fn as_auth_error(&self, err: ArrayError) -> ArrayError {
        match err {
            ArrayError::Api { message, .. } => ArrayError::Auth {
                target: self.target.clone(),
                message,
            },
            other => other,
        }
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
        resource: &str,
    ) -> Result<T, ArrayError>
    where
        T: DeserializeOwned + Send,
    {
        let bytes = self.execute(method, path, query, body).await?;
        serde_json::from_slice(&bytes).map_err(|err| ArrayError::Decode {
            resource: resource.to_owned(),
            message: err.to_string(),
        })
    }

    async fn request_unit(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
        resource: &str,
    ) -> Result<(), ArrayError> {
        let bytes = self.execute(method, path, query, body).await?;
        if bytes.is_empty() {
            return Ok(());
        }
        serde_json::from_slice::<Value>(&bytes)
            .map(|_| ())
            .map_err(|err| ArrayError::Decode {
                resource: resource.to_owned(),
                message: err.to_string(),
            })
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Vec<u8>, ArrayError> {
        let url = format!("{}/{path}", self.base_url);
        debug!(%method, %url, "array request");

        let mut builder = self.client.request(method, &url).query(query);
        if let Some(payload) = body {
            builder = builder.json(&payload);
        }

        let response = builder.send().await.map_err(|err| self.transport(&err))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport(&err))?
            .to_vec();

        if status.is_success() {
            return Ok(bytes);
        }

        Err(ArrayError::api(status.as_u16(), api_error_message(&bytes)))
    }

    fn transport(&self, err: &reqwest::Error) -> ArrayError {
        ArrayError::Transport {
            target: self.target.clone(),
            message: err.to_string(),
        }
    }
}

/// Builds the versioned API root for a management address, defaulting to
/// HTTPS when no scheme is given.
pub(crate) fn base_url(target: &str, api_version: &str) -> String {
    let trimmed = target.trim().trim_end_matches('/');
    let version = api_version.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        format!("{trimmed}/api/{version}")
    } else {
        format!("https://{trimmed}/api/{version}")
    }
}

/// Extracts the message text from an error body.
///
/// The array answers failed requests with a list of `{msg, ctx}` entries;
/// anything else is returned verbatim.
pub(crate) fn api_error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<Vec<ErrorEntry>>(body) {
        Ok(entries) if !entries.is_empty() => entries
            .into_iter()
            .map(|entry| match entry.ctx {
                Some(ctx) if !ctx.is_empty() => format!("{ctx}: {}", entry.msg),
                _ => entry.msg,
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::from_utf8_lossy(body).trim().to_owned(),
    }
}

impl ArrayApi for RestArray {
    fn get_basic_info(&self) -> ArrayFuture<'_, ArrayInfo> {
        Box::pin(async move {
            self.request(Method::GET, "array", &[], None, "array")
                .await
        })
    }

    fn get_space_info(&self) -> ArrayFuture<'_, SpaceInfo> {
        Box::pin(async move {
            let rows: Vec<SpaceInfo> = self
                .request(Method::GET, "array", &[("space", "true")], None, "space")
                .await?;
            rows.into_iter().next().ok_or_else(|| ArrayError::Decode {
                resource: String::from("space"),
                message: String::from("empty space listing"),
            })
        })
    }

    fn get_phonehome_status(&self) -> ArrayFuture<'_, PhoneHomeStatus> {
        Box::pin(async move {
            self.request(Method::GET, "array/phonehome", &[], None, "phonehome")
                .await
        })
    }

    fn list_messages(&self, filter: MessageFilter) -> ArrayFuture<'_, Vec<Message>> {
        Box::pin(async move {
            let mut query = Vec::new();
            if filter.open {
                query.push(("open", "true"));
            }
            if filter.flagged {
                query.push(("flagged", "true"));
            }
            self.request(Method::GET, "message", &query, None, "messages")
                .await
        })
    }

    fn list_hosts(&self) -> ArrayFuture<'_, Vec<Host>> {
        Box::pin(async move { self.request(Method::GET, "host", &[], None, "hosts").await })
    }

    fn list_host_connections(&self) -> ArrayFuture<'_, Vec<HostConnectionRow>> {
        Box::pin(async move {
            self.request(Method::GET, "host", &[("all", "true")], None, "host connections")
                .await
        })
    }

    fn list_volume_connections<'a>(
        &'a self,
        volume: &'a str,
    ) -> ArrayFuture<'a, Vec<VolumeConnection>> {
        Box::pin(async move {
            let path = format!("volume/{volume}/host");
            self.request(
                Method::GET,
                &path,
                &[("private", "true")],
                None,
                "volume connections",
            )
            .await
        })
    }

    fn create_host<'a>(
        &'a self,
        name: &'a str,
        iqns: &'a [String],
        wwns: &'a [String],
    ) -> ArrayFuture<'a, Host> {
        Box::pin(async move {
            let path = format!("host/{name}");
            let body = json!({ "iqnlist": iqns, "wwnlist": wwns });
            self.request(Method::POST, &path, &[], Some(body), "host")
                .await
        })
    }

    fn delete_host<'a>(&'a self, name: &'a str) -> ArrayFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("host/{name}");
            self.request_unit(Method::DELETE, &path, &[], None, "host")
                .await
        })
    }

    fn connect_host<'a>(
        &'a self,
        host: &'a str,
        volume: &'a str,
    ) -> ArrayFuture<'a, VolumeConnection> {
        Box::pin(async move {
            let path = format!("host/{host}/volume/{volume}");
            let response: ConnectResponse = self
                .request(Method::POST, &path, &[], None, "connection")
                .await?;
            Ok(response.into())
        })
    }

    fn disconnect_host<'a>(&'a self, host: &'a str, volume: &'a str) -> ArrayFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("host/{host}/volume/{volume}");
            self.request_unit(Method::DELETE, &path, &[], None, "connection")
                .await
        })
    }

    fn list_volumes(&self, pending: bool) -> ArrayFuture<'_, Vec<Volume>> {
        Box::pin(async move {
            let query: &[(&str, &str)] = if pending { &[("pending", "true")] } else { &[] };
            self.request(Method::GET, "volume", query, None, "volumes")
                .await
        })
    }

    fn create_volume<'a>(&'a self, name: &'a str, size_bytes: u64) -> ArrayFuture<'a, Volume> {
        Box::pin(async move {
            let path = format!("volume/{name}");
            let body = json!({ "size": size_bytes });
            self.request(Method::POST, &path, &[], Some(body), "volume")
                .await
        })
    }

    fn destroy_volume<'a>(&'a self, name: &'a str) -> ArrayFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("volume/{name}");
            self.request_unit(Method::DELETE, &path, &[], None, "volume")
                .await
        })
    }

    fn eradicate_volume<'a>(&'a self, name: &'a str) -> ArrayFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("volume/{name}");
            self.request_unit(Method::DELETE, &path, &[("eradicate", "true")], None, "volume")
                .await
        })
    }
}
