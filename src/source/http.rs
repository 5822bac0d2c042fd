use super::{DocumentSource, SourceError};
use reqwest::blocking::Client;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A metadata document fetched with a plain HTTP GET.
///
/// The backend has no push-style staleness signal; a provider backed by this
/// source refreshes when the computed expiration passes. Requests carry the
/// configured timeout, and optional HTTP Basic credentials for servers that
/// gate their metadata.
pub struct HttpSource {
    url: Url,
    client: Client,
    credentials: Option<(String, String)>,
}

/// Builder for [`HttpSource`].
#[derive(Debug)]
pub struct HttpSourceBuilder {
    url: String,
    timeout: Duration,
    credentials: Option<(String, String)>,
}

impl HttpSource {
    /// Creates a source for the given URL with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(url: impl Into<String>) -> Result<Self, SourceError> {
        Self::builder(url).build()
    }

    /// Creates a builder for explicit configuration (timeout, credentials).
    pub fn builder(url: impl Into<String>) -> HttpSourceBuilder {
        HttpSourceBuilder {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            credentials: None,
        }
    }

    /// Returns the URL this source fetches from.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl HttpSourceBuilder {
    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets HTTP Basic credentials sent with every request.
    #[must_use]
    pub fn basic_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Builds the source.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the URL does not parse or the HTTP
    /// client cannot be constructed.
    pub fn build(self) -> Result<HttpSource, SourceError> {
        let url = Url::parse(&self.url)?;
        let client = Client::builder().timeout(self.timeout).build()?;
        Ok(HttpSource {
            url,
            client,
            credentials: self.credentials,
        })
    }
}

impl DocumentSource for HttpSource {
    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        let mut request = self.client.get(self.url.clone());
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource")
            .field("url", &self.url.as_str())
            .field("credentials", &self.credentials.as_ref().map(|_| "<basic>"))
            .finish()
    }
}
