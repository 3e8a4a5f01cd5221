//! REST client over the interceptor chain.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use hyper::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::{Principal, Session};
use crate::config::Config;
use crate::error::Result;
use crate::http::{BoxFuture, Request, Transport};
use crate::interceptor::Chain;
use crate::loading::LoadingCounter;
use crate::notify::Notifier;
use crate::table::{Page, PageQuery, PageSource};

/// Login form payload.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "accessToken")]
    token: String,
}

/// JSON client bound to one API base URL.
pub struct ApiClient {
    chain: Chain,
    base_url: Url,
    login_endpoint: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(
        chain: Chain,
        mut base_url: Url,
        login_endpoint: &str,
        session: Arc<Session>,
    ) -> Self {
        // Paths are joined onto the base, which only keeps its last segment
        // when the path ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            chain,
            base_url,
            login_endpoint: login_endpoint.to_string(),
            session,
        }
    }

    /// Client with the standard interceptor stack in front of `transport`.
    pub fn from_config(
        config: &Config,
        transport: Arc<dyn Transport>,
        session: Arc<Session>,
        notifier: Arc<dyn Notifier>,
        counter: LoadingCounter,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.api.base_url)?;
        let chain = Chain::standard(
            transport,
            Arc::clone(&session),
            notifier,
            counter,
            &config.api,
        );
        Ok(Self::new(chain, base_url, &config.api.login_endpoint, session))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Absolute URL with a form-encoded query string.
    pub fn url_with_query(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let url = self.url_with_query(path, query)?;
        let response = self.chain.send(Request::get(url)).await?;
        response.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let request = Request::json(Method::POST, self.url(path)?, body)?;
        let response = self.chain.send(request).await?;
        response.json()
    }

    /// Exchange credentials for a token and open the session with it.
    pub async fn login(&self, credentials: &Credentials) -> Result<Principal> {
        debug!(email = %credentials.email, "Logging in");
        let response: LoginResponse = self.post_json(&self.login_endpoint, credentials).await?;
        self.session.login(&response.token)
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    /// A [`PageSource`] reading a paginated list endpoint.
    pub fn page_source<T>(self: &Arc<Self>, path: &str) -> Arc<dyn PageSource<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Arc::new(RestPages {
            client: Arc::clone(self),
            path: path.to_string(),
            _row: PhantomData,
        })
    }
}

struct RestPages<T> {
    client: Arc<ApiClient>,
    path: String,
    _row: PhantomData<fn() -> T>,
}

impl<T> PageSource<T> for RestPages<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn fetch(&self, query: PageQuery) -> BoxFuture<'_, Result<Page<T>>> {
        Box::pin(async move { self.client.get_json(&self.path, &query.query_pairs()).await })
    }
}
