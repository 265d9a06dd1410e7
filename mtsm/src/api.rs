//! Query API wrappers.
//!
//! Each call is a single attempt against `{url}{api_prefix}/api/v1/...`.
//! Parameters are anything that serializes to a query string, `&[("query",
//! "up")]` being the common case.

use reqwest::{StatusCode, header::ACCEPT};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use mtsm_payload::{
    TsMatrix, TsVector,
    query::{LabelValues, QueryResponse},
};

use crate::{Client, Error, client::join_segments};

impl Client {
    /// Instant query, `GET /api/v1/query`.
    ///
    /// # Errors
    ///
    /// Function will error if the request fails, the backend does not answer
    /// 200 or the body is not a query response.
    pub async fn query<Q>(&self, params: &Q) -> Result<QueryResponse<TsVector>, Error>
    where
        Q: Serialize + ?Sized,
    {
        self.get_json(self.api_endpoint(["query"]), params).await
    }

    /// Range query, `GET /api/v1/query_range`.
    ///
    /// # Errors
    ///
    /// See [`Client::query`].
    pub async fn query_range<Q>(&self, params: &Q) -> Result<QueryResponse<TsMatrix>, Error>
    where
        Q: Serialize + ?Sized,
    {
        self.get_json(self.api_endpoint(["query_range"]), params)
            .await
    }

    /// Values of the label `name`, `GET /api/v1/label/{name}/values`.
    ///
    /// # Errors
    ///
    /// See [`Client::query`].
    pub async fn label_values<Q>(&self, name: &str, params: &Q) -> Result<LabelValues, Error>
    where
        Q: Serialize + ?Sized,
    {
        self.get_json(self.api_endpoint(["label", name, "values"]), params)
            .await
    }

    /// Delete every series matching any of `matchers`, e.g.
    /// `{__name__=~"test_.*"}`. `POST /api/v1/admin/tsdb/delete_series`.
    ///
    /// # Errors
    ///
    /// Function will error if the request fails or the backend does not
    /// answer 204.
    pub async fn delete_series(&self, matchers: &[&str]) -> Result<(), Error> {
        let url = self.api_endpoint(["admin", "tsdb", "delete_series"]);
        let form: Vec<(&str, &str)> = matchers.iter().map(|m| ("match[]", *m)).collect();
        let request = self
            .http
            .post(url.clone())
            .header(ACCEPT, "application/json")
            .form(&form);
        self.execute(request, &url, |status| status == StatusCode::NO_CONTENT)
            .await?;
        Ok(())
    }

    fn api_endpoint<const N: usize>(&self, segments: [&str; N]) -> Url {
        join_segments(&self.api_url, ["api", "v1"].into_iter().chain(segments))
    }

    async fn get_json<T, Q>(&self, url: Url, params: &Q) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .query(params);
        let response = self
            .execute(request, &url, |status| status == StatusCode::OK)
            .await?;
        response.json::<T>().await.map_err(|source| Error::Request {
            url: url.to_string(),
            source,
        })
    }
}
