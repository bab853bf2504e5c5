use techdesk_core::{AppError, AppResult};
use url::Url;

/// Connection details shared by the hosted auth and data adapters.
#[derive(Debug, Clone)]
pub struct HostedBackend {
    http_client: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl HostedBackend {
    /// Creates a backend handle for the project at `base_url`.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        anon_key: impl Into<String>,
    ) -> AppResult<Self> {
        let mut base_url = Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!("invalid backend url '{base_url}': {error}"))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "backend url must use http or https, got '{}'",
                base_url.scheme()
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(AppError::Validation(
                "backend anon key must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            http_client,
            base_url,
            anon_key,
        })
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub(crate) fn anon_key(&self) -> &str {
        self.anon_key.as_str()
    }

    /// Resolves `path` against the project url and appends `query`.
    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> AppResult<Url> {
        let mut url = self.base_url.join(path).map_err(|error| {
            AppError::Internal(format!("failed to build backend url for '{path}': {error}"))
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::HostedBackend;

    #[test]
    fn endpoint_keeps_project_path_prefix() {
        let backend = HostedBackend::new(reqwest::Client::new(), "https://db.example.test/proxy", "anon")
            .unwrap_or_else(|error| panic!("{error}"));
        let url = backend
            .endpoint("auth/v1/token", &[("grant_type", "password")])
            .unwrap_or_else(|error| panic!("{error}"));

        assert_eq!(
            url.as_str(),
            "https://db.example.test/proxy/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn query_values_are_encoded() {
        let backend = HostedBackend::new(reqwest::Client::new(), "http://localhost:54321/", "anon")
            .unwrap_or_else(|error| panic!("{error}"));
        let url = backend
            .endpoint(
                "auth/v1/signup",
                &[("redirect_to", "http://localhost:3002/auth/callback")],
            )
            .unwrap_or_else(|error| panic!("{error}"));

        assert_eq!(
            url.query(),
            Some("redirect_to=http%3A%2F%2Flocalhost%3A3002%2Fauth%2Fcallback")
        );
    }

    #[test]
    fn rejects_unusable_configuration() {
        assert!(HostedBackend::new(reqwest::Client::new(), "not a url", "anon").is_err());
        assert!(HostedBackend::new(reqwest::Client::new(), "ftp://db.example.test", "anon").is_err());
        assert!(HostedBackend::new(reqwest::Client::new(), "https://db.example.test", " ").is_err());
    }
}
