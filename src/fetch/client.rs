use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared requests. Decorators in [`super::auth`] wrap another
/// client and adjust each request before delegating.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
