//! Upstream search source trait

use crate::{
    Result,
    model::{FetchRequest, ResultPage},
};
use std::sync::Arc;

/// A paginated search backend returning merged primary and folder items
#[async_trait::async_trait]
pub trait SearchSource: Send + Sync {
    /// Fetch one page of results
    async fn search(&self, request: FetchRequest) -> Result<ResultPage>;

    /// Name used in logs
    fn name(&self) -> &str {
        "upstream"
    }
}

#[async_trait::async_trait]
impl<S: SearchSource + ?Sized> SearchSource for Arc<S> {
    async fn search(&self, request: FetchRequest) -> Result<ResultPage> {
        (**self).search(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
