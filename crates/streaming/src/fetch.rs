use formats::FeatureCollection;
use foundation::{GeoRect, LayerKind};
use runtime::CancelToken;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::source::FeatureSource;

/// Fetches a collection, abandoning the request as soon as `cancel` fires.
///
/// Cancellation wins over a result that completes in the same poll, so a
/// superseded fetch never reports data.
pub async fn fetch_cancelable(
    source: &dyn FeatureSource,
    name: &str,
    kind: LayerKind,
    bbox: Option<GeoRect>,
    cancel: &CancelToken,
) -> Result<FeatureCollection, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = source.fetch(name, kind, bbox) => result,
    };
    match &result {
        Ok(fc) => debug!(layer = name, features = fc.len(), "fetch complete"),
        Err(e) if e.is_cancellation() => debug!(layer = name, "fetch cancelled"),
        Err(e) => warn!(layer = name, error = %e, "fetch failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::fetch_cancelable;
    use crate::error::FetchError;
    use crate::source::{BoxFuture, FeatureSource};
    use formats::FeatureCollection;
    use foundation::{GeoRect, LayerKind};
    use runtime::CancelToken;

    /// Never answers within a test's lifetime.
    struct Stalled;

    impl FeatureSource for Stalled {
        fn supports_viewport(&self) -> bool {
            true
        }

        fn fetch(
            &self,
            _name: &str,
            kind: LayerKind,
            _bbox: Option<GeoRect>,
        ) -> BoxFuture<'_, Result<FeatureCollection, FetchError>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(FeatureCollection::empty(kind))
            })
        }
    }

    struct Instant;

    impl FeatureSource for Instant {
        fn supports_viewport(&self) -> bool {
            false
        }

        fn fetch(
            &self,
            _name: &str,
            kind: LayerKind,
            _bbox: Option<GeoRect>,
        ) -> BoxFuture<'_, Result<FeatureCollection, FetchError>> {
            Box::pin(async move { Ok(FeatureCollection::empty(kind)) })
        }
    }

    #[tokio::test]
    async fn cancel_aborts_a_stalled_fetch() {
        let token = CancelToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            canceller.cancel();
        });
        let err = fetch_cancelable(&Stalled, "net", LayerKind::Network, None, &token)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
    }

    #[tokio::test]
    async fn precancelled_token_never_reports_data() {
        let token = CancelToken::new();
        token.cancel();
        let err = fetch_cancelable(&Instant, "fp", LayerKind::Footprint, None, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
    }

    #[tokio::test]
    async fn passes_through_results() {
        let token = CancelToken::new();
        let fc = fetch_cancelable(&Instant, "fp", LayerKind::Footprint, None, &token)
            .await
            .unwrap();
        assert!(fc.is_empty());
    }
}
