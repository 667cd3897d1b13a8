//! Feature collection sources.
//!
//! A source fetches one named collection, optionally scoped to a ground
//! rectangle, and validates the payload before handing it over. Sources are
//! `Send + Sync` and return boxed futures so they can sit behind `dyn`.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use formats::FeatureCollection;
use foundation::{GeoRect, LayerKind};
use tracing::debug;

use crate::error::FetchError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait FeatureSource: Send + Sync {
    /// Whether `fetch` honors the `bbox` argument. Sources that do not are
    /// fetched once per layer and never re-queried on camera movement.
    fn supports_viewport(&self) -> bool;

    fn fetch(
        &self,
        name: &str,
        kind: LayerKind,
        bbox: Option<GeoRect>,
    ) -> BoxFuture<'_, Result<FeatureCollection, FetchError>>;
}

/// `GET {base_url}/{name}[?bbox=w,s,e,n]`.
pub struct HttpFeatureSource {
    base_url: String,
    viewport_scoped: bool,
    client: reqwest::Client,
}

impl HttpFeatureSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            viewport_scoped: false,
            client: reqwest::Client::new(),
        }
    }

    pub fn viewport_scoped(mut self, scoped: bool) -> Self {
        self.viewport_scoped = scoped;
        self
    }

    pub fn collection_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), name)
    }
}

impl FeatureSource for HttpFeatureSource {
    fn supports_viewport(&self) -> bool {
        self.viewport_scoped
    }

    fn fetch(
        &self,
        name: &str,
        kind: LayerKind,
        bbox: Option<GeoRect>,
    ) -> BoxFuture<'_, Result<FeatureCollection, FetchError>> {
        let url = self.collection_url(name);
        let bbox = bbox.filter(|_| self.viewport_scoped);
        Box::pin(async move {
            let mut request = self.client.get(&url);
            if let Some(rect) = bbox {
                request = request.query(&[("bbox", rect.to_query_value())]);
            }
            let resp = request.send().await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url,
                });
            }

            let bytes = resp.bytes().await?;
            let collection = FeatureCollection::from_geojson_slice(&bytes, kind)?;
            debug!(%url, features = collection.len(), "fetched collection");
            Ok(collection)
        })
    }
}

/// Reads `{dir}/{name}.geojson`. Always returns the whole collection.
pub struct FileFeatureSource {
    dir: PathBuf,
}

impl FileFeatureSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.geojson"))
    }
}

impl FeatureSource for FileFeatureSource {
    fn supports_viewport(&self) -> bool {
        false
    }

    fn fetch(
        &self,
        name: &str,
        kind: LayerKind,
        _bbox: Option<GeoRect>,
    ) -> BoxFuture<'_, Result<FeatureCollection, FetchError>> {
        let path = self.collection_path(name);
        Box::pin(async move {
            let bytes = tokio::fs::read(&path).await?;
            let collection = FeatureCollection::from_geojson_slice(&bytes, kind)?;
            debug!(path = %path.display(), features = collection.len(), "read collection");
            Ok(collection)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureSource, FileFeatureSource, HttpFeatureSource};
    use crate::error::FetchError;
    use foundation::LayerKind;

    const TWO_FEATURES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "priority": 3 },
              "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] } },
            { "type": "Feature", "properties": {}, "geometry": null }
        ]
    }"#;

    #[test]
    fn http_urls_join_cleanly() {
        let source = HttpFeatureSource::new("http://localhost:8080/api/");
        assert_eq!(
            source.collection_url("corridors"),
            "http://localhost:8080/api/corridors"
        );
        assert!(!source.supports_viewport());
        assert!(source.viewport_scoped(true).supports_viewport());
    }

    #[tokio::test]
    async fn file_source_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("corridors.geojson"), TWO_FEATURES).unwrap();
        std::fs::write(dir.path().join("broken.geojson"), r#"{"type":"Feature"}"#).unwrap();
        let source = FileFeatureSource::new(dir.path());

        let fc = source
            .fetch("corridors", LayerKind::Corridor, None)
            .await
            .unwrap();
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.kind, LayerKind::Corridor);

        let err = source
            .fetch("broken", LayerKind::Corridor, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Payload(_)));

        let err = source
            .fetch("missing", LayerKind::Corridor, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
        assert!(!err.is_cancellation());
    }
}
