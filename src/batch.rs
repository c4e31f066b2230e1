//! Batch compositing for GeoJSON-like marker features
//!
//! Every eligible feature gets three composites (plain, hover, emphasized).
//! Their identifiers are written back onto the feature properties so map
//! layers can reference them as icon images.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::SpriteResult;
use crate::sprites::{CompositeRequest, EnsuredSprite, SpriteCache, SpriteVariant, VariantRole};

pub const PROP_LABEL: &str = "label";
pub const PROP_TITLE: &str = "title";
pub const PROP_SUB: &str = "sub";
pub const PROP_THUMBNAIL_URL: &str = "thumbnailUrl";
pub const PROP_IS_MULTI_POST: &str = "isMultiPost";
pub const PROP_POINT_COUNT: &str = "point_count";

pub const PROP_COMPOSITE_ID: &str = "compositeId";
pub const PROP_HOVER_COMPOSITE_ID: &str = "hoverCompositeId";
pub const PROP_BIG_COMPOSITE_ID: &str = "bigCompositeId";

const ROLES: [VariantRole; 3] = [VariantRole::Plain, VariantRole::Hover, VariantRole::Emphasized];

/// Property a role's identifier is written to
pub fn property_for(role: VariantRole) -> &'static str {
    match role {
        VariantRole::Plain => PROP_COMPOSITE_ID,
        VariantRole::Hover => PROP_HOVER_COMPOSITE_ID,
        VariantRole::Emphasized => PROP_BIG_COMPOSITE_ID,
    }
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Feature {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self {
            kind: feature_type(),
            geometry: None,
            properties,
        }
    }

    /// Non-empty string property
    fn text(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Cluster aggregates carry a truthy `point_count`
    pub fn is_cluster(&self) -> bool {
        match self.properties.get(PROP_POINT_COUNT) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn label_text(&self) -> Option<&str> {
        self.text(PROP_LABEL).or_else(|| self.text(PROP_TITLE))
    }

    pub fn icon_key<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.text(PROP_SUB).unwrap_or(fallback)
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.text(PROP_THUMBNAIL_URL)
    }

    pub fn is_multi_post(&self) -> bool {
        self.properties.get(PROP_IS_MULTI_POST) == Some(&Value::Bool(true))
    }

    pub fn composite_id(&self, role: VariantRole) -> Option<&str> {
        self.properties.get(property_for(role)).and_then(Value::as_str)
    }

    /// The three requests for this feature, or `None` when it gets no composites
    pub fn composite_requests(&self, fallback_icon_key: &str) -> Option<[CompositeRequest; 3]> {
        if self.is_cluster() {
            return None;
        }
        let label = self.label_text()?;
        let icon = self.icon_key(fallback_icon_key);
        let multi = self.is_multi_post();

        Some(ROLES.map(|role| {
            let request =
                CompositeRequest::new(SpriteVariant::for_role(role, multi), label, icon);
            match (role, self.thumbnail_url()) {
                (VariantRole::Emphasized, Some(url)) => request.with_thumbnail(url),
                _ => request,
            }
        }))
    }
}

/// One variant build started for a feature
#[derive(Debug)]
pub struct VariantHandle {
    pub feature_index: usize,
    pub role: VariantRole,
    pub id: String,
    pub handle: JoinHandle<SpriteResult<EnsuredSprite>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub features: usize,
    pub skipped: usize,
    pub launched: usize,
    pub awaited: usize,
    pub written: usize,
    pub failed: usize,
    /// Builds left running past the await cap
    pub not_awaited: usize,
}

/// Start every variant build for `features` without waiting for any of them
///
/// Each build protects its two siblings from eviction. Nothing is started
/// below the cache's minimum zoom.
pub fn launch_for_features(cache: &SpriteCache, features: &[Feature], zoom: f64) -> Vec<VariantHandle> {
    if !cache.is_zoom_eligible(zoom) {
        debug!("Zoom {} below composite threshold, skipping {} features", zoom, features.len());
        return Vec::new();
    }
    let fallback_icon_key = cache.config().fallback_icon_key.clone();
    let mut handles = Vec::with_capacity(features.len() * ROLES.len());

    for (feature_index, feature) in features.iter().enumerate() {
        let Some(requests) = feature.composite_requests(&fallback_icon_key) else {
            continue;
        };
        let ids: Vec<String> = requests.iter().map(|r| cache.derive_id(r)).collect();

        for (slot, request) in requests.into_iter().enumerate() {
            let protected: Vec<String> = ids
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != slot)
                .map(|(_, id)| id.clone())
                .collect();
            let task_cache = cache.clone();
            let handle = tokio::spawn(async move {
                task_cache.ensure_protected(request, &protected).await
            });
            handles.push(VariantHandle {
                feature_index,
                role: ROLES[slot],
                id: ids[slot].clone(),
                handle,
            });
        }
    }
    handles
}

/// Build composites for `features` and write their identifiers back
///
/// A failed variant is logged and its property left unset; the batch itself
/// never fails.
pub async fn composite_for_features(
    cache: &SpriteCache,
    features: &mut [Feature],
    zoom: f64,
) -> BatchSummary {
    let handles = launch_for_features(cache, features, zoom);
    let mut summary = BatchSummary {
        features: features.len(),
        launched: handles.len(),
        skipped: features.len() - handles.len() / ROLES.len(),
        ..Default::default()
    };

    let cap = cache.config().max_awaited_per_batch;
    let mut pending = handles.into_iter();
    for VariantHandle {
        feature_index,
        role,
        id,
        handle,
    } in pending.by_ref().take(cap)
    {
        summary.awaited += 1;
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(sprite_id = %id, error = %e, "Composite task did not complete");
                summary.failed += 1;
                continue;
            }
        };
        match outcome {
            Ok(sprite) => {
                if let Some(feature) = features.get_mut(feature_index) {
                    feature
                        .properties
                        .insert(property_for(role).to_string(), Value::String(sprite.id));
                    summary.written += 1;
                }
            }
            Err(e) => {
                warn!(sprite_id = %id, role = ?role, error = %e, "Failed to create composite");
                summary.failed += 1;
            }
        }
    }
    summary.not_awaited = pending.len();

    info!(
        "Composited {} features: {} written, {} failed, {} not awaited",
        summary.features - summary.skipped,
        summary.written,
        summary.failed,
        summary.not_awaited
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(value: Value) -> Feature {
        serde_json::from_value(json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
            "properties": value
        }))
        .unwrap()
    }

    #[test]
    fn test_requests_follow_feature_properties() {
        let f = feature(json!({
            "label": "Farmers Market",
            "sub": "food",
            "thumbnailUrl": "https://img/1.jpg"
        }));
        let [plain, hover, big] = f.composite_requests("multi").unwrap();

        assert_eq!(plain.variant, SpriteVariant::Plain);
        assert_eq!(hover.variant, SpriteVariant::Hover);
        assert_eq!(big.variant, SpriteVariant::Emphasized);
        assert_eq!(plain.icon_key, "food");
        assert_eq!(plain.thumbnail_url, None);
        assert_eq!(hover.thumbnail_url, None);
        assert_eq!(big.thumbnail_url.as_deref(), Some("https://img/1.jpg"));
    }

    #[test]
    fn test_multi_post_and_fallbacks() {
        let f = feature(json!({ "title": "Two events", "isMultiPost": true }));
        let [plain, hover, big] = f.composite_requests("multi-post-icon").unwrap();

        assert_eq!(plain.label_text, "Two events");
        assert_eq!(plain.icon_key, "multi-post-icon");
        assert_eq!(plain.variant, SpriteVariant::PlainMulti);
        assert_eq!(hover.variant, SpriteVariant::HoverMulti);
        assert_eq!(big.variant, SpriteVariant::EmphasizedMulti);
    }

    #[test]
    fn test_clusters_and_unlabelled_features_are_skipped() {
        assert!(feature(json!({ "label": "x", "point_count": 12 }))
            .composite_requests("m")
            .is_none());
        assert!(feature(json!({ "sub": "food" })).composite_requests("m").is_none());
        assert!(feature(json!({ "label": "  " })).composite_requests("m").is_none());
        assert!(feature(json!({ "label": "x", "point_count": 0 }))
            .composite_requests("m")
            .is_some());
    }

    #[test]
    fn test_collection_round_trips_unknown_geometry() {
        let raw = json!({
            "type": "FeatureCollection",
            "features": [{ "type": "Feature", "geometry": null, "properties": { "label": "A" } }]
        });
        let collection: FeatureCollection = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(serde_json::to_value(&collection).unwrap(), raw);
    }
}
