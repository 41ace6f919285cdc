//! Ward boundary registry and point-in-polygon membership
//!
//! Ward polygons are loaded once at startup from a GeoJSON FeatureCollection
//! and shared read-only through `AppState`. Membership is a single-pass scan:
//! the dataset is small (hundreds of wards), so the first containing polygon
//! wins without any spatial indexing.

use geo::{Contains, MultiPolygon, Point};
use pulsemap_common::{Error, Result};
use std::path::Path;
use tracing::{info, warn};

/// A named ward with its boundary
#[derive(Debug)]
pub struct Ward {
    pub name: String,
    /// Parsed boundary used for the containment predicate
    boundary: MultiPolygon<f64>,
    /// Original GeoJSON geometry, echoed back in API responses
    pub geometry: geojson::Geometry,
}

/// Registry of ward boundaries
#[derive(Debug)]
pub struct WardIndex {
    wards: Vec<Ward>,
}

impl WardIndex {
    /// Load ward boundaries from a GeoJSON file
    ///
    /// A missing file is an error naming the path; features without a string
    /// `name` property or without areal geometry are skipped with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Ward boundary file not found: {}",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path)?;
        let index = Self::from_geojson_str(&raw)?;
        info!("Loaded {} ward boundaries from {}", index.len(), path.display());
        Ok(index)
    }

    /// Parse ward boundaries from GeoJSON text
    pub fn from_geojson_str(raw: &str) -> Result<Self> {
        let geojson: geojson::GeoJson = raw
            .parse()
            .map_err(|e| Error::InvalidInput(format!("Invalid ward GeoJSON: {}", e)))?;

        let collection = match geojson {
            geojson::GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(Error::InvalidInput(
                    "Ward file must be a GeoJSON FeatureCollection".to_string(),
                ))
            }
        };

        let mut wards = Vec::new();
        for (i, feature) in collection.features.into_iter().enumerate() {
            let name = feature
                .properties
                .as_ref()
                .and_then(|props| props.get("name"))
                .and_then(|v| v.as_str())
                .map(str::to_string);

            let Some(name) = name else {
                warn!("Skipping ward feature {} without a 'name' property", i);
                continue;
            };

            let Some(geometry) = feature.geometry else {
                warn!(ward = %name, "Skipping ward feature without geometry");
                continue;
            };

            let boundary = match geo::Geometry::<f64>::try_from(&geometry) {
                Ok(geo::Geometry::Polygon(polygon)) => MultiPolygon(vec![polygon]),
                Ok(geo::Geometry::MultiPolygon(multi)) => multi,
                _ => {
                    warn!(ward = %name, "Skipping ward feature with non-areal geometry");
                    continue;
                }
            };

            wards.push(Ward {
                name,
                boundary,
                geometry,
            });
        }

        if wards.is_empty() {
            warn!("Ward file contained no usable polygons");
        }

        Ok(Self { wards })
    }

    /// Find the first ward containing the given WGS84 point
    ///
    /// GeoJSON position order: longitude first.
    pub fn locate(&self, longitude: f64, latitude: f64) -> Option<&Ward> {
        let point = Point::new(longitude, latitude);
        self.wards.iter().find(|ward| ward.boundary.contains(&point))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ward> {
        self.wards.iter()
    }

    pub fn len(&self) -> usize {
        self.wards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two unit squares side by side: West [0,1]x[0,1], East [1,2]x[0,1]
    fn fixture() -> WardIndex {
        let raw = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"name": "West"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"name": "East"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[1.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0], [1.0, 0.0]]]
                    }
                }
            ]
        }"#;
        WardIndex::from_geojson_str(raw).unwrap()
    }

    #[test]
    fn test_locates_point_inside_ward() {
        let index = fixture();
        assert_eq!(index.len(), 2);
        assert_eq!(index.locate(0.5, 0.5).map(|w| w.name.as_str()), Some("West"));
        assert_eq!(index.locate(1.5, 0.5).map(|w| w.name.as_str()), Some("East"));
    }

    #[test]
    fn test_point_outside_all_wards() {
        let index = fixture();
        assert!(index.locate(5.0, 5.0).is_none());
        assert!(index.locate(-0.5, 0.5).is_none());
    }

    #[test]
    fn test_lon_lat_argument_order() {
        // A point at lon 1.5 / lat 0.5 is in East; swapped it is in nothing
        let index = fixture();
        assert_eq!(index.locate(1.5, 0.5).map(|w| w.name.as_str()), Some("East"));
        assert!(index.locate(0.5, 1.5).is_none());
    }

    #[test]
    fn test_skips_unnamed_and_non_areal_features() {
        let raw = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"name": "JustAPoint"},
                    "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}
                },
                {
                    "type": "Feature",
                    "properties": {"name": "Usable"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                    }
                }
            ]
        }"#;
        let index = WardIndex::from_geojson_str(raw).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.iter().next().unwrap().name, "Usable");
    }

    #[test]
    fn test_rejects_non_collection_input() {
        let raw = r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#;
        assert!(WardIndex::from_geojson_str(raw).is_err());
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = WardIndex::load(Path::new("/nonexistent/wards.geojson")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/wards.geojson"));
    }
}
