//! Avalanche event queries.
//!
//! All statements bind `$1`/`$2` to the half-open date range, followed by an
//! optional bounding box (WKT in the service CRS) and an optional array of
//! region identifiers. Geometry and properties are serialized to JSON by
//! PostGIS; this layer only decodes them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};

use avalanche_common::{BoundingBox, CrsCode, DateRange, Feature, FeatureCollection, RegionFilter};

use crate::error::DbError;
use crate::executor::Query;

/// Service CRS; stored geometries and bbox parameters use it.
pub const SERVICE_CRS: CrsCode = CrsCode::Epsg25833;

const EVENT_PROPERTIES: &str = "json_build_object(
        'skredID', h.skredid,
        'skredTidspunkt', h.skredtidspunkt,
        'noySkredTidspunkt', h.noyskredtidspunkt,
        'eksposisjonUtlopsomr', u.eksposisjonutlopsomr,
        'area', ST_Area(u.shape),
        'hoydeStoppSkred_moh', h.hoydestoppskred_moh,
        'noyHoydeStoppSkred', h.noyhoydestoppskred,
        'regStatus', h.regstatus,
        'registrertDato', h.registrertdato,
        'endretDato', h.endretdato,
        'snittHelningUtlopssomr_gr', u.snitthelningutlopssomr_gr,
        'minHelningUtlopsomr_gr', u.minhelningutlopsomr_gr,
        'maksHelningUtlopsomr_gr', u.makshelningutlopsomr_gr
    )::text";

/// Fragment names returned by the statistics query, in column order.
pub const STATISTICS_FIELDS: [&str; 5] = ["timeline", "size", "exposition", "height", "count"];

/// Which geometry of an event to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventGeometry {
    /// Runout area polygons.
    Polygons,
    /// Release points.
    Points,
}

impl EventGeometry {
    fn from_clause(&self) -> &'static str {
        match self {
            EventGeometry::Polygons => {
                "FROM skredprod.skredhendelse AS h
    INNER JOIN skredprod.utlopomr AS u ON u.skredid = h.skredid"
            }
            EventGeometry::Points => {
                "FROM skredprod.skredhendelse AS h
    INNER JOIN skredprod.skredpunkt AS p ON p.skredid = h.skredid
    LEFT JOIN skredprod.utlopomr AS u ON u.skredid = h.skredid"
            }
        }
    }

    /// Column filtered against the bounding box and serialized as geometry.
    fn geometry_column(&self) -> &'static str {
        match self {
            EventGeometry::Polygons => "u.shape",
            EventGeometry::Points => "p.shape",
        }
    }
}

/// Appends the shared WHERE clause and returns the next placeholder number.
fn push_filters(
    sql: &mut String,
    geometry_column: &str,
    bbox: Option<&BoundingBox>,
    regions: &RegionFilter,
) -> usize {
    sql.push_str("\n    WHERE h.skredtidspunkt >= $1 AND h.skredtidspunkt < $2");
    let mut param_idx = 3;

    if bbox.is_some() {
        sql.push_str(&format!(
            "\n    AND ST_Intersects({}, ST_GeomFromText(${}, {}))",
            geometry_column,
            param_idx,
            SERVICE_CRS.srid()
        ));
        param_idx += 1;
    }

    if !regions.is_empty() {
        sql.push_str(&format!("\n    AND h.region_id = ANY(${})", param_idx));
        param_idx += 1;
    }

    param_idx
}

/// Bind the parameters in the order [`push_filters`] numbered them.
fn bind_filters<'q>(
    sql: &'q str,
    range: &DateRange,
    bbox: Option<&BoundingBox>,
    regions: &RegionFilter,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let mut query = sqlx::query(sql).bind(range.start).bind(range.end);
    if let Some(bbox) = bbox {
        query = query.bind(bbox.to_wkt());
    }
    if !regions.is_empty() {
        query = query.bind(regions.ids().to_vec());
    }
    query
}

/// Events within a date range as a GeoJSON FeatureCollection.
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub geometry: EventGeometry,
    pub range: DateRange,
    pub bbox: Option<BoundingBox>,
    pub regions: RegionFilter,
}

impl EventQuery {
    pub fn new(geometry: EventGeometry, range: DateRange) -> Self {
        Self {
            geometry,
            range,
            bbox: None,
            regions: RegionFilter::default(),
        }
    }

    pub fn within(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn in_regions(mut self, regions: RegionFilter) -> Self {
        self.regions = regions;
        self
    }

    pub fn sql(&self) -> String {
        let mut sql = format!(
            "SELECT ST_AsGeoJSON({}) AS geometry,\n    {} AS properties\n    {}",
            self.geometry.geometry_column(),
            EVENT_PROPERTIES,
            self.geometry.from_clause()
        );
        push_filters(
            &mut sql,
            self.geometry.geometry_column(),
            self.bbox.as_ref(),
            &self.regions,
        );
        sql.push_str("\n    ORDER BY h.skredtidspunkt");
        sql
    }

    fn decode(rows: &[PgRow]) -> Result<FeatureCollection, DbError> {
        let texts = rows
            .iter()
            .map(|row| {
                let geometry: Option<String> =
                    row.try_get("geometry").map_err(DbError::from_query)?;
                let properties: Option<String> =
                    row.try_get("properties").map_err(DbError::from_query)?;
                Ok((geometry, properties))
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        collect_features(texts)
    }
}

/// Build a collection from `(geometry, properties)` JSON text pairs.
///
/// Rows without geometry are skipped; missing properties become `{}`.
pub fn collect_features<I>(rows: I) -> Result<FeatureCollection, DbError>
where
    I: IntoIterator<Item = (Option<String>, Option<String>)>,
{
    let mut features = Vec::new();
    for (geometry, properties) in rows {
        if let Some(geometry) = geometry {
            features.push(Feature::from_json_text(&geometry, properties.as_deref())?);
        }
    }
    Ok(FeatureCollection::new(SERVICE_CRS).with_features(features))
}

#[async_trait]
impl Query<PgConnection> for EventQuery {
    type Output = FeatureCollection;

    fn name(&self) -> &'static str {
        match self.geometry {
            EventGeometry::Polygons => "event_polygons",
            EventGeometry::Points => "event_points",
        }
    }

    async fn execute(&self, conn: &mut PgConnection) -> Result<FeatureCollection, DbError> {
        let sql = self.sql();
        let rows = bind_filters(&sql, &self.range, self.bbox.as_ref(), &self.regions)
            .fetch_all(&mut *conn)
            .await
            .map_err(DbError::from_query)?;

        Self::decode(&rows)
    }
}

/// Aggregate histograms, keyed by fragment name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Statistics(pub BTreeMap<String, Value>);

impl Statistics {
    /// Decode the JSON text fragments; missing fragments become `null`.
    pub fn from_fragments<'a, I>(fragments: I) -> Result<Self, DbError>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut map = BTreeMap::new();
        for (name, text) in fragments {
            let value = match text {
                Some(text) => serde_json::from_str(text)?,
                None => Value::Null,
            };
            map.insert(name.to_string(), value);
        }
        Ok(Self(map))
    }
}

/// Histograms of the events in a date range.
///
/// - `timeline`: events per day
/// - `size`: events per debris area class (<10k, <50k, <100k, <500k, >=500k m²)
/// - `exposition`: events per 8-point aspect (0 = N, clockwise)
/// - `height`: events per 100 m stop-height band
/// - `count`: total number of events
#[derive(Debug, Clone)]
pub struct StatisticsQuery {
    pub range: DateRange,
    pub bbox: Option<BoundingBox>,
    pub regions: RegionFilter,
}

impl StatisticsQuery {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            bbox: None,
            regions: RegionFilter::default(),
        }
    }

    pub fn within(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn in_regions(mut self, regions: RegionFilter) -> Self {
        self.regions = regions;
        self
    }

    pub fn sql(&self) -> String {
        let mut sql = String::from(
            "WITH events AS (
    SELECT h.skredtidspunkt::date AS day,
        ST_Area(u.shape) AS area,
        u.eksposisjonutlopsomr AS aspect,
        h.hoydestoppskred_moh AS height
    FROM skredprod.skredhendelse AS h
    INNER JOIN skredprod.utlopomr AS u ON u.skredid = h.skredid",
        );
        push_filters(&mut sql, "u.shape", self.bbox.as_ref(), &self.regions);
        sql.push_str(
            "
)
SELECT
    (SELECT json_object_agg(day, n ORDER BY day)
        FROM (SELECT day, count(*) AS n FROM events GROUP BY day) t)::text AS timeline,
    (SELECT json_object_agg(class, n ORDER BY class)
        FROM (SELECT CASE
                WHEN area < 10000 THEN 0
                WHEN area < 50000 THEN 1
                WHEN area < 100000 THEN 2
                WHEN area < 500000 THEN 3
                ELSE 4 END AS class,
            count(*) AS n
            FROM events WHERE area IS NOT NULL GROUP BY 1) t)::text AS size,
    (SELECT json_object_agg(sector, n ORDER BY sector)
        FROM (SELECT ((floor((aspect + 22.5) / 45)::int % 8) + 8) % 8 AS sector,
            count(*) AS n
            FROM events WHERE aspect IS NOT NULL GROUP BY 1) t)::text AS exposition,
    (SELECT json_object_agg(band, n ORDER BY band)
        FROM (SELECT (floor(height / 100) * 100)::int AS band, count(*) AS n
            FROM events WHERE height IS NOT NULL GROUP BY 1) t)::text AS height,
    (SELECT count(*) FROM events)::text AS count",
        );
        sql
    }
}

#[async_trait]
impl Query<PgConnection> for StatisticsQuery {
    type Output = Statistics;

    fn name(&self) -> &'static str {
        "statistics"
    }

    async fn execute(&self, conn: &mut PgConnection) -> Result<Statistics, DbError> {
        let sql = self.sql();
        let row = bind_filters(&sql, &self.range, self.bbox.as_ref(), &self.regions)
            .fetch_one(&mut *conn)
            .await
            .map_err(DbError::from_query)?;

        let mut texts = Vec::with_capacity(STATISTICS_FIELDS.len());
        for name in STATISTICS_FIELDS {
            let text: Option<String> = row.try_get(name).map_err(DbError::from_query)?;
            texts.push((name, text));
        }

        Statistics::from_fragments(texts.iter().map(|(name, text)| (*name, text.as_deref())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
        )
    }

    #[test]
    fn test_event_sql_without_filters() {
        let sql = EventQuery::new(EventGeometry::Polygons, range()).sql();
        assert!(sql.contains("ST_AsGeoJSON(u.shape)"));
        assert!(sql.contains("h.skredtidspunkt >= $1 AND h.skredtidspunkt < $2"));
        assert!(!sql.contains("$3"));
    }

    #[test]
    fn test_event_sql_placeholders_are_sequential() {
        let sql = EventQuery::new(EventGeometry::Points, range())
            .within(BoundingBox::new(5.0, 60.0, 6.0, 61.0))
            .in_regions(RegionFilter::new(vec![3003]))
            .sql();
        assert!(sql.contains("ST_Intersects(p.shape, ST_GeomFromText($3, 25833))"));
        assert!(sql.contains("h.region_id = ANY($4)"));
    }

    #[test]
    fn test_region_filter_without_bbox_uses_third_placeholder() {
        let sql = StatisticsQuery::new(range())
            .in_regions(RegionFilter::new(vec![3003, 3010]))
            .sql();
        assert!(sql.contains("h.region_id = ANY($3)"));
        assert!(!sql.contains("ST_GeomFromText"));
    }

    #[test]
    fn test_statistics_sql_has_all_fragments() {
        let sql = StatisticsQuery::new(range()).sql();
        for field in STATISTICS_FIELDS {
            assert!(sql.contains(&format!("AS {}", field)), "missing {}", field);
        }
    }

    #[test]
    fn test_statistics_decode() {
        let stats = Statistics::from_fragments([
            ("timeline", Some(r#"{"2023-01-05": 3}"#)),
            ("size", None),
            ("count", Some("3")),
        ])
        .unwrap();
        assert_eq!(stats.0["timeline"]["2023-01-05"], 3);
        assert_eq!(stats.0["size"], Value::Null);
        assert_eq!(stats.0["count"], Value::from(3));
    }

    #[test]
    fn test_statistics_serializes_as_flat_map() {
        let stats = Statistics::from_fragments(
            STATISTICS_FIELDS
                .iter()
                .map(|name| (*name, Some(if *name == "count" { "0" } else { "{}" }))),
        )
        .unwrap();

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "count": 0,
                "exposition": {},
                "height": {},
                "size": {},
                "timeline": {}
            })
        );
    }

    #[test]
    fn test_collect_features() {
        let collection = collect_features([
            (
                Some(r#"{"type":"Point","coordinates":[250000.0,6600000.0]}"#.to_string()),
                Some(r#"{"skredID":17,"area":1250.5}"#.to_string()),
            ),
            (
                Some(r#"{"type":"Point","coordinates":[251000.0,6601000.0]}"#.to_string()),
                None,
            ),
        ])
        .unwrap();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.features[0].geometry["type"], "Point");
        assert_eq!(collection.features[0].properties["skredID"], 17);
        assert_eq!(collection.features[1].properties, serde_json::json!({}));

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["crs"]["properties"]["name"], "EPSG:25833");
    }

    #[test]
    fn test_collect_features_skips_rows_without_geometry() {
        let collection = collect_features([
            (None, Some(r#"{"skredID":1}"#.to_string())),
            (
                Some(r#"{"type":"Polygon","coordinates":[]}"#.to_string()),
                Some(r#"{"skredID":2}"#.to_string()),
            ),
            (None, None),
        ])
        .unwrap();

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.features[0].properties["skredID"], 2);
    }

    #[test]
    fn test_collect_features_rejects_bad_geometry() {
        let result = collect_features([(Some("POINT(1 2)".to_string()), None)]);
        assert!(matches!(result, Err(DbError::Decode(_))));
    }

    #[test]
    fn test_statistics_decode_rejects_bad_fragment() {
        let result = Statistics::from_fragments([("timeline", Some("{oops"))]);
        assert!(matches!(result, Err(DbError::Decode(_))));
    }
}
