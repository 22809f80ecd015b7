//! Daily platform statistics. The stats job logs one record per statistic
//! whose `request_data` holds the counts keyed by app, app type or country.

use serde_json::Value;

use crate::error::Result;
use crate::parser::time::RecordTime;
use crate::record::RecordExt;
use crate::types::{Measurement, MetricPoint};

/// Iterates a nested `outer -> inner -> amount` mapping, skipping inner
/// values that are not mappings
fn nested_entries<'a>(
    record: &'a Value,
) -> impl Iterator<Item = (&'a String, &'a String, &'a Value)> + 'a {
    record.entries("request_data").flat_map(|(outer, values)| {
        values
            .as_object()
            .into_iter()
            .flatten()
            .map(move |(inner, amount)| (outer, inner, amount))
    })
}

fn apps_per_country(record: &Value, measurement: Measurement) -> Result<Vec<MetricPoint>> {
    let mut time = RecordTime::new(record);
    let mut points = Vec::new();
    for (app_type, country_code, amount) in nested_entries(record) {
        points.push(
            MetricPoint::at(measurement, time.seconds()?)?
                .tag("type", Some(app_type.as_str()))
                .tag("country", Some(country_code.as_str()))
                .json_field("amount", Some(amount)),
        );
    }
    Ok(points)
}

/// Apps created, per app type and country
pub fn created_apps(record: &Value) -> Result<Vec<MetricPoint>> {
    apps_per_country(record, Measurement::CreatedApps)
}

/// Apps released to the stores, per app type and country
pub fn released_apps(record: &Value) -> Result<Vec<MetricPoint>> {
    apps_per_country(record, Measurement::ReleasedApps)
}

/// Registered users per app
pub fn all_users(record: &Value) -> Result<Vec<MetricPoint>> {
    let mut time = RecordTime::new(record);
    let mut points = Vec::new();
    for (app_id, amount) in record.entries("request_data") {
        points.push(
            MetricPoint::at(Measurement::AllUsers, time.seconds()?)?
                .tag("app", Some(app_id.as_str()))
                .json_field("amount", Some(amount)),
        );
    }
    Ok(points)
}

/// Services per app and organization type
pub fn total_services(record: &Value) -> Result<Vec<MetricPoint>> {
    let mut time = RecordTime::new(record);
    let mut points = Vec::new();
    for (app_id, organization_type, amount) in nested_entries(record) {
        points.push(
            MetricPoint::at(Measurement::TotalServices, time.seconds()?)?
                .tag("type", Some(organization_type.as_str()))
                .tag("app", Some(app_id.as_str()))
                .json_field("amount", Some(amount)),
        );
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;
    use serde_json::json;

    fn tag<'a>(point: &'a MetricPoint, key: &str) -> &'a str {
        point.tags[key].as_deref().unwrap()
    }

    #[test]
    fn test_created_apps_one_point_per_country() {
        let record = json!({
            "request_data": {"City app": {"BE": 24, "CD": 1}},
            "timestamp": 1520985600.0,
            "type": "rogerthat.created_apps"
        });
        let points = created_apps(&record).unwrap();
        assert_eq!(points.len(), 2);

        let mut seen: Vec<_> = points
            .iter()
            .map(|p| {
                assert_eq!(p.measurement, Measurement::CreatedApps);
                assert_eq!(p.time, "2018-03-14T00:00:00Z");
                assert_eq!(tag(p, "type"), "City app");
                (tag(p, "country").to_string(), p.fields["amount"].clone())
            })
            .collect();
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            seen,
            vec![
                ("BE".to_string(), FieldValue::Integer(24)),
                ("CD".to_string(), FieldValue::Integer(1)),
            ]
        );
    }

    #[test]
    fn test_released_apps_uses_own_measurement() {
        let record = json!({
            "request_data": {"YSAAA": {"BE": 1}, "Rogerthat": {"BE": 1}},
            "timestamp": 1520985600.0
        });
        let points = released_apps(&record).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.measurement == Measurement::ReleasedApps));
    }

    #[test]
    fn test_empty_stats_need_no_timestamp() {
        assert!(created_apps(&json!({})).unwrap().is_empty());
        assert!(created_apps(&json!({"request_data": {"City app": {}}})).unwrap().is_empty());
        assert!(all_users(&json!({"request_data": "oops"})).unwrap().is_empty());
        assert!(total_services(&json!({"request_data": {"em-be-idola": 3}})).unwrap().is_empty());
    }

    #[test]
    fn test_stats_without_timestamp_fail() {
        assert!(all_users(&json!({"request_data": {"rogerthat": 3}})).is_err());
    }

    #[test]
    fn test_all_users_per_app() {
        let record = json!({
            "request_data": {"rogerthat": 1200, "em-be-idola": 35},
            "timestamp": 1520985600
        });
        let points = all_users(&record).unwrap();
        assert_eq!(points.len(), 2);
        let idola = points.iter().find(|p| tag(p, "app") == "em-be-idola").unwrap();
        assert_eq!(idola.measurement, Measurement::AllUsers);
        assert_eq!(idola.fields["amount"], FieldValue::Integer(35));
    }

    #[test]
    fn test_total_services_per_organization_type() {
        let record = json!({
            "request_data": {"em-be-idola": {"1": 4, "2": 7}},
            "timestamp": 1520985600
        });
        let points = total_services(&record).unwrap();
        assert_eq!(points.len(), 2);
        for point in &points {
            assert_eq!(point.measurement, Measurement::TotalServices);
            assert_eq!(tag(point, "app"), "em-be-idola");
        }
        let second = points.iter().find(|p| tag(p, "type") == "2").unwrap();
        assert_eq!(second.fields["amount"], FieldValue::Integer(7));
    }
}
