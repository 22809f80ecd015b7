use serde_json::Value;

use crate::error::Result;
use crate::lookup::ServiceResolver;
use crate::parser::time::record_epoch_seconds;
use crate::record::RecordExt;
use crate::types::{Measurement, MetricPoint};

/// One point per API call a service made. The service hash in `user` is
/// resolved to its app id; a failed lookup fails the record.
pub fn api<R: ServiceResolver + ?Sized>(record: &Value, resolver: &mut R) -> Result<Vec<MetricPoint>> {
    let mut point = MetricPoint::at(Measurement::ApiCalls, record_epoch_seconds(record)?)?
        .tag("method", record.field_str("function"));

    point = match record.get("success") {
        None => point.field("success", true),
        Some(success) => point.json_field("success", Some(success)),
    };

    if let Some(service_hash) = record.field_str("user") {
        let app_id = resolver.resolve(service_hash)?;
        point = point
            .tag("app_id", app_id)
            .field("service", service_hash);
    }

    Ok(vec![point])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::tests::CountingResolver;
    use crate::types::FieldValue;
    use serde_json::json;

    #[test]
    fn test_api_without_user_skips_lookup() {
        let mut resolver = CountingResolver::default();
        let record = json!({"function": "system.ping", "success": false, "timestamp": 1518583750});
        let points = api(&record, &mut resolver).unwrap();

        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.measurement, Measurement::ApiCalls);
        assert_eq!(point.tags.len(), 1);
        assert_eq!(point.tags["method"].as_deref(), Some("system.ping"));
        assert_eq!(point.fields.len(), 1);
        assert_eq!(point.fields["success"], FieldValue::Bool(false));
        assert!(resolver.calls.is_empty());
    }

    #[test]
    fn test_api_with_user_resolves_app() {
        let mut resolver = CountingResolver::default();
        let record = json!({
            "function": "system.get_identity",
            "user": "5c31adac01cad92a435c44f514798d88",
            "type": "api",
            "request_data": {},
            "timestamp": 1518583750
        });
        let point = &api(&record, &mut resolver).unwrap()[0];

        assert_eq!(point.time, "2018-02-14T04:49:10Z");
        assert_eq!(
            point.tags["app_id"].as_deref(),
            Some("app-5c31adac01cad92a435c44f514798d88")
        );
        assert_eq!(point.fields["success"], FieldValue::Bool(true));
        assert_eq!(
            point.fields["service"],
            FieldValue::from("5c31adac01cad92a435c44f514798d88")
        );
        assert_eq!(resolver.calls.len(), 1);
    }

    #[test]
    fn test_unresolved_service_has_null_app_tag() {
        let mut resolver = CountingResolver::default();
        let record = json!({"function": "x", "user": "orphan", "timestamp": 1518583750});
        let point = &api(&record, &mut resolver).unwrap()[0];
        assert_eq!(point.tags["app_id"], None);
    }

    #[test]
    fn test_lookup_failure_fails_record() {
        let mut resolver = CountingResolver {
            fail: true,
            ..Default::default()
        };
        let record = json!({"function": "x", "user": "abc", "timestamp": 1518583750});
        assert!(api(&record, &mut resolver).is_err());
    }
}
