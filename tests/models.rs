use hal_overlay::{
    client::{EndpointInfo, HealthResponse},
    config,
    models::{compare_versions, ModelCatalog},
};
use std::cmp::Ordering;

fn endpoint(version: &str, status: &str, instances: u32) -> EndpointInfo {
    EndpointInfo {
        version: version.into(),
        endpoint_status: Some(status.into()),
        num_endpoint_instances: Some(instances),
        endpoint_name: None,
    }
}

#[test]
fn versions_compare_numerically() {
    assert_eq!(compare_versions("0.10.0", "0.9.1"), Ordering::Greater);
    assert_eq!(compare_versions("0.6.0", "0.6.0"), Ordering::Equal);
    assert_eq!(compare_versions("0.5", "0.5.1"), Ordering::Less);
}

#[test]
fn prefers_first_in_service_model_with_instances() {
    let health = HealthResponse {
        endpoints: vec![
            endpoint("0.5.1", "InService", 1),
            endpoint("0.6.0", "Creating", 0),
            endpoint("0.4.3", "InService", 2),
        ],
    };
    let catalog = ModelCatalog::from_health(&config::Models::default(), &health);
    let order: Vec<_> = catalog.models.iter().map(|m| m.version.as_str()).collect();
    assert_eq!(order, ["0.6.0", "0.5.1", "0.4.3"]);
    assert_eq!(catalog.selected, "0.5.1");
}

#[test]
fn newest_wins_when_nothing_is_in_service() {
    let health = HealthResponse {
        endpoints: vec![endpoint("0.9.0", "Failed", 0), endpoint("0.10.0", "Failed", 0)],
    };
    let catalog = ModelCatalog::from_health(&config::Models::default(), &health);
    assert_eq!(catalog.selected, "0.10.0");
}

#[test]
fn empty_health_falls_back_to_configured_catalog() {
    let catalog = ModelCatalog::from_health(&config::Models::default(), &HealthResponse::default());
    assert_eq!(catalog.selected, "0.6.0");
    assert_eq!(catalog.models.len(), 3);
    assert!(catalog.models.iter().all(|m| m.offline));
}
