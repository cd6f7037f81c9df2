mod common;

use anyhow::{anyhow, Result};
use common::{build_test_context, request_no_body};
use std::collections::{BTreeSet, HashSet};

#[tokio::test]
async fn openapi_paths_should_be_covered_by_test_matrix() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(paths) = body["paths"].as_object() else {
        return Err(anyhow!("openapi paths should be object"));
    };

    let mut exposed: BTreeSet<String> = BTreeSet::new();
    for (path, methods) in paths {
        let Some(methods) = methods.as_object() else {
            return Err(anyhow!("path methods should be object for {path}"));
        };
        for method in methods.keys() {
            let method = method.to_ascii_uppercase();
            exposed.insert(format!("{method} {path}"));
        }
    }

    let covered: HashSet<String> = [
        "GET /v1/health",
        "POST /v1/auth/register",
        "POST /v1/auth/login",
        "GET /v1/auth/me",
        "GET /v1/projects",
        "POST /v1/projects",
        "GET /v1/projects/{id}",
        "PUT /v1/projects/{id}",
        "DELETE /v1/projects/{id}",
        "POST /v1/projects/{id}/milestones",
        "PATCH /v1/projects/{project_id}/milestones/{milestone_id}/toggle",
        "POST /v1/projects/{id}/red-flags",
        "PATCH /v1/projects/{project_id}/red-flags/{red_flag_id}/resolve",
        "GET /v1/objectives",
        "POST /v1/objectives",
        "GET /v1/objectives/{id}",
        "PUT /v1/objectives/{id}",
        "DELETE /v1/objectives/{id}",
        "PUT /v1/objectives/{objective_id}/key-results/{key_result_id}",
        "GET /v1/initiatives",
        "POST /v1/initiatives",
        "GET /v1/initiatives/{id}",
        "PUT /v1/initiatives/{id}",
        "DELETE /v1/initiatives/{id}",
        "GET /v1/dashboard/stats",
        "GET /v1/dashboard/summary",
        "GET /v1/dashboard/red-flags",
        "GET /v1/dashboard/upcoming-milestones",
        "GET /v1/dashboard/timeline",
    ]
    .into_iter()
    .map(|s| s.to_string())
    .collect();

    let missing: Vec<String> = exposed
        .iter()
        .filter(|route| !route.starts_with("GET /v1/openapi"))
        .filter(|route| !covered.contains(*route))
        .cloned()
        .collect();
    assert!(
        missing.is_empty(),
        "missing endpoint coverage for: {missing:?}"
    );

    let stale: Vec<&String> = covered
        .iter()
        .filter(|route| !exposed.contains(*route))
        .collect();
    assert!(stale.is_empty(), "documented routes not exposed: {stale:?}");
    Ok(())
}

#[tokio::test]
async fn openapi_list_query_params_should_be_optional() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(paths) = body["paths"].as_object() else {
        return Err(anyhow!("openapi paths should be object"));
    };

    let cases: &[(&str, &[&str])] = &[
        ("/v1/projects", &["category", "status", "priority", "sort"]),
        ("/v1/objectives", &["status", "category"]),
        (
            "/v1/initiatives",
            &["status", "category", "priority", "sort"],
        ),
        ("/v1/dashboard/upcoming-milestones", &["window_days"]),
        ("/v1/dashboard/timeline", &["category", "view"]),
    ];

    for (path, names) in cases {
        let operation = paths
            .get(*path)
            .and_then(|item| item.get("get"))
            .ok_or_else(|| anyhow!("missing GET operation for path {path}"))?;
        let Some(parameters) = operation["parameters"].as_array() else {
            return Err(anyhow!("missing parameters for GET {path}"));
        };

        for name in *names {
            let parameter = parameters
                .iter()
                .find(|param| {
                    param["in"].as_str() == Some("query") && param["name"].as_str() == Some(*name)
                })
                .ok_or_else(|| anyhow!("missing query parameter {name} on GET {path}"))?;

            let required = parameter
                .get("required")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);

            assert!(
                !required,
                "query parameter {name} on GET {path} should be optional"
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn openapi_protected_operations_should_require_bearer_auth() -> Result<()> {
    let ctx = build_test_context().await?;
    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;

    assert_eq!(
        body["components"]["securitySchemes"]["bearer_auth"]["scheme"],
        "bearer"
    );

    let Some(paths) = body["paths"].as_object() else {
        return Err(anyhow!("openapi paths should be object"));
    };
    let public = ["/v1/health", "/v1/auth/register", "/v1/auth/login"];
    for (path, methods) in paths {
        let Some(methods) = methods.as_object() else {
            continue;
        };
        for (method, operation) in methods {
            let secured = operation["security"]
                .as_array()
                .is_some_and(|reqs| reqs.iter().any(|r| r.get("bearer_auth").is_some()));
            assert_eq!(
                secured,
                !public.contains(&path.as_str()),
                "unexpected security on {method} {path}"
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn openapi_dashboard_stats_schema_should_include_every_family() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(schemas) = body["components"]["schemas"].as_object() else {
        return Err(anyhow!("openapi components.schemas should be object"));
    };

    let stats = schemas
        .get("DashboardStats")
        .ok_or_else(|| anyhow!("DashboardStats schema should exist"))?;
    let Some(props) = stats["properties"].as_object() else {
        return Err(anyhow!("DashboardStats.properties should be object"));
    };
    for field in [
        "projects",
        "objectives",
        "initiatives",
        "red_flags",
        "milestones",
    ] {
        assert!(
            props.contains_key(field),
            "DashboardStats should contain field {field}"
        );
    }

    let status_schema = schemas
        .get("ProjectStatus")
        .ok_or_else(|| anyhow!("ProjectStatus schema should exist"))?;
    let values: Vec<&str> = status_schema["enum"]
        .as_array()
        .map(|v| v.iter().filter_map(|s| s.as_str()).collect())
        .unwrap_or_default();
    assert_eq!(
        values,
        vec!["planning", "active", "on_hold", "completed", "cancelled"]
    );
    Ok(())
}
