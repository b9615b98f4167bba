use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::policy::dtos::{PolicyResponseDto, UpdatePolicyDto};
use crate::features::policy::services::PolicyService;
use crate::shared::types::ApiResponse;

/// Get the current upload policy
#[utoipa::path(
    get,
    path = "/api/admin/policy",
    responses(
        (status = 200, description = "Current upload policy", body = ApiResponse<PolicyResponseDto>),
        (status = 401, description = "Admin token required")
    ),
    tag = "policy",
    security(
        ("admin_token" = [])
    )
)]
pub async fn get_policy(
    State(service): State<Arc<PolicyService>>,
) -> Result<Json<ApiResponse<PolicyResponseDto>>> {
    let policy = service.get_policy().await?;
    Ok(Json(ApiResponse::success(Some(policy.into()), None, None)))
}

/// Partially update the upload policy
#[utoipa::path(
    patch,
    path = "/api/admin/policy",
    request_body = UpdatePolicyDto,
    responses(
        (status = 200, description = "Updated upload policy", body = ApiResponse<PolicyResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Admin token required")
    ),
    tag = "policy",
    security(
        ("admin_token" = [])
    )
)]
pub async fn update_policy(
    State(service): State<Arc<PolicyService>>,
    AppJson(dto): AppJson<UpdatePolicyDto>,
) -> Result<Json<ApiResponse<PolicyResponseDto>>> {
    let policy = service.update_policy(dto).await?;
    Ok(Json(ApiResponse::success(
        Some(policy.into()),
        Some("Policy updated".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use crate::features::policy::routes::admin_routes;
    use crate::features::policy::services::PolicyService;
    use crate::shared::test_helpers::InMemoryPolicyStore;
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn server() -> TestServer {
        let service = Arc::new(PolicyService::new(Arc::new(InMemoryPolicyStore::empty())));
        TestServer::new(admin_routes(service)).unwrap()
    }

    #[tokio::test]
    async fn test_get_then_patch_policy() {
        let server = server();

        let current: Value = server.get("/api/admin/policy").await.json();
        assert_eq!(current["data"]["maxFileSizeMb"], 50);

        let updated = server
            .patch("/api/admin/policy")
            .json(&json!({ "maxFileSizeMb": 200, "defaultValidityDays": 3 }))
            .await;
        updated.assert_status_ok();
        let body: Value = updated.json();
        assert_eq!(body["data"]["maxFileSizeMb"], 200);
        assert_eq!(body["data"]["defaultValidityDays"], 3);
        assert_eq!(body["data"]["maxValidityDays"], 30);
    }

    #[tokio::test]
    async fn test_patch_rejects_invalid_values() {
        let server = server();

        server
            .patch("/api/admin/policy")
            .json(&json!({ "requirePasswordMinLength": 2 }))
            .await
            .assert_status_bad_request();

        server
            .patch("/api/admin/policy")
            .json(&json!({ "maxFileSizeMb": "lots" }))
            .await
            .assert_status_bad_request();
    }
}
