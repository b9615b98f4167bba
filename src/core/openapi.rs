use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::admin::{dtos as admin_dtos, handlers as admin_handlers};
use crate::features::auth::{self, model::AuthenticatedUser};
use crate::features::files::{dtos as files_dtos, handlers as files_handlers, models as files_models};
use crate::features::policy::{dtos as policy_dtos, handlers as policy_handlers};
use crate::features::statistics::{dtos as statistics_dtos, handlers as statistics_handlers};
use crate::modules::storage::Container;
use crate::shared::constants::CRON_SECRET_HEADER;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handler::get_me,
        // Files
        files_handlers::upload_file,
        files_handlers::get_file_info,
        files_handlers::download_file,
        files_handlers::list_my_files,
        files_handlers::get_file_details,
        files_handlers::delete_file,
        // Statistics
        statistics_handlers::get_file_stats,
        statistics_handlers::get_download_history,
        // Policy
        policy_handlers::get_policy,
        policy_handlers::update_policy,
        // Admin
        admin_handlers::run_cleanup,
    ),
    components(
        schemas(
            Meta,
            AuthenticatedUser,
            ApiResponse<AuthenticatedUser>,
            // Files
            Container,
            files_models::FileStatus,
            files_models::FileSortBy,
            files_models::SortOrder,
            files_models::UserSummary,
            files_models::StatusSummary,
            files_dtos::UploadFileDto,
            files_dtos::FileResponseDto,
            files_dtos::FilePublicInfoDto,
            files_dtos::MyFilesResponseDto,
            files_dtos::DeleteFileResponseDto,
            ApiResponse<files_dtos::FileResponseDto>,
            ApiResponse<files_dtos::FilePublicInfoDto>,
            ApiResponse<files_dtos::MyFilesResponseDto>,
            ApiResponse<files_dtos::DeleteFileResponseDto>,
            // Statistics
            statistics_dtos::FileStatisticsDto,
            statistics_dtos::DownloadHistoryDto,
            ApiResponse<statistics_dtos::FileStatisticsDto>,
            ApiResponse<Vec<statistics_dtos::DownloadHistoryDto>>,
            // Policy
            policy_dtos::PolicyResponseDto,
            policy_dtos::UpdatePolicyDto,
            ApiResponse<policy_dtos::PolicyResponseDto>,
            // Admin
            admin_dtos::CleanupResponseDto,
            ApiResponse<admin_dtos::CleanupResponseDto>,
        )
    ),
    tags(
        (name = "auth", description = "Identity resolved from bearer tokens"),
        (name = "files", description = "Upload, share links, download and owner management"),
        (name = "statistics", description = "Download counters and history (owner or admin)"),
        (name = "policy", description = "System upload policy (admin token)"),
        (name = "admin", description = "Maintenance endpoints (admin token or cron secret)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "File Sharing API",
        version = "0.1.0",
        description = "API documentation for the file sharing backend",
    )
)]
pub struct ApiDoc;

/// Registers the user JWT, the rotating admin token and the cron secret header
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
            components.add_security_scheme(
                "cron_secret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(CRON_SECRET_HEADER))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
