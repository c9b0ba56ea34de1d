#[cfg(test)]
mod tests {
    use crate::cli::commands::openapi::render_yaml;
    use crate::schemas::ApiDoc;
    use utoipa::OpenApi;
    use utoipa::openapi::PathItemType;

    fn object_properties(name: &str) -> Vec<String> {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();
        match components.schemas.get(name) {
            Some(utoipa::openapi::RefOr::T(utoipa::openapi::schema::Schema::Object(obj))) => {
                obj.properties.keys().cloned().collect()
            }
            _ => panic!("{name} should be an object schema"),
        }
    }

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();

        assert!(openapi.components.is_some());
        let components = openapi.components.as_ref().unwrap();
        assert!(components.schemas.contains_key("ErrorResponse"));
        assert!(components.schemas.contains_key("HealthResponse"));
        assert!(components.schemas.contains_key("DashboardStats"));
        assert!(components.schemas.contains_key("EntryTotals"));

        assert!(serde_json::to_string(&openapi).is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let properties = object_properties("ErrorResponse");
        for expected in ["error", "code", "success", "fields"] {
            assert!(properties.iter().any(|p| p == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_health_response_schema_structure() {
        let properties = object_properties("HealthResponse");
        for expected in ["status", "version", "database"] {
            assert!(properties.iter().any(|p| p == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_openapi_paths_contain_health_endpoint() {
        let openapi = ApiDoc::openapi();

        let health_path = openapi.paths.paths.get("/health").unwrap();
        let health_get = health_path.operations.get(&PathItemType::Get).unwrap();

        assert!(health_get.responses.responses.contains_key("200"));
        assert!(health_get.responses.responses.contains_key("503"));
    }

    #[test]
    fn test_resource_paths_are_documented() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        for resource in [
            "users",
            "properties",
            "property-images",
            "units",
            "tenants",
            "leases",
            "payments",
            "expenses",
            "documents",
            "notifications",
            "accounts",
            "journal-entries",
            "journal-entry-lines",
        ] {
            let collection = format!("/api/v1/{resource}");
            let item = paths
                .get(&collection)
                .unwrap_or_else(|| panic!("{collection} missing"));
            assert!(item.operations.contains_key(&PathItemType::Get));
            assert!(item.operations.contains_key(&PathItemType::Post));

            let single = paths
                .iter()
                .find(|(path, _)| path.starts_with(&format!("{collection}/{{")))
                .unwrap_or_else(|| panic!("{collection}/{{id}} missing"));
            for method in [PathItemType::Get, PathItemType::Put, PathItemType::Delete] {
                assert!(single.1.operations.contains_key(&method), "{} lacks an operation", single.0);
            }
        }

        assert!(paths.contains_key("/api/v1/notifications/{notification_id}/respond"));
        assert!(paths.contains_key("/api/v1/dashboard/stats"));
        for auth in ["register", "login", "refresh", "user", "user/update"] {
            assert!(paths.contains_key(&format!("/api/v1/auth/{auth}")), "auth/{auth} missing");
        }
    }

    #[test]
    fn test_bearer_scheme_and_public_endpoints() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(openapi.security.is_some());

        let register = openapi.paths.paths.get("/api/v1/auth/register").unwrap();
        let post = register.operations.get(&PathItemType::Post).unwrap();
        // Public endpoints override the global requirement with an empty one
        assert!(post.security.is_some());
    }

    #[test]
    fn test_all_error_responses_reference_correct_schema() {
        let openapi_json = serde_json::to_string(&ApiDoc::openapi()).unwrap();

        assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
        assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
        assert!(openapi_json.contains("#/components/schemas/ErrorResponse"));
    }

    #[test]
    fn test_yaml_export() {
        let yaml = render_yaml().unwrap();

        assert!(yaml.starts_with("openapi:"));
        assert!(yaml.contains("Rentals API"));
        assert!(yaml.contains("/api/v1/leases"));
    }
}
