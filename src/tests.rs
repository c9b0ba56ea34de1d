#[cfg(test)]
mod integration_tests {
    use crate::schemas::{ApiResponse, ErrorResponse};
    use crate::test_utils::test_utils::{TEST_PASSWORD, bearer, create_test_user, setup_test_app};
    use crate::schemas::AppState;
    use axum::http::StatusCode;
    use axum_test::{TestRequest, TestServer};
    use model::entities::user::{Role, Model as User};
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use std::str::FromStr;

    struct Harness {
        server: TestServer,
        state: AppState,
    }

    impl Harness {
        async fn new() -> Self {
            let (app, state) = setup_test_app().await;
            let server = TestServer::new(app).unwrap();
            Self { server, state }
        }

        async fn user(&self, username: &str, role: Role) -> User {
            create_test_user(&self.state.db, username, role).await
        }

        fn get(&self, path: &str, user: &User) -> TestRequest {
            let (name, value) = bearer(&self.state, user.id);
            self.server.get(path).add_header(name, value)
        }

        fn post(&self, path: &str, user: &User) -> TestRequest {
            let (name, value) = bearer(&self.state, user.id);
            self.server.post(path).add_header(name, value)
        }

        fn put(&self, path: &str, user: &User) -> TestRequest {
            let (name, value) = bearer(&self.state, user.id);
            self.server.put(path).add_header(name, value)
        }

        fn delete(&self, path: &str, user: &User) -> TestRequest {
            let (name, value) = bearer(&self.state, user.id);
            self.server.delete(path).add_header(name, value)
        }

        async fn create(&self, path: &str, user: &User, body: Value) -> Value {
            let response = self.post(path, user).json(&body).await;
            if response.status_code() != StatusCode::CREATED {
                println!("Error response: {}", response.text());
                panic!("Expected 201 Created from {path}, got {}", response.status_code());
            }
            let body: ApiResponse<Value> = response.json();
            assert!(body.success);
            body.data
        }

        async fn property(&self, landlord: &User, name: &str) -> i64 {
            let data = self
                .create(
                    "/api/v1/properties",
                    landlord,
                    json!({
                        "name": name,
                        "property_type": "residential",
                        "region": "Coast",
                        "district": "Central",
                        "street": "12 Harbour Road",
                        "bedrooms": 3,
                        "bathrooms": 2
                    }),
                )
                .await;
            data["id"].as_i64().unwrap()
        }

        async fn unit(&self, landlord: &User, property_id: i64, unit_number: &str) -> i64 {
            let data = self
                .create(
                    "/api/v1/units",
                    landlord,
                    json!({
                        "property_id": property_id,
                        "unit_number": unit_number,
                        "rent_amount": "750.00"
                    }),
                )
                .await;
            data["id"].as_i64().unwrap()
        }

        async fn tenant_profile(&self, landlord: &User, tenant: &User) -> i64 {
            let data = self
                .create(
                    "/api/v1/tenants",
                    landlord,
                    json!({ "user_id": tenant.id, "phone": "555-0101" }),
                )
                .await;
            data["id"].as_i64().unwrap()
        }

        /// Landlord with one property, one unit and an active lease for `tenant`.
        async fn leased(&self, landlord: &User, tenant: &User) -> (i64, i64, i64, i64) {
            let property_id = self.property(landlord, "Harbour View").await;
            let unit_id = self.unit(landlord, property_id, "A-101").await;
            let profile_id = self.tenant_profile(landlord, tenant).await;
            let lease = self
                .create(
                    "/api/v1/leases",
                    landlord,
                    json!({
                        "property_id": property_id,
                        "unit_id": unit_id,
                        "tenant_id": profile_id,
                        "start_date": "2024-01-01",
                        "end_date": "2024-12-31",
                        "monthly_rent": "750.00",
                        "status": "active"
                    }),
                )
                .await;
            assert_eq!(lease["landlord_id"].as_i64().unwrap(), landlord.id as i64);
            (property_id, unit_id, profile_id, lease["id"].as_i64().unwrap())
        }
    }

    fn error_fields(response: &axum_test::TestResponse) -> Vec<String> {
        let body: ErrorResponse = response.json();
        assert!(!body.success);
        assert_eq!(body.code, "VALIDATION_FAILED");
        body.fields.unwrap_or_default().into_keys().collect()
    }

    fn decimal(value: &Value) -> Decimal {
        match value {
            Value::String(s) => Decimal::from_str(s).unwrap(),
            other => Decimal::from_str(&other.to_string()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let harness = Harness::new().await;

        let response = harness.server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_register_login_and_refresh() {
        let harness = Harness::new().await;

        let response = harness
            .server
            .post("/api/v1/auth/register")
            .json(&json!({
                "username": "tina",
                "email": "tina@example.com",
                "password": TEST_PASSWORD,
                "password_confirm": TEST_PASSWORD
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["role"], "tenant");
        assert!(body.data.get("password_hash").is_none());

        let response = harness
            .server
            .post("/api/v1/auth/login")
            .json(&json!({ "username": "tina", "password": TEST_PASSWORD }))
            .await;
        response.assert_status(StatusCode::OK);
        let tokens: ApiResponse<Value> = response.json();
        let access = tokens.data["access"].as_str().unwrap().to_string();
        let refresh = tokens.data["refresh"].as_str().unwrap().to_string();

        let response = harness
            .server
            .get("/api/v1/auth/user")
            .add_header(
                axum::http::header::AUTHORIZATION,
                axum::http::HeaderValue::from_str(&format!("Bearer {access}")).unwrap(),
            )
            .await;
        response.assert_status(StatusCode::OK);
        let me: ApiResponse<Value> = response.json();
        assert_eq!(me.data["username"], "tina");
        assert!(!me.data["last_login_at"].is_null());

        let response = harness
            .server
            .post("/api/v1/auth/refresh")
            .json(&json!({ "refresh": refresh }))
            .await;
        response.assert_status(StatusCode::OK);

        // An access token is not a refresh token
        let response = harness
            .server
            .post("/api/v1/auth/refresh")
            .json(&json!({ "refresh": access }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let harness = Harness::new().await;
        harness.user("larry", Role::Landlord).await;

        let response = harness
            .server
            .post("/api/v1/auth/login")
            .json(&json!({ "username": "larry", "password": "not-the-password" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_register_rejects_admin_role_and_password_mismatch() {
        let harness = Harness::new().await;

        let response = harness
            .server
            .post("/api/v1/auth/register")
            .json(&json!({
                "username": "mallory",
                "email": "mallory@example.com",
                "password": TEST_PASSWORD,
                "password_confirm": "something-else",
                "role": "admin"
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let fields = error_fields(&response);
        assert!(fields.contains(&"role".to_string()));
        assert!(fields.contains(&"password".to_string()));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let harness = Harness::new().await;

        let response = harness.server.get("/api/v1/properties").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "UNAUTHENTICATED");
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_inactive_user_is_unauthenticated() {
        use sea_orm::{ActiveModelTrait, Set};

        let harness = Harness::new().await;
        let landlord = harness.user("larry", Role::Landlord).await;
        let mut active: model::entities::user::ActiveModel = landlord.clone().into();
        active.is_active = Set(false);
        active.update(&harness.state.db).await.unwrap();

        let response = harness.get("/api/v1/properties", &landlord).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_landlords_only_see_their_own_properties() {
        let harness = Harness::new().await;
        let alice = harness.user("alice", Role::Landlord).await;
        let bob = harness.user("bob", Role::Landlord).await;
        let admin = harness.user("root", Role::Admin).await;

        let alice_property = harness.property(&alice, "Alice Court").await;
        harness.property(&bob, "Bob Towers").await;

        let response = harness.get("/api/v1/properties", &alice).await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0]["name"], "Alice Court");

        // Out of scope reads as missing, not forbidden
        let response = harness
            .get(&format!("/api/v1/properties/{alice_property}"), &bob)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "NOT_FOUND");

        let response = harness
            .put(&format!("/api/v1/properties/{alice_property}"), &bob)
            .json(&json!({ "name": "Taken Over" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let response = harness.get("/api/v1/properties", &admin).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 2);
    }

    #[tokio::test]
    async fn test_landlord_cannot_create_property_for_someone_else() {
        let harness = Harness::new().await;
        let alice = harness.user("alice", Role::Landlord).await;
        let bob = harness.user("bob", Role::Landlord).await;

        let data = harness
            .create(
                "/api/v1/properties",
                &alice,
                json!({
                    "landlord_id": bob.id,
                    "name": "Sneaky Flats",
                    "property_type": "commercial",
                    "region": "North",
                    "district": "Hill",
                    "street": "3 Ridge Way"
                }),
            )
            .await;

        assert_eq!(data["landlord_id"].as_i64().unwrap(), alice.id as i64);
        assert_eq!(data["status"], "vacant");
    }

    #[tokio::test]
    async fn test_tenant_cannot_create_property() {
        let harness = Harness::new().await;
        let tenant = harness.user("tina", Role::Tenant).await;

        let response = harness
            .post("/api/v1/properties", &tenant)
            .json(&json!({
                "name": "Squat",
                "property_type": "residential",
                "region": "Coast",
                "district": "Central",
                "street": "1 Nowhere"
            }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_property_list_pagination() {
        let harness = Harness::new().await;
        let alice = harness.user("alice", Role::Landlord).await;
        for n in 0..3 {
            harness.property(&alice, &format!("Block {n}")).await;
        }

        let response = harness
            .get("/api/v1/properties", &alice)
            .add_query_param("page", 2)
            .add_query_param("limit", 2)
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
    }

    #[tokio::test]
    async fn test_lease_dates_and_unit_property_are_validated() {
        let harness = Harness::new().await;
        let landlord = harness.user("larry", Role::Landlord).await;
        let tenant = harness.user("tina", Role::Tenant).await;

        let first = harness.property(&landlord, "First").await;
        let second = harness.property(&landlord, "Second").await;
        let unit_elsewhere = harness.unit(&landlord, second, "B-1").await;
        let profile = harness.tenant_profile(&landlord, &tenant).await;

        let response = harness
            .post("/api/v1/leases", &landlord)
            .json(&json!({
                "property_id": first,
                "unit_id": unit_elsewhere,
                "tenant_id": profile,
                "start_date": "2024-06-01",
                "end_date": "2024-05-01",
                "monthly_rent": "900.00"
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let fields = error_fields(&response);
        assert!(fields.contains(&"end_date".to_string()));
        assert!(fields.contains(&"unit".to_string()));
    }

    #[tokio::test]
    async fn test_completed_payment_requires_paid_date() {
        let harness = Harness::new().await;
        let landlord = harness.user("larry", Role::Landlord).await;
        let tenant = harness.user("tina", Role::Tenant).await;
        let (property_id, _, profile_id, lease_id) = harness.leased(&landlord, &tenant).await;

        let mut payment = json!({
            "tenant_id": profile_id,
            "property_id": property_id,
            "lease_id": lease_id,
            "amount": "750.00",
            "payment_method": "bank_transfer",
            "due_date": "2024-02-01",
            "status": "completed"
        });

        let response = harness.post("/api/v1/payments", &landlord).json(&payment).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&response), vec!["paid_date".to_string()]);

        payment["paid_date"] = json!("2024-02-01");
        let created = harness.create("/api/v1/payments", &landlord, payment).await;
        assert_eq!(created["status"], "completed");

        // The tenant sees the payment on their own lease
        let response = harness.get("/api/v1/payments", &tenant).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
    }

    #[tokio::test]
    async fn test_tenant_without_profile_sees_nothing() {
        let harness = Harness::new().await;
        let landlord = harness.user("larry", Role::Landlord).await;
        let tenant = harness.user("tina", Role::Tenant).await;
        let drifter = harness.user("drifter", Role::Tenant).await;
        harness.leased(&landlord, &tenant).await;

        for path in ["/api/v1/leases", "/api/v1/payments", "/api/v1/notifications", "/api/v1/properties"] {
            let response = harness.get(path, &drifter).await;
            response.assert_status(StatusCode::OK);
            let body: ApiResponse<Vec<Value>> = response.json();
            assert!(body.data.is_empty(), "{path} leaked rows to a tenant without a profile");
        }

        let response = harness.get("/api/v1/leases", &tenant).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
    }

    #[tokio::test]
    async fn test_notification_respond_flow() {
        let harness = Harness::new().await;
        let landlord = harness.user("larry", Role::Landlord).await;
        let tenant = harness.user("tina", Role::Tenant).await;
        let (_, _, _, lease_id) = harness.leased(&landlord, &tenant).await;

        let created = harness
            .create(
                "/api/v1/notifications",
                &tenant,
                json!({
                    "lease_id": lease_id,
                    "category": "maintenance",
                    "subject": "Leaking tap",
                    "description": "The kitchen tap drips all night."
                }),
            )
            .await;
        assert_eq!(created["status"], "pending");
        assert_eq!(created["priority"], "medium");
        let notification_id = created["id"].as_i64().unwrap();
        let respond_path = format!("/api/v1/notifications/{notification_id}/respond");

        let response = harness
            .post(&respond_path, &tenant)
            .json(&json!({ "response": "Fixed it myself" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = harness
            .post(&respond_path, &landlord)
            .json(&json!({ "response": "   " }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&response), vec!["response".to_string()]);

        let response = harness
            .post(&respond_path, &landlord)
            .json(&json!({ "response": "Plumber booked for Monday" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["status"], "in_progress");
        assert_eq!(body.data["landlord_response"], "Plumber booked for Monday");
        assert_eq!(body.data["responded_by"].as_i64().unwrap(), landlord.id as i64);
        assert!(!body.data["responded_at"].is_null());

        // Tenants edit content, not workflow state
        let response = harness
            .put(&format!("/api/v1/notifications/{notification_id}"), &tenant)
            .json(&json!({ "status": "resolved" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&response), vec!["status".to_string()]);
    }

    #[tokio::test]
    async fn test_tenant_cannot_notify_on_foreign_lease() {
        let harness = Harness::new().await;
        let landlord = harness.user("larry", Role::Landlord).await;
        let tenant = harness.user("tina", Role::Tenant).await;
        let other = harness.user("otto", Role::Tenant).await;
        let (_, _, _, lease_id) = harness.leased(&landlord, &tenant).await;
        harness.tenant_profile(&landlord, &other).await;

        let response = harness
            .post("/api/v1/notifications", &other)
            .json(&json!({
                "lease_id": lease_id,
                "category": "complaint",
                "subject": "Noise",
                "description": "Too loud"
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&response), vec!["lease".to_string()]);
    }

    #[tokio::test]
    async fn test_journal_entries_must_balance() {
        let harness = Harness::new().await;
        let landlord = harness.user("larry", Role::Landlord).await;

        let cash = harness
            .create(
                "/api/v1/accounts",
                &landlord,
                json!({ "code": "1000", "name": "Cash", "account_type": "asset" }),
            )
            .await["id"]
            .as_i64()
            .unwrap();
        let rent = harness
            .create(
                "/api/v1/accounts",
                &landlord,
                json!({ "code": "4000", "name": "Rental income", "account_type": "income" }),
            )
            .await["id"]
            .as_i64()
            .unwrap();

        let response = harness
            .post("/api/v1/journal-entries", &landlord)
            .json(&json!({
                "entry_date": "2024-02-01",
                "description": "February rent",
                "lines": [
                    { "account_id": cash, "debit": "750.00" },
                    { "account_id": rent, "credit": "700.00" }
                ]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&response), vec!["lines".to_string()]);

        let entry = harness
            .create(
                "/api/v1/journal-entries",
                &landlord,
                json!({
                    "entry_date": "2024-02-01",
                    "description": "February rent",
                    "reference": "RENT-2024-02",
                    "lines": [
                        { "account_id": cash, "debit": "750.00" },
                        { "account_id": rent, "credit": "750.00" }
                    ]
                }),
            )
            .await;
        assert_eq!(entry["lines"].as_array().unwrap().len(), 2);
        assert_eq!(entry["created_by"].as_i64().unwrap(), landlord.id as i64);
        assert!(entry["totals"]["is_balanced"].as_bool().unwrap());
        assert_eq!(decimal(&entry["totals"]["total_debit"]), Decimal::new(750, 0));
        assert_eq!(decimal(&entry["totals"]["total_credit"]), Decimal::new(750, 0));

        // Referenced accounts stay put
        let response = harness
            .delete(&format!("/api/v1/accounts/{cash}"), &landlord)
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "REFERENTIAL_VIOLATION");
    }

    #[tokio::test]
    async fn test_tenants_have_no_ledger_access() {
        let harness = Harness::new().await;
        let tenant = harness.user("tina", Role::Tenant).await;

        let response = harness.get("/api/v1/accounts", &tenant).await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = harness.get("/api/v1/journal-entries", &tenant).await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_only_admins_manage_users() {
        let harness = Harness::new().await;
        let admin = harness.user("root", Role::Admin).await;
        let landlord = harness.user("larry", Role::Landlord).await;

        let response = harness.get("/api/v1/users", &landlord).await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = harness.get("/api/v1/users", &admin).await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 2);

        let response = harness
            .get("/api/v1/users", &admin)
            .add_query_param("role", "landlord")
            .await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0]["username"], "larry");
    }

    #[tokio::test]
    async fn test_admin_cannot_strand_rows_by_changing_role() {
        let harness = Harness::new().await;
        let admin = harness.user("root", Role::Admin).await;
        let landlord = harness.user("lara", Role::Landlord).await;
        let tenant = harness.user("tina", Role::Tenant).await;
        harness.leased(&landlord, &tenant).await;

        let response = harness
            .put(&format!("/api/v1/users/{}", landlord.id), &admin)
            .json(&json!({ "role": "tenant" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&response), vec!["role".to_string()]);

        let response = harness
            .put(&format!("/api/v1/users/{}", tenant.id), &admin)
            .json(&json!({ "role": "landlord" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&response), vec!["role".to_string()]);

        let body: ApiResponse<Value> = harness
            .get(&format!("/api/v1/users/{}", landlord.id), &admin)
            .await
            .json();
        assert_eq!(body.data["role"], "landlord");

        // Nothing depends on a fresh landlord yet
        let idle = harness.user("ivan", Role::Landlord).await;
        let response = harness
            .put(&format!("/api/v1/users/{}", idle.id), &admin)
            .json(&json!({ "role": "tenant" }))
            .await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reassigning_property_moves_its_leases() {
        let harness = Harness::new().await;
        let admin = harness.user("root", Role::Admin).await;
        let alice = harness.user("alice", Role::Landlord).await;
        let bob = harness.user("bob", Role::Landlord).await;
        let tenant = harness.user("tina", Role::Tenant).await;
        let (property_id, _, _, lease_id) = harness.leased(&alice, &tenant).await;

        let response = harness
            .put(&format!("/api/v1/properties/{property_id}"), &admin)
            .json(&json!({ "landlord_id": bob.id }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["landlord_id"].as_i64().unwrap(), bob.id as i64);

        let lease_path = format!("/api/v1/leases/{lease_id}");
        let body: ApiResponse<Value> = harness.get(&lease_path, &bob).await.json();
        assert_eq!(body.data["landlord_id"].as_i64().unwrap(), bob.id as i64);

        let response = harness
            .put(&lease_path, &bob)
            .json(&json!({ "notes": "Taken over" }))
            .await;
        response.assert_status(StatusCode::OK);

        let response = harness.get(&lease_path, &alice).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dashboard_is_role_shaped_and_repeatable() {
        let harness = Harness::new().await;
        let landlord = harness.user("larry", Role::Landlord).await;
        let tenant = harness.user("tina", Role::Tenant).await;
        harness.leased(&landlord, &tenant).await;

        let first = harness.get("/api/v1/dashboard/stats", &landlord).await;
        first.assert_status(StatusCode::OK);
        let first: ApiResponse<Value> = first.json();
        assert_eq!(first.data["role"], "landlord");
        assert_eq!(first.data["total_properties"], 1);
        assert_eq!(first.data["total_units"], 1);
        assert_eq!(first.data["total_tenants"], 1);
        assert_eq!(first.data["active_leases"], 1);

        let second: ApiResponse<Value> = harness.get("/api/v1/dashboard/stats", &landlord).await.json();
        assert_eq!(first.data, second.data);

        let response = harness.get("/api/v1/dashboard/stats", &tenant).await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["role"], "tenant");
    }
}
