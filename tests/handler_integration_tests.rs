use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use portfolio_api::{
    AppConfig, AppState, InMemoryRepository, MockStorageService,
    auth::{StaticIdentityVerifier, issue_token},
    config::BlobStoreConfig,
    create_router,
    models::{NewProject, NewUser, Role, User},
    repository::Repository,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// --- Test harness ---

struct TestApp {
    router: Router,
    repo: Arc<InMemoryRepository>,
    storage: MockStorageService,
    config: AppConfig,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    fn with_config(config: AppConfig) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let storage = MockStorageService::new();
        let state = AppState::new(
            repo.clone(),
            Arc::new(storage.clone()),
            Arc::new(StaticIdentityVerifier::new()),
            config.clone(),
        );
        Self {
            router: create_router(state),
            repo,
            storage,
            config,
        }
    }

    fn token(&self, role: Role) -> String {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", role.as_str()),
            password_hash: None,
            name: role.as_str().to_string(),
            role,
            google_id: None,
            avatar_url: None,
            created_at: Utc::now(),
        };
        issue_token(&user, &self.config.jwt_secret).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Sends a JSON body with an admin session.
    async fn admin(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(Role::Admin)))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| e["field"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

const BOUNDARY: &str = "portfolio-test-boundary";

fn multipart_body(text: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in text {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn cloud_config() -> AppConfig {
    AppConfig {
        blob_store: Some(BlobStoreConfig {
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key: "key".to_string(),
            secret_key: "secret".to_string(),
            bucket: "portfolio".to_string(),
            public_base_url: "https://cdn.example.com".to_string(),
            folder: "portfolio".to_string(),
        }),
        ..AppConfig::default()
    }
}

// --- Role gate ---

#[cfg(test)]
mod gate_tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_without_session_never_reach_storage() {
        let app = TestApp::new();
        let request = Request::builder()
            .method("POST")
            .uri("/projects")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"title": "x", "description": "y"}).to_string()))
            .unwrap();

        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(app.repo.call_count(), 0);
    }

    #[tokio::test]
    async fn test_members_are_forbidden() {
        let app = TestApp::new();
        for (method, uri) in [
            ("POST", "/achievements".to_string()),
            ("PUT", format!("/team/{}", Uuid::new_v4())),
            ("DELETE", format!("/courses/{}", Uuid::new_v4())),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(&uri)
                .header(header::COOKIE, format!("token={}", app.token(Role::Member)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap();
            let (status, body) = app.send(request).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
            assert_eq!(
                body["message"],
                "You do not have permission to perform this action"
            );
        }
        assert_eq!(app.repo.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reads_are_public() {
        let app = TestApp::new();
        for uri in ["/projects", "/achievements", "/team", "/courses"] {
            let (status, body) = app.get(uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body["data"], json!([]));
        }
    }
}

// --- Projects ---

#[cfg(test)]
mod project_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_project_reports_every_missing_field() {
        let app = TestApp::new();
        let (status, body) = app.admin("POST", "/projects", json!({"featured": "yes"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["title", "description"]);

        let (_, list) = app.get("/projects").await;
        assert_eq!(list["data"], json!([]));
    }

    #[tokio::test]
    async fn test_create_then_partially_update_project() {
        let app = TestApp::new();
        let (status, created) = app
            .admin(
                "POST",
                "/projects",
                json!({
                    "title": "Rover",
                    "description": "Autonomous Mars rover",
                    "technologies": "[\"Rust\", \"ROS\"]",
                    "featured": "true",
                    "github_url": "https://github.com/team/rover"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["message"], "Project created successfully");
        assert_eq!(created["data"]["category"], "General");
        assert_eq!(created["data"]["featured"], true);
        assert_eq!(created["data"]["technologies"], json!(["Rust", "ROS"]));

        let id = created["data"]["id"].as_str().unwrap();
        let (status, updated) = app
            .admin(
                "PUT",
                &format!("/projects/{id}"),
                json!({"title": "Rover v2", "github_url": ""}),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["title"], "Rover v2");
        assert_eq!(updated["data"]["description"], "Autonomous Mars rover");
        assert_eq!(updated["data"]["technologies"], json!(["Rust", "ROS"]));
        assert_eq!(updated["data"]["github_url"], Value::Null);
    }

    #[tokio::test]
    async fn test_featured_projects_are_listed_first() {
        let app = TestApp::new();
        app.admin("POST", "/projects", json!({"title": "Plain", "description": "d"}))
            .await;
        app.admin(
            "POST",
            "/projects",
            json!({"title": "Star", "description": "d", "featured": true}),
        )
        .await;

        let (_, list) = app.get("/projects").await;
        assert_eq!(list["data"][0]["title"], "Star");
        assert_eq!(list["data"][1]["title"], "Plain");
    }

    #[tokio::test]
    async fn test_blank_featured_leaves_project_unchanged() {
        let app = TestApp::new();
        let (_, created) = app
            .admin(
                "POST",
                "/projects",
                json!({"title": "Star", "description": "d", "featured": true}),
            )
            .await;
        let id = created["data"]["id"].as_str().unwrap();

        let (status, body) = app
            .admin("PUT", &format!("/projects/{id}"), json!({"title": "Star v2", "featured": ""}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Star v2");
        assert_eq!(body["data"]["featured"], true);
    }

    #[tokio::test]
    async fn test_contributors_must_reference_real_users() {
        let app = TestApp::new();
        let member = app
            .repo
            .create_user(NewUser {
                email: "builder@example.com".to_string(),
                password_hash: None,
                name: "Builder".to_string(),
                role: Role::Member,
                google_id: None,
                avatar_url: None,
            })
            .await
            .unwrap();

        let (status, created) = app
            .admin(
                "POST",
                "/projects",
                json!({"title": "T", "description": "D", "contributors": ["all", member.id, member.id]}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            created["data"]["contributors"],
            json!(["all", member.id.to_string()])
        );

        let ghost = Uuid::new_v4();
        let (status, body) = app
            .admin(
                "POST",
                "/projects",
                json!({"title": "T", "description": "D", "contributors": [ghost]}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["contributors"]);

        let (status, _) = app
            .admin(
                "POST",
                "/projects",
                json!({"title": "T", "description": "D", "contributors": ["bob"]}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let app = TestApp::new();

        let (status, body) = app.get(&format!("/projects/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Project not found");

        let (status, body) = app.get("/projects/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid id format");

        let (status, _) = app
            .admin("DELETE", &format!("/projects/{}", Uuid::new_v4()), json!({}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_project() {
        let app = TestApp::new();
        let (_, created) = app
            .admin("POST", "/projects", json!({"title": "T", "description": "D"}))
            .await;
        let id = created["data"]["id"].as_str().unwrap();

        let (status, body) = app.admin("DELETE", &format!("/projects/{id}"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Project deleted successfully");

        let (status, _) = app.get(&format!("/projects/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_concurrent_updates_leave_one_complete_winner() {
        let app = Arc::new(TestApp::new());
        let (_, created) = app
            .admin("POST", "/projects", json!({"title": "T", "description": "D"}))
            .await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let mut handles = Vec::new();
        for title in ["Left", "Right"] {
            let app = app.clone();
            let uri = format!("/projects/{id}");
            handles.push(tokio::spawn(async move {
                app.admin("PUT", &uri, json!({"title": title, "description": title}))
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().0, StatusCode::OK);
        }

        let (_, project) = app.get(&format!("/projects/{id}")).await;
        let title = project["data"]["title"].as_str().unwrap();
        assert!(title == "Left" || title == "Right");
        assert_eq!(project["data"]["description"], title);
    }

    #[tokio::test]
    async fn test_legacy_upload_paths_are_rewritten_on_read() {
        let app = TestApp::with_config(cloud_config());
        let project = app
            .repo
            .create_project(NewProject {
                title: "Legacy".to_string(),
                description: "Imported".to_string(),
                technologies: vec![],
                image_url: Some("/uploads/abc123".to_string()),
                github_url: None,
                live_url: None,
                social_post_url: None,
                category: "General".to_string(),
                featured: false,
                contributors: vec![],
            })
            .await
            .unwrap();

        let (_, body) = app.get(&format!("/projects/{}", project.id)).await;
        assert_eq!(
            body["data"]["image_url"],
            "https://cdn.example.com/portfolio/abc123"
        );
    }
}

// --- Uploads through the content routes ---

#[cfg(test)]
mod upload_tests {
    use super::*;

    #[tokio::test]
    async fn test_multipart_create_stores_the_image() {
        let app = TestApp::with_config(cloud_config());
        let body = multipart_body(
            &[("title", "Rover"), ("description", "Mars rover"), ("featured", "on")],
            Some(("rover.png", "image/png", b"\x89PNG fake bytes".as_slice())),
        );

        let (status, created) = app
            .send(multipart_request("/projects", &app.token(Role::Admin), body))
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["featured"], true);
        let url = created["data"]["image_url"].as_str().unwrap();
        assert!(url.starts_with("https://cdn.mock.test/portfolio/"));
        assert_eq!(app.storage.stored_keys().len(), 1);
    }

    #[tokio::test]
    async fn test_non_image_upload_is_rejected_before_storage() {
        let app = TestApp::with_config(cloud_config());
        let body = multipart_body(
            &[("title", "Rover"), ("description", "Mars rover")],
            Some(("notes.txt", "text/plain", b"hello".as_slice())),
        );

        let (status, body) = app
            .send(multipart_request("/projects", &app.token(Role::Admin), body))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["image"]);
        assert!(app.storage.stored_keys().is_empty());
        assert_eq!(app.get("/projects").await.1["data"], json!([]));
    }

    #[tokio::test]
    async fn test_invalid_fields_skip_the_upload() {
        let app = TestApp::with_config(cloud_config());
        let body = multipart_body(&[], Some(("rover.png", "image/png", b"png".as_slice())));

        let (status, _) = app
            .send(multipart_request("/projects", &app.token(Role::Admin), body))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.storage.stored_keys().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_image_is_rejected() {
        let config = AppConfig {
            max_upload_bytes: 1024,
            ..cloud_config()
        };
        let app = TestApp::with_config(config);
        let big = vec![7u8; 2048];
        let body = multipart_body(
            &[("title", "Rover"), ("description", "Mars rover")],
            Some(("rover.png", "image/png", big.as_slice())),
        );

        let (status, body) = app
            .send(multipart_request("/projects", &app.token(Role::Admin), body))
            .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body["message"],
            "Uploaded file exceeds the maximum allowed size"
        );
        assert!(app.storage.stored_keys().is_empty());
    }
}

// --- Achievements ---

#[cfg(test)]
mod achievement_tests {
    use super::*;

    #[tokio::test]
    async fn test_categories_accept_an_encoded_list() {
        let app = TestApp::new();
        let (status, body) = app
            .admin(
                "POST",
                "/achievements",
                json!({
                    "title": "Robotics Cup",
                    "description": "First place",
                    "categories": "[\"AI\"]",
                    "competition": "RoboCup 2024",
                    "date": "2024-05-01"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["categories"], json!(["AI"]));
        assert_eq!(body["data"]["date"], "2024-05-01");
        assert_eq!(body["data"]["participants"], json!([]));
    }

    #[tokio::test]
    async fn test_category_bounds() {
        let app = TestApp::new();
        let base = json!({
            "title": "Cup",
            "description": "d",
            "competition": "c",
            "date": "2024-05-01"
        });

        let mut too_many = base.clone();
        too_many["categories"] = json!(["a", "b", "c", "d"]);
        let (status, body) = app.admin("POST", "/achievements", too_many).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No more than 3 categories are allowed");

        let mut none = base.clone();
        none["categories"] = json!([]);
        let (_, body) = app.admin("POST", "/achievements", none).await;
        assert_eq!(body["message"], "At least one category is required");

        let (_, body) = app.admin("POST", "/achievements", base).await;
        assert_eq!(body["message"], "categories is required");
    }

    #[tokio::test]
    async fn test_repeated_categories_count_once() {
        let app = TestApp::new();
        let achievement = |categories: Value| {
            json!({
                "title": "Cup",
                "description": "d",
                "competition": "c",
                "date": "2024-05-01",
                "categories": categories
            })
        };

        let (status, body) = app
            .admin("POST", "/achievements", achievement(json!(["AI", "ML", "AI"])))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["categories"], json!(["AI", "ML"]));

        let (status, body) = app
            .admin("POST", "/achievements", achievement(json!(["AI", "ML", "AI", "CV"])))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["categories"], json!(["AI", "ML", "CV"]));
    }

    #[tokio::test]
    async fn test_missing_fields_are_all_reported() {
        let app = TestApp::new();
        let (status, body) = app
            .admin("POST", "/achievements", json!({"date": "May 1st"}))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            error_fields(&body),
            vec!["title", "description", "categories", "competition", "date"]
        );
        assert_eq!(app.get("/achievements").await.1["data"], json!([]));
    }

    #[tokio::test]
    async fn test_most_recent_achievement_first() {
        let app = TestApp::new();
        for (title, date) in [("Old", "2022-01-10"), ("New", "2024-03-02")] {
            app.admin(
                "POST",
                "/achievements",
                json!({"title": title, "description": "d", "categories": ["x"], "competition": "c", "date": date}),
            )
            .await;
        }

        let (_, list) = app.get("/achievements").await;
        assert_eq!(list["data"][0]["title"], "New");
        assert_eq!(list["data"][1]["title"], "Old");
    }
}

// --- Team ---

#[cfg(test)]
mod team_tests {
    use super::*;

    #[tokio::test]
    async fn test_team_member_defaults_and_soft_delete() {
        let app = TestApp::new();
        let (status, created) = app
            .admin(
                "POST",
                "/team",
                json!({
                    "name": "Linus",
                    "role": "Firmware Lead",
                    "bio": "Writes drivers",
                    "department": "Hardware",
                    "social_links": "{\"github\": \"https://github.com/linus\"}"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["active"], true);
        assert_eq!(created["data"]["department"], "hardware");
        assert_eq!(
            created["data"]["social_links"]["github"],
            "https://github.com/linus"
        );
        assert_eq!(
            created["data"]["join_date"],
            Utc::now().date_naive().format("%Y-%m-%d").to_string()
        );

        let id = created["data"]["id"].as_str().unwrap();
        let (status, body) = app.admin("DELETE", &format!("/team/{id}"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Team member removed successfully");

        let (_, list) = app.get("/team").await;
        assert_eq!(list["data"], json!([]));

        let (status, member) = app.get(&format!("/team/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(member["data"]["active"], false);
    }

    #[tokio::test]
    async fn test_unknown_department_is_rejected() {
        let app = TestApp::new();
        let (status, body) = app
            .admin(
                "POST",
                "/team",
                json!({"name": "N", "role": "R", "bio": "B", "department": "marketing"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["department"]);
    }

    #[tokio::test]
    async fn test_blank_required_field_on_update() {
        let app = TestApp::new();
        let (_, created) = app
            .admin("POST", "/team", json!({"name": "N", "role": "R", "bio": "B"}))
            .await;
        let id = created["data"]["id"].as_str().unwrap();

        let (status, body) = app
            .admin("PUT", &format!("/team/{id}"), json!({"bio": "  "}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "bio cannot be empty");

        let (status, body) = app
            .admin("PUT", &format!("/team/{id}"), json!({"active": false, "role": "Mentor"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "Mentor");
        assert_eq!(body["data"]["bio"], "B");
        assert_eq!(app.get("/team").await.1["data"], json!([]));
    }

    #[tokio::test]
    async fn test_blank_active_keeps_member_listed() {
        let app = TestApp::new();
        let (_, created) = app
            .admin("POST", "/team", json!({"name": "N", "role": "R", "bio": "B"}))
            .await;
        let id = created["data"]["id"].as_str().unwrap();

        let (status, body) = app
            .admin("PUT", &format!("/team/{id}"), json!({"bio": "new", "active": ""}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["active"], true);
        assert_eq!(body["data"]["bio"], "new");

        let (_, list) = app.get("/team").await;
        assert_eq!(list["data"].as_array().unwrap().len(), 1);
    }
}

// --- Courses ---

#[cfg(test)]
mod course_tests {
    use super::*;

    fn course() -> Value {
        json!({
            "title": "Embedded Rust",
            "description": "From blinky to RTIC",
            "category": "Software",
            "instructor": "Ferris",
            "duration": "6 weeks",
            "level": "Intermediate",
            "price": "0",
            "learning_outcomes": ["no_std", "interrupts"]
        })
    }

    #[tokio::test]
    async fn test_create_course() {
        let app = TestApp::new();
        let (status, body) = app.admin("POST", "/courses", course()).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["level"], "intermediate");
        assert_eq!(body["data"]["price"], 0.0);
        assert_eq!(body["data"]["learning_outcomes"], json!(["no_std", "interrupts"]));
    }

    #[tokio::test]
    async fn test_course_validation() {
        let app = TestApp::new();

        let mut negative = course();
        negative["price"] = json!(-5);
        let (status, body) = app.admin("POST", "/courses", negative).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "price cannot be negative");

        let mut expert = course();
        expert["level"] = json!("expert");
        let (status, body) = app.admin("POST", "/courses", expert).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["level"]);

        let (status, body) = app.admin("POST", "/courses", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            error_fields(&body),
            vec![
                "title",
                "description",
                "category",
                "instructor",
                "duration",
                "level",
                "price"
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_learning_outcomes_become_empty() {
        let app = TestApp::new();
        let mut body = course();
        body["learning_outcomes"] = json!("not a list");
        let (status, created) = app.admin("POST", "/courses", body).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["learning_outcomes"], json!([]));
    }

    #[tokio::test]
    async fn test_update_and_delete_course() {
        let app = TestApp::new();
        let (_, created) = app.admin("POST", "/courses", course()).await;
        let id = created["data"]["id"].as_str().unwrap();

        let (status, updated) = app
            .admin("PUT", &format!("/courses/{id}"), json!({"price": 49.5}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["price"], 49.5);
        assert_eq!(updated["data"]["title"], "Embedded Rust");

        let (status, _) = app.admin("DELETE", &format!("/courses/{id}"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app.get(&format!("/courses/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Course not found");
    }
}

// --- Cross-cutting ---

#[cfg(test)]
mod platform_tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
        assert_eq!(app.repo.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429() {
        let app = TestApp::with_config(AppConfig {
            rate_limit_max: 2,
            ..AppConfig::default()
        });

        assert_eq!(app.get("/health").await.0, StatusCode::OK);
        assert_eq!(app.get("/projects").await.0, StatusCode::OK);

        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body["message"],
            "Too many requests from this client, please try again later."
        );
    }

    #[tokio::test]
    async fn test_non_object_json_body_is_a_bad_request() {
        let app = TestApp::new();
        let (status, body) = app.admin("POST", "/projects", json!(["not", "an", "object"])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Request body must be a JSON object");
    }
}
