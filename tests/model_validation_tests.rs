use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
use chrono::{NaiveDate, Utc};
use portfolio_api::{
    AppError,
    error::FieldError,
    forms::{FormFields, ListField, Violations},
    models::{
        ApiResponse, Contributor, CourseLevel, Department, Project, ProjectChanges, Role, User,
        UserProfile, referenced_user_ids,
    },
};
use serde_json::{Value, json};
use uuid::Uuid;

fn fields(value: Value) -> FormFields {
    match value {
        Value::Object(map) => FormFields(map),
        other => panic!("expected an object, got {other}"),
    }
}

#[cfg(test)]
mod enum_tests {
    use super::*;

    #[test]
    fn test_enums_parse_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" Software ".parse::<Department>(), Ok(Department::Software));
        assert_eq!("Beginner".parse::<CourseLevel>(), Ok(CourseLevel::Beginner));
    }

    #[test]
    fn test_unknown_enum_value_is_reported() {
        let err = "expert".parse::<CourseLevel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown value 'expert'");
    }

    #[test]
    fn test_role_defaults_to_member_and_serializes_lowercase() {
        assert_eq!(Role::default(), Role::Member);
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
    }
}

#[cfg(test)]
mod contributor_tests {
    use super::*;

    #[test]
    fn test_contributor_wire_forms() {
        let id = Uuid::new_v4();
        assert_eq!("all".parse::<Contributor>(), Ok(Contributor::AllAdmins));
        assert_eq!("ALL".parse::<Contributor>(), Ok(Contributor::AllAdmins));
        assert_eq!(id.to_string().parse::<Contributor>(), Ok(Contributor::User(id)));
        assert!("bob".parse::<Contributor>().is_err());

        let encoded = serde_json::to_value(vec![Contributor::AllAdmins, Contributor::User(id)]).unwrap();
        assert_eq!(encoded, json!(["all", id.to_string()]));
    }

    #[test]
    fn test_referenced_user_ids_skips_all_and_dedups() {
        let id = Uuid::new_v4();
        let ids = referenced_user_ids(&[
            Contributor::AllAdmins,
            Contributor::User(id),
            Contributor::User(id),
        ]);
        assert_eq!(ids, vec![id]);
    }
}

#[cfg(test)]
mod form_field_tests {
    use super::*;

    #[test]
    fn test_list_accepts_arrays_and_encoded_strings() {
        let f = fields(json!({
            "a": ["Rust", " ", "ROS"],
            "b": "[\"AI\"]",
            "c": "",
            "d": "not json",
            "e": [{"nested": true}],
        }));

        assert_eq!(f.list("a"), ListField::Parsed(vec!["Rust".into(), "ROS".into()]));
        assert_eq!(f.list("b"), ListField::Parsed(vec!["AI".into()]));
        assert_eq!(f.list("c"), ListField::Parsed(vec![]));
        assert_eq!(f.list("d"), ListField::Malformed);
        assert_eq!(f.list("e"), ListField::Malformed);
        assert_eq!(f.list("missing"), ListField::Absent);

        assert_eq!(f.list("d").or_empty(), Some(vec![]));
        assert_eq!(f.list("missing").or_empty(), None);
    }

    #[test]
    fn test_optional_text_distinguishes_absent_from_cleared() {
        let f = fields(json!({"a": "x", "b": "", "c": null, "d": "null"}));
        assert_eq!(f.optional_text("a"), Some(Some("x".to_string())));
        assert_eq!(f.optional_text("b"), Some(None));
        assert_eq!(f.optional_text("c"), Some(None));
        assert_eq!(f.optional_text("d"), Some(None));
        assert_eq!(f.optional_text("missing"), None);
    }

    #[test]
    fn test_flag_accepts_form_strings() {
        let f = fields(json!({"a": "true", "b": "0", "c": true, "d": "maybe", "e": " "}));
        assert_eq!(f.flag("a"), Ok(Some(true)));
        assert_eq!(f.flag("b"), Ok(Some(false)));
        assert_eq!(f.flag("c"), Ok(Some(true)));
        assert_eq!(f.flag("e"), Ok(None));
        assert_eq!(f.flag("missing"), Ok(None));
        assert!(f.flag("d").is_err());
    }

    #[test]
    fn test_date_and_number() {
        let f = fields(json!({"d": "2024-05-01", "bad": "01/05/2024", "p": "19.5", "n": "abc"}));
        assert_eq!(
            f.date("d"),
            Ok(Some(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
        );
        assert_eq!(
            f.date("bad").unwrap_err(),
            FieldError::new("bad", "bad must be a date (YYYY-MM-DD)")
        );
        assert_eq!(f.number("p"), Ok(Some(19.5)));
        assert!(f.number("n").is_err());
    }

    #[test]
    fn test_violations_collect_every_field() {
        let f = fields(json!({"title": "  ", "description": "ok"}));
        let mut v = Violations::new();
        v.required(&f, "title");
        v.required(&f, "description");
        v.required(&f, "competition");

        let Err(AppError::Validation(errors)) = v.into_result() else {
            panic!("expected a validation error");
        };
        let names: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(names, vec!["title", "competition"]);
    }

    #[test]
    fn test_non_blank_ignores_absent_fields() {
        let f = fields(json!({"title": ""}));
        let mut v = Violations::new();
        assert_eq!(v.non_blank(&f, "description"), None);
        assert!(v.is_empty());
        assert_eq!(v.non_blank(&f, "title"), None);
        assert!(!v.is_empty());
    }
}

#[cfg(test)]
mod record_tests {
    use super::*;

    fn project() -> Project {
        Project {
            id: Uuid::new_v4(),
            title: "Rover".to_string(),
            description: "Mars rover".to_string(),
            technologies: vec!["Rust".to_string()],
            image_url: Some("/uploads/a.png".to_string()),
            github_url: None,
            live_url: None,
            social_post_url: None,
            category: "General".to_string(),
            featured: false,
            contributors: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_changes_touch_only_supplied_fields() {
        let mut p = project();
        ProjectChanges {
            title: Some("Rover v2".to_string()),
            image_url: Some(None),
            ..ProjectChanges::default()
        }
        .apply(&mut p);

        assert_eq!(p.title, "Rover v2");
        assert_eq!(p.description, "Mars rover");
        assert_eq!(p.technologies, vec!["Rust"]);
        assert_eq!(p.image_url, None);
    }

    #[test]
    fn test_profile_never_exposes_the_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            password_hash: Some("$2b$12$secret".to_string()),
            name: "Ada".to_string(),
            role: Role::Member,
            google_id: None,
            avatar_url: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&UserProfile::from(&user)).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password_hash"));
        assert!(json.contains("\"has_password\":true"));
    }

    #[test]
    fn test_success_envelope_omits_empty_parts() {
        let value = serde_json::to_value(ApiResponse::<()>::message("done")).unwrap();
        assert_eq!(value, json!({"success": true, "message": "done"}));

        let value = serde_json::to_value(ApiResponse::data(vec![1])).unwrap();
        assert_eq!(value, json!({"success": true, "data": [1]}));
    }
}

#[cfg(test)]
mod error_envelope_tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_single_violation_uses_its_message() {
        let (status, body) = body_of(AppError::invalid("id", "Invalid id format")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid id format");
        assert_eq!(body["errors"][0]["field"], "id");
    }

    #[tokio::test]
    async fn test_multiple_violations_are_all_listed() {
        let (_, body) = body_of(AppError::Validation(vec![
            FieldError::new("title", "title is required"),
            FieldError::new("date", "date is required"),
        ]))
        .await;
        assert_eq!(body["message"], "Please correct the highlighted fields");
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_server_faults_hide_their_detail() {
        let (status, body) = body_of(AppError::Internal("pool timed out at 10.0.0.3".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("errors").is_none());

        let (status, body) = body_of(AppError::Configuration("GOOGLE_CLIENT_ID".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::Upstream("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidCredential("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
