use axum::http::StatusCode;
use portfolio_api::{
    AppConfig, AppError,
    config::BlobStoreConfig,
    forms::UploadedFile,
    storage::MockStorageService,
    uploads::{StoredUpload, UploadResolver, store_image},
};
use uuid::Uuid;

fn cloud() -> UploadResolver {
    UploadResolver::cloud("https://cdn.example.com/team/", "/portfolio/")
}

fn png(bytes: usize) -> UploadedFile {
    UploadedFile {
        file_name: Some("rover.png".to_string()),
        content_type: "image/png".to_string(),
        bytes: vec![0u8; bytes],
    }
}

#[cfg(test)]
mod resolver_tests {
    use super::*;

    #[test]
    fn test_local_resolve_uses_upload_prefix() {
        let stored = StoredUpload {
            key: "abc.png".to_string(),
            url: Some("https://ignored.example/abc.png".to_string()),
        };
        assert_eq!(
            UploadResolver::local().resolve(Some(&stored)),
            Some("/uploads/abc.png".to_string())
        );
        assert_eq!(UploadResolver::local().resolve(None), None);
    }

    #[test]
    fn test_cloud_resolve_prefers_reported_url() {
        let reported = StoredUpload {
            key: "portfolio/abc".to_string(),
            url: Some("https://bucket.example/portfolio/abc".to_string()),
        };
        assert_eq!(
            cloud().resolve(Some(&reported)),
            Some("https://bucket.example/portfolio/abc".to_string())
        );

        let derived = StoredUpload {
            key: "portfolio/abc".to_string(),
            url: None,
        };
        assert_eq!(
            cloud().resolve(Some(&derived)),
            Some("https://cdn.example.com/team/portfolio/abc".to_string())
        );
    }

    #[test]
    fn test_cloud_normalize_rewrites_legacy_local_paths() {
        let resolver = cloud();
        let rewritten = resolver.normalize("/uploads/abc123");
        assert_eq!(rewritten, "https://cdn.example.com/team/portfolio/abc123");

        // Idempotent.
        assert_eq!(resolver.normalize(&rewritten), rewritten);
    }

    #[test]
    fn test_normalize_leaves_other_values_alone() {
        let resolver = cloud();
        assert_eq!(resolver.normalize("/uploads/abc.png"), "/uploads/abc.png");
        assert_eq!(resolver.normalize("/uploads/a/b"), "/uploads/a/b");
        assert_eq!(
            resolver.normalize("HTTPS://elsewhere.example/x"),
            "HTTPS://elsewhere.example/x"
        );
        assert_eq!(
            UploadResolver::local().normalize("/uploads/abc123"),
            "/uploads/abc123"
        );
        assert_eq!(resolver.normalize_opt(None), None);
    }

    #[test]
    fn test_local_object_keys_keep_a_safe_extension() {
        let resolver = UploadResolver::local();

        let key = resolver.object_key(Some("Photo.PNG"));
        let (stem, ext) = key.split_once('.').unwrap();
        assert!(Uuid::parse_str(stem).is_ok());
        assert_eq!(ext, "png");

        assert!(resolver.object_key(Some("../../etc/passwd")).ends_with(".bin"));
        assert!(resolver.object_key(Some("noext")).ends_with(".bin"));
        assert!(resolver.object_key(None).ends_with(".bin"));
    }

    #[test]
    fn test_cloud_object_keys_live_under_the_folder() {
        let key = cloud().object_key(Some("rover.png"));
        let id = key.strip_prefix("portfolio/").expect("folder prefix");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_from_config_picks_mode() {
        assert!(!UploadResolver::from_config(&AppConfig::default()).is_cloud());

        let config = AppConfig {
            blob_store: Some(BlobStoreConfig {
                endpoint: None,
                region: "us-east-1".to_string(),
                access_key: "k".to_string(),
                secret_key: "s".to_string(),
                bucket: "b".to_string(),
                public_base_url: "https://cdn.example.com".to_string(),
                folder: "portfolio".to_string(),
            }),
            ..AppConfig::default()
        };
        assert!(UploadResolver::from_config(&config).is_cloud());
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_store_image_in_cloud_mode() {
        let storage = MockStorageService::new();
        let url = store_image(&storage, &cloud(), png(16)).await.unwrap();

        assert!(url.starts_with("https://cdn.mock.test/portfolio/"));
        assert_eq!(storage.stored_keys().len(), 1);
    }

    #[tokio::test]
    async fn test_store_image_in_local_mode() {
        let storage = MockStorageService::new();
        let url = store_image(&storage, &UploadResolver::local(), png(16))
            .await
            .unwrap();

        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_store_image_rejects_non_images() {
        let storage = MockStorageService::new();
        let file = UploadedFile {
            file_name: Some("notes.txt".to_string()),
            content_type: "text/plain".to_string(),
            bytes: b"hello".to_vec(),
        };

        let err = store_image(&storage, &cloud(), file).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref errors) if errors[0].field == "image"));
        assert!(storage.stored_keys().is_empty());
    }

    #[tokio::test]
    async fn test_store_image_respects_max_bytes() {
        let storage = MockStorageService::new();
        let resolver = cloud().with_max_bytes(8);

        assert!(store_image(&storage, &resolver, png(8)).await.is_ok());

        let err = store_image(&storage, &resolver, png(9)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(storage.stored_keys().len(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_maps_by_mode() {
        let storage = MockStorageService::new_failing();

        let err = store_image(&storage, &cloud(), png(4)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = store_image(&storage, &UploadResolver::local(), png(4))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
