//! Pre-signed URL tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use chrono::Utc;
    use flatfs_auth::{AuthError, verify_presigned_url};
    use flatfs_driver::error::DriverError;
    use flatfs_driver::memory::MemoryStoreOptions;
    use flatfs_driver::{Context, StorageDriver, UrlOptions};
    use http::Method;
    use serde_json::json;

    use crate::{driver, driver_with, populate, signing_key};

    #[tokio::test]
    async fn test_should_sign_get_and_head_urls() {
        let (_, driver) = driver();
        populate(&driver, &["/blobs/data"], "x").await;
        let ctx = Context::background();

        for method in [Method::GET, Method::HEAD] {
            let options = UrlOptions {
                method: method.clone(),
                ..UrlOptions::default()
            };
            let url = driver.url_for(&ctx, "/blobs/data", &options).await.unwrap();
            let expected = "https://objects.localhost/registry/stor/blobs/data?";
            assert!(url.starts_with(expected), "{url}");
            verify_presigned_url(&url, &method, &signing_key(), Utc::now()).unwrap();
        }
    }

    #[tokio::test]
    async fn test_should_expire_after_requested_duration() {
        let (_, driver) = driver();
        let options = UrlOptions {
            method: Method::GET,
            expires_in: Duration::from_secs(60),
        };
        let url = driver
            .url_for(&Context::background(), "/f", &options)
            .await
            .unwrap();

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert!(matches!(
            verify_presigned_url(&url, &Method::GET, &signing_key(), later),
            Err(AuthError::RequestExpired)
        ));
        assert!(matches!(
            verify_presigned_url(&url, &Method::HEAD, &signing_key(), Utc::now()),
            Err(AuthError::SignatureDoesNotMatch)
        ));
    }

    #[tokio::test]
    async fn test_should_reject_other_methods() {
        let (_, driver) = driver();
        let params: HashMap<String, serde_json::Value> =
            [("method".to_owned(), json!("PUT"))].into_iter().collect();

        let options = UrlOptions::from_parameters(&params).unwrap();
        let err = driver
            .url_for(&Context::background(), "/f", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::UnsupportedMethod { ref method } if method == "PUT"));
    }

    #[tokio::test]
    async fn test_should_report_unsupported_without_signing_key() {
        let (_, driver) = driver_with(MemoryStoreOptions::default());

        let err = driver
            .url_for(&Context::background(), "/f", &UrlOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::UnsupportedMethod { ref method } if method == "GET"));
    }
}
