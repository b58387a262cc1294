//! Whole-object and streaming read tests.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use flatfs_driver::error::DriverError;
    use flatfs_driver::{Context, StorageDriver};
    use futures::TryStreamExt;

    use crate::{TEST_CHUNK_SIZE, driver};

    #[tokio::test]
    async fn test_should_round_trip_content_of_any_size() {
        let (store, driver) = driver();
        let ctx = Context::background();

        let cases = [("/empty", 0), ("/small", 3), ("/exact", TEST_CHUNK_SIZE), ("/large", 23)];
        for (path, len) in cases {
            let data: Bytes = (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into();
            driver.put_content(&ctx, path, data.clone()).await.unwrap();
            assert_eq!(driver.get_content(&ctx, path).await.unwrap(), data, "{path}");
        }
        assert_eq!(store.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_should_store_under_root_directory() {
        let (store, driver) = driver();
        let ctx = Context::background();

        let path = "/docker/registry/v2/repositories/app/_layers/link";
        driver.put_content(&ctx, path, Bytes::from("sha256:abc")).await.unwrap();
        assert!(store.contains_key(&format!("registry/stor{path}")));
        assert_eq!(store.keys().len(), 1);
    }

    #[test]
    fn test_should_map_paths_to_keys_and_back() {
        let (_, driver) = driver();
        let mapper = driver.inner().mapper();

        for path in ["/a", "/docker/registry/v2/blobs/sha256/ab/abcd/data", "/x.y/_z-1"] {
            let key = mapper.to_key(path).unwrap();
            assert!(key.starts_with("registry/stor/"), "{key}");
            assert_eq!(mapper.to_path(&key).unwrap(), path);
        }
        assert!(mapper.to_key("/").is_err());
        assert!(mapper.to_path("elsewhere/a").is_err());
    }

    #[tokio::test]
    async fn test_should_replace_existing_content() {
        let (_, driver) = driver();
        let ctx = Context::background();

        driver.put_content(&ctx, "/a", Bytes::from("first version")).await.unwrap();
        driver.put_content(&ctx, "/a", Bytes::from("2nd")).await.unwrap();
        assert_eq!(driver.get_content(&ctx, "/a").await.unwrap(), "2nd");
    }

    #[tokio::test]
    async fn test_should_read_from_offset() {
        let (_, driver) = driver();
        let ctx = Context::background();
        driver.put_content(&ctx, "/blob", Bytes::from("0123456789")).await.unwrap();

        let tail: Vec<Bytes> = driver
            .reader(&ctx, "/blob", 4)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(tail.concat(), b"456789");

        let at_end: Vec<Bytes> = driver
            .reader(&ctx, "/blob", 10)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(at_end.is_empty());

        assert!(matches!(
            driver.reader(&ctx, "/blob", 11).await,
            Err(DriverError::InvalidOffset { offset: 11, .. })
        ));
    }

    #[tokio::test]
    async fn test_should_report_missing_paths() {
        let (_, driver) = driver();
        let ctx = Context::background();

        let err = driver.get_content(&ctx, "/missing").await.unwrap_err();
        assert!(matches!(err, DriverError::PathNotFound { ref path } if path == "/missing"));
        assert!(matches!(
            driver.reader(&ctx, "/missing", 0).await,
            Err(DriverError::PathNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_reject_malformed_paths() {
        let (store, driver) = driver();
        let ctx = Context::background();

        for path in ["", "relative", "/a//b", "/a/./b", "/a/../b", "/a b", "//"] {
            let err = driver
                .put_content(&ctx, path, Bytes::from("x"))
                .await
                .unwrap_err();
            assert!(matches!(err, DriverError::InvalidPath { .. }), "{path:?}");
        }
        assert!(store.keys().is_empty());
    }
}
