//! Stat tests.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::{DateTime, Utc};
    use flatfs_driver::error::DriverError;
    use flatfs_driver::{Context, FileInfo, StorageDriver, WalkControl};

    use crate::{driver, populate};

    #[tokio::test]
    async fn test_should_stat_file() {
        let (_, driver) = driver();
        let ctx = Context::background();
        let before = Utc::now();
        driver.put_content(&ctx, "/dir/file", Bytes::from("12345678")).await.unwrap();

        let info = driver.stat(&ctx, "/dir/file").await.unwrap();
        assert_eq!(info.path, "/dir/file");
        assert_eq!(info.size, 8);
        assert!(!info.is_dir);
        assert!(info.mod_time >= before);
    }

    #[tokio::test]
    async fn test_should_stat_inferred_directory() {
        let (_, driver) = driver();
        let ctx = Context::background();
        populate(&driver, &["/dir/a", "/dir/sub/b"], "x").await;
        let file = driver.stat(&ctx, "/dir/sub/b").await.unwrap();

        let info = driver.stat(&ctx, "/dir").await.unwrap();
        assert!(info.is_dir);
        assert_eq!(info.size, 0);
        assert!(info.mod_time >= file.mod_time);

        let info = driver.stat(&ctx, "/dir/sub/").await.unwrap();
        assert_eq!(info.path, "/dir/sub");
        assert!(info.is_dir);
    }

    #[tokio::test]
    async fn test_should_stat_root_of_empty_store() {
        let (_, driver) = driver();
        let info = driver.stat(&Context::background(), "/").await.unwrap();
        assert!(info.is_dir);
        assert_eq!(info.mod_time, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn test_should_report_missing_path() {
        let (_, driver) = driver();
        populate(&driver, &["/dirx/a"], "x").await;

        let err = driver.stat(&Context::background(), "/dir").await.unwrap_err();
        assert!(matches!(err, DriverError::PathNotFound { ref path } if path == "/dir"));
    }

    #[tokio::test]
    async fn test_should_treat_file_with_children_as_directory() {
        let (store, driver) = driver();
        let ctx = Context::background();
        populate(&driver, &["/a", "/a/x"], "x").await;

        let info = driver.stat(&ctx, "/a").await.unwrap();
        assert!(info.is_dir);
        assert_eq!(info.size, 0);
        assert_eq!(driver.list(&ctx, "/").await.unwrap(), ["/a"]);

        let mut seen = Vec::new();
        driver
            .walk(&ctx, "/", &mut |info: &FileInfo| {
                seen.push((info.path.clone(), info.is_dir));
                Ok(WalkControl::Continue)
            })
            .await
            .unwrap();
        assert_eq!(seen, [("/a".to_owned(), true), ("/a/x".to_owned(), false)]);

        driver.delete(&ctx, "/a").await.unwrap();
        assert!(store.keys().is_empty());
    }
}
