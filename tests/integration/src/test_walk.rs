//! Directory listing and traversal tests.

#[cfg(test)]
mod tests {
    use flatfs_driver::error::DriverError;
    use flatfs_driver::{Context, FileInfo, StorageDriver, WalkControl};

    use crate::{driver, populate};

    async fn walk_all(driver: &impl StorageDriver, path: &str) -> Vec<(String, bool)> {
        let mut seen = Vec::new();
        driver
            .walk(&Context::background(), path, &mut |info: &FileInfo| {
                seen.push((info.path.clone(), info.is_dir));
                Ok(WalkControl::Continue)
            })
            .await
            .unwrap();
        seen
    }

    #[tokio::test]
    async fn test_should_walk_depth_first_in_path_order() {
        let (_, driver) = driver();
        populate(&driver, &["/b/1", "/a/2", "/a/1"], "x").await;

        let seen = walk_all(&driver, "/").await;
        assert_eq!(
            seen,
            [
                ("/a".to_owned(), true),
                ("/a/1".to_owned(), false),
                ("/a/2".to_owned(), false),
                ("/b".to_owned(), true),
                ("/b/1".to_owned(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_should_order_by_segment_not_key_bytes() {
        let (_, driver) = driver();
        // "a-b" sorts before "a/x" by key bytes but after "a" by segment.
        populate(&driver, &["/a-b", "/a/x"], "x").await;

        let paths: Vec<String> = walk_all(&driver, "/").await.into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, ["/a", "/a/x", "/a-b"]);
    }

    #[tokio::test]
    async fn test_should_list_direct_children_only() {
        let (_, driver) = driver();
        populate(&driver, &["/a/1", "/a/2", "/a/sub/deep/file", "/b/1"], "x").await;
        let ctx = Context::background();

        assert_eq!(driver.list(&ctx, "/a").await.unwrap(), ["/a/1", "/a/2", "/a/sub"]);
        assert_eq!(driver.list(&ctx, "/").await.unwrap(), ["/a", "/b"]);
        assert!(matches!(
            driver.list(&ctx, "/nope").await,
            Err(DriverError::PathNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_report_walks_that_find_nothing() {
        let (_, driver) = driver();
        let ctx = Context::background();

        assert!(driver.list(&ctx, "/").await.unwrap().is_empty());
        for path in ["/", "/missing"] {
            let err = driver
                .walk(&ctx, path, &mut |_: &FileInfo| Ok(WalkControl::Continue))
                .await
                .unwrap_err();
            assert!(matches!(err, DriverError::PathNotFound { .. }), "{path}");
        }
    }

    #[tokio::test]
    async fn test_should_not_descend_into_skipped_directories() {
        let (_, driver) = driver();
        populate(&driver, &["/a/1", "/a/2", "/b/1", "/c"], "x").await;

        let mut seen = Vec::new();
        driver
            .walk(&Context::background(), "/", &mut |info: &FileInfo| {
                seen.push(info.path.clone());
                Ok(if info.path == "/a" {
                    WalkControl::SkipDir
                } else {
                    WalkControl::Continue
                })
            })
            .await
            .unwrap();
        assert_eq!(seen, ["/a", "/b", "/b/1", "/c"]);
    }

    #[tokio::test]
    async fn test_should_abort_walk_on_visitor_error() {
        let (_, driver) = driver();
        populate(&driver, &["/a/1", "/a/2", "/b/1"], "x").await;

        let mut visited = 0;
        let err = driver
            .walk(&Context::background(), "/", &mut |info: &FileInfo| {
                visited += 1;
                if info.path == "/a/1" {
                    return Err(DriverError::PathNotFound {
                        path: info.path.clone(),
                    });
                }
                Ok(WalkControl::Continue)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::PathNotFound { ref path } if path == "/a/1"));
        assert_eq!(visited, 2);
    }

    #[tokio::test]
    async fn test_should_walk_subtree_only() {
        let (_, driver) = driver();
        populate(&driver, &["/a/x/1", "/a/y", "/b/1"], "x").await;

        let paths: Vec<String> = walk_all(&driver, "/a")
            .await
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(paths, ["/a/x", "/a/x/1", "/a/y"]);
    }
}
