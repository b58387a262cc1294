//! Recursive delete tests.

#[cfg(test)]
mod tests {
    use flatfs_driver::error::DriverError;
    use flatfs_driver::memory::Fault;
    use flatfs_driver::{Context, StorageDriver};

    use crate::{driver, populate};

    #[tokio::test]
    async fn test_should_delete_entire_subtree() {
        let (store, driver) = driver();
        populate(&driver, &["/a/1", "/a/2", "/a/sub/3", "/a/sub/4", "/ab", "/b"], "x").await;
        let ctx = Context::background();

        driver.delete(&ctx, "/a").await.unwrap();

        assert!(matches!(
            driver.stat(&ctx, "/a").await,
            Err(DriverError::PathNotFound { .. })
        ));
        assert_eq!(store.keys(), ["registry/stor/ab", "registry/stor/b"]);
        assert_eq!(driver.list(&ctx, "/").await.unwrap(), ["/ab", "/b"]);
    }

    #[tokio::test]
    async fn test_should_delete_single_file() {
        let (store, driver) = driver();
        populate(&driver, &["/f", "/f2"], "x").await;

        driver.delete(&Context::background(), "/f").await.unwrap();
        assert_eq!(store.keys(), ["registry/stor/f2"]);
    }

    #[tokio::test]
    async fn test_should_report_missing_path() {
        let (_, driver) = driver();
        populate(&driver, &["/other"], "x").await;

        let err = driver.delete(&Context::background(), "/gone").await.unwrap_err();
        assert!(matches!(err, DriverError::PathNotFound { ref path } if path == "/gone"));
    }

    #[tokio::test]
    async fn test_should_continue_past_failures_and_aggregate_them() {
        let (store, driver) = driver();
        populate(&driver, &["/d/1", "/d/2", "/d/3"], "x").await;
        store.inject_fault(Fault::Delete, "registry/stor/d/2");

        let err = driver.delete(&Context::background(), "/d").await.unwrap_err();
        let DriverError::Aggregate(errors) = &err else {
            panic!("expected aggregate error, got {err:?}");
        };
        assert_eq!(errors.len(), 1);
        assert!(err.to_string().starts_with("1 errors occurred:"));
        assert_eq!(store.keys(), ["registry/stor/d/2"]);
    }

    #[tokio::test]
    async fn test_should_refuse_root() {
        let (store, driver) = driver();
        populate(&driver, &["/keep"], "x").await;

        assert!(matches!(
            driver.delete(&Context::background(), "/").await,
            Err(DriverError::InvalidPath { .. })
        ));
        assert_eq!(store.keys().len(), 1);
    }
}
