//! Move tests.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use flatfs_driver::error::DriverError;
    use flatfs_driver::memory::Fault;
    use flatfs_driver::{Context, StorageDriver};

    use crate::{driver, populate};

    #[tokio::test]
    async fn test_should_move_content_to_new_path() {
        let (store, driver) = driver();
        let ctx = Context::background();
        let payload = Bytes::from("an upload that spans several parts");
        driver.put_content(&ctx, "/_uploads/u1/data", payload.clone()).await.unwrap();

        driver
            .move_object(&ctx, "/_uploads/u1/data", "/blobs/sha256/ab/data")
            .await
            .unwrap();

        assert_eq!(driver.get_content(&ctx, "/blobs/sha256/ab/data").await.unwrap(), payload);
        assert!(matches!(
            driver.stat(&ctx, "/_uploads/u1/data").await,
            Err(DriverError::PathNotFound { .. })
        ));
        assert_eq!(store.keys(), ["registry/stor/blobs/sha256/ab/data"]);
    }

    #[tokio::test]
    async fn test_should_overwrite_destination() {
        let (_, driver) = driver();
        let ctx = Context::background();
        populate(&driver, &["/src"], "new").await;
        populate(&driver, &["/dst"], "old content").await;

        driver.move_object(&ctx, "/src", "/dst").await.unwrap();
        assert_eq!(driver.get_content(&ctx, "/dst").await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_should_report_missing_source() {
        let (store, driver) = driver();
        let ctx = Context::background();

        let err = driver.move_object(&ctx, "/nope", "/dst").await.unwrap_err();
        assert!(matches!(err, DriverError::PathNotFound { ref path } if path == "/nope"));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_should_keep_both_paths_when_copy_fails() {
        let (store, driver) = driver();
        let ctx = Context::background();
        populate(&driver, &["/small"], "abc").await;
        populate(&driver, &["/large"], "a source long enough for multipart").await;
        populate(&driver, &["/dst"], "previous").await;

        store.inject_fault(Fault::Put, "registry/stor/dst");
        store.inject_fault(Fault::Complete, "registry/stor/dst");
        for src in ["/small", "/large"] {
            let err = driver.move_object(&ctx, src, "/dst").await.unwrap_err();
            assert!(matches!(err, DriverError::Backend(_)), "{src}: {err:?}");
        }
        store.clear_faults();

        assert_eq!(driver.get_content(&ctx, "/small").await.unwrap(), "abc");
        assert_eq!(
            driver.get_content(&ctx, "/large").await.unwrap(),
            "a source long enough for multipart"
        );
        assert_eq!(driver.get_content(&ctx, "/dst").await.unwrap(), "previous");
        assert_eq!(store.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_should_treat_move_onto_itself_as_noop() {
        let (_, driver) = driver();
        let ctx = Context::background();
        populate(&driver, &["/same"], "data").await;

        driver.move_object(&ctx, "/same", "/same/").await.unwrap();
        assert_eq!(driver.get_content(&ctx, "/same").await.unwrap(), "data");
    }
}
