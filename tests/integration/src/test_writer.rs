//! Streaming writer lifecycle tests.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use flatfs_driver::error::DriverError;
    use flatfs_driver::memory::Fault;
    use flatfs_driver::{CancellationSource, Context, StorageDriver};

    use crate::driver;

    #[tokio::test]
    async fn test_should_hide_content_until_commit() {
        let (store, driver) = driver();
        let ctx = Context::background();

        let mut writer = driver.writer(&ctx, "/upload", false).await.unwrap();
        assert_eq!(writer.write(b"hello ").await.unwrap(), 6);
        assert_eq!(writer.write(b"world, again").await.unwrap(), 12);
        assert_eq!(writer.size(), 18);
        assert!(store.pending_uploads() > 0);
        assert!(matches!(
            driver.stat(&ctx, "/upload").await,
            Err(DriverError::PathNotFound { .. })
        ));

        writer.commit().await.unwrap();
        assert_eq!(driver.get_content(&ctx, "/upload").await.unwrap(), "hello world, again");
        assert_eq!(store.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_should_keep_previous_content_on_cancel() {
        let (store, driver) = driver();
        let ctx = Context::background();
        driver.put_content(&ctx, "/f", Bytes::from("original")).await.unwrap();

        let mut writer = driver.writer(&ctx, "/f", false).await.unwrap();
        writer.write(b"a replacement that spans parts").await.unwrap();
        writer.cancel().await.unwrap();
        writer.cancel().await.unwrap();

        assert_eq!(driver.get_content(&ctx, "/f").await.unwrap(), "original");
        assert_eq!(store.pending_uploads(), 0);
        assert!(matches!(writer.write(b"x").await, Err(DriverError::ClosedWriter)));
        assert!(matches!(writer.commit().await, Err(DriverError::ClosedWriter)));
    }

    #[tokio::test]
    async fn test_should_discard_on_close_without_commit() {
        let (store, driver) = driver();
        let ctx = Context::background();

        let mut writer = driver.writer(&ctx, "/never", false).await.unwrap();
        writer.write(b"0123456789").await.unwrap();
        writer.close().await.unwrap();

        assert!(!store.contains_key("registry/stor/never"));
        assert_eq!(store.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_should_resume_with_append_writer() {
        let (_, driver) = driver();
        let ctx = Context::background();

        let mut writer = driver.writer(&ctx, "/layer", false).await.unwrap();
        writer.write(b"abcdefg").await.unwrap();
        writer.commit().await.unwrap();

        let mut writer = driver.writer(&ctx, "/layer", true).await.unwrap();
        assert_eq!(writer.size(), 7);
        writer.write(b"hijklmnop").await.unwrap();
        assert_eq!(writer.size(), 16);
        writer.commit().await.unwrap();

        assert_eq!(driver.get_content(&ctx, "/layer").await.unwrap(), "abcdefghijklmnop");
        let info = driver.stat(&ctx, "/layer").await.unwrap();
        assert_eq!(info.size, 16);
    }

    #[tokio::test]
    async fn test_should_fail_append_to_missing_path() {
        let (store, driver) = driver();
        let ctx = Context::background();

        let err = driver.writer(&ctx, "/nothing", true).await.unwrap_err();
        assert!(matches!(err, DriverError::PathNotFound { ref path } if path == "/nothing"));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_should_leave_one_complete_payload_after_concurrent_commits() {
        let (_, driver) = driver();
        let ctx = Context::background();
        let first = Bytes::from("first writer payload spanning parts");
        let second = Bytes::from("the second payload, also multipart");

        let mut a = driver.writer(&ctx, "/race", false).await.unwrap();
        let mut b = driver.writer(&ctx, "/race", false).await.unwrap();
        a.write(&first[..10]).await.unwrap();
        b.write(&second[..10]).await.unwrap();
        a.write(&first[10..]).await.unwrap();
        b.write(&second[10..]).await.unwrap();

        let (ra, rb) = tokio::join!(a.commit(), b.commit());
        ra.unwrap();
        rb.unwrap();

        let content = driver.get_content(&ctx, "/race").await.unwrap();
        assert!(content == first || content == second, "interleaved: {content:?}");
    }

    #[tokio::test]
    async fn test_should_abort_upload_when_part_fails() {
        let (store, driver) = driver();
        let ctx = Context::background();
        driver.put_content(&ctx, "/p", Bytes::from("keep")).await.unwrap();
        store.inject_fault(Fault::UploadPart, "registry/stor/p");

        let mut writer = driver.writer(&ctx, "/p", false).await.unwrap();
        let err = writer.write(b"enough bytes for a part").await.unwrap_err();
        assert!(matches!(err, DriverError::Backend(_)));
        assert!(matches!(writer.commit().await, Err(DriverError::ClosedWriter)));
        writer.close().await.unwrap();

        assert_eq!(store.pending_uploads(), 0);
        store.clear_faults();
        assert_eq!(driver.get_content(&ctx, "/p").await.unwrap(), "keep");
    }

    #[tokio::test]
    async fn test_should_stop_writing_once_cancelled() {
        let (store, driver) = driver();
        let source = CancellationSource::new();
        let ctx = source.context();

        let mut writer = driver.writer(&ctx, "/c", false).await.unwrap();
        writer.write(b"abc").await.unwrap();
        source.cancel();

        assert!(matches!(
            writer.write(b"more than a chunk").await,
            Err(DriverError::Cancelled)
        ));
        writer.close().await.unwrap();
        assert!(!store.contains_key("registry/stor/c"));
        assert_eq!(store.pending_uploads(), 0);
    }
}
