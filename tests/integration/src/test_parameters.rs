//! Construction from registry parameters.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use bytes::Bytes;
    use flatfs_core::CoreError;
    use flatfs_driver::memory::InMemoryObjectStore;
    use flatfs_driver::{Context, StorageDriver};
    use serde_json::{Value, json};

    fn params(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[tokio::test]
    async fn test_should_build_driver_from_parameters() {
        let store = Arc::new(InMemoryObjectStore::default());
        let driver = flatfs_driver::from_parameters(
            store.clone(),
            &params(&[("rootdirectory", json!("/stor/")), ("chunksize", json!("4"))]),
        )
        .unwrap();
        assert_eq!(driver.name(), "manta");

        driver
            .put_content(&Context::background(), "/x", Bytes::from("abcdefghij"))
            .await
            .unwrap();
        assert_eq!(store.keys(), ["stor/x"]);
    }

    #[test]
    fn test_should_fall_back_to_path_parameter() {
        let driver = flatfs_driver::from_parameters(
            Arc::new(InMemoryObjectStore::default()),
            &params(&[("path", json!("/alt"))]),
        )
        .unwrap();
        assert_eq!(driver.inner().mapper().root(), "alt");
    }

    #[test]
    fn test_should_require_root_directory() {
        let err = flatfs_driver::from_parameters(
            Arc::new(InMemoryObjectStore::default()),
            &params(&[("chunksize", json!(1024))]),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Config(ref msg) if msg == "No path parameter provided"));
    }

    #[test]
    fn test_should_reject_invalid_chunk_size() {
        for value in [json!(0), json!(-1), json!("lots")] {
            let result = flatfs_driver::from_parameters(
                Arc::new(InMemoryObjectStore::default()),
                &params(&[("rootdirectory", json!("/r")), ("chunksize", value.clone())]),
            );
            assert!(matches!(result, Err(CoreError::Config(_))), "{value}");
        }
    }
}
