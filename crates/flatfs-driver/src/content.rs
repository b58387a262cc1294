//! Whole-object helpers built on the streaming reader and writer.

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use tracing::warn;

use crate::context::Context;
use crate::driver::StorageDriver;
use crate::error::DriverResult;

/// Read the entire object at `path`.
pub async fn get_content<D>(driver: &D, ctx: &Context, path: &str) -> DriverResult<Bytes>
where
    D: StorageDriver + ?Sized,
{
    let stream = driver.reader(ctx, path, 0).await?;
    let content = stream
        .try_fold(BytesMut::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await?;
    Ok(content.freeze())
}

/// Replace the object at `path` with `content`.
///
/// The writer is closed if writing or committing fails, so a failed call
/// leaves any previous object in place.
pub async fn put_content<D>(
    driver: &D,
    ctx: &Context,
    path: &str,
    content: Bytes,
) -> DriverResult<()>
where
    D: StorageDriver + ?Sized,
{
    let mut writer = driver.writer(ctx, path, false).await?;
    let result = async {
        writer.write(&content).await?;
        writer.commit().await
    }
    .await;

    if let Err(e) = result {
        if let Err(close_err) = writer.close().await {
            warn!(path, error = %close_err, "failed to close writer after error");
        }
        return Err(e);
    }
    Ok(())
}
