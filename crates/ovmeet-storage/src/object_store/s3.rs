// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::{
    pin::Pin,
    task::{self, Poll},
};

use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{
        Builder, Credentials as AwsCred, Region,
        endpoint::{Endpoint, EndpointFuture, Params, ResolveEndpoint},
    },
    primitives::{ByteStream, ByteStreamError},
};
use bytes::Bytes;
use futures::Stream;
use ovmeet_settings::MinIO;
use snafu::{OptionExt as _, ResultExt as _};
use url::Url;

use super::{
    DeleteSnafu, InvalidResponseSnafu, InvalidSettingsSnafu, ListPage, ListSnafu,
    ObjectStorageError, ObjectStore, PutSnafu, RangedRead,
};

type Result<T, E = ObjectStorageError> = std::result::Result<T, E>;

/// Routes every request to the configured MinIO base URI.
///
/// MinIO serves buckets path-style (`{base}/{bucket}/{key}`), not under
/// the bucket subdomains the SDK assumes.
#[derive(Debug)]
struct PathStyleEndpoint {
    base: Url,
}

impl ResolveEndpoint for PathStyleEndpoint {
    fn resolve_endpoint(&self, params: &Params) -> EndpointFuture {
        let target = match params.bucket() {
            Some(bucket) => match self.base.join(bucket) {
                Ok(target) => target,
                Err(e) => return EndpointFuture::ready(Err(e.into())),
            },
            None => self.base.clone(),
        };

        EndpointFuture::ready(Ok(Endpoint::builder().url(target.to_string()).build()))
    }
}

/// Object store backed by an S3 compatible (MinIO) deployment.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Connect to the configured bucket.
    ///
    /// Fails when the MinIO URI does not parse or the bucket is missing.
    pub async fn new(minio: &MinIO) -> Result<Self> {
        let base: Url = minio
            .uri
            .parse()
            .map_err(Into::into)
            .context(InvalidSettingsSnafu {
                message: "Invalid minio URI",
            })?;

        let config = Builder::new()
            .endpoint_resolver(PathStyleEndpoint { base })
            .credentials_provider(AwsCred::new(
                minio.access_key.clone(),
                minio.secret_key.clone(),
                None,
                None,
                "ovmeet",
            ))
            .region(Region::new("minio"))
            .build();

        let store = Self {
            client: Client::from_conf(config),
            bucket: minio.bucket.clone(),
        };

        store.check_bucket().await?;
        log::info!("Using MinIO S3 bucket: {}", store.bucket);

        Ok(store)
    }

    async fn check_bucket(&self) -> Result<()> {
        let response = self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| e.into_service_error());

        match response {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Err(ObjectStorageError::MissingBucket {
                name: self.bucket.clone(),
            }),
            Err(e) => Err(ObjectStorageError::InvalidSettings {
                message: "Cannot reach the configured MinIO storage".into(),
                source: e.into(),
            }),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let _ = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(data.len() as i64)
            .body(data.into())
            .send()
            .await
            .map_err(Into::into)
            .context(PutSnafu {
                message: "failed to put object",
            })?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }

                return Err(ObjectStorageError::Get {
                    source: service_error.into(),
                });
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStorageError::Get { source: e.into() })?;

        Ok(Some(data.into_bytes()))
    }

    async fn get_range(&self, key: &str, start: u64, end: u64) -> Result<RangedRead> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .range(format!("bytes={start}-{end}"))
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Err(ObjectStorageError::NotFound {
                        key: key.to_owned(),
                    });
                }
                if is_invalid_range(&service_error) {
                    return Err(ObjectStorageError::RangeNotSatisfiable {
                        key: key.to_owned(),
                        start,
                        end,
                    });
                }

                return Err(ObjectStorageError::Get {
                    source: service_error.into(),
                });
            }
        };

        // `Content-Range: bytes {start}-{end}/{total}` carries the total
        // object size.
        let file_size = output
            .content_range()
            .and_then(|range| range.rsplit_once('/'))
            .and_then(|(_, total)| total.parse::<u64>().ok())
            .context(InvalidResponseSnafu {
                message: "missing or malformed content-range in ranged get_object response",
            })?;

        let served_end = end.min(file_size.saturating_sub(1));

        Ok(RangedRead {
            file_size,
            start,
            end: served_end,
            body: Box::pin(ByteStreamCompat(output.body)),
        })
    }

    async fn size_if_exists(&self, key: &str) -> Result<Option<u64>> {
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| e.into_service_error());

        match response {
            Ok(head_object) => Ok(Some(head_object.content_length.unwrap_or(0).max(0) as u64)),
            Err(e) => {
                if e.is_not_found() {
                    return Ok(None);
                }

                Err(ObjectStorageError::Get { source: e.into() })
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _ = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(Into::into)
            .context(DeleteSnafu)?;

        Ok(())
    }

    async fn list(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        max_keys: u32,
        continuation: Option<&str>,
    ) -> Result<ListPage> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max_keys as i32);

        if let Some(delimiter) = delimiter {
            request = request.delimiter(delimiter);
        }

        if let Some(token) = continuation {
            request = request.continuation_token(token);
        }

        let output = request
            .send()
            .await
            .map_err(Into::into)
            .context(ListSnafu)?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(ToOwned::to_owned))
            .collect();

        Ok(ListPage {
            keys,
            next_token: output.next_continuation_token().map(ToOwned::to_owned),
        })
    }
}

fn is_invalid_range(
    error: &aws_sdk_s3::operation::get_object::GetObjectError,
) -> bool {
    use aws_sdk_s3::error::ProvideErrorMetadata as _;

    error.code() == Some("InvalidRange")
}

/// Adapter from the AWS [`ByteStream`] to a futures [`Stream`].
struct ByteStreamCompat(ByteStream);

impl Stream for ByteStreamCompat {
    type Item = Result<Bytes, ObjectStorageError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.0).poll_next(cx).map(|item| {
            item.map(|result| {
                result.map_err(|e: ByteStreamError| ObjectStorageError::Get { source: e.into() })
            })
        })
    }
}
