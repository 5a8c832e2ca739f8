//! Shared AWS SDK plumbing for the queue and secret adapters.

use crate::error::DispatchError;
use aws_config::{BehaviorVersion, ConfigLoader, Region};
use aws_sdk_sqs::config::http::HttpResponse;
use aws_sdk_sqs::error::{DisplayErrorContext, SdkError};
use url::Url;

/// Loader for the SDK config both clients are built from.
///
/// Credentials come from the default provider chain. `endpoint` points every
/// client at an SQS/Secrets Manager compatible service (ElasticMQ, LocalStack).
pub fn sdk_config_loader(region: &str, endpoint: Option<&Url>) -> ConfigLoader {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
    if let Some(endpoint) = endpoint {
        loader = loader.endpoint_url(endpoint.as_str());
    }
    loader
}

/// Flattens an SDK error into `DispatchError::Aws`, keeping the status and
/// whether the failure happened before any response arrived.
pub(crate) fn sdk_error<E>(operation: &'static str, err: SdkError<E, HttpResponse>) -> DispatchError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let transient = match &err {
        SdkError::TimeoutError(_) => true,
        SdkError::DispatchFailure(failure) => failure.is_timeout() || failure.is_io(),
        _ => false,
    };
    DispatchError::Aws {
        operation,
        status,
        transient,
        message: DisplayErrorContext(&err).to_string(),
    }
}
