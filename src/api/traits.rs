use crate::api::traits::sealed::Sealed;

/// A single step against the object store, fully configured by its builder
/// before it runs.
#[async_trait::async_trait]
pub trait ApiOperation: Sealed + Send + Sync {
    type Response;
    type Error;

    async fn execute(&self) -> Result<Self::Response, Self::Error>;
}

pub mod sealed {
    pub trait Sealed {}
}
