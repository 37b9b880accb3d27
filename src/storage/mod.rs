mod object_store;
mod s3;

pub use object_store::ObjectStore;
pub use s3::{create_s3_client, default_public_base_url, S3ObjectStore};
