//! Record Module
//!
//! TFRecord framing, `tf.train.Example` messages, the typed partial and
//! complete record schemas, and batched reading of partial records.

pub mod example;
pub mod tfrecord;
pub mod schema;
pub mod provider;

pub use example::{Example, Feature, Features};
pub use tfrecord::{RecordReader, RecordWriter, masked_crc32c};
pub use schema::{fields, CompleteRecord, PartialRecord};
pub use provider::{BatchError, Batches, PartialRecordProvider, ProviderConfig};
