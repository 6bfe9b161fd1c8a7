//! Exchange Module — row routing between operator trees

pub mod local;
pub mod outbox;
pub mod partitioner;

pub use local::{LocalExchange, LocalOutbox, ReceiveExec};
pub use outbox::{OfferOutcome, Outbox, OutboxId};
pub use partitioner::{
    HashPartitioner, OwnerPartitioner, RangePartitioner, RoundRobinPartitioner, SendPartitioner,
    SingleOutboxPartitioner, hash_key,
};
