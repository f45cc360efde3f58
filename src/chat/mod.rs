//! Conversation flow: submission, single in-flight gating and streaming

pub mod client;
pub mod gate;
pub mod observer;
pub mod stream;

pub use client::{ChatClient, RequestHandle, Submission};
pub use gate::InputGate;
pub use observer::{ChatObserver, NullObserver};
pub use stream::{StreamConsumer, StreamState};
