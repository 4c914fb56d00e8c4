pub mod latch;
pub mod telemetry;
pub mod thread;

pub use latch::CountDownLatch;
pub use telemetry::init_tracing;
pub use thread::current_thread_name;
