//! Thread identity helpers.

/// Name of the calling thread, or its id when unnamed.
///
/// Pool workers are named `{prefix}-{n}`, so this is how work finds out which context it runs on.
#[must_use]
pub fn current_thread_name() -> String {
    let current = std::thread::current();
    current
        .name()
        .map_or_else(|| format!("{:?}", current.id()), str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_thread() {
        let name = std::thread::Builder::new()
            .name("latch-waiter".into())
            .spawn(current_thread_name)
            .map(|h| h.join())
            .expect("spawn")
            .expect("join");
        assert_eq!(name, "latch-waiter");
    }

    #[test]
    fn test_unnamed_thread_falls_back_to_id() {
        let name = std::thread::Builder::new()
            .spawn(current_thread_name)
            .expect("spawn")
            .join()
            .expect("join");
        assert!(name.starts_with("ThreadId("), "got {name}");
    }
}
