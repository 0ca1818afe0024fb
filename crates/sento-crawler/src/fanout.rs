//! Bounded fan-out: run tasks in sequential groups, concurrently within a
//! group, collecting every task's outcome.
//!
//! A failing task never cancels its siblings or later groups; callers get
//! each item back next to its result and decide how to log it.

use std::future::Future;

use futures::future::join_all;

use crate::shutdown::Shutdown;

/// Outcomes of one group, in item order.
pub type GroupOutcomes<'a, I, O, E> = Vec<(&'a I, Result<O, E>)>;

/// Runs `task` over `items` in groups of `group_size`.
///
/// Each group is awaited in full before the next one starts. Once
/// `shutdown` is triggered no further group is started; the group already
/// running is allowed to finish.
pub async fn run_in_groups<'a, I, O, E, F, Fut>(
    items: &'a [I],
    group_size: usize,
    shutdown: &Shutdown,
    task: F,
) -> Vec<GroupOutcomes<'a, I, O, E>>
where
    F: Fn(&'a I) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let task = &task;
    let mut groups = Vec::new();
    for (index, group) in items.chunks(group_size.max(1)).enumerate() {
        if shutdown.is_triggered() {
            tracing::info!(
                completed_groups = index,
                "shutdown requested, not starting further groups"
            );
            break;
        }
        tracing::debug!(group = index + 1, size = group.len(), "starting fan-out group");
        let outcomes = join_all(group.iter().map(|item| async move { (item, task(item).await) })).await;
        groups.push(outcomes);
    }
    groups
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn seven_items_run_as_five_then_two() {
        let items: Vec<u32> = (1..=7).collect();
        let groups = run_in_groups(&items, 5, &Shutdown::never(), |n| async move {
            Ok::<u32, String>(*n * 10)
        })
        .await;

        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 2]);
        assert_eq!(groups[1][1].0, &7);
        assert_eq!(groups[1][1].1, Ok(70));
    }

    #[tokio::test]
    async fn failure_in_one_group_does_not_stop_the_next() {
        let items: Vec<u32> = (1..=7).collect();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let groups = run_in_groups(&items, 5, &Shutdown::never(), |n| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if *n == 2 {
                Err(format!("task {n} failed"))
            } else {
                Ok(*n)
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].iter().filter(|(_, r)| r.is_err()).count(), 1);
        assert!(groups[1].iter().all(|(_, r)| r.is_ok()));
    }

    #[tokio::test]
    async fn triggered_shutdown_starts_no_group() {
        let (trigger, shutdown) = crate::shutdown::channel();
        trigger.trigger();
        let items = [1, 2, 3];
        let groups = run_in_groups(&items, 2, &shutdown, |n| async move { Ok::<i32, ()>(*n) }).await;
        assert!(groups.is_empty());
    }
}
